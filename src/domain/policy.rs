use std::time::Duration;

use super::Eligibility;

/// Pacing of a poller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    /// Pause between two events of the same pass.
    pub event_delay: Duration,
    /// Pause between two passes (fixed delay, not fixed rate).
    pub pass_delay: Duration,
    /// Upper bound on one notification delivery.
    pub notify_timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            event_delay: Duration::from_secs(10),
            pass_delay: Duration::from_secs(30),
            notify_timeout: Duration::from_secs(15),
        }
    }
}

/// What one pass decided for one watched event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Disposition {
    StillPending,
    Removed { code: String },
    Enrollable,
    Skipped,
}

/// Cleanup and notification decision derived from an eligibility result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub remove_for: Option<String>,
    pub notify: bool,
}

impl Verdict {
    pub fn from_eligibility(eligibility: &Eligibility) -> Self {
        Self {
            remove_for: eligibility
                .disqualifying_restriction()
                .map(|r| r.code.clone()),
            notify: eligibility.can_enroll,
        }
    }
}
