use serde::{Deserialize, Serialize};

pub const ALREADY_ENROLLED: &str = "already_enrolled";
pub const IN_THE_PAST: &str = "in_the_past";

/// Restriction codes that mean the event can never become enrollable again.
pub const DISQUALIFYING_CODES: [&str; 2] = [ALREADY_ENROLLED, IN_THE_PAST];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restriction {
    pub code: String,
    #[serde(default)]
    pub description: String,
}

impl Restriction {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            description: String::new(),
        }
    }

    pub fn is_disqualifying(&self) -> bool {
        DISQUALIFYING_CODES.contains(&self.code.as_str())
    }
}

/// Eligibility of one user for one event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    pub can_enroll: bool,
    #[serde(default)]
    pub restrictions: Vec<Restriction>,
}

impl Eligibility {
    pub fn open() -> Self {
        Self {
            can_enroll: true,
            restrictions: vec![],
        }
    }

    pub fn closed(restrictions: Vec<Restriction>) -> Self {
        Self {
            can_enroll: false,
            restrictions,
        }
    }

    /// First disqualifying restriction, if any. An empty list never disqualifies.
    pub fn disqualifying_restriction(&self) -> Option<&Restriction> {
        self.restrictions.iter().find(|r| r.is_disqualifying())
    }
}
