use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::application::{AppError, AppResult, EligibilityClient, WatchUser};
use crate::domain::{Eligibility, EventId};

#[derive(Clone, Debug)]
enum Scripted {
    Result(Eligibility),
    Failure(String),
}

/// Eligibility client answering from a script instead of the network.
/// Events with no script entry are reported as not enrollable, with no
/// restrictions.
#[derive(Clone, Default)]
pub struct ScriptedEligibility {
    script: Arc<Mutex<HashMap<EventId, Scripted>>>,
    calls: Arc<Mutex<Vec<EventId>>>,
}

impl ScriptedEligibility {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, event: &EventId, eligibility: Eligibility) {
        self.put(event, Scripted::Result(eligibility));
    }

    pub fn fail(&self, event: &EventId, message: &str) {
        self.put(event, Scripted::Failure(message.to_string()));
    }

    fn put(&self, event: &EventId, entry: Scripted) {
        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        script.insert(event.clone(), entry);
    }

    /// Events checked so far, in call order.
    pub fn calls(&self) -> Vec<EventId> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl EligibilityClient for ScriptedEligibility {
    async fn check(&self, _user: &WatchUser, event: &EventId) -> AppResult<Eligibility> {
        self.calls
            .lock()
            .map_err(|_| AppError::Eligibility("lock poisoned".into()))?
            .push(event.clone());

        let entry = self
            .script
            .lock()
            .map_err(|_| AppError::Eligibility("lock poisoned".into()))?
            .get(event)
            .cloned();

        match entry {
            Some(Scripted::Result(e)) => Ok(e),
            Some(Scripted::Failure(msg)) => Err(AppError::Eligibility(msg)),
            None => Ok(Eligibility::closed(vec![])),
        }
    }
}
