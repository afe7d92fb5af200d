//! Mock implementations for external services.
//!
//! Provides deterministic stand-ins for the progress source so pipeline
//! behavior can be driven without a network.

use async_trait::async_trait;
use badgeboard_domain::{CompletedBadge, SealedCredential, StudentId, SyncError};
use badgeboard_sync::ProgressSource;
use parking_lot::Mutex;
use std::collections::HashMap;

/// One scripted response step for a student.
#[derive(Debug, Clone)]
pub enum SourceStep {
    /// Return this payload
    Progress(Vec<CompletedBadge>),
    /// Fail with a retryable fetch error carrying this message
    Fail(String),
    /// Fail with a permanent malformed-payload error
    Malformed(String),
}

#[derive(Default)]
struct ScriptState {
    steps: HashMap<StudentId, Vec<SourceStep>>,
    calls: HashMap<StudentId, usize>,
}

/// A progress source that replays a per-student script.
///
/// Each fetch consumes the next step for that student; the final step is
/// repeated once the script runs out. Students with no script get an empty
/// payload.
#[derive(Default)]
pub struct ScriptedProgressSource {
    state: Mutex<ScriptState>,
}

impl ScriptedProgressSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the response script for one student.
    pub fn script(&self, student_id: &str, steps: Vec<SourceStep>) {
        let id = StudentId::new(student_id).expect("student id is valid");
        self.state.lock().steps.insert(id, steps);
    }

    /// How many times progress was fetched for this student.
    pub fn call_count(&self, student_id: &str) -> usize {
        let id = StudentId::new(student_id).expect("student id is valid");
        self.state.lock().calls.get(&id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ProgressSource for ScriptedProgressSource {
    async fn fetch_progress(
        &self,
        student_id: &StudentId,
        _credential: Option<&SealedCredential>,
    ) -> Result<Vec<CompletedBadge>, SyncError> {
        let step = {
            let mut state = self.state.lock();
            let call = state.calls.entry(student_id.clone()).or_insert(0);
            let index = *call;
            *call += 1;

            match state.steps.get(student_id) {
                Some(steps) if !steps.is_empty() => {
                    Some(steps[index.min(steps.len() - 1)].clone())
                }
                _ => None,
            }
        };

        match step {
            None => Ok(Vec::new()),
            Some(SourceStep::Progress(payload)) => Ok(payload),
            Some(SourceStep::Fail(message)) => Err(SyncError::Fetch(message)),
            Some(SourceStep::Malformed(message)) => Err(SyncError::MalformedPayload(message)),
        }
    }
}
