use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

/// Phase of a try-on job. Variants are declared in pipeline order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JobPhase {
    Submitted,
    PollingStatus,
    PollingResult,
    Completed,
    Failed,
}

impl JobPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobPhase::Completed | JobPhase::Failed)
    }
}

/// A single request/response cycle with the try-on service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TryOnJob {
    /// Local correlation id used in logs; unrelated to the service's request id.
    pub id: Uuid,
    pub request_id: Option<String>,
    pub phase: JobPhase,
    pub history: Vec<JobPhase>,
    pub result_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryOnJob {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            request_id: None,
            phase: JobPhase::Submitted,
            history: vec![JobPhase::Submitted],
            result_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `next`. Regressions and moves out of a terminal phase are refused;
    /// `Failed` is reachable from any non-terminal phase.
    pub fn advance(&mut self, next: JobPhase) -> Result<(), TransitionError> {
        if self.phase.is_terminal() || next <= self.phase {
            return Err(TransitionError {
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        self.history.push(next);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Mark the job failed unless it already reached a terminal phase.
    pub fn fail(&mut self) {
        let _ = self.advance(JobPhase::Failed);
    }

    /// The service id is assigned exactly once per submission.
    pub fn assign_request_id(&mut self, request_id: String) -> Result<(), RequestIdAlreadyAssigned> {
        if let Some(existing) = &self.request_id {
            return Err(RequestIdAlreadyAssigned(existing.clone()));
        }
        self.request_id = Some(request_id);
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn complete(&mut self, result_url: String) -> Result<(), TransitionError> {
        self.advance(JobPhase::Completed)?;
        self.result_url = Some(result_url);
        Ok(())
    }
}

impl Default for TryOnJob {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Illegal job phase transition {from} -> {to}")]
pub struct TransitionError {
    pub from: JobPhase,
    pub to: JobPhase,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Request id already assigned: {0}")]
pub struct RequestIdAlreadyAssigned(pub String);
