use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::job::{JobPhase, TryOnJob};

/// Response of the headless relay after a job reaches `COMPLETED`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TryOnResponse {
    pub job_id: Uuid,
    pub request_id: Option<String>,
    pub image_url: Option<String>,
    pub phases: Vec<JobPhase>,
}

impl From<TryOnJob> for TryOnResponse {
    fn from(job: TryOnJob) -> Self {
        Self {
            job_id: job.id,
            request_id: job.request_id,
            image_url: job.result_url,
            phases: job.history,
        }
    }
}

/// Error body returned by the relay.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
