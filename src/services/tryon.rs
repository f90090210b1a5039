use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::time::{sleep, Instant};

use crate::models::job::{JobPhase, RequestIdAlreadyAssigned, TransitionError};
use crate::models::tryon::{
    OutputImage, ResultResponse, StatusResponse, SubmitRequest, SubmitResponse,
};
use crate::services::encode::GarmentImage;

/// Explicit configuration for the try-on client. Nothing is read from globals.
#[derive(Debug, Clone)]
pub struct TryOnConfig {
    /// Submission endpoint, without trailing slash.
    pub api_url: String,
    pub api_key: String,
    pub auth_scheme: String,
    pub model_image_url: String,
    pub category: String,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
    pub request_timeout: Duration,
}

impl TryOnConfig {
    /// Defaults matching the production service, pointed at `api_url`.
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            auth_scheme: "Key".to_string(),
            model_image_url: crate::config::DEFAULT_MODEL_IMAGE_URL.to_string(),
            category: "tops".to_string(),
            poll_interval: Duration::from_millis(1000),
            poll_timeout: Duration::from_millis(60_000),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Client for the remote try-on queue: submission, status and result endpoints.
pub struct TryOnClient {
    http: Client,
    config: TryOnConfig,
}

impl TryOnClient {
    pub fn new(config: TryOnConfig) -> Result<Self, JobError> {
        let http = Client::builder()
            .user_agent(concat!("tryon-overlay/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()
            .map_err(JobError::Client)?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &TryOnConfig {
        &self.config
    }

    fn authorization(&self) -> String {
        format!("{} {}", self.config.auth_scheme, self.config.api_key)
    }

    fn status_url(&self, request_id: &str) -> String {
        format!("{}/requests/{}/status", self.config.api_url, request_id)
    }

    fn result_url(&self, request_id: &str) -> String {
        format!("{}/requests/{}", self.config.api_url, request_id)
    }

    /// POST the job and return the service-assigned request id.
    pub async fn submit(&self, garment: &GarmentImage) -> Result<String, JobError> {
        let payload = SubmitRequest {
            model_image: &self.config.model_image_url,
            garment_image: garment.as_data_url(),
            category: &self.config.category,
        };

        let response = self
            .http
            .post(&self.config.api_url)
            .header(AUTHORIZATION, self.authorization())
            .json(&payload)
            .send()
            .await
            .map_err(|source| JobError::Transport {
                phase: JobPhase::Submitted,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(JobError::Submission { status });
        }

        let body: SubmitResponse = decode_body(response, JobPhase::Submitted).await?;
        body.request_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| JobError::MalformedResponse {
                phase: JobPhase::Submitted,
                detail: "missing request_id".to_string(),
            })
    }

    /// Wait until the status endpoint reports the completion sentinel.
    pub async fn poll_status(&self, request_id: &str) -> Result<(), JobError> {
        let url = self.status_url(request_id);
        self.poll(&url, JobPhase::PollingStatus, |body: StatusResponse| {
            tracing::debug!(status = ?body.status, "Status poll");
            body.is_completed().then_some(())
        })
        .await
    }

    /// Wait until the result endpoint lists at least one output image.
    pub async fn poll_result(&self, request_id: &str) -> Result<Vec<OutputImage>, JobError> {
        let url = self.result_url(request_id);
        self.poll(&url, JobPhase::PollingResult, |body: ResultResponse| {
            body.images.filter(|images| !images.is_empty())
        })
        .await
    }

    /// Fixed-interval poll loop. A fresh timeout window starts on every call.
    async fn poll<T, R, F>(&self, url: &str, phase: JobPhase, ready: F) -> Result<R, JobError>
    where
        T: DeserializeOwned,
        F: Fn(T) -> Option<R>,
    {
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            metrics::counter!("tryon_polls_total", "phase" => phase.to_string()).increment(1);

            let response = self
                .http
                .get(url)
                .header(AUTHORIZATION, self.authorization())
                .send()
                .await
                .map_err(|source| JobError::Transport { phase, source })?;

            let status = response.status();
            if !status.is_success() {
                return Err(JobError::Poll { phase, status });
            }

            let body: T = decode_body(response, phase).await?;
            if let Some(value) = ready(body) {
                tracing::debug!(%phase, attempt, elapsed_ms = started.elapsed().as_millis() as u64, "Poll satisfied");
                return Ok(value);
            }

            let elapsed = started.elapsed();
            if elapsed >= self.config.poll_timeout {
                return Err(JobError::Timeout { phase, elapsed });
            }

            tracing::trace!(%phase, attempt, "Not ready, sleeping");
            sleep(self.config.poll_interval).await;
        }
    }
}

async fn decode_body<T: DeserializeOwned>(response: Response, phase: JobPhase) -> Result<T, JobError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|source| JobError::Transport { phase, source })?;
    serde_json::from_slice(&bytes).map_err(|e| JobError::MalformedResponse {
        phase,
        detail: e.to_string(),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Submission rejected with HTTP {status}")]
    Submission { status: StatusCode },

    #[error("Malformed response during {phase}: {detail}")]
    MalformedResponse { phase: JobPhase, detail: String },

    #[error("Poll failed during {phase} with HTTP {status}")]
    Poll { phase: JobPhase, status: StatusCode },

    #[error("Timed out during {phase} after {elapsed:?}")]
    Timeout { phase: JobPhase, elapsed: Duration },

    #[error("HTTP request failed during {phase}: {source}")]
    Transport {
        phase: JobPhase,
        #[source]
        source: reqwest::Error,
    },

    #[error("Job {phase} cannot be run again; a fresh job is required")]
    NotFresh { phase: JobPhase },

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    RequestId(#[from] RequestIdAlreadyAssigned),
}

impl JobError {
    /// Phase that was in flight when the error occurred, if any.
    pub fn phase(&self) -> Option<JobPhase> {
        match self {
            JobError::Client(_) | JobError::RequestId(_) => None,
            JobError::NotFresh { phase } => Some(*phase),
            JobError::Transition(e) => Some(e.from),
            JobError::Submission { .. } => Some(JobPhase::Submitted),
            JobError::MalformedResponse { phase, .. }
            | JobError::Poll { phase, .. }
            | JobError::Timeout { phase, .. }
            | JobError::Transport { phase, .. } => Some(*phase),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> TryOnClient {
        TryOnClient::new(TryOnConfig::new("https://queue.example/fashn/tryon", "test-key")).unwrap()
    }

    #[test]
    fn test_endpoint_urls() {
        let client = client();
        assert_eq!(
            client.status_url("abc123"),
            "https://queue.example/fashn/tryon/requests/abc123/status"
        );
        assert_eq!(
            client.result_url("abc123"),
            "https://queue.example/fashn/tryon/requests/abc123"
        );
    }

    #[test]
    fn test_authorization_header_value() {
        assert_eq!(client().authorization(), "Key test-key");
    }

    #[test]
    fn test_error_phase() {
        let err = JobError::Timeout {
            phase: JobPhase::PollingResult,
            elapsed: Duration::from_secs(61),
        };
        assert_eq!(err.phase(), Some(JobPhase::PollingResult));
        assert_eq!(
            JobError::Submission { status: StatusCode::INTERNAL_SERVER_ERROR }.phase(),
            Some(JobPhase::Submitted)
        );
        assert_eq!(
            JobError::NotFresh { phase: JobPhase::Completed }.phase(),
            Some(JobPhase::Completed)
        );
        let refused = JobError::from(TransitionError {
            from: JobPhase::Failed,
            to: JobPhase::Completed,
        });
        assert_eq!(refused.phase(), Some(JobPhase::Failed));
    }
}
