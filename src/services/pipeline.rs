//! Try-on job driver.
//!
//! One job is a strictly sequential task: submit, wait for status completion, wait for a
//! result, apply the first output image to the callback target. Jobs share no state, so
//! any number of them may be in flight at once.

use std::time::Instant;

use crate::models::job::{JobPhase, TryOnJob};
use crate::services::encode::GarmentImage;
use crate::services::tryon::{JobError, TryOnClient, TryOnConfig};

/// Receiver of a finished job's output image.
pub trait ResultTarget: Send + Sync {
    fn apply(&self, asset_url: &str);
}

pub struct TryOnPipeline {
    client: TryOnClient,
}

impl TryOnPipeline {
    pub fn new(config: TryOnConfig) -> Result<Self, JobError> {
        Ok(Self {
            client: TryOnClient::new(config)?,
        })
    }

    pub fn client(&self) -> &TryOnClient {
        &self.client
    }

    /// Run a fresh job to a terminal phase.
    pub async fn run(
        &self,
        garment: &GarmentImage,
        target: Option<&dyn ResultTarget>,
    ) -> Result<TryOnJob, JobError> {
        let mut job = TryOnJob::new();
        self.execute(&mut job, garment, target).await?;
        Ok(job)
    }

    /// Outermost scope of a user-initiated job: failures are logged and swallowed,
    /// leaving the target untouched.
    pub async fn run_best_effort(&self, garment: &GarmentImage, target: Option<&dyn ResultTarget>) {
        let mut job = TryOnJob::new();
        if let Err(e) = self.execute(&mut job, garment, target).await {
            tracing::error!(
                job_id = %job.id,
                request_id = job.request_id.as_deref().unwrap_or("-"),
                phase = ?e.phase(),
                error = %e,
                "Try-on job failed"
            );
        }
    }

    /// Drive a fresh `job` through every phase. On error the job is left in `FAILED`.
    ///
    /// Only a `SUBMITTED` job without a request id is accepted. Anything else is
    /// rejected untouched with [`JobError::NotFresh`] before any request is sent.
    pub async fn execute(
        &self,
        job: &mut TryOnJob,
        garment: &GarmentImage,
        target: Option<&dyn ResultTarget>,
    ) -> Result<String, JobError> {
        if job.phase != JobPhase::Submitted || job.request_id.is_some() {
            tracing::warn!(job_id = %job.id, phase = %job.phase, "Refusing to re-run a used job");
            return Err(JobError::NotFresh { phase: job.phase });
        }

        let start = Instant::now();
        metrics::counter!("tryon_jobs_submitted_total").increment(1);

        match self.drive(job, garment).await {
            Ok(url) => {
                metrics::counter!("tryon_jobs_completed_total").increment(1);
                metrics::histogram!("tryon_job_duration_seconds").record(start.elapsed().as_secs_f64());

                tracing::info!(
                    job_id = %job.id,
                    request_id = job.request_id.as_deref().unwrap_or("-"),
                    result_url = %url,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Try-on job completed"
                );

                if let Some(target) = target {
                    target.apply(&url);
                }
                Ok(url)
            }
            Err(e) => {
                job.fail();
                metrics::counter!("tryon_jobs_failed_total").increment(1);
                Err(e)
            }
        }
    }

    async fn drive(&self, job: &mut TryOnJob, garment: &GarmentImage) -> Result<String, JobError> {
        tracing::info!(job_id = %job.id, "Submitting try-on job");
        let request_id = self.client.submit(garment).await?;
        job.assign_request_id(request_id.clone())?;

        self.enter(job, JobPhase::PollingStatus)?;
        self.client.poll_status(&request_id).await?;

        self.enter(job, JobPhase::PollingResult)?;
        let images = self.client.poll_result(&request_id).await?;

        // poll_result only returns once at least one image is present
        let url = images
            .into_iter()
            .next()
            .map(|image| image.url)
            .ok_or_else(|| JobError::MalformedResponse {
                phase: JobPhase::PollingResult,
                detail: "empty images list".to_string(),
            })?;

        job.complete(url.clone())?;
        Ok(url)
    }

    fn enter(&self, job: &mut TryOnJob, phase: JobPhase) -> Result<(), JobError> {
        job.advance(phase)?;
        tracing::debug!(
            job_id = %job.id,
            request_id = job.request_id.as_deref().unwrap_or("-"),
            %phase,
            "Job phase changed"
        );
        Ok(())
    }
}
