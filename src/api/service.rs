use tracing::{error, info};

use crate::{
    config::PipelineConfig,
    domain::{
        codec,
        entity::{Envelope, JobStatus},
        error::{StoreError, SubmissionError},
        repository::{JobQueue, ResultStore},
    },
};

/// Enqueue/lookup surface handed to whatever fronts the pipeline.
#[derive(Clone)]
pub struct JobService<Q, R>
where
    Q: JobQueue,
    R: ResultStore,
{
    queue: Q,
    results: R,
    config: PipelineConfig,
}

impl<Q, R> JobService<Q, R>
where
    Q: JobQueue,
    R: ResultStore,
{
    pub fn new(queue: Q, results: R, config: PipelineConfig) -> Self {
        Self {
            queue,
            results,
            config,
        }
    }

    /// Queues `image` and returns its job id without waiting for processing.
    pub async fn submit(&self, image: &str) -> Result<String, SubmissionError> {
        if image.trim().is_empty() {
            return Err(SubmissionError::MissingPayload);
        }

        let envelope = Envelope::new(image.to_string());
        let raw = codec::encode_envelope(&envelope)?;

        if let Err(e) = self.queue.push(&raw).await {
            error!(job_id = %envelope.job_id, error = ?e, "Failed to submit job");
            return Err(SubmissionError::Queue(e));
        }

        info!(job_id = %envelope.job_id, "Submitted job");

        Ok(envelope.job_id)
    }

    /// Current status of `job_id`. Unknown, unprocessed and expired jobs are
    /// all `Pending`. Never writes.
    pub async fn poll(&self, job_id: &str) -> Result<JobStatus, StoreError> {
        let key = self.config.result_key(job_id);

        let raw = self
            .results
            .get(&key)
            .await
            .map_err(|cause| StoreError::Read {
                key: key.clone(),
                cause,
            })?;

        let outcome = raw
            .map(|raw| codec::decode_outcome(&raw))
            .transpose()
            .map_err(|source| StoreError::Corrupt { key, source })?;

        Ok(outcome.into())
    }
}
