use anyhow::Result;
use tracing::{error, info, warn};

use crate::{
    config::PipelineConfig,
    domain::{
        codec,
        entity::{Envelope, JobOutcome},
        error::{JobError, StoreError},
        repository::{JobQueue, ResultStore},
    },
    infrastructure::{tool::ToolRunner, workspace::Workspace},
};

/// What one iteration of the loop did with the job it popped.
///
/// `stored` is false when the outcome could not be written and is lost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Processed {
    Completed { job_id: String, stored: bool },
    Failed { job_id: String, error: String, stored: bool },
    /// The queue item was not a valid envelope, so there was no job id to
    /// report against.
    Discarded,
}

/// A single sequential consumer. Run several against one queue for
/// parallelism; each popped job goes to exactly one of them.
pub struct Worker<Q, R, T>
where
    Q: JobQueue,
    R: ResultStore,
    T: ToolRunner,
{
    name: String,
    queue: Q,
    results: R,
    tool: T,
    workspace: Workspace,
    config: PipelineConfig,
}

impl<Q, R, T> Worker<Q, R, T>
where
    Q: JobQueue,
    R: ResultStore,
    T: ToolRunner,
{
    pub fn new(
        name: impl Into<String>,
        queue: Q,
        results: R,
        tool: T,
        workspace: Workspace,
        config: PipelineConfig,
    ) -> Self {
        Self {
            name: name.into(),
            queue,
            results,
            tool,
            workspace,
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Processes jobs forever. Queue errors are logged and retried after the
    /// configured delay.
    pub async fn run(&self) {
        info!(worker = %self.name, queue = %self.config.queue_name, "Listening on queue");

        loop {
            if let Err(e) = self.process_next().await {
                error!(worker = %self.name, error = ?e, "Failed to pop from queue");
                tokio::time::sleep(self.config.pop_retry_delay).await;
            }
        }
    }

    /// Waits for one job and takes it to a terminal outcome. Only a failed pop
    /// is returned as an error; everything after it ends up in the result.
    pub async fn process_next(&self) -> Result<Processed> {
        let raw = self.queue.pop().await?;

        let envelope = match codec::decode_envelope(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(worker = %self.name, error = %e, "Discarding undecodable queue item");
                return Ok(Processed::Discarded);
            }
        };

        info!(worker = %self.name, job_id = %envelope.job_id, "Received job");

        let outcome = match self.process(&envelope).await {
            Ok(image) => JobOutcome::Completed {
                image: codec::encode_image(&image, codec::RESULT_MEDIA_TYPE),
            },
            Err(e) => {
                error!(worker = %self.name, job_id = %envelope.job_id, error = %e, "Failed to process job");
                JobOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        // Outcome is lost if this fails; there is no redelivery.
        let stored = match self.store(&envelope.job_id, &outcome).await {
            Ok(()) => true,
            Err(e) => {
                error!(worker = %self.name, job_id = %envelope.job_id, error = %e, "Failed to store result");
                false
            }
        };

        let processed = match outcome {
            JobOutcome::Completed { .. } => {
                if stored {
                    info!(worker = %self.name, job_id = %envelope.job_id, "Job completed");
                }
                Processed::Completed {
                    job_id: envelope.job_id,
                    stored,
                }
            }
            JobOutcome::Failed { error } => Processed::Failed {
                job_id: envelope.job_id,
                error,
                stored,
            },
        };

        Ok(processed)
    }

    /// Runs the tool on the envelope's image and returns the result bytes.
    /// Scratch files are gone by the time this returns.
    async fn process(&self, envelope: &Envelope) -> Result<Vec<u8>, JobError> {
        let entry = self.workspace.acquire(&envelope.job_id).await?;

        let image = codec::decode_image(&envelope.image)?;
        entry.write_input(&image).await?;

        self.tool
            .run(entry.input_path(), entry.output_path())
            .await?;

        Ok(entry.read_output().await?)
    }

    async fn store(&self, job_id: &str, outcome: &JobOutcome) -> Result<(), StoreError> {
        let key = self.config.result_key(job_id);

        let value = codec::encode_outcome(outcome).map_err(|e| StoreError::Write {
            key: key.clone(),
            cause: e.into(),
        })?;

        let written = self
            .results
            .put(&key, &value, self.config.result_ttl)
            .await
            .map_err(|cause| StoreError::Write {
                key: key.clone(),
                cause,
            })?;

        if !written {
            warn!(worker = %self.name, job_id = %job_id, "Result already present, keeping the first one");
        }

        Ok(())
    }
}
