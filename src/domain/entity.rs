use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The unit placed on the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "jobId")]
    pub job_id: String,

    // Transport-encoded image, `data:<media type>;base64,<payload>`.
    pub image: String,
}

impl Envelope {
    /// Wraps a payload under a freshly generated job id.
    pub fn new(image: String) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            image,
        }
    }
}

/// Terminal outcome of a job, as stored under its result key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobOutcome {
    Completed { image: String },
    Failed { error: String },
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed { .. })
    }
}

/// What a poller sees. `Pending` is never stored, it is the absence of an outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Completed { image: String },
    Failed { error: String },
}

impl JobStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, JobStatus::Pending)
    }
}

impl From<JobOutcome> for JobStatus {
    fn from(outcome: JobOutcome) -> Self {
        match outcome {
            JobOutcome::Completed { image } => JobStatus::Completed { image },
            JobOutcome::Failed { error } => JobStatus::Failed { error },
        }
    }
}

impl From<Option<JobOutcome>> for JobStatus {
    fn from(outcome: Option<JobOutcome>) -> Self {
        outcome.map(Into::into).unwrap_or(JobStatus::Pending)
    }
}
