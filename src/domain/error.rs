use std::path::PathBuf;

use thiserror::Error;

/// Raised to the submitter; nothing was enqueued.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("image data is required")]
    MissingPayload,

    #[error("failed to encode job envelope: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to enqueue job: {0:#}")]
    Queue(anyhow::Error),
}

/// Access to the shared store failed, or it held something unreadable.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read result {key}: {cause:#}")]
    Read { key: String, cause: anyhow::Error },

    #[error("failed to write result {key}: {cause:#}")]
    Write { key: String, cause: anyhow::Error },

    #[error("result {key} is not a valid outcome: {source}")]
    Corrupt {
        key: String,
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("image payload has no data URI separator")]
    MissingSeparator,

    #[error("image payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("malformed job envelope: {0}")]
    Envelope(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("job id {0:?} cannot be used as a file name")]
    InvalidJobId(String),

    #[error("workspace I/O failed at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ToolExecutionError {
    #[error("failed to process image with {program}: input file {} does not exist", input.display())]
    MissingInput { program: String, input: PathBuf },

    #[error("failed to process image with {program}: could not start process: {source}")]
    Launch {
        program: String,
        source: std::io::Error,
    },

    #[error("failed to process image with {program}: exited with status {status}: {stderr}")]
    Exited {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Anything that turns a popped job into a `failed` outcome.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Tool(#[from] ToolExecutionError),
}
