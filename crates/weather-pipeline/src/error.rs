//! Error types for pipeline runs.

use thiserror::Error;

/// Errors that abort a pipeline run.
///
/// None of these are recovered inside the pipeline. They surface to the
/// scheduler (or the `--once` caller) as a failed run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Transport failure or non-success status from the weather API
    #[error("Request error{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Request {
        status: Option<u16>,
        message: String,
    },

    /// Weather API body is not the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Normalized record could not be written to the staging location
    #[error("Staging write error: {0}")]
    StagingWrite(String),

    /// Staged artifact could not be read back by the sink
    #[error("Staging read error: {0}")]
    StagingRead(String),

    /// An object already exists at the target key and overwrite is disabled
    #[error("Duplicate artifact: '{key}' already exists in container '{container}'")]
    DuplicateArtifact { container: String, key: String },

    /// Blob backend could not be reached or rejected the write
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl PipelineError {
    /// Short kind name used in run reports and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Request { .. } => "RequestError",
            PipelineError::MalformedResponse(_) => "MalformedResponseError",
            PipelineError::StagingWrite(_) => "StagingWriteError",
            PipelineError::StagingRead(_) => "StagingReadError",
            PipelineError::DuplicateArtifact { .. } => "DuplicateArtifactError",
            PipelineError::StorageUnavailable(_) => "StorageUnavailableError",
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
