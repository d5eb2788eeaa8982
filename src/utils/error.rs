use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// malformed timing input, rejected at submission
    #[error("invalid job {command:?}: {reason}")]
    InvalidJob { command: String, reason: String },
    /// the caller selected a policy outside the recognized set
    #[error("unknown scheduling policy {0:?}")]
    UnknownPolicy(String),
    /// metric aggregation over zero jobs
    #[error("cannot compute metrics over an empty batch")]
    EmptyBatch,
    /// the execution unit for a job could never be created; fatal for that job
    #[error("failed to create execution unit {unit}: {reason}")]
    ExecutionCreate { unit: String, reason: String },
    /// pause/resume/stop failed on an already-transitioning unit; non-fatal
    #[error("execution unit {unit} refused {op}: {reason}")]
    ExecutionState {
        unit: String,
        op: &'static str,
        reason: String,
    },
    #[error("batch {0} not found in store")]
    NoSuchBatch(u32),
    #[error(transparent)]
    InvalidConfig(#[from] config::ConfigError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Others(#[from] anyhow::Error),
}

/// A type alias that forces the usage of the custom error type.
pub type Result<T> = std::result::Result<T, Error>;

impl From<tracing::subscriber::SetGlobalDefaultError> for Error {
    fn from(err: tracing::subscriber::SetGlobalDefaultError) -> Self {
        Self::Others(anyhow::Error::from(err))
    }
}

impl From<tracing_subscriber::util::TryInitError> for Error {
    fn from(err: tracing_subscriber::util::TryInitError) -> Self {
        Self::Others(anyhow::Error::from(err))
    }
}
