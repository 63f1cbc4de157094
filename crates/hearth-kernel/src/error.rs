use thiserror::Error;

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("operation cancelled")]
    Cancelled,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration document error: {0}")]
    Document(#[from] serde_json::Error),
    #[error("logging error: {0}")]
    Logging(String),
    #[error("lifecycle hook error: {0}")]
    Hook(String),
    #[error("metadata index error: {0}")]
    ItemIndex(String),
    #[error("restart error: {0}")]
    Restart(String),
}

impl KernelError {
    /// Wrap an externally-authored hook failure.
    pub fn hook(err: anyhow::Error) -> Self {
        Self::Hook(format!("{err:#}"))
    }
}
