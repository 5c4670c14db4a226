use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("placeholder values must be substituted before deployment: {}", .0.join(", "))]
    UnsubstitutedPlaceholders(Vec<&'static str>),
    #[error("missing environment variable {0}")]
    MissingVariable(&'static str),
    #[error("artifact error: {0}")]
    Asset(String),
    #[error("stack {stack} ended in {status}")]
    StackFailed { stack: String, status: String },
    #[error("table {table} does not match the stack definition: {reason}")]
    TableMismatch { table: String, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error("aws request failed: {0}")]
    Aws(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub fn aws<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Aws(Box::new(err))
    }
}
