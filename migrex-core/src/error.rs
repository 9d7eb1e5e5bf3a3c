use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The target host could not be reached or authenticated against.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A remote command ran but came back unusable.
    #[error("Command error: {0}")]
    Command(String),

    /// The work item is missing connection material required to even try.
    #[error("{0}")]
    Insufficient(String),

    /// The target exists but is outside the support matrix.
    #[error("{0}")]
    NotSupported(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AssessError {
    /// Operator-facing detail without the variant prefix, used when the
    /// message is persisted verbatim on the process row.
    pub fn detail(&self) -> String {
        match self {
            AssessError::Connection(msg)
            | AssessError::Command(msg)
            | AssessError::Insufficient(msg)
            | AssessError::NotSupported(msg)
            | AssessError::Cancelled(msg)
            | AssessError::Internal(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AssessError>;
