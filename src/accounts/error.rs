use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccountError {
    /// Input failed shape or format checks. Raised before any hashing or storage.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The stored password hash is missing or unparseable.
    #[error("password comparison failed: {0}")]
    Comparison(String),

    /// Storage failure, or a hashing failure that aborted a write.
    #[error("persistence failed: {0:#}")]
    Persistence(#[source] anyhow::Error),

    #[error("account {0} not found")]
    NotFound(i32),
}

impl AccountError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
