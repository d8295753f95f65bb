use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for failures the caller caused and can correct; these are
    /// surfaced as structured failures, never logged as server errors.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::NotFound(_)
                | Self::AlreadyExists(_)
                | Self::InsufficientBalance(_)
                | Self::NotConfigured(_)
                | Self::PermissionDenied(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
