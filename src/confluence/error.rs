use thiserror::Error;

/// Errors from publishing to the wiki.
///
/// Only `Network` is worth retrying; the client does that internally before
/// the error reaches a caller.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("permission denied: {0}")]
    Permission(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("Confluence API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl PublishError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

pub type Result<T> = std::result::Result<T, PublishError>;
