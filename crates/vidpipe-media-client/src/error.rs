//! Media client error types.

use thiserror::Error;

/// Result type for media service operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur talking to the remote media service.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Remote service returned {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MediaError {
    pub fn remote(status: u16, body: impl Into<String>) -> Self {
        Self::Remote {
            status,
            body: body.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Check if the error is worth retrying.
    ///
    /// Only transient transport failures and server-side errors qualify;
    /// 4xx responses (other than 429) and empty lookups are not retryable.
    /// Note this says nothing about whether the *operation* is safe to
    /// retry: creates are never idempotent and must not be blindly reissued.
    pub fn is_retryable(&self) -> bool {
        match self {
            MediaError::Network(_) => true,
            MediaError::Remote { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
