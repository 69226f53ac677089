//! Error types for the ledger client library.

/// All errors that can occur when using the ledger client or cache.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The HTTP transport failed (connection, TLS, body read).
    #[cfg(feature = "async")]
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("api error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, or a placeholder when it could not be read.
        message: String,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Session mirror backend failed, or shared state was poisoned.
    #[error("session storage error: {0}")]
    Session(Box<dyn core::error::Error + Send + Sync>),

    /// No CSRF token was configured for mutating requests.
    #[error("csrf token is required for api requests")]
    MissingCsrfToken,

    /// Filter criteria were rejected before sending.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Undo was requested with an empty deleted stack.
    #[error("there is no deleted transaction to restore")]
    NothingToUndo,

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, LedgerError>;
