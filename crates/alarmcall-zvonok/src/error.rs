//! Error types for the Zvonok client.

use thiserror::Error;

/// Errors that can occur when building or using the Zvonok client.
#[derive(Debug, Error)]
pub enum ZvonokError {
    /// Public API key not provided.
    #[error("Zvonok API token not set. Set ZVONOK_API_TOKEN environment variable.")]
    NoToken,

    /// API base is not an absolute http(s) URL.
    #[error("invalid Zvonok API base {base:?}: {reason}")]
    InvalidApiBase { base: String, reason: String },

    /// HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    /// A call operation did not succeed.
    #[error("{0}")]
    Api(String),
}

impl ZvonokError {
    /// True for errors raised while constructing the client.
    pub fn is_config(&self) -> bool {
        !matches!(self, ZvonokError::Api(_))
    }
}

/// Result type for Zvonok operations.
pub type Result<T> = std::result::Result<T, ZvonokError>;
