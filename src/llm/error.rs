//! Error types for the completion client.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised by a remote completion call, before or during streaming.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// HTTP transport failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("completion API returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The API reported an error inside the event stream.
    #[error("completion API error: {0}")]
    Api(String),

    /// The event stream broke or could not be opened.
    #[error("stream error: {0}")]
    Stream(String),

    /// A chunk could not be decoded.
    #[error("malformed stream chunk: {0}")]
    MalformedChunk(#[from] serde_json::Error),

    /// Client configuration is unusable.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
