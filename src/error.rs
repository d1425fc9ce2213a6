//! Error types shared across the crate.
//!
//! Every fallible library operation returns one of these. Only the CLI layer
//! decides whether an error terminates the process.

use reqwest::StatusCode;

/// Problems with the startup configuration. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Failures of the JSON-file backed key-value stores.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage file is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Failures of the authorization and token endpoint interactions.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no authorization code was supplied")]
    MissingCode,

    #[error("no code verifier stored; restart the flow with `spotme auth`")]
    MissingVerifier,

    #[error("authorization server rejected the request: {error}")]
    Server {
        error: String,
        description: Option<String>,
    },

    #[error("authorization was denied by the user: {0}")]
    Denied(String),

    #[error("token endpoint returned {0}")]
    Status(StatusCode),

    #[error("invalid authorization URL: {0}")]
    InvalidUrl(String),

    #[error("token response did not contain an access token")]
    MissingAccessToken,

    #[error("timed out waiting for the authorization callback")]
    Timeout,

    #[error("callback listener failed: {0}")]
    Listener(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failures of a single resource request.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("access token rejected: {0}")]
    Unauthorized(String),

    #[error("resource API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("response body is not valid JSON: {0}")]
    Decode(String),
}

impl FetchError {
    /// Whether this failure means the user has to authorize again.
    pub fn requires_reauthorization(&self) -> bool {
        matches!(self, FetchError::Unauthorized(_))
    }
}
