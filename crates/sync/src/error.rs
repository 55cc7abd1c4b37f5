use std::time::Duration;

use autoprice_core::CoreError;

/// Failure talking to the remote store.
///
/// Every variant is a transport failure from the engine's point of view:
/// it is logged and the affected key is skipped for this cycle. None of them
/// is ever propagated as fatal.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote store returned a non-2xx status code.
    #[error("Remote store returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The remote store answered 2xx but reported `ok: false`.
    #[error("Remote store rejected the write: {0}")]
    Rejected(String),

    /// The call did not complete within its deadline.
    #[error("Remote call timed out after {0:?}")]
    Timeout(Duration),

    /// The response body was not the expected envelope.
    #[error("Malformed payload: {0}")]
    Malformed(String),

    /// A local value could not be rendered for sending.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Invalid or unparsable configuration value.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}
