use thiserror::Error;

use crate::platform::PlatformError;

/// Store-level error type.
/// Everything the adapters and the analysis workflow can fail with funnels
/// into this enum so callers match on one type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The platform binding has not been injected yet. Adapters absorb this
    /// case silently; only workflow entry points surface it.
    #[error("Platform binding is not ready")]
    NotReady,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Generation error: {0}")]
    Generation(String),

    /// A platform response did not match the shape the adapter expects.
    #[error("Malformed {what} from platform: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
