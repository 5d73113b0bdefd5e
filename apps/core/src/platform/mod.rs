// Platform binding: the external capability surface the store coordinates.
// The trait deals in raw `serde_json::Value` for structured replies; typed
// decoding happens once at the adapter boundary so backends stay dumb pipes.

pub mod http;
pub mod memory;
pub mod probe;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub use probe::{BindingSource, LateBinding};

use crate::errors::StoreError;

/// One file handed to [`Platform::fs_upload`].
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub media_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        UploadFile {
            name: name.into(),
            media_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }
}

/// Raw capability surface of the remote platform.
///
/// Implementations report failures through [`PlatformError`]; they never
/// absorb them. Deciding what a failure means (abort, fall back, ignore) is
/// the store's job.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Interactive sign-in. Resolves once the platform has a session.
    async fn auth_sign_in(&self) -> Result<(), PlatformError>;

    async fn auth_sign_out(&self) -> Result<(), PlatformError>;

    async fn auth_is_signed_in(&self) -> Result<bool, PlatformError>;

    /// Profile of the signed-in user, as the platform shapes it.
    async fn auth_get_user(&self) -> Result<Value, PlatformError>;

    /// Stores blobs and returns the handle of the stored artifact.
    async fn fs_upload(&self, files: &[UploadFile]) -> Result<Value, PlatformError>;

    /// Reads a stored blob. Fails if the path does not exist.
    async fn fs_read(&self, path: &str) -> Result<Bytes, PlatformError>;

    async fn kv_get(&self, key: &str) -> Result<Option<String>, PlatformError>;

    /// Returns the platform's acceptance flag for the write.
    async fn kv_set(&self, key: &str, value: &str) -> Result<bool, PlatformError>;

    /// Keys matching a glob pattern, with values when `include_values`.
    async fn kv_list(&self, pattern: &str, include_values: bool) -> Result<Value, PlatformError>;

    /// Asks the platform's AI endpoint to review a stored artifact.
    async fn ai_feedback(&self, artifact_path: &str, prompt: &str) -> Result<Value, PlatformError>;
}

/// Error payload the platform attaches to failed calls. Both fields are
/// optional; `msg` is the short human-readable form when present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorPayload {
    pub msg: Option<String>,
    pub message: Option<String>,
}

impl ErrorPayload {
    /// Preferred display message: `msg` first, then `message`.
    pub fn best_message(&self) -> Option<&str> {
        self.msg.as_deref().or(self.message.as_deref())
    }
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Platform API error (status {status}): {}", payload.best_message().unwrap_or("no message"))]
    Api { status: u16, payload: ErrorPayload },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed platform response: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl PlatformError {
    /// API error carrying a bare short message. Used by local backends.
    pub fn api(status: u16, msg: impl Into<String>) -> Self {
        PlatformError::Api {
            status,
            payload: ErrorPayload {
                msg: Some(msg.into()),
                message: None,
            },
        }
    }
}

/// Decodes a raw platform reply into a typed model at the adapter boundary.
pub(crate) fn decode<T: DeserializeOwned>(what: &'static str, value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|source| StoreError::Decode { what, source })
}

/// Handle of a stored blob, as returned by the upload endpoint.
/// Only `path` is guaranteed; everything else depends on the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FsItem {
    pub path: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default, rename = "type")]
    pub media_type: Option<String>,
}

/// One entry from a key-value listing. `value` is only populated when the
/// listing was requested with values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KvEntry {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// Reply shape of the platform's generation endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AiResponse {
    pub message: AiMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiMessage {
    pub content: AiContent,
}

/// Generation content is either a plain string or a sequence of blocks of
/// which only the first text block matters.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AiContent {
    Text(String),
    Blocks(Vec<AiBlock>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiBlock {
    #[serde(default)]
    pub text: Option<String>,
}

impl AiResponse {
    /// Extracts the reply text: string content as-is, otherwise the first
    /// block's text, otherwise empty.
    pub fn text(&self) -> &str {
        match &self.message.content {
            AiContent::Text(text) => text,
            AiContent::Blocks(blocks) => blocks
                .first()
                .and_then(|block| block.text.as_deref())
                .unwrap_or(""),
        }
    }

    /// Reply carrying plain string content. Used by canned generators and
    /// tests; the HTTP backend decodes replies instead.
    pub fn from_text(text: impl Into<String>) -> Self {
        AiResponse {
            message: AiMessage {
                content: AiContent::Text(text.into()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_payload_prefers_msg() {
        let payload = ErrorPayload {
            msg: Some("Too many attempts".to_string()),
            message: Some("Rate limited by identity provider".to_string()),
        };
        assert_eq!(payload.best_message(), Some("Too many attempts"));
    }

    #[test]
    fn test_error_payload_falls_back_to_message() {
        let payload: ErrorPayload =
            serde_json::from_str(r#"{"message":"Session rejected"}"#).unwrap();
        assert_eq!(payload.best_message(), Some("Session rejected"));
    }

    #[test]
    fn test_empty_error_payload_has_no_message() {
        let payload: ErrorPayload = serde_json::from_str("{}").unwrap();
        assert_eq!(payload.best_message(), None);
    }

    #[test]
    fn test_fs_item_decodes_minimal_shape() {
        let item: FsItem = serde_json::from_value(json!({ "path": "/uploads/a.pdf" })).unwrap();
        assert_eq!(item.path, "/uploads/a.pdf");
        assert_eq!(item.size, None);
    }

    #[test]
    fn test_fs_item_decode_requires_path() {
        let result: Result<FsItem, StoreError> =
            decode("upload response", json!({ "name": "a.pdf" }));
        match result {
            Err(StoreError::Decode { what, .. }) => assert_eq!(what, "upload response"),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_ai_response_string_content() {
        let response: AiResponse =
            serde_json::from_value(json!({ "message": { "content": "hello" } })).unwrap();
        assert_eq!(response.text(), "hello");
    }

    #[test]
    fn test_ai_response_block_content() {
        let response: AiResponse = serde_json::from_value(json!({
            "message": { "content": [{ "type": "text", "text": "first" }, { "text": "second" }] }
        }))
        .unwrap();
        assert_eq!(response.text(), "first");
    }

    #[test]
    fn test_ai_response_empty_blocks() {
        let response: AiResponse =
            serde_json::from_value(json!({ "message": { "content": [] } })).unwrap();
        assert_eq!(response.text(), "");

        let response: AiResponse =
            serde_json::from_value(json!({ "message": { "content": [{}] } })).unwrap();
        assert_eq!(response.text(), "");
    }
}
