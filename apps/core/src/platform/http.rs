// HTTP platform client — the single point of entry for all remote platform
// calls. Talks the platform's REST surface and hands raw JSON back to the
// adapters; no typed decoding happens here.

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::{json, Value};
use tracing::debug;

use async_trait::async_trait;

use super::{ErrorPayload, Platform, PlatformError, UploadFile};
use crate::config::StoreConfig;

const WHOAMI_PATH: &str = "/auth/whoami";
const SIGN_IN_PATH: &str = "/auth/signin";
const SIGN_OUT_PATH: &str = "/auth/signout";
const FS_UPLOAD_PATH: &str = "/fs/upload";
const FS_READ_PATH: &str = "/fs/read";
const KV_GET_PATH: &str = "/kv/get";
const KV_SET_PATH: &str = "/kv/set";
const KV_LIST_PATH: &str = "/kv/list";
const AI_FEEDBACK_PATH: &str = "/ai/feedback";

/// Generation calls can take a while; everything else finishes well inside
/// this bound.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(120);

/// REST rendition of the platform binding, authenticated with a bearer
/// token. Where the browser SDK would open an interactive sign-in window,
/// this client validates its token against the identity endpoint instead.
#[derive(Clone)]
pub struct HttpPlatform {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpPlatform {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.base_url.clone(), config.auth_token.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .bearer_auth(&self.token)
    }

    /// Converts a non-success response into an API error, keeping the
    /// platform's error payload when the body parses as one.
    async fn api_error(response: Response) -> PlatformError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        PlatformError::Api {
            status,
            payload: payload_from_body(body),
        }
    }

    async fn json_body(response: Response) -> Result<Value, PlatformError> {
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(response.json::<Value>().await?)
    }

    async fn expect_success(response: Response) -> Result<(), PlatformError> {
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(())
    }
}

/// Parses an error body into the platform's payload shape; non-JSON bodies
/// are carried whole in the generic `message` slot.
fn payload_from_body(body: String) -> ErrorPayload {
    serde_json::from_str(&body).unwrap_or_else(|_| ErrorPayload {
        msg: None,
        message: if body.is_empty() { None } else { Some(body) },
    })
}

#[async_trait]
impl Platform for HttpPlatform {
    async fn auth_sign_in(&self) -> Result<(), PlatformError> {
        let response = self.request(Method::POST, SIGN_IN_PATH).send().await?;
        Self::expect_success(response).await
    }

    async fn auth_sign_out(&self) -> Result<(), PlatformError> {
        let response = self.request(Method::POST, SIGN_OUT_PATH).send().await?;
        Self::expect_success(response).await
    }

    async fn auth_is_signed_in(&self) -> Result<bool, PlatformError> {
        let response = self.request(Method::GET, WHOAMI_PATH).send().await?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(false);
        }
        Self::expect_success(response).await?;
        Ok(true)
    }

    async fn auth_get_user(&self) -> Result<Value, PlatformError> {
        let response = self.request(Method::GET, WHOAMI_PATH).send().await?;
        Self::json_body(response).await
    }

    async fn fs_upload(&self, files: &[UploadFile]) -> Result<Value, PlatformError> {
        let mut form = Form::new();
        for (index, file) in files.iter().enumerate() {
            let mut part = Part::bytes(file.bytes.to_vec()).file_name(file.name.clone());
            if let Some(media_type) = &file.media_type {
                part = part.mime_str(media_type)?;
            }
            form = form.part(format!("file{index}"), part);
        }
        debug!("uploading {} file(s)", files.len());
        let response = self
            .request(Method::POST, FS_UPLOAD_PATH)
            .multipart(form)
            .send()
            .await?;
        Self::json_body(response).await
    }

    async fn fs_read(&self, path: &str) -> Result<Bytes, PlatformError> {
        let response = self
            .request(Method::GET, FS_READ_PATH)
            .query(&[("path", path)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(response.bytes().await?)
    }

    async fn kv_get(&self, key: &str) -> Result<Option<String>, PlatformError> {
        let response = self
            .request(Method::GET, KV_GET_PATH)
            .query(&[("key", key)])
            .send()
            .await?;
        let value = Self::json_body(response).await?;
        // null for missing keys, a JSON string otherwise
        Ok(serde_json::from_value(value)?)
    }

    async fn kv_set(&self, key: &str, value: &str) -> Result<bool, PlatformError> {
        let response = self
            .request(Method::POST, KV_SET_PATH)
            .json(&json!({ "key": key, "value": value }))
            .send()
            .await?;
        let accepted = Self::json_body(response).await?;
        Ok(serde_json::from_value(accepted)?)
    }

    async fn kv_list(&self, pattern: &str, include_values: bool) -> Result<Value, PlatformError> {
        let response = self
            .request(Method::GET, KV_LIST_PATH)
            .query(&[
                ("pattern", pattern),
                ("values", if include_values { "true" } else { "false" }),
            ])
            .send()
            .await?;
        Self::json_body(response).await
    }

    async fn ai_feedback(&self, artifact_path: &str, prompt: &str) -> Result<Value, PlatformError> {
        debug!("requesting feedback for {artifact_path}");
        let response = self
            .request(Method::POST, AI_FEEDBACK_PATH)
            .json(&json!({ "path": artifact_path, "message": prompt }))
            .send()
            .await?;
        Self::json_body(response).await
    }
}
