// In-memory platform: a complete local backend for offline development and
// tests. Mirrors the deployed platform's observable behavior, including its
// response shapes, plus a few knobs for forcing failure paths.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{ErrorPayload, Platform, PlatformError, UploadFile};
use crate::models::PlatformUser;

pub struct InMemoryPlatform {
    user: Mutex<PlatformUser>,
    signed_in: AtomicBool,
    sign_in_denial: Mutex<Option<ErrorPayload>>,
    user_payload_override: Mutex<Option<Value>>,
    files: Mutex<BTreeMap<String, Bytes>>,
    kv: Mutex<BTreeMap<String, String>>,
    kv_writes: Mutex<Vec<(String, String)>>,
    ai_content: Mutex<Value>,
    fail_next_upload: AtomicBool,
}

impl InMemoryPlatform {
    pub fn new() -> Arc<Self> {
        Self::with_user(PlatformUser {
            id: "local-user".to_string(),
            username: Some("local".to_string()),
            email: None,
        })
    }

    pub fn with_user(user: PlatformUser) -> Arc<Self> {
        Arc::new(Self {
            user: Mutex::new(user),
            signed_in: AtomicBool::new(false),
            sign_in_denial: Mutex::new(None),
            user_payload_override: Mutex::new(None),
            files: Mutex::new(BTreeMap::new()),
            kv: Mutex::new(BTreeMap::new()),
            kv_writes: Mutex::new(Vec::new()),
            ai_content: Mutex::new(Value::String(default_review_json())),
            fail_next_upload: AtomicBool::new(false),
        })
    }

    /// Forces every subsequent sign-in to fail with this payload.
    pub fn deny_sign_in(&self, payload: ErrorPayload) {
        *self.sign_in_denial.lock().expect("denial lock poisoned") = Some(payload);
    }

    /// Marks the session signed in or out without going through sign-in.
    pub fn set_signed_in(&self, signed_in: bool) {
        self.signed_in.store(signed_in, Ordering::SeqCst);
    }

    /// Replaces the profile payload returned by the auth surface. Accepts
    /// arbitrary JSON so tests can return shapes that fail decoding.
    pub fn set_user_payload(&self, payload: Value) {
        *self.user_payload_override.lock().expect("user lock poisoned") = Some(payload);
    }

    /// Replaces the generation reply content: a string or a block array,
    /// placed verbatim at `message.content`.
    pub fn set_ai_content(&self, content: Value) {
        *self.ai_content.lock().expect("ai lock poisoned") = content;
    }

    /// Makes the next upload fail once.
    pub fn fail_next_upload(&self) {
        self.fail_next_upload.store(true, Ordering::SeqCst);
    }

    /// Seeds a key-value pair without recording it in the write log.
    pub fn seed_kv(&self, key: impl Into<String>, value: impl Into<String>) {
        self.kv
            .lock()
            .expect("kv lock poisoned")
            .insert(key.into(), value.into());
    }

    /// Every `kv_set` call in order, including overwrites.
    pub fn kv_writes(&self) -> Vec<(String, String)> {
        self.kv_writes.lock().expect("kv write log poisoned").clone()
    }

    pub fn stored_file_count(&self) -> usize {
        self.files.lock().expect("file lock poisoned").len()
    }
}

/// Review document the local backend answers with by default. Scores match
/// the stub the hosted endpoint currently serves.
fn default_review_json() -> String {
    json!({
        "overallScore": 78,
        "ATS": { "score": 72, "tips": [] },
        "toneAndStyle": { "score": 80, "tips": [] },
        "content": { "score": 75, "tips": [] },
        "structure": { "score": 70, "tips": [] },
        "skills": { "score": 85, "tips": [] },
    })
    .to_string()
}

/// Minimal glob: `*` matches any run of characters, everything else is
/// literal. Key patterns here are single-star prefixes like `resume:*`.
fn glob_match(pattern: &str, key: &str) -> bool {
    match pattern.split_once('*') {
        None => pattern == key,
        Some((prefix, suffix)) => {
            key.len() >= prefix.len() + suffix.len()
                && key.starts_with(prefix)
                && key.ends_with(suffix)
        }
    }
}

#[async_trait]
impl Platform for InMemoryPlatform {
    async fn auth_sign_in(&self) -> Result<(), PlatformError> {
        // One suspension point, like the real network round trip.
        tokio::task::yield_now().await;
        if let Some(payload) = self.sign_in_denial.lock().expect("denial lock poisoned").clone() {
            return Err(PlatformError::Api {
                status: 401,
                payload,
            });
        }
        self.signed_in.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn auth_sign_out(&self) -> Result<(), PlatformError> {
        self.signed_in.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn auth_is_signed_in(&self) -> Result<bool, PlatformError> {
        Ok(self.signed_in.load(Ordering::SeqCst))
    }

    async fn auth_get_user(&self) -> Result<Value, PlatformError> {
        if let Some(payload) = self
            .user_payload_override
            .lock()
            .expect("user lock poisoned")
            .clone()
        {
            return Ok(payload);
        }
        let user = self.user.lock().expect("user lock poisoned").clone();
        Ok(serde_json::to_value(user)?)
    }

    async fn fs_upload(&self, files: &[UploadFile]) -> Result<Value, PlatformError> {
        if self.fail_next_upload.swap(false, Ordering::SeqCst) {
            return Err(PlatformError::api(507, "Storage quota exceeded"));
        }
        let first = files
            .first()
            .ok_or_else(|| PlatformError::api(400, "No files in upload"))?;

        // Each upload lands in its own directory, like the hosted backend.
        let upload_id = Uuid::new_v4();
        let mut stored = self.files.lock().expect("file lock poisoned");
        for file in files {
            stored.insert(
                format!("/uploads/{upload_id}/{}", file.name),
                file.bytes.clone(),
            );
        }

        Ok(json!({
            "id": upload_id.to_string(),
            "name": first.name,
            "path": format!("/uploads/{upload_id}/{}", first.name),
            "size": first.bytes.len(),
            "type": first.media_type,
        }))
    }

    async fn fs_read(&self, path: &str) -> Result<Bytes, PlatformError> {
        self.files
            .lock()
            .expect("file lock poisoned")
            .get(path)
            .cloned()
            .ok_or_else(|| PlatformError::api(404, format!("No such file: {path}")))
    }

    async fn kv_get(&self, key: &str) -> Result<Option<String>, PlatformError> {
        Ok(self.kv.lock().expect("kv lock poisoned").get(key).cloned())
    }

    async fn kv_set(&self, key: &str, value: &str) -> Result<bool, PlatformError> {
        self.kv_writes
            .lock()
            .expect("kv write log poisoned")
            .push((key.to_string(), value.to_string()));
        self.kv
            .lock()
            .expect("kv lock poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(true)
    }

    async fn kv_list(&self, pattern: &str, include_values: bool) -> Result<Value, PlatformError> {
        let kv = self.kv.lock().expect("kv lock poisoned");
        let entries: Vec<Value> = kv
            .iter()
            .filter(|(key, _)| glob_match(pattern, key))
            .map(|(key, value)| {
                if include_values {
                    json!({ "key": key, "value": value })
                } else {
                    Value::String(key.clone())
                }
            })
            .collect();
        Ok(Value::Array(entries))
    }

    async fn ai_feedback(&self, artifact_path: &str, _prompt: &str) -> Result<Value, PlatformError> {
        if !self
            .files
            .lock()
            .expect("file lock poisoned")
            .contains_key(artifact_path)
        {
            return Err(PlatformError::api(
                404,
                format!("No such file: {artifact_path}"),
            ));
        }
        let content = self.ai_content.lock().expect("ai lock poisoned").clone();
        Ok(json!({ "message": { "content": content } }))
    }
}
