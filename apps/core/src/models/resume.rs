use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Feedback;

/// Sentinel key holding the flat id index used for bulk wipe.
/// Listers must skip it: it matches [`RECORD_PATTERN`] but is not a record.
pub const INDEX_KEY: &str = "resume:index";

/// Key-value pattern matching every stored record (and the index sentinel).
pub const RECORD_PATTERN: &str = "resume:*";

/// Storage key for one record.
pub fn record_key(id: &Uuid) -> String {
    format!("resume:{id}")
}

/// A submitted resume and, once generation completes, its review.
///
/// Persisted whole under `resume:<id>`. The draft form carries
/// `feedback: null` and is observable in storage between the upload and the
/// final write; it is never rolled back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRecord {
    pub id: Uuid,
    pub resume_path: String,
    /// Preview image written by older client revisions; this crate reads it
    /// but never writes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
    /// `None` until generation completes, serialized as an explicit `null`
    /// so the draft state stays observable in storage.
    pub feedback: Option<Feedback>,
}

impl ResumeRecord {
    pub fn storage_key(&self) -> String {
        record_key(&self.id)
    }
}
