// AI adapter: feedback generation behind a pluggable trait. The deployed
// configuration answers with a fixed canned review; wiring a store with
// `generator: None` routes generation through the platform binding instead.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::StoreInner;
use crate::errors::StoreError;
use crate::platform::{decode, AiResponse, PlatformError};

/// Produces review content for a stored artifact. Implementations other
/// than the platform itself live behind this trait so the workflow never
/// knows which backend answered.
#[async_trait]
pub trait FeedbackGenerator: Send + Sync {
    async fn feedback(&self, artifact_path: &str, prompt: &str)
        -> Result<AiResponse, PlatformError>;
}

/// Deterministic responder used while the platform's generation endpoint is
/// stubbed out. Always answers with the same structured review.
pub struct CannedFeedback;

impl CannedFeedback {
    /// The canned structured review document.
    pub fn content() -> String {
        json!({
            "overallScore": 80,
            "ATS": { "score": 75, "tips": [] },
            "toneAndStyle": { "score": 80, "tips": [] },
            "content": { "score": 78, "tips": [] },
            "structure": { "score": 74, "tips": [] },
            "skills": { "score": 85, "tips": [] },
        })
        .to_string()
    }
}

#[async_trait]
impl FeedbackGenerator for CannedFeedback {
    async fn feedback(
        &self,
        artifact_path: &str,
        _prompt: &str,
    ) -> Result<AiResponse, PlatformError> {
        debug!("serving canned feedback for {artifact_path}");
        Ok(AiResponse::from_text(Self::content()))
    }
}

pub struct Ai {
    pub(crate) inner: Arc<StoreInner>,
}

impl Ai {
    /// Requests review content for an uploaded artifact. Routed to the
    /// store's generator when one is configured, otherwise to the platform
    /// binding; in the latter case `Ok(None)` means the binding is not
    /// ready.
    pub async fn feedback(
        &self,
        artifact_path: &str,
        prompt: &str,
    ) -> Result<Option<AiResponse>, StoreError> {
        if let Some(generator) = &self.inner.generator {
            return Ok(Some(generator.feedback(artifact_path, prompt).await?));
        }

        let Some(platform) = self.inner.platform() else {
            debug!("ai.feedback skipped: platform binding not ready");
            return Ok(None);
        };
        let raw = platform.ai_feedback(artifact_path, prompt).await?;
        Ok(Some(decode("generation response", raw)?))
    }
}
