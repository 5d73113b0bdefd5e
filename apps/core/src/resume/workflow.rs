// Analyze workflow: upload, persist a draft, generate feedback, persist the
// final record. The draft write is deliberate and never rolled back; a
// generation failure leaves an inspectable record with `feedback: null`.

use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::{Feedback, ResumeRecord, INDEX_KEY};
use crate::platform::UploadFile;
use crate::resume::prompts::prepare_instructions;
use crate::store::PlatformStore;

/// Phase of the analyze workflow, published on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzePhase {
    Idle,
    Uploading,
    PersistingDraft,
    Generating,
    PersistingFinal,
    Done,
    Failed,
}

/// Progress snapshot for the status indicator. Carried on a watch channel:
/// only the latest value is retained and nothing reads it for control flow.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub phase: AnalyzePhase,
    pub message: String,
}

impl Progress {
    pub(crate) fn idle() -> Self {
        Progress {
            phase: AnalyzePhase::Idle,
            message: String::new(),
        }
    }
}

/// One analyze submission.
#[derive(Debug, Clone)]
pub struct AnalyzeRequest {
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub job_description: Option<String>,
    pub file: UploadFile,
}

/// Successful analysis: the persisted record and the id that keys it.
#[derive(Debug, Clone)]
pub struct AnalyzeOutcome {
    pub id: Uuid,
    pub record: ResumeRecord,
}

/// Runs the full analysis for one submission:
///
/// 1. upload the resume blob
/// 2. persist a draft record with `feedback: null`
/// 3. ask the feedback backend to review the stored artifact
/// 4. parse the reply strictly, falling back to raw text
/// 5. overwrite the draft with the finalized record
///
/// Every failure reports a `Failed` progress snapshot and aborts; steps
/// already taken (upload, draft) stay in place.
pub async fn analyze(
    store: &PlatformStore,
    request: AnalyzeRequest,
) -> Result<AnalyzeOutcome, StoreError> {
    if !store.ready() {
        return Err(fail(store, StoreError::NotReady));
    }
    if request.file.bytes.is_empty() {
        return Err(fail(
            store,
            StoreError::Validation("no file selected".to_string()),
        ));
    }

    store.report(AnalyzePhase::Uploading, "Uploading resume...");
    let uploaded = match store.fs().upload(std::slice::from_ref(&request.file)).await {
        Ok(Some(item)) => item,
        Ok(None) => {
            return Err(fail(
                store,
                StoreError::Upload("platform returned no stored file".to_string()),
            ))
        }
        Err(error) => return Err(fail(store, error)),
    };

    store.report(AnalyzePhase::PersistingDraft, "Saving resume...");
    let id = Uuid::new_v4();
    let mut record = ResumeRecord {
        id,
        resume_path: uploaded.path,
        image_path: None,
        company_name: request.company_name,
        job_title: request.job_title,
        job_description: request.job_description,
        feedback: None,
    };
    let key = record.storage_key();
    if let Err(error) = persist(store, &key, &record).await {
        return Err(fail(store, error));
    }
    if let Err(error) = append_index(store, &id).await {
        // The index is advisory; losing an entry must not sink the analysis.
        warn!("resume index update failed: {error}");
    }

    store.report(AnalyzePhase::Generating, "Analyzing resume...");
    let prompt = prepare_instructions(
        record.job_title.as_deref().unwrap_or(""),
        record.job_description.as_deref().unwrap_or(""),
    );
    let response = match store.ai().feedback(&record.resume_path, &prompt).await {
        Ok(Some(response)) => response,
        Ok(None) => {
            return Err(fail(
                store,
                StoreError::Generation("no feedback backend available".to_string()),
            ))
        }
        Err(error) => return Err(fail(store, error)),
    };

    record.feedback = Some(Feedback::from_generated(response.text()));

    store.report(AnalyzePhase::PersistingFinal, "Saving feedback...");
    if let Err(error) = persist(store, &key, &record).await {
        return Err(fail(store, error));
    }

    store.report(AnalyzePhase::Done, "Analysis complete");
    info!(
        %id,
        structured = record.feedback.as_ref().is_some_and(|f| f.is_structured()),
        "analysis complete"
    );
    Ok(AnalyzeOutcome { id, record })
}

/// Reports the failure on the progress channel and hands the error back.
fn fail(store: &PlatformStore, error: StoreError) -> StoreError {
    warn!("analysis failed: {error}");
    store.report(AnalyzePhase::Failed, error.to_string());
    error
}

/// Serializes and writes one record. Serialization follows struct field
/// order, so identical content always produces identical bytes.
async fn persist(store: &PlatformStore, key: &str, record: &ResumeRecord) -> Result<(), StoreError> {
    let json = serde_json::to_string(record)
        .map_err(|error| anyhow::anyhow!("record serialization failed: {error}"))?;
    if !store.kv().set(key, &json).await? {
        return Err(StoreError::Internal(anyhow::anyhow!(
            "key-value store rejected write to {key}"
        )));
    }
    Ok(())
}

/// Adds the id to `resume:index` unless already present. A malformed index
/// is rebuilt from scratch rather than treated as fatal.
async fn append_index(store: &PlatformStore, id: &Uuid) -> Result<(), StoreError> {
    let mut ids: Vec<String> = match store.kv().get(INDEX_KEY).await? {
        Some(json) => serde_json::from_str(&json).unwrap_or_else(|error| {
            warn!("resume index was malformed, rebuilding: {error}");
            Vec::new()
        }),
        None => Vec::new(),
    };

    let id = id.to_string();
    if ids.contains(&id) {
        return Ok(());
    }
    ids.push(id);
    let json =
        serde_json::to_string(&ids).map_err(|error| anyhow::anyhow!("index serialization failed: {error}"))?;
    if !store.kv().set(INDEX_KEY, &json).await? {
        return Err(StoreError::Internal(anyhow::anyhow!(
            "key-value store rejected index write"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record_key;
    use crate::platform::memory::InMemoryPlatform;
    use crate::platform::{AiResponse, LateBinding, PlatformError};
    use crate::store::ai::FeedbackGenerator;
    use crate::store::StoreOptions;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    struct FailingGenerator;

    #[async_trait]
    impl FeedbackGenerator for FailingGenerator {
        async fn feedback(
            &self,
            _artifact_path: &str,
            _prompt: &str,
        ) -> Result<AiResponse, PlatformError> {
            Err(PlatformError::api(529, "Model overloaded"))
        }
    }

    fn request() -> AnalyzeRequest {
        AnalyzeRequest {
            company_name: Some("Initech".to_string()),
            job_title: Some("Staff Engineer".to_string()),
            job_description: Some("Ship things".to_string()),
            file: UploadFile::new("resume.pdf", &b"%PDF-1.7 fake resume"[..])
                .with_media_type("application/pdf"),
        }
    }

    async fn ready_store_with(
        platform: Arc<InMemoryPlatform>,
        options: StoreOptions,
    ) -> PlatformStore {
        let store = PlatformStore::with_options(LateBinding::installed(platform), options);
        store.init();
        store.await_ready().await;
        store
    }

    fn platform_backed() -> StoreOptions {
        StoreOptions {
            probe_interval: Duration::from_millis(100),
            generator: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_analyze_happy_path_persists_draft_then_final() {
        let platform = InMemoryPlatform::new();
        let store = ready_store_with(platform.clone(), StoreOptions::default()).await;
        let mut progress_rx = store.subscribe_progress();

        let outcome = analyze(&store, request()).await.unwrap();
        let key = record_key(&outcome.id);
        assert_eq!(platform.stored_file_count(), 1);

        // Draft first, then the index, then the finalized record.
        let writes = platform.kv_writes();
        assert_eq!(writes.len(), 3);
        assert_eq!(writes[0].0, key);
        assert_eq!(writes[1].0, INDEX_KEY);
        assert_eq!(writes[2].0, key);

        // The draft write is byte-identical to serializing the draft again.
        let mut draft = outcome.record.clone();
        draft.feedback = None;
        assert_eq!(writes[0].1, serde_json::to_string(&draft).unwrap());
        assert!(writes[0].1.contains("\"feedback\":null"));

        // The stored final record equals the returned one.
        let stored = store.kv().get(&key).await.unwrap().unwrap();
        let reloaded: ResumeRecord = serde_json::from_str(&stored).unwrap();
        assert_eq!(reloaded, outcome.record);
        assert!(reloaded.feedback.unwrap().is_structured());

        assert_eq!(store.progress().phase, AnalyzePhase::Done);

        // A subscriber attached before the run sees the latest value.
        assert!(progress_rx.has_changed().unwrap());
        assert_eq!(progress_rx.borrow_and_update().phase, AnalyzePhase::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_analyze_scores_come_from_the_generator() {
        let platform = InMemoryPlatform::new();
        let reply = json!({
            "overallScore": 82,
            "ATS": { "score": 82, "tips": [] },
            "toneAndStyle": { "score": 82, "tips": [] },
            "content": { "score": 82, "tips": [] },
            "structure": { "score": 82, "tips": [] },
            "skills": { "score": 82, "tips": [] },
        })
        .to_string();
        platform.set_ai_content(reply.into());
        let store = ready_store_with(platform.clone(), platform_backed()).await;

        let outcome = analyze(&store, request()).await.unwrap();

        let stored = store.kv().get(&record_key(&outcome.id)).await.unwrap().unwrap();
        assert!(!stored.contains("\"raw\""));
        let reloaded: ResumeRecord = serde_json::from_str(&stored).unwrap();
        match reloaded.feedback.unwrap() {
            Feedback::Structured(doc) => assert_eq!(doc.overall_score, 82.0),
            Feedback::Raw { raw } => panic!("expected structured feedback, got raw {raw:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_analyze_keeps_unparsable_reply_verbatim() {
        let platform = InMemoryPlatform::new();
        platform.set_ai_content(json!("Sorry, no JSON today."));
        let store = ready_store_with(platform, platform_backed()).await;

        let outcome = analyze(&store, request()).await.unwrap();
        assert_eq!(
            outcome.record.feedback,
            Some(Feedback::Raw {
                raw: "Sorry, no JSON today.".to_string()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_analyze_without_ready_binding_fails_fast() {
        let store = PlatformStore::new(LateBinding::empty());
        store.init();

        let error = analyze(&store, request()).await.unwrap_err();
        assert!(matches!(error, StoreError::NotReady));
        assert_eq!(store.progress().phase, AnalyzePhase::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_analyze_rejects_empty_file() {
        let platform = InMemoryPlatform::new();
        let store = ready_store_with(platform, StoreOptions::default()).await;

        let mut submission = request();
        submission.file = UploadFile::new("empty.pdf", Vec::new());
        let error = analyze(&store, submission).await.unwrap_err();
        assert!(matches!(error, StoreError::Validation(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_analyze_upload_failure_writes_no_records() {
        let platform = InMemoryPlatform::new();
        platform.fail_next_upload();
        let store = ready_store_with(platform.clone(), StoreOptions::default()).await;

        let error = analyze(&store, request()).await.unwrap_err();
        assert!(matches!(error, StoreError::Platform(_)));
        assert!(platform.kv_writes().is_empty());
        assert_eq!(platform.stored_file_count(), 0);
        assert_eq!(store.progress().phase, AnalyzePhase::Failed);
        assert!(store.progress().message.contains("Storage quota exceeded"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_analyze_generation_failure_leaves_draft_in_place() {
        let platform = InMemoryPlatform::new();
        let store = ready_store_with(
            platform.clone(),
            StoreOptions {
                probe_interval: Duration::from_millis(100),
                generator: Some(Arc::new(FailingGenerator)),
            },
        )
        .await;

        let error = analyze(&store, request()).await.unwrap_err();
        assert!(matches!(error, StoreError::Platform(_)));
        assert_eq!(store.progress().phase, AnalyzePhase::Failed);

        // The draft survives for inspection; feedback is still null.
        let writes = platform.kv_writes();
        assert_eq!(writes.len(), 2, "draft and index writes only");
        let draft: ResumeRecord = serde_json::from_str(&writes[0].1).unwrap();
        assert!(draft.feedback.is_none());
        assert_eq!(
            store.kv().get(&record_key(&draft.id)).await.unwrap(),
            Some(writes[0].1.clone())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_analyses_get_distinct_ids() {
        let platform = InMemoryPlatform::new();
        let store = ready_store_with(platform, StoreOptions::default()).await;

        let first = analyze(&store, request()).await.unwrap();
        let second = analyze(&store, request()).await.unwrap();
        assert_ne!(first.id, second.id);

        let index: Vec<String> = serde_json::from_str(
            &store.kv().get(INDEX_KEY).await.unwrap().unwrap(),
        )
        .unwrap();
        assert_eq!(index, vec![first.id.to_string(), second.id.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_index_is_rebuilt_not_fatal() {
        let platform = InMemoryPlatform::new();
        platform.seed_kv(INDEX_KEY, "{definitely not json");
        let store = ready_store_with(platform, StoreOptions::default()).await;

        let outcome = analyze(&store, request()).await.unwrap();

        let index: Vec<String> = serde_json::from_str(
            &store.kv().get(INDEX_KEY).await.unwrap().unwrap(),
        )
        .unwrap();
        assert_eq!(index, vec![outcome.id.to_string()]);
    }
}
