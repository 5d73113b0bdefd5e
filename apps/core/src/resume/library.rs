// Record library: listing, loading and wiping stored analyses.
// Listing is tolerant by design. Storage may hold entries written by other
// revisions or corrupted halfway; one bad value must not blank the whole
// library, so unparsable entries are logged and skipped.

use bytes::Bytes;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::{record_key, ResumeRecord, INDEX_KEY, RECORD_PATTERN};
use crate::store::PlatformStore;

/// Every parseable stored record, sorted by id. The platform's listing
/// order is unspecified, so a stable order is imposed here.
pub async fn list_records(store: &PlatformStore) -> Result<Vec<ResumeRecord>, StoreError> {
    let entries = store.kv().list(RECORD_PATTERN, true).await?;
    let mut records = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.key == INDEX_KEY {
            continue;
        }
        let Some(value) = entry.value else {
            debug!(key = %entry.key, "listing entry carried no value, skipping");
            continue;
        };
        match serde_json::from_str::<ResumeRecord>(&value) {
            Ok(record) => records.push(record),
            Err(error) => warn!(key = %entry.key, "skipping unparsable record: {error}"),
        }
    }
    records.sort_by_key(|record| record.id);
    Ok(records)
}

/// One stored record. `Ok(None)` when the key is absent or the store is not
/// ready; a present-but-corrupt value is an error, unlike in listings.
pub async fn load_record(
    store: &PlatformStore,
    id: &Uuid,
) -> Result<Option<ResumeRecord>, StoreError> {
    let Some(json) = store.kv().get(&record_key(id)).await? else {
        return Ok(None);
    };
    let record = serde_json::from_str(&json).map_err(|source| StoreError::Decode {
        what: "stored record",
        source,
    })?;
    Ok(Some(record))
}

/// The uploaded blob behind a record, for detail views.
pub async fn load_artifact(
    store: &PlatformStore,
    record: &ResumeRecord,
) -> Result<Option<Bytes>, StoreError> {
    store.fs().read(&record.resume_path).await
}

/// Ids recorded in `resume:index`. Absent and malformed indexes both read
/// as empty; the index is advisory and gets rebuilt on the next analysis.
pub async fn stored_index(store: &PlatformStore) -> Result<Vec<String>, StoreError> {
    match store.kv().get(INDEX_KEY).await? {
        Some(json) => match serde_json::from_str(&json) {
            Ok(ids) => Ok(ids),
            Err(error) => {
                warn!("resume index was malformed: {error}");
                Ok(Vec::new())
            }
        },
        None => Ok(Vec::new()),
    }
}

/// Resets the bulk index. The platform exposes no delete primitive, so the
/// records themselves stay stored; only the index is emptied. Returns the
/// platform's acceptance flag, `false` while the store is not ready.
pub async fn wipe(store: &PlatformStore) -> Result<bool, StoreError> {
    let accepted = store.kv().set(INDEX_KEY, "[]").await?;
    if accepted {
        info!("resume index wiped");
    }
    Ok(accepted)
}
