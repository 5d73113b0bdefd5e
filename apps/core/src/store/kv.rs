// Key-value adapter. Values are opaque strings to the platform; the record
// layer owns what is inside them. List results are normalized to typed
// entries here, at the boundary.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::StoreInner;
use crate::errors::StoreError;
use crate::platform::{decode, KvEntry};

pub struct Kv {
    pub(crate) inner: Arc<StoreInner>,
}

impl Kv {
    /// `Ok(None)` when the key is absent or the binding is not ready.
    pub async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let Some(platform) = self.inner.platform() else {
            debug!("kv.get skipped: platform binding not ready");
            return Ok(None);
        };
        Ok(platform.kv_get(key).await?)
    }

    /// Writes one pair and returns the platform's acceptance flag.
    /// `Ok(false)` while the binding is not ready.
    pub async fn set(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let Some(platform) = self.inner.platform() else {
            debug!(key, "kv.set skipped: platform binding not ready");
            return Ok(false);
        };
        Ok(platform.kv_set(key, value).await?)
    }

    /// Entries whose keys match `pattern`, with values when requested.
    /// Empty while the binding is not ready. Ordering is platform-defined;
    /// callers must not rely on it.
    pub async fn list(
        &self,
        pattern: &str,
        include_values: bool,
    ) -> Result<Vec<KvEntry>, StoreError> {
        let Some(platform) = self.inner.platform() else {
            debug!("kv.list skipped: platform binding not ready");
            return Ok(Vec::new());
        };
        let raw = platform.kv_list(pattern, include_values).await?;
        decode_entries(raw)
    }
}

/// The platform answers a listing with either `{key, value}` objects or bare
/// key strings; both normalize to [`KvEntry`].
fn decode_entries(raw: Value) -> Result<Vec<KvEntry>, StoreError> {
    let items: Vec<Value> = decode("kv list response", raw)?;
    items
        .into_iter()
        .map(|item| match item {
            Value::String(key) => Ok(KvEntry { key, value: None }),
            object => decode("kv list entry", object),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::memory::InMemoryPlatform;
    use crate::platform::LateBinding;
    use crate::store::PlatformStore;
    use serde_json::json;

    async fn ready_store(platform: Arc<InMemoryPlatform>) -> PlatformStore {
        let store = PlatformStore::new(LateBinding::installed(platform));
        store.init();
        store.await_ready().await;
        store
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_set_round_trip() {
        let platform = InMemoryPlatform::new();
        let store = ready_store(platform).await;

        assert_eq!(store.kv().get("resume:a").await.unwrap(), None);
        assert!(store.kv().set("resume:a", "{\"x\":1}").await.unwrap());
        assert_eq!(
            store.kv().get("resume:a").await.unwrap().as_deref(),
            Some("{\"x\":1}")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_matches_pattern_with_values() {
        let platform = InMemoryPlatform::new();
        platform.seed_kv("resume:a", "1");
        platform.seed_kv("resume:b", "2");
        platform.seed_kv("draft:c", "3");
        let store = ready_store(platform).await;

        let entries = store.kv().list("resume:*", true).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "resume:a");
        assert_eq!(entries[0].value.as_deref(), Some("1"));
        assert_eq!(entries[1].key, "resume:b");
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_without_values_yields_bare_keys() {
        let platform = InMemoryPlatform::new();
        platform.seed_kv("resume:a", "1");
        let store = ready_store(platform).await;

        let entries = store.kv().list("resume:*", false).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "resume:a");
        assert_eq!(entries[0].value, None);
    }

    #[test]
    fn test_decode_entries_rejects_non_listing_shapes() {
        assert!(decode_entries(json!({ "not": "a list" })).is_err());
        assert!(decode_entries(json!([42])).is_err());
        assert!(decode_entries(json!([{ "value": "no key" }])).is_err());
    }

    #[test]
    fn test_decode_entries_accepts_mixed_shapes() {
        let entries = decode_entries(json!([
            "resume:a",
            { "key": "resume:b", "value": "2" },
        ]))
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "resume:a");
        assert_eq!(entries[0].value, None);
        assert_eq!(entries[1].value.as_deref(), Some("2"));
    }
}
