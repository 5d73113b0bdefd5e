// Storage adapter: blob upload and read over the platform binding.
// No retries and no partial-failure recovery; one platform call per
// operation, with failures surfaced to the caller.

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use super::StoreInner;
use crate::errors::StoreError;
use crate::platform::{decode, FsItem, UploadFile};

pub struct Fs {
    pub(crate) inner: Arc<StoreInner>,
}

impl Fs {
    /// Uploads blobs and returns the stored artifact's handle.
    /// `Ok(None)` while the binding is not ready; callers must treat that as
    /// "the upload did not happen".
    pub async fn upload(&self, files: &[UploadFile]) -> Result<Option<FsItem>, StoreError> {
        if files.is_empty() {
            return Err(StoreError::Validation(
                "upload requires at least one file".to_string(),
            ));
        }
        let Some(platform) = self.inner.platform() else {
            debug!("fs.upload skipped: platform binding not ready");
            return Ok(None);
        };

        let raw = platform.fs_upload(files).await?;
        let item: FsItem = decode("upload response", raw)?;
        debug!(path = %item.path, "stored {} file(s)", files.len());
        Ok(Some(item))
    }

    /// Reads a stored blob. `Ok(None)` while the binding is not ready; a
    /// missing path is a platform error, not an absence.
    pub async fn read(&self, path: &str) -> Result<Option<Bytes>, StoreError> {
        let Some(platform) = self.inner.platform() else {
            debug!("fs.read skipped: platform binding not ready");
            return Ok(None);
        };
        Ok(Some(platform.fs_read(path).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::memory::InMemoryPlatform;
    use crate::platform::{LateBinding, PlatformError};
    use crate::store::PlatformStore;

    async fn ready_store(platform: Arc<InMemoryPlatform>) -> PlatformStore {
        let store = PlatformStore::new(LateBinding::installed(platform));
        store.init();
        store.await_ready().await;
        store
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_returns_typed_handle() {
        let platform = InMemoryPlatform::new();
        let store = ready_store(platform.clone()).await;

        let item = store
            .fs()
            .upload(&[UploadFile::new("resume.pdf", &b"%PDF-1.7"[..])
                .with_media_type("application/pdf")])
            .await
            .unwrap()
            .expect("binding is ready");

        assert!(item.path.ends_with("/resume.pdf"));
        assert_eq!(item.size, Some(8));
        assert_eq!(item.media_type.as_deref(), Some("application/pdf"));
        assert_eq!(platform.stored_file_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_with_no_files_is_a_validation_error() {
        let platform = InMemoryPlatform::new();
        let store = ready_store(platform).await;
        assert!(matches!(
            store.fs().upload(&[]).await,
            Err(StoreError::Validation(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_surfaces_platform_failures() {
        let platform = InMemoryPlatform::new();
        platform.fail_next_upload();
        let store = ready_store(platform).await;

        let error = store
            .fs()
            .upload(&[UploadFile::new("resume.pdf", &b"x"[..])])
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            StoreError::Platform(PlatformError::Api { status: 507, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_round_trips_uploaded_bytes() {
        let platform = InMemoryPlatform::new();
        let store = ready_store(platform).await;

        let item = store
            .fs()
            .upload(&[UploadFile::new("resume.pdf", &b"definitely a pdf"[..])])
            .await
            .unwrap()
            .unwrap();

        let bytes = store.fs().read(&item.path).await.unwrap().unwrap();
        assert_eq!(&bytes[..], b"definitely a pdf");
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_missing_path_is_an_error_not_none() {
        let platform = InMemoryPlatform::new();
        let store = ready_store(platform).await;
        assert!(store.fs().read("/uploads/ghost.pdf").await.is_err());
    }
}
