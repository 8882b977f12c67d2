//! Bulk deletion by selection criteria.

use tracing::{info, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::listing::list_all_keys;
use crate::store::ObjectStore;

/// Which keys a bulk deletion removes.
///
/// With `all` set every listed key is selected. Otherwise, with an
/// extension, keys ending in it (ASCII case-insensitive) are selected.
/// With neither, nothing is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionCriteria {
    all: bool,
    extension: Option<String>,
}

impl DeletionCriteria {
    /// Build criteria. An empty extension counts as no extension.
    pub fn new(all: bool, extension: Option<String>) -> Self {
        Self {
            all,
            extension: extension.filter(|e| !e.is_empty()),
        }
    }

    /// Select every key.
    #[must_use]
    pub fn all() -> Self {
        Self::new(true, None)
    }

    /// Select keys ending in `extension`.
    pub fn extension(extension: impl Into<String>) -> Self {
        Self::new(false, Some(extension.into()))
    }

    /// `true` when these criteria can never select a key.
    #[must_use]
    pub fn selects_nothing(&self) -> bool {
        !self.all && self.extension.is_none()
    }

    /// Whether `key` is selected.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        if self.all {
            return true;
        }
        self.extension.as_deref().is_some_and(|ext| {
            key.len() >= ext.len()
                && key.is_char_boundary(key.len() - ext.len())
                && key[key.len() - ext.len()..].eq_ignore_ascii_case(ext)
        })
    }

    /// Keep only the selected keys, preserving order.
    #[must_use]
    pub fn select(&self, keys: Vec<String>) -> Vec<String> {
        if self.selects_nothing() {
            return Vec::new();
        }
        keys.into_iter().filter(|key| self.matches(key)).collect()
    }
}

/// List `bucket` under `prefix`, select keys by `criteria`, and delete the
/// selection in one batch call. Returns the number of keys deleted.
///
/// # Errors
///
/// - [`GatewayError::NothingToDelete`] when nothing is selected; the batch
///   call is not made (and with no criteria, the listing is skipped too).
/// - Listing failures, mapped from the store error.
/// - [`GatewayError::BatchDeleteFailed`] when the batch call fails or
///   reports any per-key error.
pub async fn delete_selected(
    store: &dyn ObjectStore,
    bucket: &str,
    prefix: Option<&str>,
    criteria: &DeletionCriteria,
) -> GatewayResult<usize> {
    if criteria.selects_nothing() {
        return Err(GatewayError::NothingToDelete);
    }

    let keys = list_all_keys(store, bucket, prefix).await?;
    let listed = keys.len();
    let selected = criteria.select(keys);
    if selected.is_empty() {
        info!(bucket = %bucket, listed, "no keys matched deletion criteria");
        return Err(GatewayError::NothingToDelete);
    }

    let report = store
        .delete_objects(bucket, &selected)
        .await
        .map_err(|e| GatewayError::BatchDeleteFailed {
            message: e.to_string(),
            failures: Vec::new(),
        })?;

    if !report.errors.is_empty() {
        warn!(
            bucket = %bucket,
            deleted = report.deleted,
            failed = report.errors.len(),
            "batch delete reported failures"
        );
        let message = report
            .errors
            .iter()
            .map(|(key, error)| format!("{key}: {error}"))
            .collect::<Vec<_>>()
            .join("\n");
        return Err(GatewayError::BatchDeleteFailed {
            message,
            failures: report.errors,
        });
    }

    info!(bucket = %bucket, listed, deleted = report.deleted, "batch delete finished");
    Ok(report.deleted)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;
    use crate::error::{StoreError, StoreResult};
    use crate::memory::MemoryObjectStore;
    use crate::types::{BatchDeleteReport, BucketSummary, ObjectPage, PresignedUrl, StoredObject};

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(|k| (*k).to_owned()).collect()
    }

    #[test]
    fn test_should_select_extension_case_insensitively() {
        let selected = DeletionCriteria::extension(".log").select(keys(&["a.log", "b.txt", "c.LOG"]));
        assert_eq!(selected, keys(&["a.log", "c.LOG"]));
    }

    #[test]
    fn test_should_select_everything_when_all_is_set() {
        let criteria = DeletionCriteria::new(true, Some(".log".into()));
        assert_eq!(criteria.select(keys(&["a.log", "b.txt"])), keys(&["a.log", "b.txt"]));
    }

    #[test]
    fn test_should_select_nothing_without_criteria() {
        let criteria = DeletionCriteria::new(false, Some(String::new()));
        assert!(criteria.selects_nothing());
        assert!(criteria.select(keys(&["a.log", "b.txt"])).is_empty());
    }

    #[test]
    fn test_should_match_suffix_without_implicit_dot() {
        let criteria = DeletionCriteria::extension("log");
        assert!(criteria.matches("catalog"));
        assert!(criteria.matches("x.LOG"));
        assert!(!criteria.matches("lo"));
        assert!(!criteria.matches("日志"));
    }

    /// Counts calls and can make the batch call fail outright or per key.
    #[derive(Debug)]
    struct CountingStore {
        inner: MemoryObjectStore,
        list_calls: AtomicUsize,
        batch_calls: AtomicUsize,
        batch_mode: BatchMode,
    }

    #[derive(Debug, Clone, Copy)]
    enum BatchMode {
        Normal,
        Fail,
        RejectFirst,
    }

    impl CountingStore {
        async fn with_keys(list: &[&str], batch_mode: BatchMode) -> Self {
            let inner = MemoryObjectStore::new("http://localhost:8080");
            inner.create_bucket("logs").await.unwrap();
            for key in list {
                inner
                    .put_object("logs", key, Bytes::from_static(b"x"), "text/plain")
                    .await
                    .unwrap();
            }
            Self {
                inner,
                list_calls: AtomicUsize::new(0),
                batch_calls: AtomicUsize::new(0),
                batch_mode,
            }
        }
    }

    #[async_trait]
    impl ObjectStore for CountingStore {
        async fn list_buckets(&self) -> StoreResult<Vec<BucketSummary>> {
            self.inner.list_buckets().await
        }
        async fn bucket_exists(&self, bucket: &str) -> bool {
            self.inner.bucket_exists(bucket).await
        }
        async fn create_bucket(&self, bucket: &str) -> StoreResult<()> {
            self.inner.create_bucket(bucket).await
        }
        async fn delete_bucket(&self, bucket: &str) -> StoreResult<()> {
            self.inner.delete_bucket(bucket).await
        }
        async fn put_object(
            &self,
            bucket: &str,
            key: &str,
            body: Bytes,
            content_type: &str,
        ) -> StoreResult<()> {
            self.inner.put_object(bucket, key, body, content_type).await
        }
        async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<StoredObject> {
            self.inner.get_object(bucket, key).await
        }
        async fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
            self.inner.delete_object(bucket, key).await
        }
        async fn list_objects_page(
            &self,
            bucket: &str,
            prefix: Option<&str>,
            cursor: Option<&str>,
        ) -> StoreResult<ObjectPage> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.list_objects_page(bucket, prefix, cursor).await
        }
        async fn delete_objects(
            &self,
            bucket: &str,
            keys: &[String],
        ) -> StoreResult<BatchDeleteReport> {
            self.batch_calls.fetch_add(1, Ordering::SeqCst);
            match self.batch_mode {
                BatchMode::Normal => self.inner.delete_objects(bucket, keys).await,
                BatchMode::Fail => Err(StoreError::backend("DeleteObjects", "service unavailable")),
                BatchMode::RejectFirst => {
                    let report = self.inner.delete_objects(bucket, &keys[1..]).await?;
                    Ok(BatchDeleteReport {
                        deleted: report.deleted,
                        errors: vec![(keys[0].clone(), "AccessDenied".to_owned())],
                    })
                }
            }
        }
        fn presign_get(
            &self,
            bucket: &str,
            key: &str,
            expires_in: Duration,
        ) -> StoreResult<PresignedUrl> {
            self.inner.presign_get(bucket, key, expires_in)
        }
    }

    #[tokio::test]
    async fn test_should_delete_matching_keys_in_one_batch() {
        let store = CountingStore::with_keys(&["a.log", "b.txt", "c.LOG"], BatchMode::Normal).await;

        let deleted = delete_selected(&store, "logs", None, &DeletionCriteria::extension(".log"))
            .await
            .unwrap();

        assert_eq!(deleted, 2);
        assert_eq!(store.batch_calls.load(Ordering::SeqCst), 1);
        let remaining = list_all_keys(&store, "logs", None).await.unwrap();
        assert_eq!(remaining, keys(&["b.txt"]));
    }

    #[tokio::test]
    async fn test_should_skip_listing_and_batch_without_criteria() {
        let store = CountingStore::with_keys(&["a.log"], BatchMode::Normal).await;

        let result = delete_selected(&store, "logs", None, &DeletionCriteria::default()).await;

        assert!(matches!(result, Err(GatewayError::NothingToDelete)));
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.batch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_should_report_nothing_to_delete_when_filter_matches_nothing() {
        let store = CountingStore::with_keys(&["a.txt", "b.txt"], BatchMode::Normal).await;

        let result =
            delete_selected(&store, "logs", None, &DeletionCriteria::extension(".log")).await;

        assert!(matches!(result, Err(GatewayError::NothingToDelete)));
        assert_eq!(store.batch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_should_restrict_selection_to_prefix() {
        let store =
            CountingStore::with_keys(&["keep/a.log", "tmp/b.log", "tmp/c.txt"], BatchMode::Normal)
                .await;

        let deleted = delete_selected(&store, "logs", Some("tmp/"), &DeletionCriteria::all())
            .await
            .unwrap();

        assert_eq!(deleted, 2);
        let remaining = list_all_keys(&store, "logs", None).await.unwrap();
        assert_eq!(remaining, keys(&["keep/a.log"]));
    }

    #[tokio::test]
    async fn test_should_surface_failed_batch_as_one_error() {
        let store = CountingStore::with_keys(&["a.log", "b.log"], BatchMode::Fail).await;

        let result = delete_selected(&store, "logs", None, &DeletionCriteria::all()).await;

        let Err(GatewayError::BatchDeleteFailed { message, failures }) = result else {
            panic!("expected a batch failure");
        };
        assert!(message.contains("service unavailable"));
        assert!(failures.is_empty());
    }

    #[tokio::test]
    async fn test_should_surface_per_key_batch_errors() {
        let store = CountingStore::with_keys(&["a.log", "b.log"], BatchMode::RejectFirst).await;

        let result = delete_selected(&store, "logs", None, &DeletionCriteria::all()).await;

        let Err(GatewayError::BatchDeleteFailed { message, failures }) = result else {
            panic!("expected a batch failure");
        };
        assert_eq!(message, "a.log: AccessDenied");
        assert_eq!(failures.len(), 1);
    }

    #[tokio::test]
    async fn test_should_map_missing_bucket_during_listing() {
        let store = CountingStore::with_keys(&[], BatchMode::Normal).await;
        let result = delete_selected(&store, "absent", None, &DeletionCriteria::all()).await;
        assert!(matches!(result, Err(GatewayError::BucketNotFound { .. })));
    }
}
