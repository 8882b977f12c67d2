//! The object store capability the gateway orchestrates.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreResult;
use crate::types::{BatchDeleteReport, BucketSummary, ObjectPage, PresignedUrl, StoredObject};

/// Operations a backing object store must provide.
///
/// Implementations are shared as `Arc<dyn ObjectStore>` across request
/// tasks and worker-pool workers. None of them cache bucket existence: each
/// call reflects the store as it is at that moment.
#[async_trait]
pub trait ObjectStore: Send + Sync + Debug {
    /// All buckets visible to the configured credentials.
    async fn list_buckets(&self) -> StoreResult<Vec<BucketSummary>>;

    /// Whether `bucket` exists. Any failure to find out reads as `false`.
    async fn bucket_exists(&self, bucket: &str) -> bool;

    /// Create `bucket`.
    async fn create_bucket(&self, bucket: &str) -> StoreResult<()>;

    /// Delete an empty `bucket`.
    async fn delete_bucket(&self, bucket: &str) -> StoreResult<()>;

    /// Store `body` under `key`, overwriting any existing object.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> StoreResult<()>;

    /// Fetch an object.
    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<StoredObject>;

    /// Delete one object. Deleting a missing key succeeds.
    async fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()>;

    /// One page of keys under `prefix`, starting after `cursor`.
    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        cursor: Option<&str>,
    ) -> StoreResult<ObjectPage>;

    /// Delete `keys` in one logical batch.
    ///
    /// `Err` means the call as a whole failed; per-key refusals come back in
    /// [`BatchDeleteReport::errors`].
    async fn delete_objects(&self, bucket: &str, keys: &[String])
    -> StoreResult<BatchDeleteReport>;

    /// A GET URL for `key` valid for `expires_in` from now.
    ///
    /// Computed locally from the store credentials, no network round-trip.
    fn presign_get(&self, bucket: &str, key: &str, expires_in: Duration)
    -> StoreResult<PresignedUrl>;
}
