//! In-memory [`ObjectStore`] backend.
//!
//! Buckets live in a [`DashMap`]; each bucket keeps its objects in a
//! `BTreeMap` behind a `parking_lot::RwLock`, so listings come out in
//! lexicographic key order and pages are cheap range scans. Continuation
//! tokens are the base64 of the last key returned.
//!
//! Presigned URLs are path-style (`{public_endpoint}/{bucket}/{key}`) and
//! signed with the store's own credentials, which the HTTP surface uses to
//! verify them when they come back.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use bucketgate_auth::{Credentials, UrlSigner};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::store::ObjectStore;
use crate::types::{BatchDeleteReport, BucketSummary, ObjectPage, PresignedUrl, StoredObject};
use crate::validation::validate_bucket_name;

/// Access key used when no credentials are configured.
pub const DEFAULT_ACCESS_KEY_ID: &str = "bucketgate";
/// Secret key used when no credentials are configured.
pub const DEFAULT_SECRET_ACCESS_KEY: &str = "bucketgate";

const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug)]
struct MemoryBucket {
    created_at: DateTime<Utc>,
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryBucket {
    fn new() -> Self {
        Self {
            created_at: Utc::now(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }
}

/// A process-local object store.
///
/// # Examples
///
/// ```
/// use bucketgate_core::memory::MemoryObjectStore;
/// use bucketgate_core::store::ObjectStore;
///
/// # tokio_test::block_on(async {
/// let store = MemoryObjectStore::new("http://localhost:8080");
/// store.create_bucket("photos").await.unwrap();
/// assert!(store.bucket_exists("photos").await);
/// # });
/// ```
#[derive(Debug)]
pub struct MemoryObjectStore {
    buckets: DashMap<String, MemoryBucket>,
    signer: UrlSigner,
    public_endpoint: String,
    page_size: usize,
}

impl MemoryObjectStore {
    /// Create an empty store presigning against `public_endpoint` with the
    /// default credentials.
    pub fn new(public_endpoint: impl Into<String>) -> Self {
        Self::with_signer(
            public_endpoint,
            UrlSigner::new(
                Credentials::new(DEFAULT_ACCESS_KEY_ID, DEFAULT_SECRET_ACCESS_KEY),
                "us-east-1",
            ),
        )
    }

    /// Create an empty store with an explicit signer.
    pub fn with_signer(public_endpoint: impl Into<String>, signer: UrlSigner) -> Self {
        Self {
            buckets: DashMap::new(),
            signer,
            public_endpoint: public_endpoint.into().trim_end_matches('/').to_owned(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set the listing page size. Zero is treated as one.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// The credentials presigned URLs are signed with.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        self.signer.credentials()
    }

    fn no_such_bucket(bucket: &str) -> StoreError {
        StoreError::NoSuchBucket {
            bucket: bucket.to_owned(),
        }
    }
}

fn encode_cursor(key: &str) -> String {
    BASE64_STANDARD.encode(key.as_bytes())
}

fn decode_cursor(token: &str) -> StoreResult<String> {
    let bytes = BASE64_STANDARD
        .decode(token)
        .map_err(|_| StoreError::backend("ListObjects", "invalid continuation token"))?;
    String::from_utf8(bytes)
        .map_err(|_| StoreError::backend("ListObjects", "continuation token is not UTF-8"))
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list_buckets(&self) -> StoreResult<Vec<BucketSummary>> {
        let mut buckets: Vec<BucketSummary> = self
            .buckets
            .iter()
            .map(|entry| BucketSummary {
                name: entry.key().clone(),
                created_at: Some(entry.value().created_at),
            })
            .collect();
        buckets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(buckets)
    }

    async fn bucket_exists(&self, bucket: &str) -> bool {
        self.buckets.contains_key(bucket)
    }

    async fn create_bucket(&self, bucket: &str) -> StoreResult<()> {
        validate_bucket_name(bucket)?;

        match self.buckets.entry(bucket.to_owned()) {
            Entry::Occupied(_) => Err(StoreError::BucketAlreadyExists {
                bucket: bucket.to_owned(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(MemoryBucket::new());
                info!(bucket = %bucket, "bucket created");
                Ok(())
            }
        }
    }

    async fn delete_bucket(&self, bucket: &str) -> StoreResult<()> {
        // The emptiness check runs under the shard write lock, so a
        // concurrent put either lands first or sees the bucket gone.
        if self
            .buckets
            .remove_if(bucket, |_, b| b.objects.read().is_empty())
            .is_none()
        {
            return Err(if self.buckets.contains_key(bucket) {
                StoreError::BucketNotEmpty {
                    bucket: bucket.to_owned(),
                }
            } else {
                Self::no_such_bucket(bucket)
            });
        }

        info!(bucket = %bucket, "bucket deleted");
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> StoreResult<()> {
        let entry = self
            .buckets
            .get(bucket)
            .ok_or_else(|| Self::no_such_bucket(bucket))?;
        let size = body.len();
        entry.objects.write().insert(
            key.to_owned(),
            StoredObject {
                body,
                content_type: content_type.to_owned(),
            },
        );
        debug!(bucket = %bucket, key = %key, size, "object stored");
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<StoredObject> {
        let entry = self
            .buckets
            .get(bucket)
            .ok_or_else(|| Self::no_such_bucket(bucket))?;
        let objects = entry.objects.read();
        objects.get(key).cloned().ok_or_else(|| StoreError::NoSuchKey {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
        let entry = self
            .buckets
            .get(bucket)
            .ok_or_else(|| Self::no_such_bucket(bucket))?;
        entry.objects.write().remove(key);
        debug!(bucket = %bucket, key = %key, "object deleted");
        Ok(())
    }

    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        cursor: Option<&str>,
    ) -> StoreResult<ObjectPage> {
        let entry = self
            .buckets
            .get(bucket)
            .ok_or_else(|| Self::no_such_bucket(bucket))?;
        let prefix = prefix.unwrap_or("");
        let start = match cursor.filter(|c| !c.is_empty()) {
            Some(token) => Bound::Excluded(decode_cursor(token)?),
            None => Bound::Included(prefix.to_owned()),
        };

        let objects = entry.objects.read();
        let mut keys: Vec<String> = objects
            .range((start, Bound::Unbounded))
            .map(|(key, _)| key)
            .skip_while(|key| key.as_str() < prefix)
            .take_while(|key| key.starts_with(prefix))
            .take(self.page_size + 1)
            .cloned()
            .collect();

        let next_cursor = if keys.len() > self.page_size {
            keys.truncate(self.page_size);
            keys.last().map(|last| encode_cursor(last))
        } else {
            None
        };

        Ok(ObjectPage { keys, next_cursor })
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> StoreResult<BatchDeleteReport> {
        let entry = self
            .buckets
            .get(bucket)
            .ok_or_else(|| Self::no_such_bucket(bucket))?;
        let mut objects = entry.objects.write();
        for key in keys {
            objects.remove(key);
        }
        debug!(bucket = %bucket, count = keys.len(), "objects deleted");
        Ok(BatchDeleteReport {
            deleted: keys.len(),
            errors: Vec::new(),
        })
    }

    fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> StoreResult<PresignedUrl> {
        let presigned = self.signer.presign_get(
            &self.public_endpoint,
            &format!("/{bucket}/{key}"),
            expires_in,
            Utc::now(),
        )?;
        Ok(PresignedUrl {
            url: presigned.url,
            expires_at: presigned.expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    async fn store_with(keys: &[&str]) -> MemoryObjectStore {
        let store = MemoryObjectStore::new("http://localhost:8080").with_page_size(2);
        store.create_bucket("test-bucket").await.unwrap();
        for key in keys {
            store
                .put_object("test-bucket", key, Bytes::from_static(b"x"), "text/plain")
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_should_create_and_list_buckets() {
        let store = MemoryObjectStore::new("http://localhost:8080");
        store.create_bucket("zeta").await.unwrap();
        store.create_bucket("alpha").await.unwrap();

        let names: Vec<String> = store
            .list_buckets()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn test_should_reject_duplicate_and_invalid_bucket() {
        let store = MemoryObjectStore::new("http://localhost:8080");
        store.create_bucket("photos").await.unwrap();
        assert!(matches!(
            store.create_bucket("photos").await,
            Err(StoreError::BucketAlreadyExists { .. })
        ));
        assert!(matches!(
            store.create_bucket("Bad_Name").await,
            Err(StoreError::InvalidBucketName { .. })
        ));
    }

    #[tokio::test]
    async fn test_should_refuse_to_delete_non_empty_bucket() {
        let store = store_with(&["a.txt"]).await;
        assert!(matches!(
            store.delete_bucket("test-bucket").await,
            Err(StoreError::BucketNotEmpty { .. })
        ));

        store.delete_object("test-bucket", "a.txt").await.unwrap();
        store.delete_bucket("test-bucket").await.unwrap();
        assert!(!store.bucket_exists("test-bucket").await);
        assert!(matches!(
            store.delete_bucket("test-bucket").await,
            Err(StoreError::NoSuchBucket { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_should_never_acknowledge_put_into_deleted_bucket() {
        let store = Arc::new(MemoryObjectStore::new("http://localhost:8080"));

        for round in 0..200 {
            let bucket = format!("race-{round}");
            store.create_bucket(&bucket).await.unwrap();

            let put = tokio::spawn({
                let store = Arc::clone(&store);
                let bucket = bucket.clone();
                async move {
                    store
                        .put_object(&bucket, "k", Bytes::from_static(b"v"), "text/plain")
                        .await
                }
            });
            let delete = tokio::spawn({
                let store = Arc::clone(&store);
                let bucket = bucket.clone();
                async move { store.delete_bucket(&bucket).await }
            });
            let (put, delete) = (put.await.unwrap(), delete.await.unwrap());

            match delete {
                Ok(()) => assert!(put.is_err(), "put into {bucket} was acknowledged and lost"),
                Err(e) => {
                    assert!(matches!(e, StoreError::BucketNotEmpty { .. }), "{e}");
                    assert!(store.get_object(&bucket, "k").await.is_ok());
                }
            }
        }
    }

    #[tokio::test]
    async fn test_should_round_trip_object_with_content_type() {
        let store = store_with(&[]).await;
        store
            .put_object("test-bucket", "doc.json", Bytes::from_static(b"{}"), "application/json")
            .await
            .unwrap();

        let object = store.get_object("test-bucket", "doc.json").await.unwrap();
        assert_eq!(object.body, Bytes::from_static(b"{}"));
        assert_eq!(object.content_type, "application/json");
    }

    #[tokio::test]
    async fn test_should_report_missing_key_and_bucket() {
        let store = store_with(&[]).await;
        assert!(matches!(
            store.get_object("test-bucket", "nope").await,
            Err(StoreError::NoSuchKey { .. })
        ));
        assert!(matches!(
            store.get_object("other", "nope").await,
            Err(StoreError::NoSuchBucket { .. })
        ));
    }

    #[tokio::test]
    async fn test_should_page_through_prefix_with_cursor() {
        let store = store_with(&["a.txt", "logs/1", "logs/2", "logs/3", "z.txt"]).await;

        let first = store
            .list_objects_page("test-bucket", Some("logs/"), None)
            .await
            .unwrap();
        assert_eq!(first.keys, vec!["logs/1", "logs/2"]);
        let cursor = first.continuation().unwrap().to_owned();

        let second = store
            .list_objects_page("test-bucket", Some("logs/"), Some(&cursor))
            .await
            .unwrap();
        assert_eq!(second.keys, vec!["logs/3"]);
        assert!(second.continuation().is_none());
    }

    #[tokio::test]
    async fn test_should_list_everything_without_prefix() {
        let store = store_with(&["b", "a"]).await;
        let page = store
            .list_objects_page("test-bucket", None, None)
            .await
            .unwrap();
        assert_eq!(page.keys, vec!["a", "b"]);
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_should_reject_garbage_cursor() {
        let store = store_with(&["a"]).await;
        let result = store
            .list_objects_page("test-bucket", None, Some("!!not-base64!!"))
            .await;
        assert!(matches!(result, Err(StoreError::Backend { .. })));
    }

    #[tokio::test]
    async fn test_should_batch_delete_keys() {
        let store = store_with(&["a", "b", "c"]).await;
        let report = store
            .delete_objects("test-bucket", &["a".to_owned(), "c".to_owned()])
            .await
            .unwrap();
        assert_eq!(report.deleted, 2);
        assert!(report.errors.is_empty());

        let page = store
            .list_objects_page("test-bucket", None, None)
            .await
            .unwrap();
        assert_eq!(page.keys, vec!["b"]);
    }

    #[tokio::test]
    async fn test_should_presign_path_style_url() {
        let store = store_with(&["photos/cat.png"]).await;
        let presigned = store
            .presign_get("test-bucket", "photos/cat.png", Duration::from_secs(60))
            .unwrap();
        assert!(
            presigned
                .url
                .starts_with("http://localhost:8080/test-bucket/photos/cat.png?X-Amz-Algorithm=")
        );
        assert!(presigned.url.contains("X-Amz-Credential=bucketgate%2F"));
        assert!(presigned.expires_at > Utc::now());
    }
}
