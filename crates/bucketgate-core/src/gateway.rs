//! The gateway facade.
//!
//! [`Gateway`] is what the HTTP surface calls. It owns a shared store
//! handle plus the orchestration pieces, and turns each caller operation
//! into the right sequence of store calls.
//!
//! Bucket existence is checked up front wherever a friendly "bucket not
//! found" helps the caller, but the check is advisory. The store call that
//! follows is what decides, and its own not-found maps to the same error.
//!
//! Folder uploads and downloads touch the server's own filesystem with the
//! gateway process's permissions. Without a folder root any path the
//! process can reach is accepted; with one, paths are confined to it.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info};

use crate::config::GatewayConfig;
use crate::deletion::{DeletionCriteria, delete_selected};
use crate::error::{GatewayError, GatewayResult};
use crate::listing::list_all_keys;
use crate::presign::PresignIssuer;
use crate::store::ObjectStore;
use crate::transfer::{TransferOrchestrator, guess_content_type};
use crate::types::{BucketSummary, BulkOutcome, ListedObject, Payload, StoredObject};
use crate::validation::validate_bucket_name;

/// Caller-facing object storage operations over one store.
#[derive(Debug, Clone)]
pub struct Gateway {
    store: Arc<dyn ObjectStore>,
    transfers: TransferOrchestrator,
    issuer: PresignIssuer,
    folder_root: Option<PathBuf>,
}

impl Gateway {
    /// A gateway running `concurrency` transfers at once and granting
    /// `presign_expiry` of access per listed object.
    pub fn new(store: Arc<dyn ObjectStore>, concurrency: usize, presign_expiry: Duration) -> Self {
        Self {
            transfers: TransferOrchestrator::new(Arc::clone(&store), concurrency),
            issuer: PresignIssuer::new(presign_expiry),
            store,
            folder_root: None,
        }
    }

    /// A gateway tuned by `config`.
    pub fn from_config(store: Arc<dyn ObjectStore>, config: &GatewayConfig) -> Self {
        let gateway = Self::new(store, config.transfer_concurrency, config.presign_expiry());
        match &config.folder_root {
            Some(root) => gateway.with_folder_root(root),
            None => gateway,
        }
    }

    /// Confine folder uploads and downloads to `root`.
    ///
    /// Relative folder paths resolve against it, absolute ones must lie
    /// inside it, and `..` components are refused. The check is lexical:
    /// symlinks inside `root` are followed as-is.
    #[must_use]
    pub fn with_folder_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.folder_root = Some(root.into());
        self
    }

    /// Where `folder` points once the folder root is applied.
    fn resolve_folder(&self, folder: &Path) -> GatewayResult<PathBuf> {
        let Some(root) = &self.folder_root else {
            return Ok(folder.to_path_buf());
        };

        let outside =
            || GatewayError::BadRequest(format!("{} is outside the folder root", folder.display()));
        if folder.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(outside());
        }
        if folder.is_absolute() {
            if folder.starts_with(root) {
                Ok(folder.to_path_buf())
            } else {
                Err(outside())
            }
        } else {
            Ok(root.join(folder))
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    async fn ensure_bucket(&self, bucket: &str) -> GatewayResult<()> {
        if self.store.bucket_exists(bucket).await {
            Ok(())
        } else {
            debug!(bucket = %bucket, "bucket existence check failed");
            Err(GatewayError::BucketNotFound {
                bucket: bucket.to_owned(),
            })
        }
    }

    /// All buckets.
    pub async fn list_buckets(&self) -> GatewayResult<Vec<BucketSummary>> {
        Ok(self.store.list_buckets().await?)
    }

    /// Create a bucket after checking its name.
    pub async fn create_bucket(&self, bucket: &str) -> GatewayResult<()> {
        validate_bucket_name(bucket)?;
        self.store.create_bucket(bucket).await?;
        info!(bucket = %bucket, "bucket created");
        Ok(())
    }

    /// Delete an empty bucket.
    pub async fn delete_bucket(&self, bucket: &str) -> GatewayResult<()> {
        self.ensure_bucket(bucket).await?;
        self.store.delete_bucket(bucket).await?;
        info!(bucket = %bucket, "bucket deleted");
        Ok(())
    }

    /// Upload payloads concurrently under `prefix`.
    pub async fn upload_payloads(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        payloads: Vec<Payload>,
    ) -> GatewayResult<BulkOutcome> {
        self.ensure_bucket(bucket).await?;
        self.transfers.upload(bucket, prefix, payloads).await
    }

    /// Upload every regular file directly inside `folder`.
    ///
    /// Sub-directories are not descended into. Files go up in name order.
    pub async fn upload_folder(
        &self,
        bucket: &str,
        folder: &Path,
        prefix: Option<&str>,
    ) -> GatewayResult<BulkOutcome> {
        let folder = self.resolve_folder(folder)?;
        self.ensure_bucket(bucket).await?;

        let files = regular_files(&folder).await?;
        if files.is_empty() {
            return Err(GatewayError::BadRequest("folder is empty".to_owned()));
        }

        let payloads = files
            .into_iter()
            .map(|(name, path)| Payload::from_file(name, path))
            .collect();
        self.transfers.upload(bucket, prefix, payloads).await
    }

    /// Store one object. Without a content type, one is guessed from `key`.
    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> GatewayResult<()> {
        if key.is_empty() {
            return Err(GatewayError::BadRequest("object key must not be empty".to_owned()));
        }
        self.ensure_bucket(bucket).await?;

        let content_type = content_type.map_or_else(|| guess_content_type(key), ToOwned::to_owned);
        let size = body.len();
        self.store.put_object(bucket, key, body, &content_type).await?;
        info!(bucket = %bucket, key = %key, size, "object uploaded");
        Ok(())
    }

    /// Fetch one object.
    pub async fn get_object(&self, bucket: &str, key: &str) -> GatewayResult<StoredObject> {
        self.ensure_bucket(bucket).await?;
        Ok(self.store.get_object(bucket, key).await?)
    }

    /// Delete one object.
    pub async fn delete_object(&self, bucket: &str, key: &str) -> GatewayResult<()> {
        self.ensure_bucket(bucket).await?;
        self.store.delete_object(bucket, key).await?;
        info!(bucket = %bucket, key = %key, "object deleted");
        Ok(())
    }

    /// Delete the keys under `prefix` selected by `criteria`.
    pub async fn delete_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        criteria: &DeletionCriteria,
    ) -> GatewayResult<usize> {
        self.ensure_bucket(bucket).await?;
        delete_selected(self.store.as_ref(), bucket, prefix, criteria).await
    }

    /// Every key under `prefix` with a freshly presigned URL.
    pub async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> GatewayResult<Vec<ListedObject>> {
        self.ensure_bucket(bucket).await?;
        let keys = list_all_keys(self.store.as_ref(), bucket, prefix).await?;
        let objects = self.issuer.issue(self.store.as_ref(), bucket, keys)?;
        info!(bucket = %bucket, count = objects.len(), "objects listed");
        Ok(objects)
    }

    /// Download every key under `prefix` into `folder`.
    pub async fn download_to_folder(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        folder: &Path,
    ) -> GatewayResult<BulkOutcome> {
        let folder = self.resolve_folder(folder)?;
        self.ensure_bucket(bucket).await?;

        let keys = list_all_keys(self.store.as_ref(), bucket, prefix).await?;
        if keys.is_empty() {
            return Err(GatewayError::BadRequest("nothing to download".to_owned()));
        }
        tokio::fs::create_dir_all(&folder).await.map_err(|e| {
            GatewayError::BadRequest(format!("cannot create {}: {e}", folder.display()))
        })?;
        self.transfers.download(bucket, keys, &folder).await
    }
}

/// Regular files directly inside `folder`, sorted by name.
async fn regular_files(folder: &Path) -> GatewayResult<Vec<(String, PathBuf)>> {
    let not_a_folder =
        || GatewayError::BadRequest(format!("{} is not a readable folder", folder.display()));

    let mut entries = tokio::fs::read_dir(folder)
        .await
        .map_err(|_| not_a_folder())?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|_| not_a_folder())? {
        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file())
            .unwrap_or(false);
        if is_file {
            let name = entry.file_name().to_string_lossy().into_owned();
            files.push((name, entry.path()));
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}
