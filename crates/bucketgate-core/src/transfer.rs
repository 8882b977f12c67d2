//! Bulk transfer orchestration.
//!
//! [`TransferOrchestrator`] fans a set of item operations out over a
//! [`WorkerPool`] and folds the per-item results into a [`BulkOutcome`].
//! One item failing never stops the others; the aggregate is only judged
//! once every item has an outcome.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::pool::WorkerPool;
use crate::store::ObjectStore;
use crate::types::{
    BulkOutcome, DEFAULT_CONTENT_TYPE, ItemOutcome, Payload, PayloadSource, base_name, upload_key,
};

/// Runs bulk uploads and downloads against one store.
#[derive(Debug, Clone)]
pub struct TransferOrchestrator {
    store: Arc<dyn ObjectStore>,
    pool: WorkerPool,
}

struct UploadJob {
    name: String,
    key: String,
    source: PayloadSource,
}

impl TransferOrchestrator {
    /// An orchestrator running at most `concurrency` transfers at once.
    pub fn new(store: Arc<dyn ObjectStore>, concurrency: usize) -> Self {
        Self {
            store,
            pool: WorkerPool::new(concurrency),
        }
    }

    /// Upload every payload to `bucket` under `prefix`.
    ///
    /// Returns `Ok` only when every payload was stored. Any failure yields
    /// [`GatewayError::TransferFailed`] carrying the full outcome list.
    ///
    /// # Errors
    ///
    /// [`GatewayError::BadRequest`] if `payloads` is empty, otherwise
    /// [`GatewayError::TransferFailed`] if any item failed.
    pub async fn upload(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        payloads: Vec<Payload>,
    ) -> GatewayResult<BulkOutcome> {
        if payloads.is_empty() {
            return Err(GatewayError::BadRequest("no files were provided".to_owned()));
        }

        let jobs: Vec<UploadJob> = payloads
            .into_iter()
            .map(|payload| UploadJob {
                key: upload_key(prefix, &payload.name),
                name: payload.name,
                source: payload.source,
            })
            .collect();
        let labels: Vec<(String, String)> =
            jobs.iter().map(|j| (j.name.clone(), j.key.clone())).collect();

        debug!(bucket = %bucket, count = jobs.len(), workers = self.pool.size(), "starting bulk upload");

        let store = Arc::clone(&self.store);
        let bucket_owned = bucket.to_owned();
        let results = self
            .pool
            .run(jobs, move |job| {
                let store = Arc::clone(&store);
                let bucket = bucket_owned.clone();
                async move { upload_one(store.as_ref(), &bucket, job).await }
            })
            .await;

        let outcome = collect_outcome(labels, results);
        log_outcome("upload", bucket, &outcome);
        outcome.into_result()
    }

    /// Download `keys` from `bucket` into `dest`, mirroring key paths as
    /// sub-directories.
    ///
    /// Keys that would land outside `dest` fail individually.
    ///
    /// # Errors
    ///
    /// [`GatewayError::BadRequest`] if `keys` is empty, otherwise
    /// [`GatewayError::TransferFailed`] if any item failed.
    pub async fn download(
        &self,
        bucket: &str,
        keys: Vec<String>,
        dest: &Path,
    ) -> GatewayResult<BulkOutcome> {
        if keys.is_empty() {
            return Err(GatewayError::BadRequest("nothing to download".to_owned()));
        }

        let labels: Vec<(String, String)> = keys
            .iter()
            .map(|key| (local_name(key), key.clone()))
            .collect();

        debug!(bucket = %bucket, count = keys.len(), dest = %dest.display(), "starting bulk download");

        let store = Arc::clone(&self.store);
        let bucket_owned = bucket.to_owned();
        let dest_owned = dest.to_path_buf();
        let results = self
            .pool
            .run(keys, move |key| {
                let store = Arc::clone(&store);
                let bucket = bucket_owned.clone();
                let dest = dest_owned.clone();
                async move { download_one(store.as_ref(), &bucket, &key, &dest).await }
            })
            .await;

        let outcome = collect_outcome(labels, results);
        log_outcome("download", bucket, &outcome);
        outcome.into_result()
    }
}

async fn upload_one(store: &dyn ObjectStore, bucket: &str, job: UploadJob) -> Result<(), String> {
    if base_name(&job.name).is_empty() {
        return Err("payload has no file name".to_owned());
    }

    let (body, declared) = match job.source {
        PayloadSource::Bytes { data, content_type } => (data, content_type),
        PayloadSource::File(path) => {
            let data = tokio::fs::read(&path)
                .await
                .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
            (Bytes::from(data), None)
        }
    };
    let content_type = declared.unwrap_or_else(|| guess_content_type(&job.key));

    store
        .put_object(bucket, &job.key, body, &content_type)
        .await
        .map_err(|e| e.to_string())?;
    debug!(bucket = %bucket, key = %job.key, "uploaded");
    Ok(())
}

async fn download_one(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    dest: &Path,
) -> Result<(), String> {
    let relative = safe_relative_path(key)?;
    let target = dest.join(&relative);

    if key.ends_with('/') {
        return tokio::fs::create_dir_all(&target)
            .await
            .map_err(|e| format!("failed to create {}: {e}", target.display()));
    }

    let object = store
        .get_object(bucket, key)
        .await
        .map_err(|e| e.to_string())?;

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| format!("failed to create {}: {e}", parent.display()))?;
    }
    tokio::fs::write(&target, &object.body)
        .await
        .map_err(|e| format!("failed to write {}: {e}", target.display()))?;
    debug!(bucket = %bucket, key = %key, path = %target.display(), "downloaded");
    Ok(())
}

/// Content type from a key's extension, or the generic binary type.
#[must_use]
pub fn guess_content_type(key: &str) -> String {
    mime_guess::from_path(key)
        .first_raw()
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_owned()
}

/// Map a key onto a relative path that cannot leave its base directory.
fn safe_relative_path(key: &str) -> Result<PathBuf, String> {
    if key.starts_with('/') || key.starts_with('\\') {
        return Err("key is an absolute path".to_owned());
    }

    let mut path = PathBuf::new();
    for segment in key.split('/').filter(|s| !s.is_empty() && *s != ".") {
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => path.push(part),
            _ => return Err("key escapes the destination folder".to_owned()),
        }
    }

    if path.as_os_str().is_empty() {
        return Err("key has no file name".to_owned());
    }
    Ok(path)
}

fn local_name(key: &str) -> String {
    safe_relative_path(key).map_or_else(|_| key.to_owned(), |p| p.to_string_lossy().into_owned())
}

fn collect_outcome(labels: Vec<(String, String)>, results: Vec<Result<(), String>>) -> BulkOutcome {
    BulkOutcome::new(
        labels
            .into_iter()
            .zip(results)
            .map(|((name, key), result)| match result {
                Ok(()) => ItemOutcome::succeeded(name, key),
                Err(error) => {
                    warn!(name = %name, key = %key, error = %error, "transfer item failed");
                    ItemOutcome::failed(name, key, error)
                }
            })
            .collect(),
    )
}

fn log_outcome(operation: &str, bucket: &str, outcome: &BulkOutcome) {
    info!(
        operation,
        bucket = %bucket,
        total = outcome.total(),
        succeeded = outcome.succeeded(),
        failed = outcome.failed(),
        "bulk transfer finished"
    );
}
