//! [`ObjectStore`] over a remote S3 or S3-compatible service.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CreateBucketConfiguration, Delete, ObjectIdentifier,
};
use bucketgate_auth::UrlSigner;
use bucketgate_core::types::{
    BatchDeleteReport, BucketSummary, DEFAULT_CONTENT_TYPE, ObjectPage, PresignedUrl, StoredObject,
};
use bucketgate_core::{GatewayConfig, ObjectStore, StoreError, StoreResult};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::client::{ConnectedClient, connect};

/// Most keys one `DeleteObjects` call accepts.
pub const DELETE_BATCH_LIMIT: usize = 1000;

/// Region that takes no location constraint on bucket creation.
const DEFAULT_REGION: &str = "us-east-1";

/// An S3-backed object store.
///
/// Presigned URLs are signed locally with the credentials resolved when the
/// store was built. With a custom endpoint they are path-style
/// (`{endpoint}/{bucket}/{key}`), otherwise virtual-hosted
/// (`https://{bucket}.s3.{region}.amazonaws.com/{key}`).
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    signer: Option<UrlSigner>,
    region: String,
    endpoint: Option<String>,
}

impl S3ObjectStore {
    /// Connect using `config`.
    pub async fn connect(config: &GatewayConfig) -> Self {
        let ConnectedClient {
            client,
            credentials,
        } = connect(config).await;
        Self::new(client, credentials.map(|c| UrlSigner::new(c, &config.region)), config)
    }

    /// Wrap an existing client.
    pub fn new(client: Client, signer: Option<UrlSigner>, config: &GatewayConfig) -> Self {
        Self {
            client,
            signer,
            region: config.region.clone(),
            endpoint: config
                .endpoint_url
                .as_ref()
                .map(|e| e.trim_end_matches('/').to_owned()),
        }
    }

    /// Base URL and path a presigned GET for `bucket`/`key` is built from.
    fn presign_target(&self, bucket: &str, key: &str) -> (String, String) {
        match &self.endpoint {
            Some(endpoint) => (endpoint.clone(), format!("/{bucket}/{key}")),
            None => (
                format!("https://{bucket}.s3.{}.amazonaws.com", self.region),
                format!("/{key}"),
            ),
        }
    }
}

/// The service error code, when the failure came back from the service.
fn error_code<E, R>(err: &SdkError<E, R>) -> Option<&str>
where
    E: ProvideErrorMetadata,
{
    err.as_service_error().and_then(ProvideErrorMetadata::code)
}

/// `"Code: message"` for service errors, the transport error otherwise.
fn describe<E, R>(err: &SdkError<E, R>) -> String
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match err.as_service_error() {
        Some(service) => format!(
            "{}: {}",
            service.code().unwrap_or("Unknown"),
            service.message().unwrap_or("no message")
        ),
        None => err.to_string(),
    }
}

fn no_such_bucket(bucket: &str) -> StoreError {
    StoreError::NoSuchBucket {
        bucket: bucket.to_owned(),
    }
}

/// Convert a batch of keys into delete identifiers.
fn identifiers(keys: &[String]) -> StoreResult<Vec<ObjectIdentifier>> {
    keys.iter()
        .map(|key| {
            ObjectIdentifier::builder()
                .key(key)
                .build()
                .map_err(|e| StoreError::backend("DeleteObjects", e.to_string()))
        })
        .collect()
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list_buckets(&self) -> StoreResult<Vec<BucketSummary>> {
        let resp = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| StoreError::backend("ListBuckets", describe(&e)))?;

        Ok(resp
            .buckets()
            .iter()
            .filter_map(|bucket| {
                let name = bucket.name()?.to_owned();
                let created_at = bucket.creation_date().and_then(|d| {
                    DateTime::<Utc>::from_timestamp(d.secs(), d.subsec_nanos())
                });
                Some(BucketSummary { name, created_at })
            })
            .collect())
    }

    async fn bucket_exists(&self, bucket: &str) -> bool {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => true,
            Err(e) => {
                debug!(bucket = %bucket, error = %describe(&e), "head bucket failed");
                false
            }
        }
    }

    async fn create_bucket(&self, bucket: &str) -> StoreResult<()> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if self.region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => {
                info!(bucket = %bucket, "bucket created");
                Ok(())
            }
            Err(e) => match error_code(&e) {
                Some("BucketAlreadyOwnedByYou" | "BucketAlreadyExists") => {
                    Err(StoreError::BucketAlreadyExists {
                        bucket: bucket.to_owned(),
                    })
                }
                Some("InvalidBucketName") => Err(StoreError::InvalidBucketName {
                    name: bucket.to_owned(),
                    reason: "rejected by the store".to_owned(),
                }),
                _ => Err(StoreError::backend("CreateBucket", describe(&e))),
            },
        }
    }

    async fn delete_bucket(&self, bucket: &str) -> StoreResult<()> {
        match self.client.delete_bucket().bucket(bucket).send().await {
            Ok(_) => {
                info!(bucket = %bucket, "bucket deleted");
                Ok(())
            }
            Err(e) => match error_code(&e) {
                Some("NoSuchBucket") => Err(no_such_bucket(bucket)),
                Some("BucketNotEmpty") => Err(StoreError::BucketNotEmpty {
                    bucket: bucket.to_owned(),
                }),
                _ => Err(StoreError::backend("DeleteBucket", describe(&e))),
            },
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> StoreResult<()> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| match error_code(&e) {
                Some("NoSuchBucket") => no_such_bucket(bucket),
                _ => StoreError::backend("PutObject", describe(&e)),
            })?;
        debug!(bucket = %bucket, key = %key, size, "object stored");
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<StoredObject> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match error_code(&e) {
                Some("NoSuchKey") => StoreError::NoSuchKey {
                    bucket: bucket.to_owned(),
                    key: key.to_owned(),
                },
                Some("NoSuchBucket") => no_such_bucket(bucket),
                _ => StoreError::backend("GetObject", describe(&e)),
            })?;

        let content_type = resp
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_owned();
        let body = resp
            .body
            .collect()
            .await
            .map_err(|e| StoreError::backend("GetObject", e.to_string()))?
            .into_bytes();

        Ok(StoredObject { body, content_type })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match error_code(&e) {
                Some("NoSuchBucket") => no_such_bucket(bucket),
                _ => StoreError::backend("DeleteObject", describe(&e)),
            })?;
        debug!(bucket = %bucket, key = %key, "object deleted");
        Ok(())
    }

    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        cursor: Option<&str>,
    ) -> StoreResult<ObjectPage> {
        let resp = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .set_prefix(prefix.filter(|p| !p.is_empty()).map(ToOwned::to_owned))
            .set_continuation_token(cursor.filter(|c| !c.is_empty()).map(ToOwned::to_owned))
            .send()
            .await
            .map_err(|e| match error_code(&e) {
                Some("NoSuchBucket") => no_such_bucket(bucket),
                _ => StoreError::backend("ListObjectsV2", describe(&e)),
            })?;

        let keys = resp
            .contents()
            .iter()
            .filter_map(|object| object.key().map(ToOwned::to_owned))
            .collect();
        Ok(ObjectPage {
            keys,
            next_cursor: resp.next_continuation_token().map(ToOwned::to_owned),
        })
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> StoreResult<BatchDeleteReport> {
        let mut report = BatchDeleteReport::default();

        for chunk in keys.chunks(DELETE_BATCH_LIMIT) {
            let delete = Delete::builder()
                .set_objects(Some(identifiers(chunk)?))
                .quiet(false)
                .build()
                .map_err(|e| StoreError::backend("DeleteObjects", e.to_string()))?;

            let resp = self
                .client
                .delete_objects()
                .bucket(bucket)
                .delete(delete)
                .send()
                .await
                .map_err(|e| match error_code(&e) {
                    Some("NoSuchBucket") => no_such_bucket(bucket),
                    _ => StoreError::backend("DeleteObjects", describe(&e)),
                })?;

            report.deleted += resp.deleted().len();
            for error in resp.errors() {
                let key = error.key().unwrap_or_default().to_owned();
                let reason = format!(
                    "{}: {}",
                    error.code().unwrap_or("Unknown"),
                    error.message().unwrap_or("no message")
                );
                warn!(bucket = %bucket, key = %key, reason = %reason, "key not deleted");
                report.errors.push((key, reason));
            }
        }

        debug!(bucket = %bucket, deleted = report.deleted, failed = report.errors.len(), "batch delete sent");
        Ok(report)
    }

    fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> StoreResult<PresignedUrl> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            StoreError::backend("Presign", "no credentials available for presigning")
        })?;
        let (endpoint, path) = self.presign_target(bucket, key);
        let presigned = signer.presign_get(&endpoint, &path, expires_in, Utc::now())?;
        Ok(PresignedUrl {
            url: presigned.url,
            expires_at: presigned.expires_at,
        })
    }
}
