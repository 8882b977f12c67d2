//! Response documents and their serialization into HTTP responses.

use bucketgate_core::types::{BucketSummary, BulkOutcome, ItemOutcome, ListedObject, StoredObject};
use chrono::{DateTime, Utc};
use http::StatusCode;
use serde::Serialize;
use tracing::error;

use crate::body::GatewayBody;
use crate::error::ApiError;

const JSON: &str = "application/json";

/// `GET /buckets`
#[derive(Debug, Serialize)]
pub struct BucketList {
    /// Buckets in name order.
    pub buckets: Vec<BucketEntry>,
}

/// One bucket in a [`BucketList`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketEntry {
    /// Bucket name.
    pub name: String,
    /// Creation time, when the store reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<BucketSummary> for BucketEntry {
    fn from(summary: BucketSummary) -> Self {
        Self {
            name: summary.name,
            created_at: summary.created_at,
        }
    }
}

/// `PUT /buckets/{bucket}`
#[derive(Debug, Serialize)]
pub struct BucketCreated {
    /// The new bucket.
    pub bucket: String,
}

/// `PUT /buckets/{bucket}/objects/{key}`
#[derive(Debug, Serialize)]
pub struct ObjectCreated {
    /// Target bucket.
    pub bucket: String,
    /// Stored key.
    pub key: String,
}

/// `GET /buckets/{bucket}/objects`
#[derive(Debug, Serialize)]
pub struct ObjectList {
    /// Listed bucket.
    pub bucket: String,
    /// Prefix the listing was restricted to.
    pub prefix: Option<String>,
    /// Number of objects.
    pub count: usize,
    /// Objects with their presigned URLs.
    pub objects: Vec<ListedObject>,
}

/// Successful bulk transfer.
#[derive(Debug, Serialize)]
pub struct BulkReport {
    /// Target bucket.
    pub bucket: String,
    /// Items submitted.
    pub total: usize,
    /// Items that succeeded.
    pub succeeded: usize,
    /// Items that failed.
    pub failed: usize,
    /// Per-item outcomes in submission order.
    pub outcomes: Vec<ItemOutcome>,
}

impl BulkReport {
    /// Summarize `outcome` for `bucket`.
    #[must_use]
    pub fn new(bucket: impl Into<String>, outcome: BulkOutcome) -> Self {
        Self {
            bucket: bucket.into(),
            total: outcome.total(),
            succeeded: outcome.succeeded(),
            failed: outcome.failed(),
            outcomes: outcome.outcomes,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDocument<'a> {
    error: &'a str,
    message: &'a str,
    request_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcomes: Option<&'a [ItemOutcome]>,
}

/// Serialize `document` as a JSON response with `status`.
pub fn json_response<T: Serialize>(status: StatusCode, document: &T) -> http::Response<GatewayBody> {
    match serde_json::to_vec(document) {
        Ok(bytes) => http::Response::builder()
            .status(status)
            .header(http::header::CONTENT_TYPE, JSON)
            .body(GatewayBody::from_bytes(bytes))
            .expect("static JSON response should be valid"),
        Err(e) => {
            error!(error = %e, "failed to serialize response document");
            status_only(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// `204 No Content`.
#[must_use]
pub fn no_content() -> http::Response<GatewayBody> {
    status_only(StatusCode::NO_CONTENT)
}

/// The raw bytes of an object with its stored content type.
#[must_use]
pub fn object_response(object: StoredObject) -> http::Response<GatewayBody> {
    let content_type = http::HeaderValue::from_str(&object.content_type)
        .unwrap_or(http::HeaderValue::from_static("application/octet-stream"));
    http::Response::builder()
        .status(StatusCode::OK)
        .header(http::header::CONTENT_TYPE, content_type)
        .header(http::header::CONTENT_LENGTH, object.body.len())
        .body(GatewayBody::from_bytes(object.body))
        .expect("object response should be valid")
}

/// `{"status":"running","service":"bucketgate"}`.
#[must_use]
pub fn health_response() -> http::Response<GatewayBody> {
    http::Response::builder()
        .status(StatusCode::OK)
        .header(http::header::CONTENT_TYPE, JSON)
        .body(GatewayBody::from_string(
            r#"{"status":"running","service":"bucketgate"}"#,
        ))
        .expect("static health response should be valid")
}

/// Render an error as `{"error","message","requestId","outcomes"?}`.
#[must_use]
pub fn error_to_response(err: &ApiError, request_id: &str) -> http::Response<GatewayBody> {
    json_response(
        err.status,
        &ErrorDocument {
            error: err.code,
            message: &err.message,
            request_id,
            outcomes: err.outcomes.as_deref(),
        },
    )
}

fn status_only(status: StatusCode) -> http::Response<GatewayBody> {
    http::Response::builder()
        .status(status)
        .body(GatewayBody::empty())
        .expect("static response should be valid")
}
