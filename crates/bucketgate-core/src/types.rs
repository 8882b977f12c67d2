//! Domain types shared by the store capability and the orchestration layer.

use std::path::PathBuf;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{GatewayError, GatewayResult};

/// Content type used when neither the caller nor the key name supplies one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A bucket as reported by `list-buckets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketSummary {
    /// Bucket name.
    pub name: String,
    /// Creation time, when the store reports one.
    pub created_at: Option<DateTime<Utc>>,
}

/// An object body together with its content type.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Object bytes.
    pub body: Bytes,
    /// MIME type recorded at upload.
    pub content_type: String,
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectPage {
    /// Keys on this page, in store order.
    pub keys: Vec<String>,
    /// Cursor for the next page. `None` or an empty string ends the listing.
    pub next_cursor: Option<String>,
}

impl ObjectPage {
    /// The cursor to thread into the next request, if there is a next page.
    #[must_use]
    pub fn continuation(&self) -> Option<&str> {
        self.next_cursor.as_deref().filter(|c| !c.is_empty())
    }
}

/// What a batch delete call reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchDeleteReport {
    /// Number of keys the store confirmed as deleted.
    pub deleted: usize,
    /// `(key, message)` for every key the store refused.
    pub errors: Vec<(String, String)>,
}

/// A time-limited GET URL for one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedUrl {
    /// The signed URL.
    pub url: String,
    /// When the URL stops working.
    pub expires_at: DateTime<Utc>,
}

/// A listed key with its freshly issued access URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedObject {
    /// Object key.
    pub key: String,
    /// Presigned GET URL.
    pub url: String,
    /// When `url` expires.
    pub expires_at: DateTime<Utc>,
}

/// Where a payload's bytes come from.
#[derive(Debug, Clone)]
pub enum PayloadSource {
    /// Bytes already in memory, e.g. a multipart file part.
    Bytes {
        /// The payload.
        data: Bytes,
        /// Declared content type, if any.
        content_type: Option<String>,
    },
    /// A local file, read when its upload starts.
    File(PathBuf),
}

/// A named item submitted for bulk upload.
#[derive(Debug, Clone)]
pub struct Payload {
    /// Identifier reported back in outcomes; its base name becomes the key.
    pub name: String,
    /// Where the bytes come from.
    pub source: PayloadSource,
}

impl Payload {
    /// An in-memory payload.
    pub fn from_bytes(
        name: impl Into<String>,
        data: impl Into<Bytes>,
        content_type: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: PayloadSource::Bytes {
                data: data.into(),
                content_type,
            },
        }
    }

    /// A payload read from `path`.
    pub fn from_file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: PayloadSource::File(path.into()),
        }
    }
}

/// The last path component of `name`, for either separator.
#[must_use]
pub fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Derive the object key for an upload.
///
/// The prefix is slash-trimmed and joined to the payload's base name with a
/// single `/`. An absent or all-slash prefix leaves the base name alone.
///
/// # Examples
///
/// ```
/// use bucketgate_core::types::upload_key;
///
/// assert_eq!(upload_key(Some("images/"), "a.png"), "images/a.png");
/// assert_eq!(upload_key(None, "a.png"), "a.png");
/// assert_eq!(upload_key(Some("/"), "dir/a.png"), "a.png");
/// ```
#[must_use]
pub fn upload_key(prefix: Option<&str>, name: &str) -> String {
    let base = base_name(name);
    match prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{prefix}/{base}"),
        None => base.to_owned(),
    }
}

/// Whether a single item succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// The store accepted the item.
    Succeeded,
    /// The item failed; see [`ItemOutcome::error`].
    Failed,
}

/// The outcome of one item in a bulk operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemOutcome {
    /// Payload identifier as submitted.
    pub name: String,
    /// Object key the item targeted.
    pub key: String,
    /// Success or failure.
    pub status: ItemStatus,
    /// Failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemOutcome {
    /// A successful item.
    pub fn succeeded(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            status: ItemStatus::Succeeded,
            error: None,
        }
    }

    /// A failed item.
    pub fn failed(
        name: impl Into<String>,
        key: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            status: ItemStatus::Failed,
            error: Some(error.into()),
        }
    }

    /// Whether this item failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status == ItemStatus::Failed
    }
}

/// Aggregate over the items of one bulk operation, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    /// Per-item outcomes.
    pub outcomes: Vec<ItemOutcome>,
}

impl BulkOutcome {
    /// Wrap a list of item outcomes.
    #[must_use]
    pub fn new(outcomes: Vec<ItemOutcome>) -> Self {
        Self { outcomes }
    }

    /// Number of submitted items.
    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of items that succeeded.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.total() - self.failed()
    }

    /// Number of items that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures().count()
    }

    /// The failed items.
    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    /// `true` when no item failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Failure messages, one `name: error` line per failed item.
    #[must_use]
    pub fn failure_message(&self) -> String {
        self.failures()
            .map(|o| format!("{}: {}", o.name, o.error.as_deref().unwrap_or("unknown error")))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// `Ok(self)` when every item succeeded, otherwise
    /// [`GatewayError::TransferFailed`].
    pub fn into_result(self) -> GatewayResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(GatewayError::TransferFailed(self))
        }
    }
}
