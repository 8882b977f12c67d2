//! Error types.
//!
//! Two layers, one per audience:
//!
//! - [`StoreError`] is what an [`ObjectStore`](crate::store::ObjectStore)
//!   backend raises. It names the store condition (missing bucket, missing
//!   key, backend fault) and nothing about the caller's request.
//! - [`GatewayError`] is what the gateway reports to its caller. Store
//!   conditions with a domain meaning are mapped onto dedicated variants;
//!   everything else is wrapped as [`GatewayError::Store`].

use bucketgate_auth::AuthError;

use crate::types::BulkOutcome;

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures raised by an object store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The bucket does not exist.
    #[error("The specified bucket does not exist: {bucket}")]
    NoSuchBucket {
        /// The bucket name that was not found.
        bucket: String,
    },

    /// The key does not exist in the bucket.
    #[error("The specified key does not exist: {bucket}/{key}")]
    NoSuchKey {
        /// The bucket that was searched.
        bucket: String,
        /// The key that was not found.
        key: String,
    },

    /// A bucket with this name already exists.
    #[error("The requested bucket name is not available: {bucket}")]
    BucketAlreadyExists {
        /// The conflicting bucket name.
        bucket: String,
    },

    /// The bucket still holds objects.
    #[error("The bucket you tried to delete is not empty: {bucket}")]
    BucketNotEmpty {
        /// The bucket that is not empty.
        bucket: String,
    },

    /// The bucket name violates the naming rules.
    #[error("The specified bucket is not valid: {name}: {reason}")]
    InvalidBucketName {
        /// The rejected name.
        name: String,
        /// Which rule it broke.
        reason: String,
    },

    /// A presigned URL could not be produced.
    #[error("Failed to presign URL: {0}")]
    Signing(#[from] AuthError),

    /// Any other backend failure (network, permissions, throttling).
    #[error("{operation} failed: {message}")]
    Backend {
        /// The store operation that failed.
        operation: &'static str,
        /// Backend-supplied detail.
        message: String,
    },
}

impl StoreError {
    /// Build a [`StoreError::Backend`].
    pub fn backend(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            operation,
            message: message.into(),
        }
    }
}

/// Caller-facing gateway failures.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The bucket does not exist.
    #[error("Bucket not found: {bucket}")]
    BucketNotFound {
        /// The missing bucket.
        bucket: String,
    },

    /// The object does not exist.
    #[error("Object not found: {bucket}/{key}")]
    ObjectNotFound {
        /// The bucket that was searched.
        bucket: String,
        /// The missing key.
        key: String,
    },

    /// The request is malformed or has nothing to act on.
    #[error("{0}")]
    BadRequest(String),

    /// The bucket name violates the naming rules.
    #[error("Invalid bucket name {name}: {reason}")]
    InvalidBucketName {
        /// The rejected name.
        name: String,
        /// Which rule it broke.
        reason: String,
    },

    /// No key matched the deletion criteria.
    #[error("Nothing to delete")]
    NothingToDelete,

    /// A bucket with this name already exists.
    #[error("Bucket already exists: {bucket}")]
    BucketAlreadyExists {
        /// The conflicting bucket name.
        bucket: String,
    },

    /// The bucket cannot be deleted while it holds objects.
    #[error("Bucket is not empty: {bucket}")]
    BucketNotEmpty {
        /// The bucket that is not empty.
        bucket: String,
    },

    /// One or more items of a bulk transfer failed.
    #[error("{}", .0.failure_message())]
    TransferFailed(BulkOutcome),

    /// The batch deletion call failed or reported per-key errors.
    #[error("{message}")]
    BatchDeleteFailed {
        /// Newline-joined failure description.
        message: String,
        /// `(key, message)` pairs when the store reported them.
        failures: Vec<(String, String)>,
    },

    /// A store failure without a more specific meaning.
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NoSuchBucket { bucket } => Self::BucketNotFound { bucket },
            StoreError::NoSuchKey { bucket, key } => Self::ObjectNotFound { bucket, key },
            StoreError::BucketAlreadyExists { bucket } => Self::BucketAlreadyExists { bucket },
            StoreError::BucketNotEmpty { bucket } => Self::BucketNotEmpty { bucket },
            StoreError::InvalidBucketName { name, reason } => {
                Self::InvalidBucketName { name, reason }
            }
            other => Self::Store(other),
        }
    }
}

/// Result alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
