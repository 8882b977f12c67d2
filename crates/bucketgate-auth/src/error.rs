//! Error types for presigned URL signing and verification.

/// Errors raised while generating or verifying a presigned URL.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The signing algorithm is not supported (only AWS4-HMAC-SHA256 is supported).
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// A header listed in `X-Amz-SignedHeaders` is missing from the request.
    #[error("Missing required header: {0}")]
    MissingHeader(String),

    /// The `X-Amz-Credential` value does not match
    /// `AKID/date/region/service/aws4_request`.
    #[error("Invalid credential format")]
    InvalidCredential,

    /// The access key ID was not found in the credential store.
    #[error("Access key not found: {0}")]
    AccessKeyNotFound(String),

    /// The computed signature does not match the provided signature.
    #[error("Signature does not match")]
    SignatureDoesNotMatch,

    /// The presigned URL has expired (current time exceeds `X-Amz-Date` + `X-Amz-Expires`).
    #[error("Request has expired")]
    RequestExpired,

    /// A required presigned query parameter is missing or malformed.
    #[error("Missing required query parameter: {0}")]
    MissingQueryParam(String),

    /// The endpoint a URL is signed against has no scheme or authority.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The requested validity window is outside `1..=604800` seconds.
    #[error("Invalid expiry: {0} seconds (must be between 1 and 604800)")]
    InvalidExpiry(u64),
}
