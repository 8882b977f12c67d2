//! SigV4 signing primitives.
//!
//! 1. Build the string to sign from the timestamp, credential scope, and
//!    canonical request hash.
//! 2. Derive the signing key with an HMAC-SHA256 chain over the secret key
//!    and the scope components.
//! 3. HMAC the string to sign with that key and hex-encode it.

use hmac::{Hmac, KeyInit, Mac};
use sha2::{Digest, Sha256};

/// The only algorithm supported by this implementation.
pub const SUPPORTED_ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Timestamp layout used by `X-Amz-Date` (ISO 8601 basic format).
pub const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Date layout used in the credential scope.
pub const SCOPE_DATE_FORMAT: &str = "%Y%m%d";

type HmacSha256 = Hmac<Sha256>;

/// Build the credential scope `date/region/service/aws4_request`.
///
/// # Examples
///
/// ```
/// use bucketgate_auth::sigv4::credential_scope;
///
/// assert_eq!(
///     credential_scope("20130524", "us-east-1", "s3"),
///     "20130524/us-east-1/s3/aws4_request"
/// );
/// ```
#[must_use]
pub fn credential_scope(date: &str, region: &str, service: &str) -> String {
    format!("{date}/{region}/{service}/aws4_request")
}

/// Build the SigV4 string to sign.
///
/// ```text
/// AWS4-HMAC-SHA256\n
/// <ISO8601 timestamp>\n
/// <credential_scope>\n
/// <hex(SHA256(canonical_request))>
/// ```
#[must_use]
pub fn build_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{SUPPORTED_ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_request_hash}")
}

/// Derive the SigV4 signing key.
///
/// ```text
/// DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, service)
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
/// ```
#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let date_region_key = hmac_sha256(&date_key, region.as_bytes());
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes());
    hmac_sha256(&date_region_service_key, b"aws4_request")
}

/// Compute the hex-encoded HMAC-SHA256 signature of `data`.
#[must_use]
pub fn compute_signature(signing_key: &[u8], data: &str) -> String {
    hex::encode(hmac_sha256(signing_key, data.as_bytes()))
}

/// Hex-encoded SHA-256 of a canonical request.
#[must_use]
pub fn hash_canonical_request(canonical_request: &str) -> String {
    hex::encode(Sha256::digest(canonical_request.as_bytes()))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
