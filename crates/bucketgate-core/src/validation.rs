//! Bucket name validation.
//!
//! Follows the [Amazon S3 naming rules](https://docs.aws.amazon.com/AmazonS3/latest/userguide/bucketnamingrules.html),
//! so a name the gateway accepts is also one a real S3 endpoint accepts.

use std::net::Ipv4Addr;

use crate::error::StoreError;

const MIN_BUCKET_NAME_LEN: usize = 3;
const MAX_BUCKET_NAME_LEN: usize = 63;

/// Validate a bucket name.
///
/// - 3-63 characters long
/// - Only lowercase letters, numbers, hyphens, and dots
/// - Starts and ends with a letter or number
/// - No consecutive dots
/// - Not formatted as an IPv4 address
/// - No `xn--` prefix, `sthree-` prefix, or `-s3alias` suffix
///
/// # Examples
///
/// ```
/// use bucketgate_core::validation::validate_bucket_name;
///
/// assert!(validate_bucket_name("my-valid-bucket").is_ok());
/// assert!(validate_bucket_name("AB").is_err());
/// ```
pub fn validate_bucket_name(name: &str) -> Result<(), StoreError> {
    let invalid = |reason: &str| StoreError::InvalidBucketName {
        name: name.to_owned(),
        reason: reason.to_owned(),
    };

    let len = name.len();
    if !(MIN_BUCKET_NAME_LEN..=MAX_BUCKET_NAME_LEN).contains(&len) {
        return Err(invalid(&format!(
            "must be between {MIN_BUCKET_NAME_LEN} and {MAX_BUCKET_NAME_LEN} characters long"
        )));
    }

    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.')
    {
        return Err(invalid(
            "must only contain lowercase letters, numbers, hyphens, and dots",
        ));
    }

    let bytes = name.as_bytes();
    let alnum = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    if !alnum(bytes[0]) || !alnum(bytes[len - 1]) {
        return Err(invalid("must start and end with a letter or number"));
    }

    if name.contains("..") {
        return Err(invalid("must not contain consecutive dots"));
    }

    if name.parse::<Ipv4Addr>().is_ok() {
        return Err(invalid("must not be formatted as an IP address"));
    }

    if name.starts_with("xn--") || name.starts_with("sthree-") {
        return Err(invalid("uses a reserved prefix"));
    }

    if name.ends_with("-s3alias") {
        return Err(invalid("uses a reserved suffix"));
    }

    Ok(())
}
