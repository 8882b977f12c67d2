//! Presigned URL generation and verification for AWS Signature Version 4.
//!
//! Presigned URLs carry authentication information in query parameters:
//!
//! - `X-Amz-Algorithm` - Must be `AWS4-HMAC-SHA256`
//! - `X-Amz-Credential` - `AKID/date/region/service/aws4_request`
//! - `X-Amz-Date` - ISO 8601 basic format timestamp (`YYYYMMDDTHHMMSSZ`)
//! - `X-Amz-Expires` - Validity duration in seconds
//! - `X-Amz-Security-Token` - Session token, temporary credentials only
//! - `X-Amz-SignedHeaders` - Always `host` for URLs issued here
//! - `X-Amz-Signature` - The hex-encoded signature
//!
//! The payload hash is always `UNSIGNED-PAYLOAD`.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::canonical::{
    build_canonical_query_string, build_canonical_request, encode_uri_path, uri_encode,
};
use crate::credentials::{CredentialProvider, Credentials};
use crate::error::AuthError;
use crate::sigv4::{
    AMZ_DATE_FORMAT, SCOPE_DATE_FORMAT, SUPPORTED_ALGORITHM, build_string_to_sign,
    compute_signature, credential_scope, derive_signing_key, hash_canonical_request,
};

/// The payload hash value used for all presigned URL requests.
const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Longest validity window SigV4 allows (7 days).
pub const MAX_EXPIRES_SECS: u64 = 604_800;

/// A freshly signed URL together with the instant it stops working.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedRequest {
    /// The full URL, signature included.
    pub url: String,
    /// Signing time plus the validity window.
    pub expires_at: DateTime<Utc>,
}

/// Signs GET URLs with a fixed set of credentials for one region.
#[derive(Debug, Clone)]
pub struct UrlSigner {
    credentials: Credentials,
    region: String,
    service: String,
}

impl UrlSigner {
    /// Create a signer for the `s3` service in `region`.
    pub fn new(credentials: Credentials, region: impl Into<String>) -> Self {
        Self {
            credentials,
            region: region.into(),
            service: "s3".to_owned(),
        }
    }

    /// The region this signer scopes signatures to.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// The credentials this signer signs with.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Sign a GET for `path` on `endpoint`, valid for `expires_in` from `now`.
    ///
    /// `endpoint` is a scheme and authority such as `http://localhost:8080`;
    /// any path it carries is ignored. `path` is the unencoded object path,
    /// e.g. `/bucket/reports/q1.csv`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidEndpoint`] if `endpoint` lacks a scheme or
    /// host, and [`AuthError::InvalidExpiry`] if `expires_in` is zero or
    /// longer than seven days.
    pub fn presign_get(
        &self,
        endpoint: &str,
        path: &str,
        expires_in: Duration,
        now: DateTime<Utc>,
    ) -> Result<PresignedRequest, AuthError> {
        let expires = expires_in.as_secs();
        if expires == 0 || expires > MAX_EXPIRES_SECS {
            return Err(AuthError::InvalidExpiry(expires));
        }

        let (scheme, host) = split_endpoint(endpoint)?;

        let timestamp = now.format(AMZ_DATE_FORMAT).to_string();
        let date = now.format(SCOPE_DATE_FORMAT).to_string();
        let scope = credential_scope(&date, &self.region, &self.service);
        let credential = format!("{}/{scope}", self.credentials.access_key_id);

        let mut query = format!(
            "X-Amz-Algorithm={SUPPORTED_ALGORITHM}\
             &X-Amz-Credential={}\
             &X-Amz-Date={timestamp}\
             &X-Amz-Expires={expires}",
            uri_encode(&credential)
        );
        if let Some(token) = &self.credentials.session_token {
            query.push_str("&X-Amz-Security-Token=");
            query.push_str(&uri_encode(token));
        }
        query.push_str("&X-Amz-SignedHeaders=host");

        let canonical_uri = encode_uri_path(path);
        let canonical_request = build_canonical_request(
            "GET",
            &canonical_uri,
            &query,
            &[("host", host.as_str())],
            &["host"],
            UNSIGNED_PAYLOAD,
        );
        let string_to_sign =
            build_string_to_sign(&timestamp, &scope, &hash_canonical_request(&canonical_request));
        let signing_key = derive_signing_key(
            &self.credentials.secret_access_key,
            &date,
            &self.region,
            &self.service,
        );
        let signature = compute_signature(&signing_key, &string_to_sign);

        let expires_at = now + chrono::Duration::seconds(i64::try_from(expires).unwrap_or(0));

        Ok(PresignedRequest {
            url: format!("{scheme}://{host}{canonical_uri}?{query}&X-Amz-Signature={signature}"),
            expires_at,
        })
    }
}

/// Split an endpoint into scheme and host, dropping the scheme's default port.
fn split_endpoint(endpoint: &str) -> Result<(String, String), AuthError> {
    let uri: http::Uri = endpoint
        .parse()
        .map_err(|_| AuthError::InvalidEndpoint(endpoint.to_owned()))?;
    let scheme = uri
        .scheme_str()
        .ok_or_else(|| AuthError::InvalidEndpoint(endpoint.to_owned()))?;
    let authority = uri
        .authority()
        .ok_or_else(|| AuthError::InvalidEndpoint(endpoint.to_owned()))?;

    let default_port = match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    };
    let host = match authority.port_u16() {
        Some(port) if Some(port) == default_port => authority.host().to_owned(),
        _ => authority.as_str().to_owned(),
    };

    Ok((scheme.to_owned(), host))
}

/// Parsed components from presigned URL query parameters.
#[derive(Debug, Clone)]
pub struct ParsedPresignedParams {
    /// The access key ID.
    pub access_key_id: String,
    /// The date component of the credential scope (YYYYMMDD).
    pub date: String,
    /// The AWS region from the credential scope.
    pub region: String,
    /// The AWS service from the credential scope.
    pub service: String,
    /// The ISO 8601 basic format timestamp.
    pub timestamp: String,
    /// The URL validity duration in seconds.
    pub expires: u64,
    /// The list of signed header names.
    pub signed_headers: Vec<String>,
    /// The hex-encoded signature.
    pub signature: String,
}

/// Whether a query string carries a presigned-URL signature.
#[must_use]
pub fn is_presigned_query(query: &str) -> bool {
    query
        .split('&')
        .any(|param| param.starts_with("X-Amz-Signature="))
}

/// Parse presigned URL query parameters into their components.
///
/// # Errors
///
/// Returns [`AuthError::MissingQueryParam`] if any required parameter is absent,
/// [`AuthError::UnsupportedAlgorithm`] if the algorithm is not `AWS4-HMAC-SHA256`,
/// or [`AuthError::InvalidCredential`] if the credential format is invalid.
pub fn parse_presigned_params(query: &str) -> Result<ParsedPresignedParams, AuthError> {
    let params: HashMap<String, String> = query
        .split('&')
        .filter(|s| !s.is_empty())
        .filter_map(|param| {
            let (key, value) = param.split_once('=')?;
            Some((key.to_owned(), url_decode(value)))
        })
        .collect();

    let algorithm = get_required_param(&params, "X-Amz-Algorithm")?;
    if algorithm != SUPPORTED_ALGORITHM {
        return Err(AuthError::UnsupportedAlgorithm(algorithm));
    }

    let credential = get_required_param(&params, "X-Amz-Credential")?;
    let timestamp = get_required_param(&params, "X-Amz-Date")?;
    let expires_str = get_required_param(&params, "X-Amz-Expires")?;
    let signed_headers_str = get_required_param(&params, "X-Amz-SignedHeaders")?;
    let signature = get_required_param(&params, "X-Amz-Signature")?;

    // AKID/date/region/service/aws4_request
    let cred_parts: Vec<&str> = credential.splitn(5, '/').collect();
    if cred_parts.len() != 5 || cred_parts[4] != "aws4_request" {
        return Err(AuthError::InvalidCredential);
    }

    let expires: u64 = expires_str
        .parse()
        .map_err(|_| AuthError::MissingQueryParam("X-Amz-Expires (invalid integer)".to_owned()))?;

    Ok(ParsedPresignedParams {
        access_key_id: cred_parts[0].to_owned(),
        date: cred_parts[1].to_owned(),
        region: cred_parts[2].to_owned(),
        service: cred_parts[3].to_owned(),
        timestamp,
        expires,
        signed_headers: signed_headers_str
            .split(';')
            .map(ToOwned::to_owned)
            .collect(),
        signature,
    })
}

/// Verify a presigned GET against the credentials that issued it.
///
/// Checks expiry against `now` before doing any HMAC work, then rebuilds the
/// canonical request (query minus `X-Amz-Signature`) and compares
/// signatures in constant time.
///
/// # Errors
///
/// Returns an [`AuthError`] if:
/// - Required query parameters are missing or malformed
/// - The URL has expired
/// - The access key is not found
/// - A signed header is missing from the request
/// - The signature does not match
pub fn verify_presigned(
    parts: &http::request::Parts,
    credential_provider: &dyn CredentialProvider,
    now: DateTime<Utc>,
) -> Result<ParsedPresignedParams, AuthError> {
    let query = parts.uri.query().unwrap_or("");
    let parsed = parse_presigned_params(query)?;

    debug!(
        access_key_id = %parsed.access_key_id,
        date = %parsed.date,
        region = %parsed.region,
        expires = parsed.expires,
        "Verifying presigned URL"
    );

    check_expiration(&parsed.timestamp, parsed.expires, now)?;

    let secret_key = credential_provider.get_secret_key(&parsed.access_key_id)?;

    let signed_header_refs: Vec<&str> = parsed.signed_headers.iter().map(String::as_str).collect();
    let header_pairs = collect_signed_headers(parts, &signed_header_refs)?;

    let canonical_request = build_canonical_request(
        parts.method.as_str(),
        parts.uri.path(),
        &query_without_signature(query),
        &header_pairs,
        &signed_header_refs,
        UNSIGNED_PAYLOAD,
    );

    debug!(canonical_request, "Built presigned canonical request");

    let scope = credential_scope(&parsed.date, &parsed.region, &parsed.service);
    let string_to_sign = build_string_to_sign(
        &parsed.timestamp,
        &scope,
        &hash_canonical_request(&canonical_request),
    );
    let signing_key =
        derive_signing_key(&secret_key, &parsed.date, &parsed.region, &parsed.service);
    let expected_signature = compute_signature(&signing_key, &string_to_sign);

    if parsed
        .signature
        .as_bytes()
        .ct_eq(expected_signature.as_bytes())
        .into()
    {
        debug!(access_key_id = %parsed.access_key_id, "Presigned URL verification succeeded");
        Ok(parsed)
    } else {
        debug!(
            expected = %expected_signature,
            provided = %parsed.signature,
            "Presigned URL signature mismatch"
        );
        Err(AuthError::SignatureDoesNotMatch)
    }
}

fn query_without_signature(query: &str) -> String {
    let filtered = query
        .split('&')
        .filter(|param| !param.starts_with("X-Amz-Signature="))
        .collect::<Vec<_>>()
        .join("&");
    build_canonical_query_string(&filtered)
}

fn check_expiration(timestamp: &str, expires: u64, now: DateTime<Utc>) -> Result<(), AuthError> {
    let request_time = NaiveDateTime::parse_from_str(timestamp, AMZ_DATE_FORMAT)
        .map_err(|_| AuthError::MissingQueryParam("X-Amz-Date (invalid format)".to_owned()))?;

    let expiry_time = request_time
        + chrono::Duration::seconds(i64::try_from(expires).map_err(|_| AuthError::RequestExpired)?);

    if now.naive_utc() > expiry_time {
        return Err(AuthError::RequestExpired);
    }

    Ok(())
}

fn collect_signed_headers<'a>(
    parts: &'a http::request::Parts,
    signed_headers: &[&'a str],
) -> Result<Vec<(&'a str, &'a str)>, AuthError> {
    let mut result = Vec::with_capacity(signed_headers.len());

    for &name in signed_headers {
        let value = parts
            .headers
            .get(name)
            .ok_or_else(|| AuthError::MissingHeader(name.to_owned()))?
            .to_str()
            .map_err(|_| AuthError::MissingHeader(name.to_owned()))?;
        result.push((name, value));
    }

    Ok(result)
}

fn url_decode(input: &str) -> String {
    percent_encoding::percent_decode_str(input)
        .decode_utf8_lossy()
        .into_owned()
}

fn get_required_param(params: &HashMap<String, String>, name: &str) -> Result<String, AuthError> {
    params
        .get(name)
        .cloned()
        .ok_or_else(|| AuthError::MissingQueryParam(name.to_owned()))
}
