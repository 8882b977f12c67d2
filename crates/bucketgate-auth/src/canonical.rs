//! Canonical request construction for AWS Signature Version 4.
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! Both the signer and the verifier go through [`build_canonical_request`],
//! so a URL this crate issues always canonicalizes the same way when it
//! comes back.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Characters percent-encoded in URI path segments and query values.
///
/// Everything except the RFC 3986 unreserved set (A-Z, a-z, 0-9, `-`, `_`,
/// `.`, `~`) is encoded, including `/`.
pub const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Build the full canonical request string from its components.
///
/// # Examples
///
/// ```
/// use bucketgate_auth::canonical::build_canonical_request;
///
/// let canonical = build_canonical_request(
///     "GET",
///     "/test.txt",
///     "",
///     &[("host", "examplebucket.s3.amazonaws.com")],
///     &["host"],
///     "UNSIGNED-PAYLOAD",
/// );
/// assert!(canonical.starts_with("GET\n/test.txt\n"));
/// ```
#[must_use]
pub fn build_canonical_request(
    method: &str,
    uri: &str,
    query_string: &str,
    headers: &[(&str, &str)],
    signed_headers: &[&str],
    payload_hash: &str,
) -> String {
    let canonical_uri = build_canonical_uri(uri);
    let canonical_query = build_canonical_query_string(query_string);
    let canonical_headers = build_canonical_headers(headers, signed_headers);
    let signed_headers_str = build_signed_headers_string(signed_headers);

    format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n\n{signed_headers_str}\n{payload_hash}"
    )
}

/// Build the canonical URI of a path as it arrived on the wire.
///
/// Each segment is decoded and then re-encoded, so an incoming path
/// canonicalizes the same way whichever optional escapes the client used.
/// Forward slashes (`/`) separating segments are preserved. Empty paths are
/// normalized to `/`.
///
/// Only for paths that are already encoded. Raw object paths go through
/// [`encode_uri_path`], since decoding a raw key would turn a literal `%41`
/// into `A`.
///
/// # Examples
///
/// ```
/// use bucketgate_auth::canonical::build_canonical_uri;
///
/// assert_eq!(build_canonical_uri("/bucket/my%20photo.png"), "/bucket/my%20photo.png");
/// assert_eq!(build_canonical_uri("/bucket/my%2Dphoto.png"), "/bucket/my-photo.png");
/// assert_eq!(build_canonical_uri(""), "/");
/// ```
#[must_use]
pub fn build_canonical_uri(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_owned();
    }

    path.split('/')
        .map(|segment| uri_encode(&percent_decode_str(segment).decode_utf8_lossy()))
        .collect::<Vec<_>>()
        .join("/")
}

/// Encode a raw, unencoded object path segment by segment.
///
/// Every byte outside the unreserved set is escaped, `%` included, so the
/// result names exactly the key it was built from. The output is also the
/// path's canonical URI.
///
/// # Examples
///
/// ```
/// use bucketgate_auth::canonical::encode_uri_path;
///
/// assert_eq!(encode_uri_path("/bucket/my photo.png"), "/bucket/my%20photo.png");
/// assert_eq!(encode_uri_path("/bucket/report%41.txt"), "/bucket/report%2541.txt");
/// assert_eq!(encode_uri_path(""), "/");
/// ```
#[must_use]
pub fn encode_uri_path(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_owned();
    }

    path.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
}

/// Build the canonical query string by sorting parameters.
///
/// Parameters are sorted by key, then by value. Values are kept exactly as
/// they appear on the wire; the signer already encodes with
/// [`URI_ENCODE_SET`].
///
/// # Examples
///
/// ```
/// use bucketgate_auth::canonical::build_canonical_query_string;
///
/// assert_eq!(build_canonical_query_string(""), "");
/// assert_eq!(build_canonical_query_string("b=2&a=1"), "a=1&b=2");
/// ```
#[must_use]
pub fn build_canonical_query_string(query: &str) -> String {
    if query.is_empty() {
        return String::new();
    }

    let mut params: Vec<(&str, &str)> = query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|param| param.split_once('=').unwrap_or((param, "")))
        .collect();

    params.sort_unstable();

    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the canonical headers block from the request headers.
///
/// Only headers listed in `signed_headers` are included. Names are
/// lowercased, values trimmed with inner whitespace runs collapsed, and
/// repeated headers joined with commas. No trailing newline.
#[must_use]
pub fn build_canonical_headers(headers: &[(&str, &str)], signed_headers: &[&str]) -> String {
    let mut header_map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let trimmed_value = collapse_whitespace(value.trim());
        header_map
            .entry(name.to_lowercase())
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&trimmed_value);
            })
            .or_insert(trimmed_value);
    }

    let mut sorted_signed: Vec<&str> = signed_headers.to_vec();
    sorted_signed.sort_unstable();

    sorted_signed
        .iter()
        .filter_map(|name| header_map.get(*name).map(|value| format!("{name}:{value}")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the signed headers string: sorted, semicolon-separated names.
///
/// # Examples
///
/// ```
/// use bucketgate_auth::canonical::build_signed_headers_string;
///
/// assert_eq!(build_signed_headers_string(&["x-amz-date", "host"]), "host;x-amz-date");
/// ```
#[must_use]
pub fn build_signed_headers_string(signed_headers: &[&str]) -> String {
    let mut sorted: Vec<&str> = signed_headers.to_vec();
    sorted.sort_unstable();
    sorted.join(";")
}

/// Percent-encode a single value using the SigV4 rules.
#[must_use]
pub fn uri_encode(input: &str) -> String {
    utf8_percent_encode(input, URI_ENCODE_SET).to_string()
}

fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(ch);
            prev_was_space = false;
        }
    }
    result
}
