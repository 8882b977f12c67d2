//! Typed views over request parts, query parameters and JSON bodies.

use std::path::PathBuf;

use bucketgate_core::DeletionCriteria;
use bucketgate_core::types::Payload;
use bytes::Bytes;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::multipart::{extract_boundary, parse_multipart};
use crate::router::RoutingContext;

/// Body of the folder upload and download routes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderRequest {
    /// Server-local directory, read or written with the gateway's own
    /// filesystem permissions. Relative paths resolve against the gateway's
    /// folder root; without one configured any reachable path is accepted.
    pub path: PathBuf,
    /// Key prefix to upload under or download from.
    #[serde(default)]
    pub prefix: Option<String>,
}

/// Parse a JSON request body.
///
/// # Errors
///
/// `400` when the body is not valid JSON for `T`.
pub fn parse_json<T: serde::de::DeserializeOwned>(body: &[u8]) -> ApiResult<T> {
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("invalid JSON body: {e}")))
}

/// The `prefix` query parameter, absent when empty.
#[must_use]
pub fn prefix(ctx: &RoutingContext) -> Option<&str> {
    ctx.query_value("prefix").filter(|p| !p.is_empty())
}

/// Interpret a boolean query flag. A bare `?all` counts as set.
#[must_use]
pub fn flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| {
        matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "" | "1" | "true" | "yes" | "on"
        )
    })
}

/// Deletion criteria from the `all` and `extension` query parameters.
#[must_use]
pub fn deletion_criteria(ctx: &RoutingContext) -> DeletionCriteria {
    DeletionCriteria::new(
        flag(ctx.query_value("all")),
        ctx.query_value("extension").map(ToOwned::to_owned),
    )
}

/// The request's `Content-Type` header, if readable.
#[must_use]
pub fn content_type(parts: &http::request::Parts) -> Option<&str> {
    parts
        .headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Payloads from a multipart upload body: one per file part, in body order.
///
/// Form fields are ignored. A submission without file parts yields an empty
/// list; the transfer orchestrator rejects that.
///
/// # Errors
///
/// `400` when the request is not `multipart/form-data`.
pub fn upload_payloads(parts: &http::request::Parts, body: &Bytes) -> ApiResult<Vec<Payload>> {
    let content_type = content_type(parts)
        .ok_or_else(|| ApiError::bad_request("missing Content-Type, expected multipart/form-data"))?;
    let boundary = extract_boundary(content_type)?;

    Ok(parse_multipart(body, &boundary)
        .files
        .into_iter()
        .map(|file| Payload::from_bytes(file.filename, file.data, file.content_type))
        .collect())
}
