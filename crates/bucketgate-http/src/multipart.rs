//! `multipart/form-data` parsing for bulk uploads.
//!
//! Every part that carries a `filename` becomes a [`FilePart`]; any other
//! named part is kept as a text field. The parser works on the already
//! collected body bytes.

use std::collections::HashMap;

use bytes::Bytes;

use crate::error::{ApiError, ApiResult};

/// One uploaded file.
#[derive(Debug, Clone)]
pub struct FilePart {
    /// Form field the file was sent under.
    pub field: String,
    /// Client-side file name, as sent.
    pub filename: String,
    /// The part's declared content type, if any.
    pub content_type: Option<String>,
    /// File contents.
    pub data: Bytes,
}

/// A parsed multipart submission.
#[derive(Debug, Default)]
pub struct MultipartForm {
    /// Non-file form fields (name to value).
    pub fields: HashMap<String, String>,
    /// File parts, in body order.
    pub files: Vec<FilePart>,
}

/// Extract the boundary from a `multipart/form-data; boundary=...` content type.
///
/// # Errors
///
/// `400` if the content type is not `multipart/form-data` or has no boundary.
pub fn extract_boundary(content_type: &str) -> ApiResult<String> {
    let mime: mime::Mime = content_type
        .parse()
        .map_err(|_| ApiError::bad_request(format!("invalid Content-Type: {content_type}")))?;

    if mime.type_() != mime::MULTIPART || mime.subtype() != mime::FORM_DATA {
        return Err(ApiError::bad_request(format!(
            "expected multipart/form-data, got: {content_type}"
        )));
    }

    match mime.get_param(mime::BOUNDARY) {
        Some(boundary) if !boundary.as_str().is_empty() => Ok(boundary.as_str().to_owned()),
        _ => Err(ApiError::bad_request("missing boundary in Content-Type")),
    }
}

/// Parse a `multipart/form-data` body.
///
/// A submission without any file part parses successfully; deciding whether
/// that is acceptable is up to the caller.
pub fn parse_multipart(body: &[u8], boundary: &str) -> MultipartForm {
    let delimiter = format!("--{boundary}");
    let end_delimiter = format!("--{boundary}--");

    let mut form = MultipartForm::default();

    for part_bytes in split_multipart_parts(body, delimiter.as_bytes(), end_delimiter.as_bytes()) {
        let Some((headers_section, part_body)) = split_headers_body(part_bytes) else {
            continue;
        };

        let disposition = parse_content_disposition(headers_section);
        let Some(field) = disposition.name else {
            continue;
        };

        match disposition.filename {
            Some(filename) => form.files.push(FilePart {
                field,
                filename,
                content_type: parse_part_content_type(headers_section),
                data: Bytes::copy_from_slice(part_body),
            }),
            None => {
                let value = String::from_utf8_lossy(part_body).into_owned();
                form.fields.insert(field, value);
            }
        }
    }

    form
}

/// Split the multipart body into individual parts by boundary.
fn split_multipart_parts<'a>(
    body: &'a [u8],
    delimiter: &[u8],
    end_delimiter: &[u8],
) -> Vec<&'a [u8]> {
    let mut parts = Vec::new();
    let mut remaining = body;

    // Skip the preamble.
    if let Some(pos) = find_bytes(remaining, delimiter) {
        remaining = skip_crlf(&remaining[pos + delimiter.len()..]);
    } else {
        return parts;
    }

    loop {
        if remaining.starts_with(end_delimiter)
            || remaining
                .strip_prefix(b"\r\n")
                .is_some_and(|r| r.starts_with(end_delimiter))
        {
            break;
        }

        if let Some(pos) = find_bytes(remaining, delimiter) {
            parts.push(strip_trailing_crlf(&remaining[..pos]));
            remaining = skip_crlf(&remaining[pos + delimiter.len()..]);
        } else {
            let part = strip_trailing_crlf(remaining);
            if !part.is_empty() {
                parts.push(part);
            }
            break;
        }
    }

    parts
}

/// Split a part into headers and body at the first blank line.
fn split_headers_body(part: &[u8]) -> Option<(&[u8], &[u8])> {
    let separator = b"\r\n\r\n";
    find_bytes(part, separator).map(|pos| (&part[..pos], &part[pos + separator.len()..]))
}

struct ContentDisposition {
    name: Option<String>,
    filename: Option<String>,
}

fn parse_content_disposition(headers: &[u8]) -> ContentDisposition {
    let headers_str = String::from_utf8_lossy(headers);
    let mut disposition = ContentDisposition {
        name: None,
        filename: None,
    };

    for line in headers_str.split("\r\n") {
        if !line
            .to_ascii_lowercase()
            .starts_with("content-disposition:")
        {
            continue;
        }
        for param in line.split(';').skip(1) {
            let Some((key, value)) = param.trim().split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').to_owned();
            match key.trim().to_ascii_lowercase().as_str() {
                "name" => disposition.name = Some(value),
                "filename" => disposition.filename = Some(value),
                _ => {}
            }
        }
    }

    disposition
}

fn parse_part_content_type(headers: &[u8]) -> Option<String> {
    let headers_str = String::from_utf8_lossy(headers);
    headers_str.split("\r\n").find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case("content-type")
            .then(|| value.trim().to_owned())
            .filter(|v| !v.is_empty())
    })
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn skip_crlf(data: &[u8]) -> &[u8] {
    data.strip_prefix(b"\r\n").unwrap_or(data)
}

fn strip_trailing_crlf(data: &[u8]) -> &[u8] {
    data.strip_suffix(b"\r\n").unwrap_or(data)
}
