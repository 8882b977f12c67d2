//! Request routing: maps method and path to a gateway [`Route`].
//!
//! The JSON surface lives under `/buckets`. Anything else is either the
//! health probe or, when the query string carries SigV4 presigned
//! parameters, direct path-style access to an object (`/{bucket}/{key}`).
//!
//! Object keys are everything after `/objects/`, percent-decoded, so they
//! may contain `/`.

use http::Method;
use percent_encoding::percent_decode_str;

use crate::error::{ApiError, ApiResult};

/// The operation a request resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `GET /health`
    Health,
    /// `GET /buckets`
    ListBuckets,
    /// `PUT /buckets/{bucket}`
    CreateBucket {
        /// Target bucket.
        bucket: String,
    },
    /// `DELETE /buckets/{bucket}`
    DeleteBucket {
        /// Target bucket.
        bucket: String,
    },
    /// `GET /buckets/{bucket}/objects`
    ListObjects {
        /// Target bucket.
        bucket: String,
    },
    /// `POST /buckets/{bucket}/objects`
    UploadObjects {
        /// Target bucket.
        bucket: String,
    },
    /// `DELETE /buckets/{bucket}/objects`
    DeleteObjects {
        /// Target bucket.
        bucket: String,
    },
    /// `POST /buckets/{bucket}/folder-uploads`
    UploadFolder {
        /// Target bucket.
        bucket: String,
    },
    /// `POST /buckets/{bucket}/folder-downloads`
    DownloadFolder {
        /// Target bucket.
        bucket: String,
    },
    /// `PUT /buckets/{bucket}/objects/{key}`
    PutObject {
        /// Target bucket.
        bucket: String,
        /// Object key.
        key: String,
    },
    /// `GET /buckets/{bucket}/objects/{key}`
    GetObject {
        /// Target bucket.
        bucket: String,
        /// Object key.
        key: String,
    },
    /// `DELETE /buckets/{bucket}/objects/{key}`
    DeleteObject {
        /// Target bucket.
        bucket: String,
        /// Object key.
        key: String,
    },
    /// `GET /{bucket}/{key}?X-Amz-Signature=...`
    PresignedGet {
        /// Target bucket.
        bucket: String,
        /// Object key.
        key: String,
    },
}

impl Route {
    /// Short operation name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Health => "Health",
            Self::ListBuckets => "ListBuckets",
            Self::CreateBucket { .. } => "CreateBucket",
            Self::DeleteBucket { .. } => "DeleteBucket",
            Self::ListObjects { .. } => "ListObjects",
            Self::UploadObjects { .. } => "UploadObjects",
            Self::DeleteObjects { .. } => "DeleteObjects",
            Self::UploadFolder { .. } => "UploadFolder",
            Self::DownloadFolder { .. } => "DownloadFolder",
            Self::PutObject { .. } => "PutObject",
            Self::GetObject { .. } => "GetObject",
            Self::DeleteObject { .. } => "DeleteObject",
            Self::PresignedGet { .. } => "PresignedGet",
        }
    }
}

/// A resolved route plus the decoded query string.
#[derive(Debug, Clone)]
pub struct RoutingContext {
    /// The identified operation.
    pub route: Route,
    /// Decoded query parameters, in request order.
    pub query_params: Vec<(String, String)>,
}

impl RoutingContext {
    /// The first value of query parameter `name`.
    #[must_use]
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Stateless router for the gateway's paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct GatewayRouter;

impl GatewayRouter {
    /// Resolve a request to a routing context.
    ///
    /// # Errors
    ///
    /// `404 NoSuchRoute` when no route has this path shape, and
    /// `405 MethodNotAllowed` when the shape exists but not for this method.
    pub fn resolve<B>(&self, req: &http::Request<B>) -> ApiResult<RoutingContext> {
        let method = req.method();
        let uri = req.uri();
        let query = uri.query().unwrap_or("");
        let route = identify_route(method, uri.path(), query)?;

        Ok(RoutingContext {
            route,
            query_params: parse_query_params(query),
        })
    }
}

fn identify_route(method: &Method, path: &str, query: &str) -> ApiResult<Route> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);

    // `/buckets/...` always belongs to the JSON API, whatever the query.
    if *method == Method::GET && bucketgate_auth::is_presigned_query(query) {
        if let Some((bucket, key)) = trimmed.split_once('/') {
            if !bucket.is_empty() && bucket != "buckets" && !key.is_empty() {
                return Ok(Route::PresignedGet {
                    bucket: decode_uri_component(bucket),
                    key: decode_uri_component(key),
                });
            }
        }
    }

    if trimmed == "health" {
        return allow(method, path, &[Method::GET], || Route::Health);
    }

    let rest = match trimmed.strip_prefix("buckets") {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return Err(ApiError::no_such_route(method, path)),
    };
    let rest = rest.trim_start_matches('/');
    if rest.is_empty() {
        return allow(method, path, &[Method::GET], || Route::ListBuckets);
    }

    let (bucket_raw, tail) = rest.split_once('/').unwrap_or((rest, ""));
    let bucket = decode_uri_component(bucket_raw);

    match tail {
        "" => match *method {
            Method::PUT => Ok(Route::CreateBucket { bucket }),
            Method::DELETE => Ok(Route::DeleteBucket { bucket }),
            _ => Err(ApiError::method_not_allowed(method, path)),
        },
        "objects" | "objects/" => match *method {
            Method::GET => Ok(Route::ListObjects { bucket }),
            Method::POST => Ok(Route::UploadObjects { bucket }),
            Method::DELETE => Ok(Route::DeleteObjects { bucket }),
            _ => Err(ApiError::method_not_allowed(method, path)),
        },
        "folder-uploads" => allow(method, path, &[Method::POST], || Route::UploadFolder {
            bucket,
        }),
        "folder-downloads" => allow(method, path, &[Method::POST], || Route::DownloadFolder {
            bucket,
        }),
        _ => {
            let Some(key_raw) = tail.strip_prefix("objects/") else {
                return Err(ApiError::no_such_route(method, path));
            };
            let key = decode_uri_component(key_raw);
            match *method {
                Method::GET => Ok(Route::GetObject { bucket, key }),
                Method::PUT => Ok(Route::PutObject { bucket, key }),
                Method::DELETE => Ok(Route::DeleteObject { bucket, key }),
                _ => Err(ApiError::method_not_allowed(method, path)),
            }
        }
    }
}

fn allow(
    method: &Method,
    path: &str,
    allowed: &[Method],
    route: impl FnOnce() -> Route,
) -> ApiResult<Route> {
    if allowed.contains(method) {
        Ok(route())
    } else {
        Err(ApiError::method_not_allowed(method, path))
    }
}

/// Decode a percent-encoded path component.
fn decode_uri_component(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Parse a query string into key-value pairs, `+` decoding to a space.
fn parse_query_params(query: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}
