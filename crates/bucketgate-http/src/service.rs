//! The gateway HTTP service implementing hyper's `Service` trait.
//!
//! [`GatewayHttpService`] ties routing, body collection, presigned URL
//! verification and dispatch together. It handles:
//!
//! 1. Health check interception (`GET /health`)
//! 2. CORS preflight requests (`OPTIONS`)
//! 3. Request routing via [`GatewayRouter`]
//! 4. Body collection, capped at the configured size
//! 5. Presigned URL verification for direct object access
//! 6. Dispatch to the [`RouteHandler`]
//! 7. Common response headers (`x-request-id`, `Server`, CORS)

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bucketgate_auth::{Credentials, StaticCredentialProvider, verify_presigned};
use bytes::Bytes;
use chrono::Utc;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::service::Service;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::body::GatewayBody;
use crate::dispatch::RouteHandler;
use crate::error::{ApiError, ApiResult};
use crate::response::{error_to_response, health_response};
use crate::router::{GatewayRouter, Route};

/// Default request body cap (512 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 512 * 1024 * 1024;

/// Configuration for the HTTP service.
#[derive(Clone)]
pub struct GatewayHttpConfig {
    /// Largest request body accepted; larger ones get `413`.
    pub max_body_bytes: usize,
    /// Value of the `Server` response header.
    pub server_name: String,
    /// Credentials presigned URLs are verified against. `None` disables the
    /// direct-access route.
    pub presign_credentials: Option<Credentials>,
}

impl std::fmt::Debug for GatewayHttpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayHttpConfig")
            .field("max_body_bytes", &self.max_body_bytes)
            .field("server_name", &self.server_name)
            .field(
                "presign_credentials",
                &self.presign_credentials.as_ref().map(|c| &c.access_key_id),
            )
            .finish()
    }
}

impl Default for GatewayHttpConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            server_name: "bucketgate".to_owned(),
            presign_credentials: None,
        }
    }
}

/// The gateway HTTP service.
///
/// # Type Parameters
///
/// - `H`: The handler implementing [`RouteHandler`], normally
///   [`bucketgate_core::Gateway`].
#[derive(Debug)]
pub struct GatewayHttpService<H: RouteHandler> {
    handler: Arc<H>,
    router: GatewayRouter,
    config: Arc<GatewayHttpConfig>,
}

impl<H: RouteHandler> GatewayHttpService<H> {
    /// Create a service owning `handler`.
    #[must_use]
    pub fn new(handler: H, config: GatewayHttpConfig) -> Self {
        Self::from_shared(Arc::new(handler), config)
    }

    /// Create a service from a shared handler.
    #[must_use]
    pub fn from_shared(handler: Arc<H>, config: GatewayHttpConfig) -> Self {
        Self {
            handler,
            router: GatewayRouter,
            config: Arc::new(config),
        }
    }

    /// Process one request of any body type.
    pub async fn handle<B>(&self, req: http::Request<B>) -> http::Response<GatewayBody>
    where
        B: http_body::Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let request_id = Uuid::new_v4().to_string();
        let response = process_request(
            req,
            self.handler.as_ref(),
            self.router,
            &self.config,
            &request_id,
        )
        .await;
        add_common_headers(response, &request_id, &self.config.server_name)
    }
}

impl<H: RouteHandler> Clone for GatewayHttpService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            router: self.router,
            config: Arc::clone(&self.config),
        }
    }
}

impl<H: RouteHandler> Service<http::Request<Incoming>> for GatewayHttpService<H> {
    type Response = http::Response<GatewayBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}

async fn process_request<B, H>(
    req: http::Request<B>,
    handler: &H,
    router: GatewayRouter,
    config: &GatewayHttpConfig,
    request_id: &str,
) -> http::Response<GatewayBody>
where
    B: http_body::Body<Data = Bytes> + Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    H: RouteHandler,
{
    let method = req.method().clone();
    let uri = req.uri().clone();
    debug!(%method, %uri, request_id, "processing request");

    if method == http::Method::GET && uri.path() == "/health" {
        return health_response();
    }

    if method == http::Method::OPTIONS {
        return cors_preflight_response();
    }

    let ctx = match router.resolve(&req) {
        Ok(ctx) => ctx,
        Err(err) => {
            warn!(%method, %uri, error = %err, request_id, "failed to route request");
            return error_to_response(&err, request_id);
        }
    };

    info!(route = ctx.route.name(), %method, %uri, request_id, "routed request");

    let (parts, body) = req.into_parts();
    let body = match collect_body(&parts, body, config.max_body_bytes).await {
        Ok(body) => body,
        Err(err) => {
            warn!(error = %err, request_id, "rejected request body");
            return error_to_response(&err, request_id);
        }
    };

    if matches!(ctx.route, Route::PresignedGet { .. }) {
        if let Err(err) = authorize_presigned(&parts, config) {
            warn!(error = %err, request_id, "presigned access denied");
            return error_to_response(&err, request_id);
        }
    }

    match handler.handle_route(ctx, parts, body).await {
        Ok(response) => response,
        Err(err) => {
            debug!(error = %err, request_id, "request failed");
            error_to_response(&err, request_id)
        }
    }
}

/// Collect the body, refusing anything over `limit` bytes.
async fn collect_body<B>(parts: &http::request::Parts, body: B, limit: usize) -> ApiResult<Bytes>
where
    B: http_body::Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let declared = parts
        .headers
        .get(http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|len| len > u64::try_from(limit).unwrap_or(u64::MAX)) {
        return Err(ApiError::payload_too_large(limit));
    }

    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            Err(ApiError::payload_too_large(limit))
        }
        Err(err) => Err(ApiError::internal(format!("failed to read request body: {err}"))),
    }
}

/// Verify a presigned direct-access request against the configured credentials.
fn authorize_presigned(parts: &http::request::Parts, config: &GatewayHttpConfig) -> ApiResult<()> {
    let credentials = config
        .presign_credentials
        .as_ref()
        .ok_or_else(|| ApiError::access_denied("presigned access is not served by this gateway"))?;
    let provider = StaticCredentialProvider::from(credentials);
    verify_presigned(parts, &provider, Utc::now())?;
    Ok(())
}

fn cors_preflight_response() -> http::Response<GatewayBody> {
    http::Response::builder()
        .status(http::StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Methods", "GET, PUT, POST, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "*, Content-Type")
        .header("Access-Control-Max-Age", "86400")
        .body(GatewayBody::empty())
        .expect("static CORS response should be valid")
}

fn add_common_headers(
    mut response: http::Response<GatewayBody>,
    request_id: &str,
    server_name: &str,
) -> http::Response<GatewayBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        headers.insert("x-request-id", hv);
    }
    if let Ok(hv) = http::HeaderValue::from_str(server_name) {
        headers.insert(http::header::SERVER, hv);
    }
    headers.insert(
        http::header::ACCESS_CONTROL_ALLOW_ORIGIN,
        http::HeaderValue::from_static("*"),
    );
    headers.insert(
        http::header::ACCESS_CONTROL_EXPOSE_HEADERS,
        http::HeaderValue::from_static("x-request-id, Content-Length"),
    );

    response
}
