//! Route dispatch: runs a resolved [`Route`] against the gateway.
//!
//! [`RouteHandler`] is the boundary between the HTTP layer and the
//! orchestration logic. [`Gateway`] implements it; the service only ever
//! sees the trait.

use std::future::Future;
use std::pin::Pin;

use bucketgate_core::Gateway;
use bytes::Bytes;
use http::StatusCode;
use tracing::debug;

use crate::body::GatewayBody;
use crate::error::ApiResult;
use crate::request::{FolderRequest, content_type, deletion_criteria, parse_json, prefix, upload_payloads};
use crate::response::{
    BucketCreated, BucketEntry, BucketList, BulkReport, ObjectCreated, ObjectList, health_response,
    json_response, no_content, object_response,
};
use crate::router::{Route, RoutingContext};

/// Boxed response future returned by [`RouteHandler::handle_route`].
pub type RouteFuture<'a> =
    Pin<Box<dyn Future<Output = ApiResult<http::Response<GatewayBody>>> + Send + 'a>>;

/// Turns a routed request into a response.
pub trait RouteHandler: Send + Sync + 'static {
    /// Handle one routed request. `body` is fully collected.
    fn handle_route<'a>(
        &'a self,
        ctx: RoutingContext,
        parts: http::request::Parts,
        body: Bytes,
    ) -> RouteFuture<'a>;
}

impl RouteHandler for Gateway {
    fn handle_route<'a>(
        &'a self,
        ctx: RoutingContext,
        parts: http::request::Parts,
        body: Bytes,
    ) -> RouteFuture<'a> {
        Box::pin(dispatch_route(self, ctx, parts, body))
    }
}

/// Run `ctx.route` against `gateway`.
pub async fn dispatch_route(
    gateway: &Gateway,
    ctx: RoutingContext,
    parts: http::request::Parts,
    body: Bytes,
) -> ApiResult<http::Response<GatewayBody>> {
    debug!(route = ctx.route.name(), "dispatching request");

    let response = match &ctx.route {
        Route::Health => health_response(),
        Route::ListBuckets => {
            let buckets = gateway.list_buckets().await?;
            json_response(
                StatusCode::OK,
                &BucketList {
                    buckets: buckets.into_iter().map(BucketEntry::from).collect(),
                },
            )
        }
        Route::CreateBucket { bucket } => {
            gateway.create_bucket(bucket).await?;
            json_response(
                StatusCode::CREATED,
                &BucketCreated {
                    bucket: bucket.clone(),
                },
            )
        }
        Route::DeleteBucket { bucket } => {
            gateway.delete_bucket(bucket).await?;
            no_content()
        }
        Route::ListObjects { bucket } => {
            let prefix = prefix(&ctx);
            let objects = gateway.list_objects(bucket, prefix).await?;
            json_response(
                StatusCode::OK,
                &ObjectList {
                    bucket: bucket.clone(),
                    prefix: prefix.map(ToOwned::to_owned),
                    count: objects.len(),
                    objects,
                },
            )
        }
        Route::UploadObjects { bucket } => {
            let payloads = upload_payloads(&parts, &body)?;
            let outcome = gateway.upload_payloads(bucket, prefix(&ctx), payloads).await?;
            json_response(StatusCode::CREATED, &BulkReport::new(bucket.clone(), outcome))
        }
        Route::DeleteObjects { bucket } => {
            gateway
                .delete_objects(bucket, prefix(&ctx), &deletion_criteria(&ctx))
                .await?;
            no_content()
        }
        Route::UploadFolder { bucket } => {
            let request: FolderRequest = parse_json(&body)?;
            let outcome = gateway
                .upload_folder(bucket, &request.path, request.prefix.as_deref())
                .await?;
            json_response(StatusCode::CREATED, &BulkReport::new(bucket.clone(), outcome))
        }
        Route::DownloadFolder { bucket } => {
            let request: FolderRequest = parse_json(&body)?;
            let outcome = gateway
                .download_to_folder(bucket, request.prefix.as_deref(), &request.path)
                .await?;
            json_response(StatusCode::OK, &BulkReport::new(bucket.clone(), outcome))
        }
        Route::PutObject { bucket, key } => {
            gateway
                .put_object(bucket, key, body, content_type(&parts))
                .await?;
            json_response(
                StatusCode::CREATED,
                &ObjectCreated {
                    bucket: bucket.clone(),
                    key: key.clone(),
                },
            )
        }
        Route::GetObject { bucket, key } | Route::PresignedGet { bucket, key } => {
            object_response(gateway.get_object(bucket, key).await?)
        }
        Route::DeleteObject { bucket, key } => {
            gateway.delete_object(bucket, key).await?;
            no_content()
        }
    };

    Ok(response)
}
