//! JSON-over-HTTP surface for bucketgate.
//!
//! This crate provides the HTTP layer in front of [`bucketgate_core::Gateway`]:
//!
//! - **Routing** ([`router`]): maps method and path to a [`Route`].
//! - **Requests** ([`request`], [`multipart`]): query flags, JSON bodies and
//!   multipart uploads turned into core types.
//! - **Responses** ([`response`], [`error`]): JSON documents and the error
//!   mapping from domain failures to status codes.
//! - **Dispatch** ([`dispatch`]): runs a route through the
//!   [`RouteHandler`](dispatch::RouteHandler) trait.
//! - **Service** ([`service`]): the hyper `Service` tying it all together.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request
//!   -> GatewayHttpService (hyper Service)
//!     -> Health check / CORS interception
//!     -> GatewayRouter (route identification)
//!     -> Body collection (size capped)
//!     -> Presigned URL verification (direct access only)
//!     -> RouteHandler (Gateway)
//!     -> Common response headers (x-request-id, Server, CORS)
//!   <- HTTP Response
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use bucketgate_core::{Gateway, GatewayConfig, MemoryObjectStore};
//! use bucketgate_http::service::{GatewayHttpConfig, GatewayHttpService};
//!
//! let config = GatewayConfig::default();
//! let store = Arc::new(MemoryObjectStore::new(config.public_endpoint.clone()));
//! let gateway = Gateway::from_config(store, &config);
//! let service = GatewayHttpService::new(gateway, GatewayHttpConfig::default());
//! // Use `service` with a hyper server.
//! ```

pub mod body;
pub mod dispatch;
pub mod error;
pub mod multipart;
pub mod request;
pub mod response;
pub mod router;
pub mod service;

pub use body::GatewayBody;
pub use dispatch::RouteHandler;
pub use error::{ApiError, ApiResult};
pub use router::{GatewayRouter, Route, RoutingContext};
pub use service::{GatewayHttpConfig, GatewayHttpService};
