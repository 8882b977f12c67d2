//! S3 backend for bucketgate.
//!
//! [`S3ObjectStore`] implements [`bucketgate_core::ObjectStore`] with
//! `aws-sdk-s3`, so the gateway can front AWS S3 or any S3-compatible
//! service (`MinIO`, `LocalStack`, ...) given an endpoint override.

pub mod client;
pub mod store;

pub use client::{ConnectedClient, connect};
pub use store::S3ObjectStore;
