//! Object store orchestration for bucketgate.
//!
//! This crate holds everything between the HTTP surface and a concrete
//! object store: the [`ObjectStore`] capability, an in-memory backend, and
//! the bulk operations built on top of it.
//!
//! # Architecture
//!
//! ```text
//! Gateway (caller-facing facade)
//!    |-- TransferOrchestrator -- WorkerPool (bounded, no fail-fast)
//!    |-- list_all_keys (cursor-driven pagination)
//!    |-- delete_selected (all / extension, one batch call)
//!    |-- PresignIssuer (fresh URL per key per call)
//!        |
//!        v
//! Arc<dyn ObjectStore> (memory here, S3 in bucketgate-s3)
//! ```

pub mod config;
pub mod deletion;
pub mod error;
pub mod gateway;
pub mod listing;
pub mod memory;
pub mod pool;
pub mod presign;
pub mod store;
pub mod transfer;
pub mod types;
pub mod validation;

pub use config::{GatewayConfig, StoreBackend};
pub use deletion::DeletionCriteria;
pub use error::{GatewayError, GatewayResult, StoreError, StoreResult};
pub use gateway::Gateway;
pub use memory::MemoryObjectStore;
pub use store::ObjectStore;
pub use types::{BulkOutcome, ItemOutcome, ItemStatus, ListedObject, Payload};
