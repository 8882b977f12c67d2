//! Integration tests for the bucketgate server.
//!
//! Each test spawns its own gateway over the in-memory store on an ephemeral
//! port and talks to it with a real HTTP client, so no external server is
//! needed:
//!
//! ```text
//! cargo test -p bucketgate-integration
//! ```

use std::net::SocketAddr;
use std::sync::{Arc, Once};
use std::time::Duration;

use bucketgate_auth::{Credentials, UrlSigner};
use bucketgate_core::{Gateway, MemoryObjectStore};
use bucketgate_http::service::{GatewayHttpConfig, GatewayHttpService};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// A gateway listening on a local ephemeral port.
#[derive(Debug, Clone)]
pub struct TestServer {
    /// Bound address.
    pub addr: SocketAddr,
    /// HTTP client for talking to it.
    pub client: reqwest::Client,
}

impl TestServer {
    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Create `bucket`, panicking on failure.
    pub async fn create_bucket(&self, bucket: &str) {
        let resp = self
            .client
            .put(self.url(&format!("/buckets/{bucket}")))
            .send()
            .await
            .unwrap_or_else(|e| panic!("failed to create bucket {bucket}: {e}"));
        assert_eq!(resp.status(), 201, "create bucket {bucket}");
    }

    /// Store `body` under `key`, panicking on failure.
    pub async fn put_object(&self, bucket: &str, key: &str, body: &'static [u8]) {
        let resp = self
            .client
            .put(self.url(&format!("/buckets/{bucket}/objects/{key}")))
            .body(body)
            .send()
            .await
            .unwrap_or_else(|e| panic!("failed to put {bucket}/{key}: {e}"));
        assert_eq!(resp.status(), 201, "put {bucket}/{key}");
    }

    /// Keys currently listed under `bucket`.
    pub async fn list_keys(&self, bucket: &str) -> Vec<String> {
        let json: serde_json::Value = self
            .client
            .get(self.url(&format!("/buckets/{bucket}/objects")))
            .send()
            .await
            .expect("list objects")
            .json()
            .await
            .expect("list objects JSON");
        json["objects"]
            .as_array()
            .expect("objects array")
            .iter()
            .filter_map(|o| o["key"].as_str().map(ToOwned::to_owned))
            .collect()
    }
}

/// Spawn a gateway with default limits.
pub async fn spawn_server() -> TestServer {
    spawn_server_with(GatewayHttpConfig::default()).await
}

/// Spawn a gateway with the given HTTP config. Presign credentials are
/// always set so the direct-access route works.
pub async fn spawn_server_with(mut http_config: GatewayHttpConfig) -> TestServer {
    init_tracing();

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");

    let credentials = Credentials::new("integration", "integration-secret");
    let store = MemoryObjectStore::with_signer(
        format!("http://{addr}"),
        UrlSigner::new(credentials.clone(), "us-east-1"),
    )
    .with_page_size(2);
    let gateway = Gateway::new(Arc::new(store), 4, Duration::from_secs(60));

    http_config.presign_credentials = Some(credentials);
    let service = GatewayHttpService::new(gateway, http_config);

    tokio::spawn(async move {
        let http = HttpConnBuilder::new(TokioExecutor::new());
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                continue;
            };
            let conn = http
                .serve_connection(TokioIo::new(stream), service.clone())
                .into_owned();
            tokio::spawn(async move {
                if let Err(e) = conn.await {
                    tracing::debug!(error = %e, "test connection error");
                }
            });
        }
    });

    TestServer {
        addr,
        client: reqwest::Client::new(),
    }
}

/// Generate a unique bucket name for a test.
#[must_use]
pub fn test_bucket_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

mod test_bucket;
mod test_deletion;
mod test_error;
mod test_folder;
mod test_object;
