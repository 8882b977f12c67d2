//! Bucketgate server: an HTTP gateway for bulk object storage transfers.
//!
//! Fronts either the in-memory store or a remote S3-compatible store with the
//! JSON API from `bucketgate-http`, and exposes a health endpoint for
//! orchestration systems.
//!
//! # Usage
//!
//! ```text
//! GATEWAY_LISTEN=0.0.0.0:8080 STORE_BACKEND=memory bucketgate-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:8080` | Bind address |
//! | `STORE_BACKEND` | `memory` | `memory` or `s3` |
//! | `S3_ENDPOINT_URL` | *(unset)* | S3-compatible endpoint (path-style) |
//! | `AWS_REGION` | `us-east-1` | Region used for signing |
//! | `PUBLIC_ENDPOINT` | `http://localhost:8080` | Base of in-memory presigned URLs |
//! | `PRESIGN_EXPIRY_SECS` | `60` | Presigned URL lifetime |
//! | `TRANSFER_CONCURRENCY` | `16` | Parallel item transfers |
//! | `MAX_REQUEST_BODY_BYTES` | `536870912` | Request body cap |
//! | `FOLDER_ROOT` | *(unset)* | Directory folder transfers are confined to; unset allows any server path |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use bucketgate_auth::{Credentials, UrlSigner};
use bucketgate_core::memory::{DEFAULT_ACCESS_KEY_ID, DEFAULT_SECRET_ACCESS_KEY};
use bucketgate_core::{Gateway, GatewayConfig, MemoryObjectStore, ObjectStore, StoreBackend};
use bucketgate_http::service::{GatewayHttpConfig, GatewayHttpService};
use bucketgate_s3::S3ObjectStore;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Server version logged at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Credentials in-memory presigned URLs are signed and verified with.
fn memory_credentials(config: &GatewayConfig) -> Credentials {
    config
        .credentials()
        .unwrap_or_else(|| Credentials::new(DEFAULT_ACCESS_KEY_ID, DEFAULT_SECRET_ACCESS_KEY))
}

/// Build the configured object store and the credentials the direct-access
/// route verifies presigned URLs against.
///
/// Only the in-memory store serves its own presigned URLs; S3 URLs point at
/// the remote store, so the direct-access route stays disabled for it.
async fn build_store(config: &GatewayConfig) -> (Arc<dyn ObjectStore>, Option<Credentials>) {
    match config.store_backend {
        StoreBackend::Memory => {
            let credentials = memory_credentials(config);
            let signer = UrlSigner::new(credentials.clone(), config.region.clone());
            let store = MemoryObjectStore::with_signer(config.public_endpoint.clone(), signer)
                .with_page_size(config.list_page_size);
            (Arc::new(store), Some(credentials))
        }
        StoreBackend::S3 => {
            let store = S3ObjectStore::connect(config).await;
            (Arc::new(store), None)
        }
    }
}

/// Build the [`GatewayHttpConfig`] from the application [`GatewayConfig`].
fn build_http_config(
    config: &GatewayConfig,
    presign_credentials: Option<Credentials>,
) -> GatewayHttpConfig {
    GatewayHttpConfig {
        max_body_bytes: config.max_request_body_bytes,
        presign_credentials,
        ..GatewayHttpConfig::default()
    }
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve(listener: TcpListener, service: GatewayHttpService<Gateway>) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Probe `GET /health` on the local gateway.
///
/// Exits with code 0 if healthy, 1 otherwise.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request = format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.contains("200 OK") && response.contains("\"status\":\"running\"") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --health-check flag for Docker HEALTHCHECK.
    if std::env::args().any(|a| a == "--health-check") {
        let config = GatewayConfig::from_env();
        let addr = config.gateway_listen.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    let config = GatewayConfig::from_env();

    init_tracing(&config.log_level)?;

    info!(
        gateway_listen = %config.gateway_listen,
        store_backend = %config.store_backend,
        region = %config.region,
        public_endpoint = %config.public_endpoint,
        transfer_concurrency = config.transfer_concurrency,
        folder_root = ?config.folder_root,
        version = VERSION,
        "starting bucketgate server",
    );

    if config.folder_root.is_none() {
        warn!("FOLDER_ROOT is unset, folder transfers may read or write any server path");
    }

    let (store, presign_credentials) = build_store(&config).await;
    let gateway = Gateway::from_config(store, &config);
    let service = GatewayHttpService::new(gateway, build_http_config(&config, presign_credentials));

    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service).await
}
