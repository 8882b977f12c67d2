//! Gateway configuration.
//!
//! Provides [`GatewayConfig`], loaded from environment variables by
//! [`GatewayConfig::from_env`]. Every field has a default, so an empty
//! environment yields a working in-memory gateway on port 8080.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use bucketgate_auth::Credentials;
use bucketgate_auth::presigned::MAX_EXPIRES_SECS;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Which object store the gateway fronts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local store, lost on restart.
    #[default]
    Memory,
    /// A remote S3 or S3-compatible store.
    S3,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "s3" => Ok(Self::S3),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::S3 => f.write_str("s3"),
        }
    }
}

/// Gateway configuration.
///
/// # Examples
///
/// ```
/// use bucketgate_core::config::{GatewayConfig, StoreBackend};
///
/// let config = GatewayConfig::default();
/// assert_eq!(config.gateway_listen, "0.0.0.0:8080");
/// assert_eq!(config.store_backend, StoreBackend::Memory);
/// assert_eq!(config.presign_expiry().as_secs(), 60);
/// ```
#[derive(Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Bind address for the HTTP surface.
    #[builder(default = String::from("0.0.0.0:8080"))]
    pub gateway_listen: String,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// Backing store.
    #[builder(default)]
    pub store_backend: StoreBackend,

    /// Custom S3 endpoint. Switches the S3 backend to path-style addressing.
    #[builder(default)]
    pub endpoint_url: Option<String>,

    /// Region used for signing and by the S3 client.
    #[builder(default = String::from("us-east-1"))]
    pub region: String,

    /// Explicit access key ID.
    #[builder(default)]
    pub access_key_id: Option<String>,

    /// Explicit secret access key.
    #[builder(default)]
    #[serde(skip_serializing)]
    pub secret_access_key: Option<String>,

    /// Session token for temporary credentials.
    #[builder(default)]
    #[serde(skip_serializing)]
    pub session_token: Option<String>,

    /// Base URL the in-memory backend embeds in presigned URLs.
    #[builder(default = String::from("http://localhost:8080"))]
    pub public_endpoint: String,

    /// Presigned URL validity window in seconds.
    #[builder(default = 60)]
    pub presign_expiry_secs: u64,

    /// Worker-pool size for bulk transfers.
    #[builder(default = 16)]
    pub transfer_concurrency: usize,

    /// Page size of the in-memory backend's listing.
    #[builder(default = 1000)]
    pub list_page_size: usize,

    /// Largest request body the HTTP surface accepts.
    #[builder(default = 536_870_912)]
    pub max_request_body_bytes: usize,

    /// Directory folder uploads and downloads are confined to. Unset means
    /// any server-local path the process can reach.
    #[builder(default)]
    pub folder_root: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("gateway_listen", &self.gateway_listen)
            .field("log_level", &self.log_level)
            .field("store_backend", &self.store_backend)
            .field("endpoint_url", &self.endpoint_url)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("public_endpoint", &self.public_endpoint)
            .field("presign_expiry_secs", &self.presign_expiry_secs)
            .field("transfer_concurrency", &self.transfer_concurrency)
            .field("list_page_size", &self.list_page_size)
            .field("max_request_body_bytes", &self.max_request_body_bytes)
            .field("folder_root", &self.folder_root)
            .finish_non_exhaustive()
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GATEWAY_LISTEN` | `0.0.0.0:8080` |
    /// | `LOG_LEVEL` | `info` |
    /// | `STORE_BACKEND` | `memory` |
    /// | `S3_ENDPOINT_URL` / `AWS_ENDPOINT_URL` | unset |
    /// | `AWS_REGION` / `DEFAULT_REGION` | `us-east-1` |
    /// | `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` / `AWS_SESSION_TOKEN` | unset |
    /// | `PUBLIC_ENDPOINT` | `http://localhost:8080` |
    /// | `PRESIGN_EXPIRY_SECS` | `60` |
    /// | `TRANSFER_CONCURRENCY` | `16` |
    /// | `LIST_PAGE_SIZE` | `1000` |
    /// | `MAX_REQUEST_BODY_BYTES` | `536870912` |
    /// | `FOLDER_ROOT` | unset |
    ///
    /// Numeric values that fail to parse, or parse to zero, keep the default.
    /// So does a `PRESIGN_EXPIRY_SECS` above seven days.
    /// An unknown `STORE_BACKEND` also keeps the default.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Some(v) = non_empty("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(backend) = non_empty("STORE_BACKEND").and_then(|v| v.parse().ok()) {
            config.store_backend = backend;
        }
        config.endpoint_url = non_empty("S3_ENDPOINT_URL").or_else(|| non_empty("AWS_ENDPOINT_URL"));
        if let Some(v) = non_empty("AWS_REGION").or_else(|| non_empty("DEFAULT_REGION")) {
            config.region = v;
        }
        config.access_key_id = non_empty("AWS_ACCESS_KEY_ID");
        config.secret_access_key = non_empty("AWS_SECRET_ACCESS_KEY");
        config.session_token = non_empty("AWS_SESSION_TOKEN");
        if let Some(v) = non_empty("PUBLIC_ENDPOINT") {
            config.public_endpoint = v.trim_end_matches('/').to_owned();
        }
        if let Some(n) = non_empty("PRESIGN_EXPIRY_SECS")
            .and_then(|v| parse_positive::<u64>(&v))
            .filter(|n| *n <= MAX_EXPIRES_SECS)
        {
            config.presign_expiry_secs = n;
        }
        if let Some(n) = non_empty("TRANSFER_CONCURRENCY").and_then(|v| parse_positive(&v)) {
            config.transfer_concurrency = n;
        }
        if let Some(n) = non_empty("LIST_PAGE_SIZE").and_then(|v| parse_positive(&v)) {
            config.list_page_size = n;
        }
        if let Some(n) = non_empty("MAX_REQUEST_BODY_BYTES").and_then(|v| parse_positive(&v)) {
            config.max_request_body_bytes = n;
        }
        config.folder_root = non_empty("FOLDER_ROOT");

        config
    }

    /// Presigned URL validity window, clamped to what SigV4 accepts
    /// (one second to seven days).
    #[must_use]
    pub fn presign_expiry(&self) -> Duration {
        Duration::from_secs(self.presign_expiry_secs.clamp(1, MAX_EXPIRES_SECS))
    }

    /// Explicit credentials, when both halves of the key pair are set.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        let access_key_id = self.access_key_id.as_ref()?;
        let secret_access_key = self.secret_access_key.as_ref()?;
        let creds = Credentials::new(access_key_id, secret_access_key);
        Some(match &self.session_token {
            Some(token) => creds.with_session_token(token),
            None => creds,
        })
    }
}

/// Parse a strictly positive integer.
fn parse_positive<T>(value: &str) -> Option<T>
where
    T: FromStr + PartialEq + Default,
{
    value.trim().parse::<T>().ok().filter(|n| *n != T::default())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::store::ObjectStore;

    fn from_pairs(pairs: &[(&str, &str)]) -> GatewayConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        GatewayConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_should_create_default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.gateway_listen, "0.0.0.0:8080");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert!(config.endpoint_url.is_none());
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.public_endpoint, "http://localhost:8080");
        assert_eq!(config.presign_expiry_secs, 60);
        assert_eq!(config.transfer_concurrency, 16);
        assert_eq!(config.list_page_size, 1000);
        assert_eq!(config.max_request_body_bytes, 536_870_912);
        assert!(config.folder_root.is_none());
    }

    #[test]
    fn test_should_load_from_env() {
        let config = GatewayConfig::from_env();
        assert!(!config.gateway_listen.is_empty());
    }

    #[test]
    fn test_should_read_every_variable() {
        let config = from_pairs(&[
            ("GATEWAY_LISTEN", "127.0.0.1:9000"),
            ("LOG_LEVEL", "debug"),
            ("STORE_BACKEND", "S3"),
            ("AWS_ENDPOINT_URL", "http://minio:9000"),
            ("DEFAULT_REGION", "eu-west-1"),
            ("AWS_ACCESS_KEY_ID", "AKID"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("PUBLIC_ENDPOINT", "https://files.example.com/"),
            ("PRESIGN_EXPIRY_SECS", "300"),
            ("TRANSFER_CONCURRENCY", "4"),
            ("LIST_PAGE_SIZE", "50"),
            ("MAX_REQUEST_BODY_BYTES", "1024"),
            ("FOLDER_ROOT", "/srv/transfers"),
        ]);

        assert_eq!(config.gateway_listen, "127.0.0.1:9000");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.store_backend, StoreBackend::S3);
        assert_eq!(config.endpoint_url.as_deref(), Some("http://minio:9000"));
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.public_endpoint, "https://files.example.com");
        assert_eq!(config.presign_expiry(), Duration::from_secs(300));
        assert_eq!(config.transfer_concurrency, 4);
        assert_eq!(config.list_page_size, 50);
        assert_eq!(config.folder_root.as_deref(), Some("/srv/transfers"));
        assert_eq!(config.max_request_body_bytes, 1024);
        assert_eq!(config.credentials(), Some(Credentials::new("AKID", "secret")));
    }

    #[test]
    fn test_should_prefer_specific_variables() {
        let config = from_pairs(&[
            ("S3_ENDPOINT_URL", "http://first:9000"),
            ("AWS_ENDPOINT_URL", "http://second:9000"),
            ("AWS_REGION", "ap-south-1"),
            ("DEFAULT_REGION", "eu-west-1"),
        ]);
        assert_eq!(config.endpoint_url.as_deref(), Some("http://first:9000"));
        assert_eq!(config.region, "ap-south-1");
    }

    #[test]
    fn test_should_fall_back_on_invalid_or_zero_numbers() {
        let config = from_pairs(&[
            ("PRESIGN_EXPIRY_SECS", "0"),
            ("TRANSFER_CONCURRENCY", "many"),
            ("LIST_PAGE_SIZE", "-3"),
            ("STORE_BACKEND", "tape"),
        ]);
        assert_eq!(config.presign_expiry_secs, 60);
        assert_eq!(config.transfer_concurrency, 16);
        assert_eq!(config.list_page_size, 1000);
        assert_eq!(config.store_backend, StoreBackend::Memory);
    }

    #[test]
    fn test_should_keep_presign_expiry_within_signing_limit() {
        let config = from_pairs(&[("PRESIGN_EXPIRY_SECS", "604801")]);
        assert_eq!(config.presign_expiry_secs, 60);

        let config = from_pairs(&[("PRESIGN_EXPIRY_SECS", "604800")]);
        assert_eq!(config.presign_expiry_secs, 604_800);

        let config = GatewayConfig::builder()
            .presign_expiry_secs(u64::MAX)
            .build();
        assert_eq!(config.presign_expiry(), Duration::from_secs(MAX_EXPIRES_SECS));

        let issued = crate::MemoryObjectStore::new("http://localhost:8080")
            .presign_get("photos", "a.txt", config.presign_expiry());
        assert!(issued.is_ok());
    }

    #[test]
    fn test_should_require_both_key_halves() {
        let config = from_pairs(&[("AWS_ACCESS_KEY_ID", "AKID")]);
        assert!(config.credentials().is_none());

        let config = from_pairs(&[
            ("AWS_ACCESS_KEY_ID", "AKID"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("AWS_SESSION_TOKEN", "token"),
        ]);
        let creds = config.credentials().unwrap();
        assert_eq!(creds.session_token.as_deref(), Some("token"));
    }

    #[test]
    fn test_should_build_with_typed_builder() {
        let config = GatewayConfig::builder()
            .gateway_listen("127.0.0.1:0".into())
            .transfer_concurrency(2)
            .presign_expiry_secs(5)
            .build();
        assert_eq!(config.gateway_listen, "127.0.0.1:0");
        assert_eq!(config.transfer_concurrency, 2);
        assert_eq!(config.presign_expiry(), Duration::from_secs(5));
    }

    #[test]
    fn test_should_serialize_to_camel_case_json_without_secrets() {
        let config = GatewayConfig::builder()
            .secret_access_key(Some("super-secret".into()))
            .build();
        let json = serde_json::to_string(&config).expect("test serialization");
        assert!(json.contains("gatewayListen"));
        assert!(json.contains("\"storeBackend\":\"memory\""));
        assert!(!json.contains("super-secret"));
    }
}
