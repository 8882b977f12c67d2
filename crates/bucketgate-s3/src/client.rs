//! S3 client construction.

use aws_config::{BehaviorVersion, Region};
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_s3::Client;
use bucketgate_auth::Credentials;
use bucketgate_core::GatewayConfig;
use tracing::{debug, warn};

/// Provider name reported for explicitly configured credentials.
const PROVIDER_NAME: &str = "bucketgate";

/// A ready S3 client plus the credentials it resolved, used for local
/// presigning.
#[derive(Debug, Clone)]
pub struct ConnectedClient {
    /// The SDK client.
    pub client: Client,
    /// Credentials the default chain (or the configuration) resolved to.
    /// `None` when nothing could be resolved; presigning then fails.
    pub credentials: Option<Credentials>,
}

/// Build an S3 client from `config`.
///
/// The region always comes from the configuration. A custom endpoint
/// switches the client to path-style addressing. Explicit credentials win
/// over the SDK's default provider chain.
pub async fn connect(config: &GatewayConfig) -> ConnectedClient {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

    if let Some(endpoint) = &config.endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }

    if let (Some(access_key), Some(secret_key)) = (&config.access_key_id, &config.secret_access_key)
    {
        let credentials = aws_credential_types::Credentials::new(
            access_key,
            secret_key,
            config.session_token.clone(),
            None,
            PROVIDER_NAME,
        );
        loader = loader.credentials_provider(credentials);
    }

    let sdk_config = loader.load().await;
    let credentials = resolve_credentials(&sdk_config).await;

    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config);
    let s3_config = if config.endpoint_url.is_some() {
        s3_config.force_path_style(true).build()
    } else {
        s3_config.build()
    };

    debug!(
        region = %config.region,
        endpoint = ?config.endpoint_url,
        has_credentials = credentials.is_some(),
        "S3 client ready"
    );

    ConnectedClient {
        client: Client::from_conf(s3_config),
        credentials,
    }
}

async fn resolve_credentials(sdk_config: &aws_config::SdkConfig) -> Option<Credentials> {
    let Some(provider) = sdk_config.credentials_provider() else {
        warn!("no credentials provider configured, presigning is unavailable");
        return None;
    };

    match provider.provide_credentials().await {
        Ok(resolved) => {
            let credentials =
                Credentials::new(resolved.access_key_id(), resolved.secret_access_key());
            Some(match resolved.session_token() {
                Some(token) => credentials.with_session_token(token),
                None => credentials,
            })
        }
        Err(e) => {
            warn!(error = %e, "failed to resolve credentials, presigning is unavailable");
            None
        }
    }
}
