//! Presigned access issuance for listed keys.

use std::time::Duration;

use crate::error::StoreResult;
use crate::store::ObjectStore;
use crate::types::ListedObject;

/// Default validity window of an issued URL.
pub const DEFAULT_PRESIGN_EXPIRY: Duration = Duration::from_secs(60);

/// Issues one presigned GET URL per key.
///
/// Nothing is cached: every call signs again with a fresh expiry window.
#[derive(Debug, Clone, Copy)]
pub struct PresignIssuer {
    expires_in: Duration,
}

impl Default for PresignIssuer {
    fn default() -> Self {
        Self::new(DEFAULT_PRESIGN_EXPIRY)
    }
}

impl PresignIssuer {
    /// An issuer granting `expires_in` of access per URL.
    #[must_use]
    pub fn new(expires_in: Duration) -> Self {
        Self { expires_in }
    }

    /// The validity window granted per URL.
    #[must_use]
    pub fn expires_in(&self) -> Duration {
        self.expires_in
    }

    /// Sign a URL for each key, in the order given.
    pub fn issue(
        &self,
        store: &dyn ObjectStore,
        bucket: &str,
        keys: Vec<String>,
    ) -> StoreResult<Vec<ListedObject>> {
        keys.into_iter()
            .map(|key| {
                let presigned = store.presign_get(bucket, &key, self.expires_in)?;
                Ok(ListedObject {
                    key,
                    url: presigned.url,
                    expires_at: presigned.expires_at,
                })
            })
            .collect()
    }
}
