//! Exhaustive listing.

use tracing::debug;

use crate::error::StoreResult;
use crate::store::ObjectStore;

/// Every key under `prefix`, in store order.
///
/// Pages are fetched one after another, each with the cursor the previous
/// page returned. The listing ends only when a page comes back without a
/// cursor (or with an empty one); an empty page that still carries a cursor
/// is followed. A failing page aborts the whole listing.
pub async fn list_all_keys(
    store: &dyn ObjectStore,
    bucket: &str,
    prefix: Option<&str>,
) -> StoreResult<Vec<String>> {
    let mut keys = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0_usize;

    loop {
        let page = store
            .list_objects_page(bucket, prefix, cursor.as_deref())
            .await?;
        pages += 1;
        debug!(bucket = %bucket, page = pages, count = page.keys.len(), "listed page");

        let next = page.continuation().map(ToOwned::to_owned);
        keys.extend(page.keys);
        match next {
            Some(token) => cursor = Some(token),
            None => break,
        }
    }

    debug!(bucket = %bucket, pages, total = keys.len(), "listing complete");
    Ok(keys)
}
