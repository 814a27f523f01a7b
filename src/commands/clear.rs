//! Implements the `spendsync clear` command.

use crate::commands::{open_store, Out};
use crate::Config;
use anyhow::Result;

/// Drops the local cache and waits for the re-download the store starts in
/// response.
pub async fn clear(config: Config) -> Result<Out<()>> {
    let store = open_store(&config).await?;
    store.wait_for_collection().await;
    store.clear_cache().await;
    let refreshed = store.wait_for_collection().await;
    store.shutdown().await;
    Ok(Out::new_message(format!(
        "Cache cleared; re-downloaded {} transaction(s)",
        refreshed.len()
    )))
}
