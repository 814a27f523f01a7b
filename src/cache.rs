//! Durable storage for the transaction collection.
//!
//! The cache is a single opaque blob: the serialized JSON array of all
//! transactions, stored under a fixed logical name in the application's data
//! directory. It holds no state between calls; the store treats it as a pure
//! key-value byte store.

use crate::error::{Error, Result};
use crate::model::{decode_transactions, encode_transactions, Transaction};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::trace;

/// The fixed logical name of the cached transaction blob.
pub const CACHE_FILE_NAME: &str = "cachedTransactions.data";

/// Durable storage for the transaction collection. The store talks to this
/// seam so tests can point it at a temp directory or swap in another backing.
#[async_trait::async_trait]
pub trait TransactionCache: Send + Sync {
    /// Replaces the cached collection. Atomic from the caller's perspective:
    /// either the whole write lands or the prior blob is retained.
    async fn save(&self, transactions: &[Transaction]) -> Result<()>;

    /// Loads the cached collection. Fails with `Error::CacheNotFound` when no
    /// prior save occurred.
    async fn load(&self) -> Result<Vec<Transaction>>;

    /// Deletes the cached collection. Idempotent.
    async fn clear(&self) -> Result<()>;
}

/// Implements `TransactionCache` as a single JSON file on disk.
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    /// Creates a cache that persists to `CACHE_FILE_NAME` inside `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(CACHE_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("data.tmp")
    }
}

#[async_trait::async_trait]
impl TransactionCache for FileCache {
    async fn save(&self, transactions: &[Transaction]) -> Result<()> {
        trace!("saving {} transactions to {}", transactions.len(), self.path.display());
        let bytes = encode_transactions(transactions)
            .map_err(|e| Error::CacheWrite(std::io::Error::new(ErrorKind::InvalidData, e)))?;

        // Write to a temp sibling and rename so a reader never observes a
        // partially written blob.
        let temp = self.temp_path();
        tokio::fs::write(&temp, &bytes)
            .await
            .map_err(Error::CacheWrite)?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(Error::CacheWrite)
    }

    async fn load(&self) -> Result<Vec<Transaction>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(Error::CacheNotFound),
            Err(e) => return Err(Error::CacheWrite(e)),
        };
        decode_transactions(&bytes)
    }

    async fn clear(&self) -> Result<()> {
        trace!("clearing transaction cache at {}", self.path.display());
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::CacheDelete(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::transaction;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path());
        let expected = vec![
            transaction(1, "coffee", "2.50"),
            transaction(2, "rent", "120000"),
        ];
        cache.save(&expected).await.unwrap();

        let loaded = cache.load().await.unwrap();
        assert_eq!(loaded, expected);

        // Ids round-trip as native integers.
        let value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(cache.path()).unwrap()).unwrap();
        assert!(value[0]["id"].is_i64());
    }

    #[tokio::test]
    async fn test_load_without_save_is_not_found() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path());
        match cache.load().await {
            Err(Error::CacheNotFound) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_save_replaces_prior_blob() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path());
        cache.save(&[transaction(1, "old", "1")]).await.unwrap();
        let newer = vec![transaction(2, "new", "2")];
        cache.save(&newer).await.unwrap();
        assert_eq!(cache.load().await.unwrap(), newer);
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path());
        cache.save(&[transaction(1, "coffee", "2.50")]).await.unwrap();
        cache.clear().await.unwrap();
        cache.clear().await.unwrap();
        match cache.load().await {
            Err(Error::CacheNotFound) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_accepts_string_ids() {
        // Older writers stored ids as strings; reads must still accept them.
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path());
        std::fs::write(
            cache.path(),
            r#"[{"id": "7", "summary": "bus", "category": "travel",
                 "sum": "450", "currency": "HUF", "paid": "2021-06-01T08:00:00+0200"}]"#,
        )
        .unwrap();
        let loaded = cache.load().await.unwrap();
        assert_eq!(loaded[0].id, 7);
    }
}
