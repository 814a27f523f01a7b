//! The remote endpoint the transaction collection is synchronized from.

mod http;

use crate::error::Result;
use crate::model::Transaction;

pub use http::HttpSource;

/// A single-attempt, stateless fetcher for the full transaction list. Retry
/// logic lives in the store's retry policy, never here.
#[async_trait::async_trait]
pub trait RemoteSource: Send + Sync {
    /// Issues one request for the full transaction list.
    ///
    /// # Errors
    /// - `Error::Transport` if no response arrives.
    /// - `Error::HttpStatus` if the server responds with a non-2xx status.
    /// - `Error::Decode` if the body is malformed.
    async fn fetch_all(&self) -> Result<Vec<Transaction>>;
}
