//! Command handlers for the spendsync CLI.
//!
//! The CLI is a thin collaborator over the core: each handler opens the
//! store, calls its public operations, and reports the outcome. No
//! synchronization or persistence logic lives here.

use crate::api::HttpSource;
use crate::cache::FileCache;
use crate::retry::RetryPolicy;
use crate::store::TransactionStore;
use crate::Config;
use anyhow::Result;
use serde::Serialize;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, info, warn};

mod clear;
mod delete;
mod insert;
mod query;

pub use clear::clear;
pub use delete::delete;
pub use insert::add;
pub use query::list;

/// The output type for a command. This allows the command to return a
/// consistent message and, optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the
    /// command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as
    /// JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// Opens the transaction store described by `config` and installs a cancel
/// handler so the user can abandon a retry session with Ctrl-C instead of
/// waiting out the full attempt budget.
pub(crate) async fn open_store(config: &Config) -> Result<TransactionStore> {
    let cache = Arc::new(FileCache::new(config.cache_dir()));
    let source = Arc::new(HttpSource::new(config.base_url())?);
    let retry = RetryPolicy::new(config.max_attempts());
    let store = TransactionStore::new(cache, source, retry).await;
    store.set_cancel_handler(Arc::new(|error, delay| {
        warn!("fetch failed ({error}); retrying in {delay}s, press Ctrl-C to stop retrying");
        Box::pin(async {
            if tokio::signal::ctrl_c().await.is_err() {
                // No signal handler available: keep retrying.
                std::future::pending::<()>().await;
            }
        })
    }));
    Ok(store)
}
