mod api;
pub mod args;
mod cache;
pub mod commands;
mod config;
mod error;
mod home;
mod model;
mod retry;
mod store;
mod utils;

pub use api::{HttpSource, RemoteSource};
pub use cache::{FileCache, TransactionCache, CACHE_FILE_NAME};
pub use config::Config;
pub use error::Error;
pub use error::Result;
pub use home::{default_home, Home};
pub use model::{Amount, Category, Currency, Transaction};
pub use retry::{never_cancel, CancelFuture, CancelHandler, RetryPolicy, DEFAULT_MAX_ATTEMPTS};
pub use store::{filtered_sorted, CollectionStream, TransactionStore};
