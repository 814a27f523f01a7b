//! The error taxonomy for the synchronization engine.
//!
//! Cache errors are absorbed (logged) by the store, fetch errors are absorbed
//! by the retry policy up to its attempt budget, and only conversion errors
//! from user input are surfaced synchronously. Nothing here is fatal: the
//! store always degrades to an empty or stale-cached collection.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The request never produced a response (DNS, connect, or read failure).
    #[error("network transport failure: {0}")]
    Transport(String),

    /// The server responded with a non-2xx status code.
    #[error("server responded with HTTP status {0}")]
    HttpStatus(u16),

    /// A payload field could not be decoded. Carries the field name and the
    /// raw value exactly as it appeared on the wire.
    #[error("unable to decode field '{field}' from value '{raw}'")]
    Decode { field: String, raw: String },

    /// No cached transactions exist. Callers treat this as "no cached data",
    /// not as a failure.
    #[error("no cached transaction data found")]
    CacheNotFound,

    #[error("unable to write the transaction cache")]
    CacheWrite(#[source] std::io::Error),

    #[error("unable to delete the transaction cache")]
    CacheDelete(#[source] std::io::Error),

    /// The retry budget was exhausted. Carries the error from the final
    /// attempt.
    #[error("gave up after repeated fetch failures")]
    RetryGivenUp(#[source] Box<Error>),

    /// The user declined to keep retrying. Carries the error that triggered
    /// the wait that was cancelled, not a new error.
    #[error("fetch retries cancelled")]
    RetryCancelled(#[source] Box<Error>),

    /// A user-entered amount string could not be parsed as a decimal.
    #[error("unable to convert '{raw}' to a decimal amount")]
    Conversion { raw: String },
}

impl Error {
    pub(crate) fn decode(field: impl Into<String>, raw: impl Into<String>) -> Self {
        Error::Decode {
            field: field.into(),
            raw: raw.into(),
        }
    }

    /// The error that triggered a retry session's terminal outcome, if this
    /// is such an outcome.
    pub fn retry_source(&self) -> Option<&Error> {
        match self {
            Error::RetryGivenUp(source) | Error::RetryCancelled(source) => Some(source.as_ref()),
            _ => None,
        }
    }
}
