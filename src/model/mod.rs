//! The data model for the synchronization engine.

mod amount;
mod transaction;

pub use amount::Amount;
pub use transaction::{Category, Currency, Transaction};

pub(crate) use transaction::{decode_transactions, encode_transactions, parse_paid_date};
