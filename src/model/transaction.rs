//! The transaction record and its wire codec.
//!
//! The remote endpoint and the persistent cache share one JSON mapping: field
//! names `id, summary, category, sum, currency, paid`, where `paid` is the
//! wire name for `paid_date`. Decoding is two-phase: serde parses the loose
//! wire shape and `TryFrom` tightens it, so a bad field fails with an
//! `Error::Decode` naming the field and the raw value instead of a generic
//! serde message.

use crate::error::{Error, Result};
use crate::model::Amount;
use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use std::str::FromStr;

/// The fixed paid-date wire format, e.g. `2021-02-03T09:31:10+0100`.
const PAID_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Represents a single financial transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    /// Unique within the collection. Assigned by the store as max + 1 for
    /// newly created records.
    pub id: i64,
    pub summary: String,
    pub category: Category,
    pub sum: Amount,
    pub currency: Currency,
    #[serde(rename = "paid", serialize_with = "serialize_paid_date")]
    pub paid_date: DateTime<FixedOffset>,
}

/// The closed set of transaction categories.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Clothing,
    Housing,
    Travel,
    Food,
    Utilities,
    Insurance,
    Healthcare,
    Financial,
    Lifestyle,
    Entertainment,
    Miscellaneous,
}

serde_plain::derive_display_from_serialize!(Category);
serde_plain::derive_fromstr_from_deserialize!(Category);

/// The closed set of supported currencies.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "UPPERCASE")]
#[value(rename_all = "UPPER")]
pub enum Currency {
    Eur,
    Huf,
    Usd,
}

serde_plain::derive_display_from_serialize!(Currency);
serde_plain::derive_fromstr_from_deserialize!(Currency);

/// The loose shape of a transaction as it appears on the wire. `id` and `sum`
/// arrive as either numbers or numeric strings depending on the producer, so
/// both are held raw until `TryFrom` tightens them.
#[derive(Debug, Deserialize)]
struct WireTransaction {
    id: serde_json::Value,
    summary: String,
    category: String,
    sum: serde_json::Value,
    currency: String,
    paid: String,
}

impl TryFrom<WireTransaction> for Transaction {
    type Error = Error;

    fn try_from(wire: WireTransaction) -> Result<Self> {
        // Try the string form first, then fall back to the native number.
        let id = match &wire.id {
            serde_json::Value::String(s) => s
                .parse::<i64>()
                .map_err(|_| Error::decode("id", s.clone()))?,
            serde_json::Value::Number(n) => {
                n.as_i64().ok_or_else(|| Error::decode("id", n.to_string()))?
            }
            other => return Err(Error::decode("id", other.to_string())),
        };

        let category = Category::from_str(&wire.category)
            .map_err(|_| Error::decode("category", wire.category.clone()))?;

        let sum = match &wire.sum {
            serde_json::Value::String(s) => {
                Decimal::from_str(s).map_err(|_| Error::decode("sum", s.clone()))?
            }
            serde_json::Value::Number(n) => Decimal::from_str(&n.to_string())
                .map_err(|_| Error::decode("sum", n.to_string()))?,
            other => return Err(Error::decode("sum", other.to_string())),
        };

        let currency = Currency::from_str(&wire.currency)
            .map_err(|_| Error::decode("currency", wire.currency.clone()))?;

        let paid_date = parse_paid_date(&wire.paid)?;

        Ok(Transaction {
            id,
            summary: wire.summary,
            category,
            sum: Amount::new(sum),
            currency,
            paid_date,
        })
    }
}

/// Parses a paid date in the fixed wire format. RFC 3339 offsets (`Z`,
/// `+01:00`) are also accepted for producers that emit them.
pub(crate) fn parse_paid_date(raw: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_str(raw, PAID_DATE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map_err(|_| Error::decode("paid", raw))
}

fn serialize_paid_date<S>(
    date: &DateTime<FixedOffset>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&date.format(PAID_DATE_FORMAT).to_string())
}

/// Decodes a JSON array of transactions from the remote endpoint or the
/// persistent cache.
pub(crate) fn decode_transactions(bytes: &[u8]) -> Result<Vec<Transaction>> {
    let wire: Vec<WireTransaction> =
        serde_json::from_slice(bytes).map_err(|e| Error::decode("$", e.to_string()))?;
    wire.into_iter().map(Transaction::try_from).collect()
}

/// Encodes a collection of transactions as a JSON array.
pub(crate) fn encode_transactions(transactions: &[Transaction]) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(transactions)
}
