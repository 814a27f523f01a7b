//! Implements the `spendsync add` command.

use crate::args::AddArgs;
use crate::commands::{open_store, Out};
use crate::model::{parse_paid_date, Amount, Transaction};
use crate::Config;
use anyhow::{Context, Result};
use std::str::FromStr;

/// Creates a new transaction with a freshly allocated id and saves it.
///
/// The amount is validated synchronously: an unparseable string fails here
/// with the conversion error, before anything is written.
pub async fn add(config: Config, args: AddArgs) -> Result<Out<Transaction>> {
    let sum = Amount::from_str(args.amount())?;
    let paid_date = match args.paid() {
        Some(raw) => parse_paid_date(raw).context("Invalid --paid date")?,
        None => chrono::Local::now().fixed_offset(),
    };

    let store = open_store(&config).await?;
    // Mutations on an unloaded collection are dropped, so wait for the load
    // to finish first.
    store.wait_for_collection().await;
    let transaction = store
        .create_new(args.summary(), args.category(), sum, args.currency(), paid_date)
        .await;
    store.add(transaction.clone()).await;
    store.shutdown().await;

    Ok(Out::new(
        format!(
            "Saved transaction {}: {} ({})",
            transaction.id,
            transaction.summary,
            transaction.sum.formatted(transaction.currency)
        ),
        transaction,
    ))
}
