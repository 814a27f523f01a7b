//! Implements the `spendsync delete` command.

use crate::args::DeleteArgs;
use crate::commands::{open_store, Out};
use crate::model::Transaction;
use crate::Config;
use anyhow::Result;

/// Deletes the transaction with the given id, if it exists.
pub async fn delete(config: Config, args: DeleteArgs) -> Result<Out<Transaction>> {
    let store = open_store(&config).await?;
    let transactions = store.wait_for_collection().await;

    let Some(target) = transactions.into_iter().find(|t| t.id == args.id()) else {
        store.shutdown().await;
        return Ok(Out::new_message(format!(
            "No transaction with id {}",
            args.id()
        )));
    };

    store.delete(&target).await;
    store.shutdown().await;
    Ok(Out::new(
        format!("Deleted transaction {}: {}", target.id, target.summary),
        target,
    ))
}
