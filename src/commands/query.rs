//! Implements the `spendsync list` command.

use crate::args::ListArgs;
use crate::commands::{open_store, Out};
use crate::model::Transaction;
use crate::store::filtered_sorted;
use crate::Config;
use anyhow::Result;

/// Lists the loaded collection, filtered and sorted the way the mobile app's
/// transaction screen shows it: newest first.
pub async fn list(config: Config, args: ListArgs) -> Result<Out<Vec<Transaction>>> {
    let store = open_store(&config).await?;
    let transactions = store.wait_for_collection().await;
    let items = filtered_sorted(&transactions, args.filter());
    store.shutdown().await;

    if items.is_empty() {
        return Ok(Out::new("No matching transactions".to_string(), items));
    }

    let mut lines = vec![format!("{} transaction(s):", items.len())];
    for t in &items {
        lines.push(format!(
            "{:>5}  {}  {:<13}  {:>14}  {}",
            t.id,
            t.paid_date.format("%Y-%m-%d"),
            t.category.to_string(),
            t.sum.formatted(t.currency),
            t.summary,
        ));
    }
    Ok(Out::new(lines.join("\n"), items))
}
