//! The transaction store: owns the canonical collection, drives fetch on
//! demand, persists on every mutation, and retries fetch failures.
//!
//! The canonical state is `Option<Vec<Transaction>>` where `None` means "not
//! yet loaded from any source". It lives behind one `tokio::sync::Mutex` (the
//! coordination point), so `add`, `delete`, `clear_cache` and the
//! fetch-completion callback never interleave their read-modify-write
//! sequences. Observers receive every transition, in the order it was applied
//! at the coordination point.
//!
//! Network, disk and backoff-timer waits all happen on spawned tasks, never
//! while the coordination point is held, so the store stays responsive to
//! mutations and observers while a fetch or retry wait is outstanding.

use crate::api::RemoteSource;
use crate::cache::TransactionCache;
use crate::error::Error;
use crate::model::{Amount, Category, Currency, Transaction};
use crate::retry::{never_cancel, CancelHandler, RetryPolicy};
use chrono::{DateTime, FixedOffset};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Fetches, caches and persists transactions.
///
/// Created `Unloaded`; becomes `Loaded` after a successful cache read or a
/// finished fetch session. Reverts to `Unloaded` only via [`clear_cache`],
/// which deletes the persistent cache entry and re-arms the fetch pipeline.
///
/// [`clear_cache`]: TransactionStore::clear_cache
pub struct TransactionStore {
    inner: Arc<Inner>,
    persist_task: JoinHandle<()>,
}

struct Inner {
    state: Mutex<State>,
    cache: Arc<dyn TransactionCache>,
    source: Arc<dyn RemoteSource>,
    retry: RetryPolicy,
    cancel_handler: watch::Sender<CancelHandler>,
}

struct State {
    transactions: Option<Vec<Transaction>>,
    subscribers: Vec<mpsc::UnboundedSender<Option<Vec<Transaction>>>>,
    /// Bumped on every transition to `Unloaded`. A fetch session only applies
    /// its result while the generation it was started for is still current,
    /// so a superseded session can never overwrite a newer state.
    generation: u64,
    fetch_task: Option<JoinHandle<()>>,
}

/// A subscription to the canonical collection state. The current value is
/// replayed immediately; every later transition follows in application order.
pub struct CollectionStream {
    receiver: mpsc::UnboundedReceiver<Option<Vec<Transaction>>>,
}

impl CollectionStream {
    /// The next state value, or `None` once the store has shut down.
    pub async fn recv(&mut self) -> Option<Option<Vec<Transaction>>> {
        self.receiver.recv().await
    }
}

impl TransactionStore {
    /// Creates the store, seeds it from the persistent cache, and starts a
    /// fetch session if there was no usable cached data. Cache read failures
    /// are logged and treated as "no cached data".
    pub async fn new(
        cache: Arc<dyn TransactionCache>,
        source: Arc<dyn RemoteSource>,
        retry: RetryPolicy,
    ) -> Self {
        let (cancel_handler, _) = watch::channel(never_cancel());
        let inner = Arc::new(Inner {
            state: Mutex::new(State {
                transactions: None,
                subscribers: Vec::new(),
                generation: 0,
                fetch_task: None,
            }),
            cache: Arc::clone(&cache),
            source,
            retry,
            cancel_handler,
        });

        // Register the write-through subscriber before anything can publish,
        // so no transition slips past it. Unlike external observers it does
        // not see the initial Unloaded value, only transitions, which keeps
        // it from deleting the cache entry it is about to load from.
        let (tx, rx) = mpsc::unbounded_channel();
        inner.state.lock().await.subscribers.push(tx);
        let persist_task = tokio::spawn(persist_loop(cache, rx));

        let seeded = inner.cache.load().await;
        let mut state = inner.state.lock().await;
        match seeded {
            Ok(transactions) => {
                debug!("loaded {} cached transactions", transactions.len());
                Inner::publish(&mut state, Some(transactions));
            }
            Err(Error::CacheNotFound) => {
                debug!("no cached transaction data, fetching");
                spawn_fetch(&inner, &mut state);
            }
            Err(e) => {
                warn!("unable to load cached transaction data, fetching: {e}");
                spawn_fetch(&inner, &mut state);
            }
        }
        drop(state);

        Self {
            inner,
            persist_task,
        }
    }

    /// Subscribes to the canonical collection state.
    pub async fn observe_collection(&self) -> CollectionStream {
        let mut state = self.inner.state.lock().await;
        let (tx, receiver) = mpsc::unbounded_channel();
        // Replay the current value, then deliver all subsequent transitions.
        let _ = tx.send(state.transactions.clone());
        state.subscribers.push(tx);
        CollectionStream { receiver }
    }

    /// Upserts `transaction` by id: a record with the same id is replaced,
    /// otherwise the record is appended. Triggers a cache write-through.
    ///
    /// Dropped with a warning while the collection is not yet loaded.
    pub async fn add(&self, transaction: Transaction) {
        let mut state = self.inner.state.lock().await;
        let Some(mut transactions) = state.transactions.clone() else {
            warn!(
                "dropping add of transaction {}: collection not loaded yet",
                transaction.id
            );
            return;
        };
        transactions.retain(|t| t.id != transaction.id);
        transactions.push(transaction);
        Inner::publish(&mut state, Some(transactions));
    }

    /// Removes the record matching `transaction.id`, if present. Idempotent;
    /// triggers a cache write-through even when nothing matched. Does nothing
    /// while the collection is not yet loaded.
    pub async fn delete(&self, transaction: &Transaction) {
        let mut state = self.inner.state.lock().await;
        let Some(mut transactions) = state.transactions.clone() else {
            debug!(
                "ignoring delete of transaction {}: collection not loaded yet",
                transaction.id
            );
            return;
        };
        transactions.retain(|t| t.id != transaction.id);
        Inner::publish(&mut state, Some(transactions));
    }

    /// Resets the collection to its initial Unloaded state. The persistent
    /// cache entry is deleted and the store immediately starts a new fetch
    /// session, superseding any session still in flight.
    pub async fn clear_cache(&self) {
        let mut state = self.inner.state.lock().await;
        state.generation += 1;
        // The write-through subscriber reacts to the Unloaded transition by
        // deleting the cache entry.
        Inner::publish(&mut state, None);
        spawn_fetch(&self.inner, &mut state);
    }

    /// Creates a new, unsaved transaction with a freshly allocated id
    /// (`max(existing ids, default 0) + 1`). The caller must [`add`] it to
    /// make it part of the collection.
    ///
    /// [`add`]: TransactionStore::add
    pub async fn create_new(
        &self,
        summary: impl Into<String>,
        category: Category,
        sum: Amount,
        currency: Currency,
        paid_date: DateTime<FixedOffset>,
    ) -> Transaction {
        let state = self.inner.state.lock().await;
        let next_id = state
            .transactions
            .iter()
            .flatten()
            .map(|t| t.id)
            .max()
            .unwrap_or(0)
            + 1;
        Transaction {
            id: next_id,
            summary: summary.into(),
            category,
            sum,
            currency,
            paid_date,
        }
    }

    /// Installs the handler consulted during fetch-retry waits. The handler
    /// current at the time of each wait is the one raced against the backoff
    /// timer.
    pub fn set_cancel_handler(&self, handler: CancelHandler) {
        self.inner.cancel_handler.send_replace(handler);
    }

    /// True while the collection has not yet been loaded from any source.
    pub async fn is_loading(&self) -> bool {
        self.inner.state.lock().await.transactions.is_none()
    }

    /// Waits until the collection is loaded and returns it.
    pub async fn wait_for_collection(&self) -> Vec<Transaction> {
        let mut stream = self.observe_collection().await;
        while let Some(value) = stream.recv().await {
            if let Some(transactions) = value {
                return transactions;
            }
        }
        Vec::new()
    }

    /// Stops the fetch pipeline and drains pending cache write-throughs.
    /// Short-lived processes call this so the final write lands before exit.
    pub async fn shutdown(self) {
        {
            let mut state = self.inner.state.lock().await;
            if let Some(task) = state.fetch_task.take() {
                task.abort();
            }
            state.subscribers.clear();
        }
        if let Err(e) = self.persist_task.await {
            if !e.is_cancelled() {
                warn!("persistence task failed: {e}");
            }
        }
    }
}

impl Inner {
    /// Applies and broadcasts a state transition. Must be called with the
    /// coordination point held so observers see transitions in order.
    fn publish(state: &mut State, value: Option<Vec<Transaction>>) {
        state.transactions = value;
        let transactions = &state.transactions;
        state
            .subscribers
            .retain(|tx| tx.send(transactions.clone()).is_ok());
    }
}

/// Starts a fetch session for the current generation, superseding any session
/// still in flight.
fn spawn_fetch(inner: &Arc<Inner>, state: &mut State) {
    if let Some(stale) = state.fetch_task.take() {
        stale.abort();
    }
    let generation = state.generation;
    let task_inner = Arc::clone(inner);
    state.fetch_task = Some(tokio::spawn(async move {
        let source = Arc::clone(&task_inner.source);
        let handler_rx = task_inner.cancel_handler.subscribe();
        let outcome = task_inner
            .retry
            .run(
                |error, delay| {
                    let handler = handler_rx.borrow().clone();
                    handler(error, delay)
                },
                || {
                    let source = Arc::clone(&source);
                    async move { source.fetch_all().await }
                },
            )
            .await;

        // Terminal retry outcomes degrade to an empty collection so the user
        // can keep working locally while the network is unreachable.
        let transactions = match outcome {
            Ok(transactions) => transactions,
            Err(e) => {
                warn!("remote fetch abandoned, continuing with an empty collection: {e}");
                Vec::new()
            }
        };

        let mut state = task_inner.state.lock().await;
        if state.generation == generation && state.transactions.is_none() {
            Inner::publish(&mut state, Some(transactions));
        } else {
            debug!("discarding superseded fetch result for generation {generation}");
        }
    }));
}

/// The write-through loop: persists every Loaded transition and deletes the
/// cache entry on every Unloaded transition. Cache failures are logged, never
/// surfaced, since the collection can always be repopulated from the network.
async fn persist_loop(
    cache: Arc<dyn TransactionCache>,
    mut rx: mpsc::UnboundedReceiver<Option<Vec<Transaction>>>,
) {
    while let Some(value) = rx.recv().await {
        let result = match &value {
            Some(transactions) => cache.save(transactions).await,
            None => cache.clear().await,
        };
        if let Err(e) = result {
            warn!("unable to persist cached transaction data: {e}");
        }
    }
}

/// The collaborator-facing projection: case-insensitive substring match on
/// the summary, or raw substring match on the amount text, sorted by paid
/// date descending.
pub fn filtered_sorted(transactions: &[Transaction], filter: &str) -> Vec<Transaction> {
    let needle = filter.to_lowercase();
    let mut items: Vec<Transaction> = transactions
        .iter()
        .filter(|t| {
            filter.is_empty()
                || t.summary.to_lowercase().contains(&needle)
                || t.sum.to_string().contains(filter)
        })
        .cloned()
        .collect();
    items.sort_by(|a, b| b.paid_date.cmp(&a.paid_date));
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FileCache;
    use crate::test::{transaction, FailingSource, PendingSource, ScriptedSource};
    use tempfile::TempDir;

    async fn store_with(
        dir: &TempDir,
        source: Arc<dyn RemoteSource>,
        retry: RetryPolicy,
    ) -> TransactionStore {
        let cache = Arc::new(FileCache::new(dir.path()));
        TransactionStore::new(cache, source, retry).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_a_fresh_start_fetch_success() {
        let dir = TempDir::new().unwrap();
        let expected = vec![transaction(1, "coffee", "2.50"), transaction(2, "rent", "120000")];
        let source = Arc::new(ScriptedSource::ok(expected.clone()));
        let store = store_with(&dir, source, RetryPolicy::default()).await;

        let mut stream = store.observe_collection().await;
        assert_eq!(stream.recv().await.unwrap(), None);
        assert_eq!(stream.recv().await.unwrap(), Some(expected.clone()));

        store.shutdown().await;
        let cache = FileCache::new(dir.path());
        assert_eq!(cache.load().await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_scenario_b_cache_seed_then_clear() {
        let dir = TempDir::new().unwrap();
        let cached = vec![transaction(1, "coffee", "2.50")];
        FileCache::new(dir.path()).save(&cached).await.unwrap();

        let fetched = vec![transaction(2, "rent", "120000")];
        let source = Arc::new(ScriptedSource::ok(fetched.clone()));
        let store = store_with(&dir, source.clone(), RetryPolicy::default()).await;

        // Seeded from the cache; the remote source was never consulted.
        let mut stream = store.observe_collection().await;
        assert_eq!(stream.recv().await.unwrap(), Some(cached));
        assert_eq!(source.calls(), 0);

        store.clear_cache().await;
        assert_eq!(stream.recv().await.unwrap(), None);
        assert_eq!(stream.recv().await.unwrap(), Some(fetched.clone()));
        assert_eq!(source.calls(), 1);

        store.shutdown().await;
        assert_eq!(FileCache::new(dir.path()).load().await.unwrap(), fetched);
    }

    #[tokio::test]
    async fn test_scenario_c_add_on_loaded_empty() {
        let dir = TempDir::new().unwrap();
        FileCache::new(dir.path()).save(&[]).await.unwrap();
        let store = store_with(&dir, Arc::new(PendingSource), RetryPolicy::default()).await;

        let mut stream = store.observe_collection().await;
        assert_eq!(stream.recv().await.unwrap(), Some(vec![]));

        let added = transaction(3, "coffee", "2.50");
        store.add(added.clone()).await;
        assert_eq!(stream.recv().await.unwrap(), Some(vec![added.clone()]));

        store.shutdown().await;
        assert_eq!(FileCache::new(dir.path()).load().await.unwrap(), vec![added]);
    }

    #[tokio::test]
    async fn test_create_new_id_is_monotonic_and_stable() {
        let dir = TempDir::new().unwrap();
        FileCache::new(dir.path())
            .save(&[transaction(3, "a", "1"), transaction(7, "b", "2")])
            .await
            .unwrap();
        let store = store_with(&dir, Arc::new(PendingSource), RetryPolicy::default()).await;

        let now = chrono::Local::now().fixed_offset();
        let first = store
            .create_new("", Category::Miscellaneous, Amount::default(), Currency::Huf, now)
            .await;
        let second = store
            .create_new("", Category::Miscellaneous, Amount::default(), Currency::Huf, now)
            .await;

        // Without an add in between, both allocations see the same max.
        assert_eq!(first.id, 8);
        assert_eq!(second.id, 8);

        store.add(first).await;
        let third = store
            .create_new("", Category::Miscellaneous, Amount::default(), Currency::Huf, now)
            .await;
        assert_eq!(third.id, 9);
        store.shutdown().await;
    }

    #[tokio::test]
    async fn test_create_new_id_starts_at_one() {
        let dir = TempDir::new().unwrap();
        FileCache::new(dir.path()).save(&[]).await.unwrap();
        let store = store_with(&dir, Arc::new(PendingSource), RetryPolicy::default()).await;
        let now = chrono::Local::now().fixed_offset();
        let t = store
            .create_new("", Category::Food, Amount::default(), Currency::Eur, now)
            .await;
        assert_eq!(t.id, 1);
        store.shutdown().await;
    }

    #[tokio::test]
    async fn test_add_upserts_by_id() {
        let dir = TempDir::new().unwrap();
        FileCache::new(dir.path()).save(&[]).await.unwrap();
        let store = store_with(&dir, Arc::new(PendingSource), RetryPolicy::default()).await;

        store.add(transaction(5, "old summary", "1")).await;
        let replacement = transaction(5, "new summary", "2");
        store.add(replacement.clone()).await;

        let collection = store.wait_for_collection().await;
        assert_eq!(collection, vec![replacement]);
        store.shutdown().await;
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let kept = transaction(1, "kept", "1");
        FileCache::new(dir.path()).save(&[kept.clone()]).await.unwrap();
        let store = store_with(&dir, Arc::new(PendingSource), RetryPolicy::default()).await;

        // Deleting a record that does not exist leaves the collection as is.
        store.delete(&transaction(99, "missing", "0")).await;
        assert_eq!(store.wait_for_collection().await, vec![kept.clone()]);

        store.delete(&kept).await;
        store.delete(&kept).await;
        assert_eq!(store.wait_for_collection().await, vec![]);
        store.shutdown().await;
    }

    #[tokio::test]
    async fn test_add_while_unloaded_is_dropped() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, Arc::new(PendingSource), RetryPolicy::default()).await;

        assert!(store.is_loading().await);
        store.add(transaction(1, "dropped", "1")).await;
        store.delete(&transaction(1, "dropped", "1")).await;

        // Still unloaded; mutations while Unloaded neither crash nor load.
        let mut stream = store.observe_collection().await;
        assert_eq!(stream.recv().await.unwrap(), None);
        assert!(store.is_loading().await);
        store.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_give_up_publishes_empty_collection() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(FailingSource::default());
        let store = store_with(&dir, source.clone(), RetryPolicy::default()).await;

        let mut stream = store.observe_collection().await;
        assert_eq!(stream.recv().await.unwrap(), None);
        // Empty but Loaded, never an error state.
        assert_eq!(stream.recv().await.unwrap(), Some(vec![]));
        assert_eq!(source.calls(), 5);
        store.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_handler_short_circuits_session() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(FailingSource::default());
        let store = store_with(&dir, source.clone(), RetryPolicy::default()).await;
        store.set_cancel_handler(Arc::new(|_, _| Box::pin(std::future::ready(()))));

        let mut stream = store.observe_collection().await;
        assert_eq!(stream.recv().await.unwrap(), None);
        assert_eq!(stream.recv().await.unwrap(), Some(vec![]));
        // Cancelled during the first wait: exactly one network call was made.
        assert_eq!(source.calls(), 1);
        store.shutdown().await;
    }

    #[tokio::test]
    async fn test_store_stays_responsive_while_fetch_pending() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, Arc::new(PendingSource), RetryPolicy::default()).await;

        // A second clear while a session is in flight supersedes it cleanly.
        store.clear_cache().await;
        store.clear_cache().await;

        let mut stream = store.observe_collection().await;
        assert_eq!(stream.recv().await.unwrap(), None);
        assert!(store.is_loading().await);
        store.shutdown().await;
    }

    #[tokio::test]
    async fn test_observers_see_transitions_in_order() {
        let dir = TempDir::new().unwrap();
        FileCache::new(dir.path()).save(&[]).await.unwrap();
        let store = store_with(&dir, Arc::new(PendingSource), RetryPolicy::default()).await;
        let mut stream = store.observe_collection().await;

        let a = transaction(1, "a", "1");
        let b = transaction(2, "b", "2");
        store.add(a.clone()).await;
        store.add(b.clone()).await;
        store.delete(&a).await;

        assert_eq!(stream.recv().await.unwrap(), Some(vec![]));
        assert_eq!(stream.recv().await.unwrap(), Some(vec![a.clone()]));
        assert_eq!(stream.recv().await.unwrap(), Some(vec![a, b.clone()]));
        assert_eq!(stream.recv().await.unwrap(), Some(vec![b]));
        store.shutdown().await;
    }

    #[test]
    fn test_filtered_sorted_matches_summary_case_insensitive() {
        let items = vec![transaction(1, "Morning Coffee", "2.50"), transaction(2, "rent", "120000")];
        let filtered = filtered_sorted(&items, "coffee");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, 1);
    }

    #[test]
    fn test_filtered_sorted_matches_amount_text() {
        let items = vec![transaction(1, "coffee", "2.50"), transaction(2, "rent", "120000")];
        let filtered = filtered_sorted(&items, "2.5");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, 1);
    }

    #[test]
    fn test_filtered_sorted_orders_by_paid_date_descending() {
        // The helper assigns later paid dates to higher ids.
        let items = vec![transaction(1, "a", "1"), transaction(3, "c", "3"), transaction(2, "b", "2")];
        let sorted = filtered_sorted(&items, "");
        let ids: Vec<i64> = sorted.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }
}
