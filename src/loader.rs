use std::collections::HashMap;
use std::sync::Arc;

use async_graphql::Value;
use futures_util::future::{try_join_all, BoxFuture, Shared};
use futures_util::FutureExt;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error};

use crate::error::LoadError;

pub(crate) const LOG_TARGET: &str = "graphql_directives::loader";

/// Backend batch-fetch function. Receives the distinct keys of one batch in
/// first-occurrence order and must return one value per key, in the same
/// order. Backend failures pass through to callers unmodified; retry policy
/// belongs to the function itself.
pub type BatchFn =
    Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, anyhow::Result<Vec<Value>>> + Send + Sync>;

/// Builds a [`BatchFn`] from an async closure.
pub fn batch_fn<F, Fut>(f: F) -> BatchFn
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = anyhow::Result<Vec<Value>>> + Send + 'static,
{
    Arc::new(move |keys| Box::pin(f(keys)))
}

/// Batching, per-request cache over a [`BatchFn`].
///
/// Concurrent `load` calls issued within one coalescing window (before the
/// scheduler yields back to the dispatch task) share a single backend call
/// over the distinct requested keys. A key is cached from the moment it is
/// first requested: later `load`s of the same key join the still-in-flight
/// result rather than refetching. Results, including failures, stay cached
/// for the lifetime of the cache, which is exactly one request: the owning
/// request context creates a fresh instance per operation and drops it with
/// the operation.
pub struct BatchLoadCache {
    batch_fn: BatchFn,
    state: Arc<Mutex<State>>,
}

/// In-flight results are shared oneshot receivers; if the dispatch side is
/// dropped before delivering, joiners observe [`LoadError::Aborted`].
type PendingResult = Shared<BoxFuture<'static, Result<Value, LoadError>>>;

enum Entry {
    Pending(PendingResult),
    Done(Result<Value, LoadError>),
}

struct State {
    // per-key results keyed by the canonical GraphQL literal of the key
    cache: HashMap<String, Entry>,
    batch: Option<Batch>,
}

struct Batch {
    // distinct keys in first-occurrence order, as handed to the batch fn;
    // one reply channel per key, same index
    keys: Vec<Value>,
    waiters: Vec<oneshot::Sender<Result<Value, LoadError>>>,
}

impl BatchLoadCache {
    pub fn new(batch_fn: BatchFn) -> Self {
        Self {
            batch_fn,
            state: Arc::new(Mutex::new(State { cache: HashMap::new(), batch: None })),
        }
    }

    /// Loads one key, suspending until the coalesced batch resolves. A key
    /// requested twice within the cache's lifetime hits the backend at most
    /// once, whether the first request already completed or is still in
    /// flight.
    pub async fn load(&self, key: Value) -> Result<Value, LoadError> {
        let cache_key = key.to_string();

        let pending = {
            let mut state = self.state.lock().await;
            if let Some(entry) = state.cache.get(&cache_key) {
                match entry {
                    Entry::Done(result) => return result.clone(),
                    Entry::Pending(shared) => shared.clone(),
                }
            } else {
                let (tx, rx) = oneshot::channel();
                let shared: PendingResult = rx
                    .map(|result| result.unwrap_or(Err(LoadError::Aborted)))
                    .boxed()
                    .shared();
                state.cache.insert(cache_key, Entry::Pending(shared.clone()));

                match state.batch.as_mut() {
                    Some(batch) => {
                        batch.keys.push(key);
                        batch.waiters.push(tx);
                    }
                    None => {
                        // first key of a new window, this call owns the
                        // dispatch; detached so cancelling this caller never
                        // strands the other waiters of the window
                        state.batch = Some(Batch { keys: vec![key], waiters: vec![tx] });
                        tokio::spawn(dispatch(self.batch_fn.clone(), self.state.clone()));
                    }
                }
                shared
            }
        };

        pending.await
    }

    /// Loads a sequence of keys, preserving input order in the output. All
    /// keys join the same coalescing window.
    pub async fn load_many(&self, keys: Vec<Value>) -> Result<Vec<Value>, LoadError> {
        try_join_all(keys.into_iter().map(|key| self.load(key))).await
    }
}

/// Drains the pending batch after yielding once, so every `load` issued
/// before the yield completes joins the window.
async fn dispatch(batch_fn: BatchFn, state: Arc<Mutex<State>>) {
    tokio::task::yield_now().await;

    let batch = {
        let mut state = state.lock().await;
        match state.batch.take() {
            Some(batch) => batch,
            None => return,
        }
    };

    debug!(target: LOG_TARGET, keys = batch.keys.len(), "Dispatching batch.");

    let results: Vec<Result<Value, LoadError>> = match (batch_fn)(batch.keys.clone()).await {
        Ok(values) if values.len() == batch.keys.len() => values.into_iter().map(Ok).collect(),
        Ok(values) => {
            let err = LoadError::BatchShapeMismatch {
                expected: batch.keys.len(),
                actual: values.len(),
            };
            error!(target: LOG_TARGET, error = %err, "Batch fetch returned wrong cardinality.");
            vec![Err(err); batch.keys.len()]
        }
        Err(e) => {
            error!(target: LOG_TARGET, error = %e, "Batch fetch failed.");
            let err = LoadError::Backend(Arc::new(e));
            vec![Err(err); batch.keys.len()]
        }
    };

    let mut state = state.lock().await;
    for ((key, result), tx) in batch.keys.iter().zip(results).zip(batch.waiters) {
        state.cache.insert(key.to_string(), Entry::Done(result.clone()));
        let _ = tx.send(result);
    }
}
