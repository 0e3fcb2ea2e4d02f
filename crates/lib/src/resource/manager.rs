//! Collection state with independent per-operation tracking.
//!
//! A [`ResourceManager`] owns an ordered collection and the bookkeeping the
//! UI reads: which ids have a mutation pending, whether a load or create is
//! running, the last error and the upload progress. Network calls run
//! without holding the state lock; results are applied under it in one step.

use std::{
    collections::HashSet,
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use tracing::{debug, warn};

use super::{Resource, in_flight::InFlight, in_flight::InFlightGuard};
use crate::{Result, http::ProgressFn};

/// How a successful mutation changes the entity it targeted.
pub enum Mutation<R> {
    /// Swap in the server's copy, keeping the position.
    Replace(R),
    /// Edit the local copy in place.
    Patch(Box<dyn FnOnce(&mut R) + Send>),
    /// Drop the entity, keeping the order of the rest.
    Remove,
}

impl<R: fmt::Debug> fmt::Debug for Mutation<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::Replace(r) => f.debug_tuple("Replace").field(r).finish(),
            Mutation::Patch(_) => f.write_str("Patch(..)"),
            Mutation::Remove => f.write_str("Remove"),
        }
    }
}

pub(crate) struct CollectionState<R: Resource> {
    pub(crate) items: Vec<R>,
    pub(crate) in_flight: InFlight<R::Id>,
    pub(crate) loading: usize,
    pub(crate) error: Option<String>,
    pub(crate) progress: Option<u8>,
    /// Bumped by every `list` and `reset`; completions carrying an older
    /// value are discarded.
    pub(crate) generation: u64,
}

impl<R: Resource> Default for CollectionState<R> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            in_flight: InFlight::default(),
            loading: 0,
            error: None,
            progress: None,
            generation: 0,
        }
    }
}

impl<R: Resource> CollectionState<R> {
    fn position(&self, id: &R::Id) -> Option<usize> {
        self.items.iter().position(|item| item.id() == *id)
    }

    /// Append, replacing in place any entity that already has the same id.
    fn upsert(&mut self, item: R) {
        match self.position(&item.id()) {
            Some(index) => self.items[index] = item,
            None => self.items.push(item),
        }
    }
}

/// Point-in-time copy of a collection and its tracking state.
#[derive(Debug, Clone)]
pub struct CollectionSnapshot<R: Resource> {
    pub items: Vec<R>,
    pub in_flight: HashSet<R::Id>,
    pub loading: bool,
    pub error: Option<String>,
    pub progress: Option<u8>,
}

/// Keeps the loading counter raised for as long as it lives.
struct LoadingGuard<R: Resource> {
    state: Arc<Mutex<CollectionState<R>>>,
}

impl<R: Resource> LoadingGuard<R> {
    fn acquire(state: &Arc<Mutex<CollectionState<R>>>) -> Self {
        lock(state).loading += 1;
        Self {
            state: Arc::clone(state),
        }
    }
}

impl<R: Resource> Drop for LoadingGuard<R> {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        state.loading = state.loading.saturating_sub(1);
    }
}

fn lock<R: Resource>(state: &Mutex<CollectionState<R>>) -> MutexGuard<'_, CollectionState<R>> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Async state for one collection.
pub struct ResourceManager<R: Resource> {
    state: Arc<Mutex<CollectionState<R>>>,
}

impl<R: Resource> Clone for ResourceManager<R> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<R: Resource> Default for ResourceManager<R> {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(CollectionState::default())),
        }
    }
}

impl<R: Resource> fmt::Debug for ResourceManager<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("ResourceManager")
            .field("items", &state.items.len())
            .field("in_flight", &state.in_flight.ids().len())
            .field("loading", &state.loading)
            .field("error", &state.error)
            .finish()
    }
}

impl<R: Resource> ResourceManager<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the collection with the result of `fetch`.
    ///
    /// A failure keeps the previous collection and records the error. If
    /// another `list` or a `reset` started while `fetch` was running, the
    /// result is discarded.
    pub async fn list<Fut>(&self, fetch: Fut) -> Result<Vec<R>>
    where
        Fut: Future<Output = Result<Vec<R>>>,
    {
        let generation = {
            let mut state = lock(&self.state);
            state.generation += 1;
            state.error = None;
            state.generation
        };
        let _loading = LoadingGuard::acquire(&self.state);

        let result = fetch.await;

        let mut state = lock(&self.state);
        if state.generation != generation {
            debug!(generation, current = state.generation, "discarding stale list result");
            return result;
        }
        match result {
            Ok(items) => {
                let mut seen = HashSet::with_capacity(items.len());
                let mut unique = Vec::with_capacity(items.len());
                for item in items {
                    if seen.insert(item.id()) {
                        unique.push(item);
                    } else {
                        warn!(id = %item.id(), "dropping duplicate id from listing");
                    }
                }
                state.items = unique.clone();
                debug!(count = unique.len(), "collection replaced");
                Ok(unique)
            }
            Err(err) => {
                state.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Run a mutation of entity `id`.
    ///
    /// `id` is in flight from before `op` starts until its result has been
    /// applied, and is released exactly once whatever the outcome. A failure
    /// records the error and leaves the collection unchanged.
    pub async fn mutate<Fut>(&self, id: R::Id, op: Fut) -> Result<()>
    where
        Fut: Future<Output = Result<Mutation<R>>>,
    {
        let _in_flight = InFlightGuard::acquire(&self.state, id.clone());

        let result = op.await;

        let mut state = lock(&self.state);
        match result {
            Ok(mutation) => {
                let Some(index) = state.position(&id) else {
                    debug!(%id, "mutated entity no longer in collection");
                    return Ok(());
                };
                match mutation {
                    Mutation::Replace(item) => state.items[index] = item,
                    Mutation::Patch(edit) => edit(&mut state.items[index]),
                    Mutation::Remove => {
                        state.items.remove(index);
                    }
                }
                Ok(())
            }
            Err(err) => {
                state.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Run a create and append what it returns.
    ///
    /// `op` receives a progress reporter. Reported percentages only ever move
    /// forward, reach 100 on success, and are forwarded to `on_progress`.
    pub async fn create<F, Fut>(&self, on_progress: Option<ProgressFn>, op: F) -> Result<Vec<R>>
    where
        F: FnOnce(ProgressFn) -> Fut,
        Fut: Future<Output = Result<Vec<R>>>,
    {
        let generation = {
            let mut state = lock(&self.state);
            state.error = None;
            state.progress = Some(0);
            state.generation
        };
        let _loading = LoadingGuard::acquire(&self.state);
        let reporter = self.progress_reporter(on_progress);

        let result = op(Arc::clone(&reporter)).await;

        match result {
            Ok(created) => {
                reporter(100);
                let mut state = lock(&self.state);
                if state.generation == generation {
                    for item in &created {
                        state.upsert(item.clone());
                    }
                } else {
                    debug!("collection reset during create, not appending");
                }
                Ok(created)
            }
            Err(err) => {
                let mut state = lock(&self.state);
                state.progress = None;
                state.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    fn progress_reporter(&self, forward: Option<ProgressFn>) -> ProgressFn {
        let state = Arc::clone(&self.state);
        Arc::new(move |percent: u8| {
            let percent = percent.min(100);
            let advanced = {
                let mut state = lock(&state);
                match state.progress {
                    Some(current) if current >= percent => false,
                    _ => {
                        state.progress = Some(percent);
                        true
                    }
                }
            };
            if advanced {
                if let Some(forward) = &forward {
                    forward(percent);
                }
            }
        })
    }

    /// Drop the collection and invalidate outstanding loads.
    pub fn reset(&self) {
        let mut state = lock(&self.state);
        state.generation += 1;
        state.items.clear();
        state.error = None;
        state.progress = None;
    }

    pub fn items(&self) -> Vec<R> {
        lock(&self.state).items.clone()
    }

    pub fn get(&self, id: &R::Id) -> Option<R> {
        let state = lock(&self.state);
        state.position(id).map(|index| state.items[index].clone())
    }

    pub fn len(&self) -> usize {
        lock(&self.state).items.len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.state).items.is_empty()
    }

    /// Ids with a mutation currently pending.
    pub fn in_flight(&self) -> HashSet<R::Id> {
        lock(&self.state).in_flight.ids()
    }

    pub fn is_in_flight(&self, id: &R::Id) -> bool {
        lock(&self.state).in_flight.contains(id)
    }

    /// A list or create is running.
    pub fn is_loading(&self) -> bool {
        lock(&self.state).loading > 0
    }

    pub fn error(&self) -> Option<String> {
        lock(&self.state).error.clone()
    }

    pub fn clear_error(&self) {
        lock(&self.state).error = None;
    }

    /// Upload progress in percent, while a create runs or after it succeeded.
    pub fn progress(&self) -> Option<u8> {
        lock(&self.state).progress
    }

    pub fn snapshot(&self) -> CollectionSnapshot<R> {
        let state = lock(&self.state);
        CollectionSnapshot {
            items: state.items.clone(),
            in_flight: state.in_flight.ids(),
            loading: state.loading > 0,
            error: state.error.clone(),
            progress: state.progress,
        }
    }
}
