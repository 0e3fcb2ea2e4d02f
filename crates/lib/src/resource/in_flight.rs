//! Per-entity in-flight tracking.

use std::{
    collections::{HashMap, HashSet},
    hash::Hash,
    sync::{Arc, Mutex},
};

use super::manager::CollectionState;
use super::Resource;

/// Ids with a mutation pending, counted so overlapping mutations of the same
/// id keep it marked until the last one finishes.
#[derive(Debug)]
pub(crate) struct InFlight<Id> {
    pending: HashMap<Id, usize>,
}

impl<Id> Default for InFlight<Id> {
    fn default() -> Self {
        Self {
            pending: HashMap::new(),
        }
    }
}

impl<Id: Eq + Hash + Clone> InFlight<Id> {
    pub(crate) fn insert(&mut self, id: Id) {
        *self.pending.entry(id).or_insert(0) += 1;
    }

    pub(crate) fn remove(&mut self, id: &Id) {
        if let Some(count) = self.pending.get_mut(id) {
            *count -= 1;
            if *count == 0 {
                self.pending.remove(id);
            }
        }
    }

    pub(crate) fn contains(&self, id: &Id) -> bool {
        self.pending.contains_key(id)
    }

    pub(crate) fn ids(&self) -> HashSet<Id> {
        self.pending.keys().cloned().collect()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Marks an id as in flight for as long as it lives.
///
/// Dropping the guard, on success, failure, or when the owning future is
/// cancelled, releases the id exactly once.
pub(crate) struct InFlightGuard<R: Resource> {
    state: Arc<Mutex<CollectionState<R>>>,
    id: Option<R::Id>,
}

impl<R: Resource> InFlightGuard<R> {
    pub(crate) fn acquire(state: &Arc<Mutex<CollectionState<R>>>, id: R::Id) -> Self {
        {
            let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());
            guard.in_flight.insert(id.clone());
            guard.error = None;
        }
        Self {
            state: Arc::clone(state),
            id: Some(id),
        }
    }
}

impl<R: Resource> Drop for InFlightGuard<R> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
            guard.in_flight.remove(&id);
        }
    }
}
