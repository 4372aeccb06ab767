//! Window-local page cache
//!
//! Every window process keeps its own in-memory mirror of the pages and tags
//! it has loaded. Nothing here is persisted; the cache lives and dies with the
//! window. Staleness is tracked explicitly:
//!
//! - `ever_requested`: ids any view has asked for. Never shrinks.
//! - `dirty`: ids known to need a refetch.
//!
//! The set to fetch is `dirty ∪ (ever_requested − loaded)`. The
//! [`Reconciler`] consumes it; [`WindowSession`] decides when pages become
//! dirty.

mod reconcile;
mod session;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, MutexGuard};

use crate::logging::CacheMetrics;
use crate::page::{Page, PageId};

pub use reconcile::{PageSource, ReconcileReport, Reconciler, ReconcilerHandle};
pub use session::WindowSession;

/// A mutation of a [`WindowCache`], broadcast to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheChange {
    Observed(PageId),
    MarkedDirty(Vec<PageId>),
    PageLoaded(PageId),
    TagsLoaded(PageId),
    Evicted(PageId),
}

impl CacheChange {
    /// Whether this change can grow the needs-fetch set
    pub fn wants_fetch(&self) -> bool {
        matches!(self, CacheChange::Observed(_) | CacheChange::MarkedDirty(_))
    }
}

/// Point-in-time copy of the cache contents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheSnapshot {
    pub loaded_pages: BTreeMap<PageId, Page>,
    pub loaded_tags: BTreeMap<PageId, Vec<String>>,
    pub ever_requested: BTreeSet<PageId>,
    pub dirty: BTreeSet<PageId>,
}

impl CacheSnapshot {
    fn needs_fetch(&self) -> Vec<PageId> {
        let unloaded = self
            .ever_requested
            .iter()
            .filter(|id| !self.loaded_pages.contains_key(id));
        self.dirty
            .iter()
            .chain(unloaded)
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Per-window page cache. Shared between the UI thread and the reconciler
/// through an `Arc`.
#[derive(Debug, Default)]
pub struct WindowCache {
    state: Mutex<CacheSnapshot>,
    subscribers: Mutex<Vec<Sender<CacheChange>>>,
    metrics: CacheMetrics,
}

impl WindowCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, CacheSnapshot> {
        // A panic while holding the lock cannot leave the maps half updated,
        // so a poisoned lock is still usable
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn broadcast(&self, change: CacheChange) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subscribers.retain(|tx| tx.send(change.clone()).is_ok());
    }

    /// Receive every subsequent change. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> Receiver<CacheChange> {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .map(|subscribers| subscribers.len())
            .unwrap_or(0)
    }

    /// Register interest in a page. Membership lasts for the life of the
    /// window.
    pub fn observe(&self, id: PageId) {
        let added = self.state().ever_requested.insert(id);
        if added {
            tracing::trace!(page_id = id, "observing page");
            self.broadcast(CacheChange::Observed(id));
        }
    }

    pub fn mark_dirty(&self, id: PageId) {
        self.mark_many_dirty(&[id]);
    }

    pub fn mark_many_dirty(&self, ids: &[PageId]) {
        if ids.is_empty() {
            return;
        }
        self.state().dirty.extend(ids.iter().copied());
        tracing::trace!(count = ids.len(), "marked pages dirty");
        self.broadcast(CacheChange::MarkedDirty(ids.to_vec()));
    }

    /// Cached page, if loaded
    pub fn page(&self, id: PageId) -> Option<Page> {
        let page = self.state().loaded_pages.get(&id).cloned();
        if page.is_some() {
            self.metrics.record_hit();
        } else {
            self.metrics.record_miss();
        }
        page
    }

    /// Cached tags, if loaded
    pub fn tags(&self, id: PageId) -> Option<Vec<String>> {
        self.state().loaded_tags.get(&id).cloned()
    }

    pub fn loaded_ids(&self) -> Vec<PageId> {
        self.state().loaded_pages.keys().copied().collect()
    }

    pub fn is_dirty(&self, id: PageId) -> bool {
        self.state().dirty.contains(&id)
    }

    /// Sorted ids that need a fetch right now
    pub fn needs_fetch(&self) -> Vec<PageId> {
        self.state().needs_fetch()
    }

    /// Snapshot the needs-fetch set and clear `dirty` in one step, so fetches
    /// already in flight are not requested again
    pub fn take_needs_fetch(&self) -> Vec<PageId> {
        let mut state = self.state();
        let ids = state.needs_fetch();
        state.dirty.clear();
        ids
    }

    pub fn merge_page(&self, page: Page) {
        let id = page.id;
        self.state().loaded_pages.insert(id, page);
        self.broadcast(CacheChange::PageLoaded(id));
    }

    pub fn merge_tags(&self, id: PageId, tags: Vec<String>) {
        self.state().loaded_tags.insert(id, tags);
        self.broadcast(CacheChange::TagsLoaded(id));
    }

    /// Forget a loaded page. It stays observed.
    pub fn evict(&self, id: PageId) {
        let removed = {
            let mut state = self.state();
            state.dirty.remove(&id);
            state.loaded_tags.remove(&id);
            state.loaded_pages.remove(&id).is_some()
        };
        if removed {
            self.broadcast(CacheChange::Evicted(id));
        }
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        self.state().clone()
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests;
