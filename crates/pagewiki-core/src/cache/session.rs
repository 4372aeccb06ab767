//! Cross-window consistency rules for one window
//!
//! Consistency model: read-your-writes within a window, eventual and
//! focus-triggered across windows. A window refetches a page when it wrote
//! the page itself or when it regains focus. Writes from another window stay
//! invisible until then.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{ReconcileReport, Reconciler, ReconcilerHandle, WindowCache};
use crate::db::StoreContext;
use crate::document::Document;
use crate::error::Result;
use crate::page::{Page, PageId};

/// Store handle and cache of a single window process
#[derive(Debug)]
pub struct WindowSession {
    store: Arc<StoreContext>,
    cache: Arc<WindowCache>,
    focused: AtomicBool,
}

impl WindowSession {
    /// New session with an empty cache. Windows start focused.
    pub fn new(store: Arc<StoreContext>) -> Self {
        Self::with_cache(store, Arc::new(WindowCache::new()))
    }

    pub fn with_cache(store: Arc<StoreContext>, cache: Arc<WindowCache>) -> Self {
        WindowSession {
            store,
            cache,
            focused: AtomicBool::new(true),
        }
    }

    pub fn store(&self) -> &Arc<StoreContext> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<WindowCache> {
        &self.cache
    }

    pub fn is_focused(&self) -> bool {
        self.focused.load(Ordering::Relaxed)
    }

    /// The window came to the front: every loaded page is presumed stale.
    ///
    /// Returns the ids marked dirty.
    pub fn focus_gained(&self) -> Vec<PageId> {
        self.focused.store(true, Ordering::Relaxed);
        let loaded = self.cache.loaded_ids();
        self.cache.mark_many_dirty(&loaded);
        tracing::debug!(
            pages = loaded.len(),
            "window focused, refreshing loaded pages"
        );
        loaded
    }

    /// The window lost focus. Nothing is invalidated.
    pub fn focus_lost(&self) {
        self.focused.store(false, Ordering::Relaxed);
    }

    pub fn observe(&self, id: PageId) {
        self.cache.observe(id);
    }

    pub fn page(&self, id: PageId) -> Option<Page> {
        self.cache.page(id)
    }

    pub fn tags(&self, id: PageId) -> Option<Vec<String>> {
        self.cache.tags(id)
    }

    fn reconciler(&self) -> Reconciler {
        Reconciler::new(Arc::clone(&self.cache), self.store.clone())
    }

    /// Run one reconcile pass on the calling thread
    pub fn reconcile(&self) -> ReconcileReport {
        self.reconciler().reconcile_once()
    }

    /// Start a background reconciler for this window
    pub fn spawn_reconciler(&self) -> std::io::Result<ReconcilerHandle> {
        self.reconciler().spawn()
    }

    pub fn create_page(&self, document: &impl Document, title: Option<&str>) -> Result<Page> {
        let page = self.store.create_page(document, title)?;
        self.cache.mark_dirty(page.id);
        Ok(page)
    }

    pub fn save_page(
        &self,
        id: PageId,
        document: &impl Document,
        title: Option<&str>,
    ) -> Result<Page> {
        let page = self.store.upsert_page(id, document, title)?;
        self.cache.mark_dirty(id);
        Ok(page)
    }

    pub fn set_tags<S: AsRef<str>>(&self, id: PageId, tags: &[S]) -> Result<Vec<String>> {
        let applied = self.store.set_tags_for_page(id, tags)?;
        self.cache.mark_dirty(id);
        Ok(applied)
    }

    pub fn mark_viewed(&self, id: PageId) -> Result<bool> {
        let changed = self.store.mark_viewed(id)?;
        if changed {
            self.cache.mark_dirty(id);
        }
        Ok(changed)
    }

    pub fn archive(&self, id: PageId) -> Result<bool> {
        let changed = self.store.archive_page(id)?;
        if changed {
            self.cache.mark_dirty(id);
        }
        Ok(changed)
    }

    pub fn unarchive(&self, id: PageId) -> Result<bool> {
        let changed = self.store.unarchive_page(id)?;
        if changed {
            self.cache.mark_dirty(id);
        }
        Ok(changed)
    }

    /// Delete a page and drop it from this window's cache
    pub fn delete_page(&self, id: PageId) -> Result<bool> {
        let deleted = self.store.delete_page(id)?;
        self.cache.evict(id);
        Ok(deleted)
    }
}
