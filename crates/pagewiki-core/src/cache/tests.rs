use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::tempdir;

use super::*;
use crate::db::{RetryOptions, StoreContext};
use crate::document::JsonDocument;
use crate::error::{Result, WikiError};

fn page(id: PageId, title: &str) -> Page {
    Page {
        id,
        title: Some(title.to_string()),
        filename: crate::document::page_filename(id, Some(title)),
        document: String::new(),
        plain_text: title.to_string(),
        markdown: title.to_string(),
        view_count: 0,
        last_viewed_at: None,
        archived_at: None,
        created_at: None,
        updated_at: None,
    }
}

/// In-memory page source that can be told to fail for some ids
#[derive(Default)]
struct MemorySource {
    pages: Mutex<BTreeMap<PageId, Page>>,
    failing: BTreeSet<PageId>,
    fetches: AtomicUsize,
}

impl MemorySource {
    fn with_pages(pages: &[(PageId, &str)]) -> Self {
        let source = MemorySource::default();
        {
            let mut map = source.pages.lock().unwrap();
            for (id, title) in pages {
                map.insert(*id, page(*id, title));
            }
        }
        source
    }

    fn retitle(&self, id: PageId, title: &str) {
        self.pages.lock().unwrap().insert(id, page(id, title));
    }
}

impl PageSource for MemorySource {
    fn fetch_page(&self, id: PageId) -> Result<Option<Page>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        if self.failing.contains(&id) {
            return Err(WikiError::Other(format!("disk on fire reading {}", id)));
        }
        Ok(self.pages.lock().unwrap().get(&id).cloned())
    }

    fn tags_for_page(&self, id: PageId) -> Result<Vec<String>> {
        Ok(vec![format!("tag{}", id)])
    }
}

fn reconciler(cache: &Arc<WindowCache>, source: &Arc<MemorySource>) -> Reconciler {
    Reconciler::new(Arc::clone(cache), source.clone())
}

#[test]
fn test_needs_fetch_is_dirty_plus_unloaded_requests() {
    let cache = WindowCache::new();
    cache.observe(1);
    cache.observe(2);
    cache.merge_page(page(2, "loaded"));
    cache.mark_dirty(7);
    cache.mark_dirty(2);

    assert_eq!(cache.needs_fetch(), vec![1, 2, 7]);

    let taken = cache.take_needs_fetch();
    assert_eq!(taken, vec![1, 2, 7]);
    // Dirty is cleared, the unloaded request remains
    assert_eq!(cache.needs_fetch(), vec![1]);
    assert!(!cache.is_dirty(7));
}

#[test]
fn test_observe_is_idempotent() {
    let cache = WindowCache::new();
    let rx = cache.subscribe();
    cache.observe(3);
    cache.observe(3);

    assert_eq!(rx.try_recv().unwrap(), CacheChange::Observed(3));
    assert!(rx.try_recv().is_err());
    assert_eq!(cache.snapshot().ever_requested, BTreeSet::from([3]));
}

#[test]
fn test_dirty_page_without_prior_load_is_fetched() {
    let cache = Arc::new(WindowCache::new());
    let source = Arc::new(MemorySource::with_pages(&[(5, "five")]));

    cache.mark_dirty(5);
    let report = reconciler(&cache, &source).reconcile_once();

    assert_eq!(report.loaded, vec![5]);
    let snapshot = cache.snapshot();
    assert_eq!(snapshot.loaded_pages[&5].title.as_deref(), Some("five"));
    assert_eq!(snapshot.loaded_tags[&5], vec!["tag5"]);
    assert!(snapshot.dirty.is_empty());
}

#[test]
fn test_one_failure_does_not_abort_the_batch() {
    let cache = Arc::new(WindowCache::new());
    let source = Arc::new(MemorySource {
        failing: BTreeSet::from([2]),
        ..MemorySource::with_pages(&[(1, "one"), (2, "two"), (3, "three")])
    });

    cache.mark_many_dirty(&[1, 2, 3]);
    let report = reconciler(&cache, &source).reconcile_once();

    assert_eq!(report.loaded, vec![1, 3]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, 2);
    assert!(cache.page(1).is_some());
    assert!(cache.page(2).is_none());
    assert!(cache.page(3).is_some());
    // Dirty was cleared up front, failure or not
    assert!(cache.snapshot().dirty.is_empty());
}

#[test]
fn test_missing_page_is_reported_and_evicted() {
    let cache = Arc::new(WindowCache::new());
    let source = Arc::new(MemorySource::default());
    cache.merge_page(page(4, "deleted elsewhere"));
    cache.mark_dirty(4);

    let report = reconciler(&cache, &source).reconcile_once();
    assert_eq!(report.missing, vec![4]);
    assert!(cache.page(4).is_none());
}

#[test]
fn test_clean_cache_does_no_work() {
    let cache = Arc::new(WindowCache::new());
    let source = Arc::new(MemorySource::with_pages(&[(1, "one")]));
    cache.observe(1);

    let reconciler = reconciler(&cache, &source);
    reconciler.reconcile_once();
    let report = reconciler.reconcile_once();

    assert!(report.is_empty());
    assert_eq!(source.fetches.load(Ordering::Relaxed), 1);
}

#[test]
fn test_page_lookups_count_hits_and_misses() {
    let cache = WindowCache::new();
    cache.merge_page(page(1, "one"));
    cache.page(1);
    cache.page(2);
    assert_eq!(cache.metrics().hits(), 1);
    assert_eq!(cache.metrics().misses(), 1);
}

#[test]
fn test_dropped_subscribers_are_pruned() {
    let cache = WindowCache::new();
    let kept = cache.subscribe();
    let dropped = cache.subscribe();
    assert_eq!(cache.subscriber_count(), 2);

    drop(dropped);
    cache.mark_dirty(1);
    assert_eq!(cache.subscriber_count(), 1);
    assert_eq!(kept.try_recv().unwrap(), CacheChange::MarkedDirty(vec![1]));
}

#[test]
fn test_background_reconciler_loads_observed_pages() {
    let cache = Arc::new(WindowCache::new());
    let source = Arc::new(MemorySource::with_pages(&[(1, "one"), (2, "two")]));
    let changes = cache.subscribe();
    let handle = reconciler(&cache, &source).spawn().unwrap();

    cache.observe(2);
    let deadline = Duration::from_secs(5);
    loop {
        match changes.recv_timeout(deadline).unwrap() {
            CacheChange::TagsLoaded(2) => break,
            _ => continue,
        }
    }
    assert_eq!(cache.page(2).unwrap().title.as_deref(), Some("two"));

    source.retitle(2, "two, edited");
    cache.mark_dirty(2);
    loop {
        match changes.recv_timeout(deadline).unwrap() {
            CacheChange::TagsLoaded(2) => break,
            _ => continue,
        }
    }
    assert_eq!(cache.page(2).unwrap().title.as_deref(), Some("two, edited"));

    handle.stop();
}

fn window(dir: &std::path::Path) -> WindowSession {
    let mut store = StoreContext::open(dir).unwrap();
    store.set_retry_options(RetryOptions {
        delay: Duration::ZERO,
        ..RetryOptions::default()
    });
    WindowSession::new(Arc::new(store))
}

#[test]
fn test_own_writes_are_read_back() {
    let dir = tempdir().unwrap();
    let session = window(dir.path());

    let created = session
        .create_page(&JsonDocument::from_plain_text("Draft"), None)
        .unwrap();
    session.observe(created.id);
    session.reconcile();
    assert_eq!(
        session.page(created.id).unwrap().title.as_deref(),
        Some("Draft")
    );

    session
        .save_page(created.id, &JsonDocument::from_plain_text("Final"), None)
        .unwrap();
    session.set_tags(created.id, &["Done"]).unwrap();
    assert!(session.cache().is_dirty(created.id));

    session.reconcile();
    assert_eq!(
        session.page(created.id).unwrap().title.as_deref(),
        Some("Final")
    );
    assert_eq!(session.tags(created.id).unwrap(), vec!["done"]);
}

#[test]
fn test_other_window_writes_wait_for_focus() {
    let dir = tempdir().unwrap();
    let window_a = window(dir.path());
    let window_b = window(dir.path());

    let page = window_a
        .create_page(&JsonDocument::from_plain_text("Original"), None)
        .unwrap();
    window_a.observe(page.id);
    window_a.reconcile();
    window_a.focus_lost();

    window_b
        .save_page(
            page.id,
            &JsonDocument::from_plain_text("Changed in B"),
            None,
        )
        .unwrap();

    // Without a focus event window A keeps serving its copy
    let report = window_a.reconcile();
    assert!(report.is_empty());
    assert_eq!(
        window_a.page(page.id).unwrap().title.as_deref(),
        Some("Original")
    );

    assert_eq!(window_a.focus_gained(), vec![page.id]);
    assert!(window_a.is_focused());
    window_a.reconcile();
    assert_eq!(
        window_a.page(page.id).unwrap().title.as_deref(),
        Some("Changed in B")
    );
}

fn wait_for_tags(changes: &std::sync::mpsc::Receiver<CacheChange>, id: PageId) {
    loop {
        match changes.recv_timeout(Duration::from_secs(5)).unwrap() {
            CacheChange::TagsLoaded(loaded) if loaded == id => break,
            _ => continue,
        }
    }
}

#[test]
fn test_session_reconciler_refreshes_on_focus() {
    let dir = tempdir().unwrap();
    let window_a = window(dir.path());
    let window_b = window(dir.path());
    let page = window_b
        .create_page(&JsonDocument::from_plain_text("Before"), None)
        .unwrap();

    let changes = window_a.cache().subscribe();
    let handle = window_a.spawn_reconciler().unwrap();

    window_a.observe(page.id);
    wait_for_tags(&changes, page.id);
    assert_eq!(
        window_a.page(page.id).unwrap().title.as_deref(),
        Some("Before")
    );

    window_a.focus_lost();
    window_b
        .save_page(page.id, &JsonDocument::from_plain_text("After"), None)
        .unwrap();
    window_a.focus_gained();
    wait_for_tags(&changes, page.id);
    assert_eq!(
        window_a.page(page.id).unwrap().title.as_deref(),
        Some("After")
    );

    handle.stop();
}

#[test]
fn test_delete_evicts_but_keeps_observation() {
    let dir = tempdir().unwrap();
    let session = window(dir.path());
    let page = session
        .create_page(&JsonDocument::from_plain_text("Short lived"), None)
        .unwrap();
    session.observe(page.id);
    session.reconcile();
    assert!(session.page(page.id).is_some());

    assert!(session.delete_page(page.id).unwrap());
    assert!(session.page(page.id).is_none());
    assert!(session.cache().snapshot().ever_requested.contains(&page.id));

    let report = session.reconcile();
    assert_eq!(report.missing, vec![page.id]);
}

#[test]
fn test_archive_and_view_mark_dirty() {
    let dir = tempdir().unwrap();
    let session = window(dir.path());
    let page = session
        .create_page(&JsonDocument::from_plain_text("Viewed"), None)
        .unwrap();
    session.reconcile();

    assert!(session.mark_viewed(page.id).unwrap());
    session.reconcile();
    assert_eq!(session.page(page.id).unwrap().view_count, 1);

    assert!(session.archive(page.id).unwrap());
    session.reconcile();
    assert!(!session.page(page.id).unwrap().is_live());

    assert!(session.unarchive(page.id).unwrap());
    session.reconcile();
    assert!(session.page(page.id).unwrap().is_live());
}
