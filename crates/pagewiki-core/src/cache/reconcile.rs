use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Serialize;

use super::WindowCache;
use crate::db::StoreContext;
use crate::error::Result;
use crate::page::{Page, PageId};
use crate::{log_cache_metrics, trace_time};

/// How often an idle worker checks for a stop request
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Where the reconciler reads pages from
pub trait PageSource: Send + Sync {
    fn fetch_page(&self, id: PageId) -> Result<Option<Page>>;
    fn tags_for_page(&self, id: PageId) -> Result<Vec<String>>;
}

impl PageSource for StoreContext {
    fn fetch_page(&self, id: PageId) -> Result<Option<Page>> {
        StoreContext::fetch_page(self, id)
    }

    fn tags_for_page(&self, id: PageId) -> Result<Vec<String>> {
        StoreContext::tags_for_page(self, id)
    }
}

/// Outcome of one reconcile pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub loaded: Vec<PageId>,
    /// Requested ids with no page in the store
    pub missing: Vec<PageId>,
    pub failed: Vec<(PageId, String)>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty() && self.missing.is_empty() && self.failed.is_empty()
    }
}

/// Refetches stale and missing pages into a [`WindowCache`]
#[derive(Clone)]
pub struct Reconciler {
    cache: Arc<WindowCache>,
    source: Arc<dyn PageSource>,
}

impl Reconciler {
    pub fn new(cache: Arc<WindowCache>, source: Arc<dyn PageSource>) -> Self {
        Reconciler { cache, source }
    }

    /// Fetch everything in the needs-fetch set once.
    ///
    /// `dirty` is cleared before the first fetch. A failure for one id is
    /// recorded in the report and does not stop the others.
    pub fn reconcile_once(&self) -> ReconcileReport {
        let ids = self.cache.take_needs_fetch();
        let mut report = ReconcileReport::default();
        if ids.is_empty() {
            return report;
        }

        let start = Instant::now();
        for id in ids {
            match self.load(id) {
                Ok(true) => report.loaded.push(id),
                Ok(false) => {
                    self.cache.evict(id);
                    report.missing.push(id);
                }
                Err(e) => {
                    tracing::warn!(page_id = id, error = %e, "failed to refresh cached page");
                    report.failed.push((id, e.to_string()));
                }
            }
        }

        trace_time!(
            start,
            "reconcile",
            loaded = report.loaded.len(),
            failed = report.failed.len()
        );
        log_cache_metrics!(self.cache.metrics(), "reconcile");
        report
    }

    fn load(&self, id: PageId) -> Result<bool> {
        let Some(page) = self.source.fetch_page(id)? else {
            return Ok(false);
        };
        let tags = self.source.tags_for_page(id)?;
        self.cache.merge_page(page);
        self.cache.merge_tags(id, tags);
        self.cache.metrics().record_refetch();
        Ok(true)
    }

    /// Run passes on a background thread whenever a page is observed or
    /// marked dirty. The worker's own merges do not wake it.
    pub fn spawn(self) -> std::io::Result<ReconcilerHandle> {
        let changes = self.cache.subscribe();
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name("pagewiki-reconciler".to_string())
            .spawn(move || {
                tracing::debug!("reconciler started");
                self.reconcile_once();
                while !worker_stop.load(Ordering::Relaxed) {
                    match changes.recv_timeout(IDLE_POLL) {
                        Ok(change) => {
                            let mut wanted = change.wants_fetch();
                            // Coalesce a burst of changes into a single pass
                            while let Ok(next) = changes.try_recv() {
                                wanted |= next.wants_fetch();
                            }
                            if wanted {
                                self.reconcile_once();
                            }
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                tracing::debug!("reconciler stopped");
            })?;

        Ok(ReconcilerHandle {
            stop,
            thread: Some(thread),
        })
    }
}

/// Owner of a background reconciler. Dropping it stops the worker.
#[derive(Debug)]
pub struct ReconcilerHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ReconcilerHandle {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("reconciler thread panicked");
            }
        }
    }
}

impl Drop for ReconcilerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
