mod open;

use std::time::Duration;

use tempfile::{tempdir, TempDir};

use crate::db::{RetryOptions, StoreContext};
use crate::document::JsonDocument;
use crate::page::Page;

/// Store in a throwaway directory with zero retry delay
pub(super) fn test_store() -> (TempDir, StoreContext) {
    let dir = tempdir().unwrap();
    let mut store = StoreContext::open(dir.path()).unwrap();
    store.set_retry_options(RetryOptions {
        delay: Duration::ZERO,
        ..RetryOptions::default()
    });
    (dir, store)
}

pub(super) fn create(store: &StoreContext, text: &str) -> Page {
    store
        .create_page(&JsonDocument::from_plain_text(text), None)
        .unwrap()
}
