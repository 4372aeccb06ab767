use super::{create, test_store};
use crate::config::{StoreConfig, CONFIG_FILE};
use crate::db::StoreContext;
use tempfile::tempdir;

#[test]
fn test_open_is_lazy() {
    let (dir, store) = test_store();
    assert!(!store.is_open());
    assert!(!dir.path().join("pagewiki.db").exists());

    assert_eq!(store.page_count().unwrap(), 0);
    assert!(store.is_open());
    assert!(dir.path().join("pagewiki.db").exists());
}

#[test]
fn test_reset_drops_handle_and_reopens() {
    let (_dir, store) = test_store();
    create(&store, "first");
    assert!(store.is_open());

    store.reset();
    assert!(!store.is_open());

    // Data survives; the next call reopens and re-bootstraps
    assert_eq!(store.page_count().unwrap(), 1);
    assert!(store.is_open());
}

#[test]
fn test_pragmas_applied() {
    let (_dir, store) = test_store();
    let (journal, fk): (String, i64) = store
        .with_connection(|conn| {
            let journal = conn.query_row("PRAGMA journal_mode", [], |r| r.get(0))?;
            let fk = conn.query_row("PRAGMA foreign_keys", [], |r| r.get(0))?;
            Ok((journal, fk))
        })
        .unwrap();
    assert_eq!(journal.to_lowercase(), "wal");
    assert_eq!(fk, 1);
}

#[test]
fn test_database_file_from_config() {
    let dir = tempdir().unwrap();
    let config = StoreConfig {
        database_file: "wiki.sqlite".to_string(),
        ..Default::default()
    };
    config.save(&dir.path().join(CONFIG_FILE)).unwrap();

    let store = StoreContext::open(dir.path()).unwrap();
    create(&store, "hello");
    assert!(dir.path().join("wiki.sqlite").exists());
    assert!(!dir.path().join("pagewiki.db").exists());
}

#[test]
fn test_two_contexts_share_one_file() {
    let dir = tempdir().unwrap();
    let window_a = StoreContext::open(dir.path()).unwrap();
    let window_b = StoreContext::open(dir.path()).unwrap();

    let page = create(&window_a, "Shared page");
    let seen = window_b.fetch_page(page.id).unwrap().unwrap();
    assert_eq!(seen.title.as_deref(), Some("Shared page"));
}
