//! Integration tests for the pagewiki CLI
//!
//! Each invocation is a separate process, so these also exercise the store
//! being shared between independent "windows".

mod common;

use std::fs;

use common::{json_output, new_page, pagewiki, wiki};
use predicates::prelude::*;
use tempfile::tempdir;

// ============================================================================
// Help, version, exit codes
// ============================================================================

#[test]
fn test_help_flag() {
    pagewiki()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: pagewiki"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("related"));
}

#[test]
fn test_no_command_prints_version() {
    pagewiki()
        .assert()
        .success()
        .stdout(predicate::str::contains("pagewiki"));
}

#[test]
fn test_unknown_format_exit_code_2() {
    let dir = tempdir().unwrap();
    wiki(dir.path())
        .args(["--format", "records", "list"])
        .assert()
        .code(2);
}

#[test]
fn test_missing_page_exit_code_3() {
    let dir = tempdir().unwrap();
    wiki(dir.path())
        .args(["show", "42"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("page not found: 42"));
}

#[test]
fn test_json_error_envelope() {
    let dir = tempdir().unwrap();
    let output = wiki(dir.path())
        .args(["--format", "json", "delete", "9"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    let error: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(error["error"]["type"], "page_not_found");
    assert_eq!(error["error"]["code"], 3);
}

// ============================================================================
// Store setup
// ============================================================================

#[test]
fn test_init_is_idempotent() {
    let dir = tempdir().unwrap();
    wiki(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized store"));
    assert!(dir.path().join("config.toml").exists());
    assert!(dir.path().join("pagewiki.db").exists());

    new_page(dir.path(), "Survives re-init");
    wiki(dir.path()).arg("init").assert().success();

    let status = json_output(dir.path(), &["status"]);
    assert_eq!(status["pages"], 1);
}

#[test]
fn test_database_file_from_config() {
    let dir = tempdir().unwrap();
    let config: toml::Table = toml::from_str("database_file = \"notes.sqlite\"").unwrap();
    fs::write(
        dir.path().join("config.toml"),
        toml::to_string(&config).unwrap(),
    )
    .unwrap();

    new_page(dir.path(), "custom file");
    assert!(dir.path().join("notes.sqlite").exists());
    assert!(!dir.path().join("pagewiki.db").exists());
}

// ============================================================================
// Pages
// ============================================================================

#[test]
fn test_new_and_show() {
    let dir = tempdir().unwrap();
    let id = new_page(dir.path(), "Hello World\nsecond line");
    assert_eq!(id, 0);

    wiki(dir.path())
        .args(["show", "0"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Hello World\n"))
        .stdout(predicate::str::contains("second line"));

    let page = json_output(dir.path(), &["show", "0"]);
    assert_eq!(page["title"], "Hello World");
    assert_eq!(page["filename"], "0_Hello_World.md");
    assert_eq!(page["view_count"], 2);
    assert!(page["tags"].as_array().unwrap().is_empty());
}

#[test]
fn test_new_reads_stdin() {
    let dir = tempdir().unwrap();
    wiki(dir.path())
        .arg("new")
        .write_stdin("Piped page\nfrom a script\n")
        .assert()
        .success()
        .stdout("0\n");

    let page = json_output(dir.path(), &["show", "0"]);
    assert_eq!(page["title"], "Piped page");
}

#[test]
fn test_new_rejects_empty_text() {
    let dir = tempdir().unwrap();
    wiki(dir.path()).args(["new", "   "]).assert().code(2);
}

#[test]
fn test_edit_updates_title_and_index() {
    let dir = tempdir().unwrap();
    new_page(dir.path(), "Draft title\nold words");
    wiki(dir.path())
        .args(["edit", "0", "Final title\nnew words"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved page 0: Final title"));

    wiki(dir.path())
        .args(["search", "old"])
        .assert()
        .success()
        .stdout("");
    wiki(dir.path())
        .args(["search", "new"])
        .assert()
        .success()
        .stdout("0\tFinal title\n");
}

#[test]
fn test_archive_hides_from_list() {
    let dir = tempdir().unwrap();
    new_page(dir.path(), "kept");
    new_page(dir.path(), "hidden");

    wiki(dir.path()).args(["archive", "1"]).assert().success();
    wiki(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout("0\tkept\n");

    wiki(dir.path())
        .args(["archive", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already archived"));

    wiki(dir.path()).args(["unarchive", "1"]).assert().success();
    let pages = json_output(dir.path(), &["list"]);
    assert_eq!(pages.as_array().unwrap().len(), 2);
}

#[test]
fn test_recent_lists_viewed_pages_only() {
    let dir = tempdir().unwrap();
    new_page(dir.path(), "seen");
    new_page(dir.path(), "unseen");
    wiki(dir.path()).args(["show", "0"]).assert().success();

    wiki(dir.path())
        .arg("recent")
        .assert()
        .success()
        .stdout("0\tseen\n");
}

#[test]
fn test_delete_removes_page_tags_and_index_row() {
    let dir = tempdir().unwrap();
    new_page(dir.path(), "Doomed page");
    wiki(dir.path())
        .args(["tag", "set", "0", "solo"])
        .assert()
        .success();

    wiki(dir.path()).args(["delete", "0"]).assert().success();
    wiki(dir.path()).args(["show", "0"]).assert().code(3);

    let conn = rusqlite::Connection::open(dir.path().join("pagewiki.db")).unwrap();
    let count = |sql: &str| -> i64 { conn.query_row(sql, [], |r| r.get(0)).unwrap() };
    assert_eq!(count("SELECT COUNT(*) FROM pages_fts"), 0);
    assert_eq!(count("SELECT COUNT(*) FROM tag_associations"), 0);
    assert_eq!(count("SELECT COUNT(*) FROM tags"), 0);
}

// ============================================================================
// Search
// ============================================================================

#[test]
fn test_find_is_subsequence_match() {
    let dir = tempdir().unwrap();
    new_page(dir.path(), "Apple Banana");
    new_page(dir.path(), "abacus");
    new_page(dir.path(), "xyz");

    let found = json_output(dir.path(), &["find", "ab"]);
    let mut ids: Vec<i64> = found
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect();
    ids.sort();
    assert_eq!(ids, vec![0, 1]);
}

#[test]
fn test_search_title_only() {
    let dir = tempdir().unwrap();
    new_page(dir.path(), "Lisbon trip\nbring sunscreen");
    new_page(dir.path(), "Shopping\nsunscreen");

    let all = json_output(dir.path(), &["search", "sunscreen"]);
    assert_eq!(all.as_array().unwrap().len(), 2);

    wiki(dir.path())
        .args(["search", "--title-only", "lisbon"])
        .assert()
        .success()
        .stdout("0\tLisbon trip\n");
}

// ============================================================================
// Tags
// ============================================================================

#[test]
fn test_tags_and_related_pages() {
    let dir = tempdir().unwrap();
    new_page(dir.path(), "Hello World");
    new_page(dir.path(), "Neighbour");

    wiki(dir.path())
        .args(["tag", "set", "0", "a", "B"])
        .assert()
        .success();
    wiki(dir.path())
        .args(["tag", "set", "1", "a"])
        .assert()
        .success();

    let mut tags: Vec<String> =
        serde_json::from_value(json_output(dir.path(), &["tag", "show", "0"])).unwrap();
    tags.sort();
    assert_eq!(tags, vec!["a", "b"]);

    wiki(dir.path())
        .args(["related", "0"])
        .assert()
        .success()
        .stdout("1\tNeighbour\t1 shared\n");

    wiki(dir.path()).args(["archive", "1"]).assert().success();
    let related = json_output(dir.path(), &["related", "0"]);
    assert!(related.as_array().unwrap().is_empty());
}

#[test]
fn test_tag_listing_and_find() {
    let dir = tempdir().unwrap();
    new_page(dir.path(), "one");
    new_page(dir.path(), "two");
    wiki(dir.path())
        .args(["tag", "set", "0", "travel", "trivia"])
        .assert()
        .success();
    wiki(dir.path())
        .args(["tag", "set", "1", "trivia"])
        .assert()
        .success();

    wiki(dir.path())
        .args(["tag", "list", "--popular"])
        .assert()
        .success()
        .stdout("trivia\t2\ntravel\t1\n");
    wiki(dir.path())
        .args(["tag", "find", "tvl"])
        .assert()
        .success()
        .stdout("travel\t1\n");

    // Clearing every tag leaves nothing to clean up
    wiki(dir.path())
        .args(["tag", "set", "0"])
        .assert()
        .success();
    wiki(dir.path())
        .args(["tag", "list"])
        .assert()
        .success()
        .stdout("trivia\n");
    let cleanup = json_output(dir.path(), &["tag", "cleanup"]);
    assert_eq!(cleanup["removed"], 0);
}

#[test]
fn test_tag_set_on_missing_page() {
    let dir = tempdir().unwrap();
    wiki(dir.path())
        .args(["tag", "set", "5", "x"])
        .assert()
        .code(3);
}

// ============================================================================
// Images and export
// ============================================================================

#[test]
fn test_image_add_list_cleanup() {
    let dir = tempdir().unwrap();
    let files = tempdir().unwrap();
    let picture = files.path().join("map.png");
    fs::write(&picture, [0x89, b'P', b'N', b'G']).unwrap();

    new_page(dir.path(), "Trip");
    let added = json_output(
        dir.path(),
        &["image", "add", "0", picture.to_str().unwrap()],
    );
    assert_eq!(added["mime_type"], "image/png");
    let image_id = added["id"].as_i64().unwrap();

    wiki(dir.path())
        .args(["image", "list", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("image/png\t4 bytes"));

    // Still embedded: nothing to clean up
    let cleanup = json_output(dir.path(), &["image", "cleanup", "0"]);
    assert!(cleanup["removed"].as_array().unwrap().is_empty());

    // Rewriting the page drops the embed, so cleanup removes the attachment
    wiki(dir.path())
        .args(["edit", "0", "Trip\nno pictures"])
        .assert()
        .success();
    let cleanup = json_output(dir.path(), &["image", "cleanup", "0"]);
    assert_eq!(cleanup["removed"][0].as_i64(), Some(image_id));

    wiki(dir.path())
        .args(["image", "rm", &image_id.to_string()])
        .assert()
        .code(3);
}

#[test]
fn test_export_writes_markdown_and_images() {
    let dir = tempdir().unwrap();
    let out = tempdir().unwrap();
    let picture = out.path().join("photo.jpg");
    fs::write(&picture, [0xff, 0xd8]).unwrap();

    new_page(dir.path(), "Hello World\nbody");
    new_page(dir.path(), "Archived");
    wiki(dir.path()).args(["archive", "1"]).assert().success();
    wiki(dir.path())
        .args(["image", "add", "0", picture.to_str().unwrap()])
        .assert()
        .success()
        .stdout("1\n");

    let target = out.path().join("export");
    let report = json_output(dir.path(), &["export", target.to_str().unwrap()]);
    assert_eq!(report["pages"], 1);
    assert_eq!(report["images"], 1);

    let markdown = fs::read_to_string(target.join("0_Hello_World.md")).unwrap();
    assert!(markdown.starts_with("Hello World\n\nbody"));
    assert!(markdown.contains("![photo.jpg](image:1)"));
    assert_eq!(fs::read(target.join("0_1.jpg")).unwrap(), vec![0xff, 0xd8]);
    assert!(!target.join("1_Archived.md").exists());
}
