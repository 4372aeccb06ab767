use assert_cmd::{cargo::cargo_bin_cmd, Command};
use std::path::Path;

pub fn pagewiki() -> Command {
    cargo_bin_cmd!("pagewiki")
}

/// Command bound to a store directory
pub fn wiki(store: &Path) -> Command {
    let mut cmd = pagewiki();
    cmd.arg("--store").arg(store);
    cmd
}

/// Create a page and return its id
#[allow(dead_code)]
pub fn new_page(store: &Path, text: &str) -> i64 {
    let output = wiki(store).args(["new", text]).output().unwrap();
    assert!(
        output.status.success(),
        "new failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .and_then(|line| line.trim().parse().ok())
        .expect("page id on first line")
}

/// Run a command with `--format json` and parse stdout
#[allow(dead_code)]
pub fn json_output(store: &Path, args: &[&str]) -> serde_json::Value {
    let output = wiki(store)
        .arg("--format")
        .arg("json")
        .args(args)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}
