use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

#[allow(deprecated)]
fn drift(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("drift").expect("binary");
    cmd.current_dir(root)
        .env("DRIFT_EMBEDDING_MODE", "hashing")
        .env_remove("RUST_LOG");
    cmd
}

fn run_json(root: &Path, args: &[&str]) -> Value {
    let output = drift(root).args(args).output().expect("command run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid json")
}

fn setup_repo() -> tempfile::TempDir {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join("docs")).unwrap();
    fs::write(
        root.join("src/auth.rs"),
        r#"/// Check the user password and open a session.
pub fn login(user: &str, password: &str) -> Option<Session> {
    if verify_password(user, password) {
        Some(open_session(user))
    } else {
        None
    }
}

pub fn logout(session: Session) {
    close_session(session);
}
"#,
    )
    .unwrap();
    fs::write(
        root.join("docs/auth.md"),
        "# Login\n\nThe login function checks the user password and opens a session for the user.\n\n## Logout\n\nCall logout to close the session.\n",
    )
    .unwrap();
    temp
}

#[test]
fn index_then_stats_and_search() {
    let temp = setup_repo();
    let root = temp.path();

    let outcome = run_json(root, &["index", "--json"]);
    assert_eq!(outcome["indexed"], 2);
    assert_eq!(outcome["errors"], 0);
    assert!(root.join(".drift/index.json").is_file());

    let stats = run_json(root, &["stats", "--json"]);
    assert!(stats["items"].as_u64().unwrap() >= 4);
    assert!(stats["files"]["src/auth.rs"].as_u64().unwrap() >= 2);
    assert_eq!(stats["files"]["docs/auth.md"], 2);
    assert_eq!(stats["model_id"], "hashing-384");

    let hits = run_json(
        root,
        &["search", "open a session", "--kind", "code", "--json", "-k", "1"],
    );
    let hits = hits.as_array().expect("hits array");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["chunk"]["file_path"], "src/auth.rs");
}

#[test]
fn sync_picks_up_new_files_only() {
    let temp = setup_repo();
    let root = temp.path();
    run_json(root, &["index", "--json"]);

    let unchanged = run_json(root, &["sync", "--json"]);
    assert_eq!(unchanged["indexed"], 0);
    assert_eq!(unchanged["removed"], 0);

    fs::write(root.join("docs/faq.md"), "# FAQ\n\nSessions expire after one hour.\n").unwrap();
    fs::remove_file(root.join("docs/auth.md")).unwrap();

    let synced = run_json(root, &["sync", "--json"]);
    assert_eq!(synced["indexed"], 1);
    assert_eq!(synced["removed"], 1);

    let stats = run_json(root, &["stats", "--json"]);
    assert!(stats["files"]["docs/faq.md"].is_number());
    assert!(stats["files"]["docs/auth.md"].is_null());
}

#[test]
fn check_exit_code_follows_overall_severity() {
    let temp = setup_repo();
    let root = temp.path();
    run_json(root, &["index", "--json"]);

    let output = drift(root).args(["check", "--json"]).output().unwrap();
    let report: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(report["checked"], 2);
    let critical = report["overall"] == "critical";
    assert_eq!(output.status.code(), Some(if critical { 1 } else { 0 }));
}

#[test]
fn strict_thresholds_fail_the_check() {
    let temp = setup_repo();
    let root = temp.path();
    fs::create_dir_all(root.join(".drift")).unwrap();
    fs::write(
        root.join(".drift/config.toml"),
        "[linter]\ncritical_threshold = 1.0\nwarning_threshold = 1.0\nhealthy_threshold = 1.0\nmin_score = 0.0\n",
    )
    .unwrap();
    run_json(root, &["index", "--json"]);

    drift(root)
        .args(["check", "--path", "docs/"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("[critical] docs/auth.md"));
}

#[test]
fn check_on_empty_index_is_clean() {
    let temp = tempdir().unwrap();
    drift(temp.path())
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 doc chunks checked"));
}

#[test]
fn clear_empties_the_index() {
    let temp = setup_repo();
    let root = temp.path();
    run_json(root, &["index", "--json"]);

    drift(root)
        .arg("clear")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed"));

    let stats = run_json(root, &["stats", "--json"]);
    assert_eq!(stats["items"], 0);
}

#[test]
fn invalid_config_is_reported() {
    let temp = setup_repo();
    let root = temp.path();
    let config = root.join("custom.toml");
    fs::write(&config, "[linter]\ntop_k = 0\n").unwrap();

    drift(root)
        .args(["--config", config.to_str().unwrap(), "stats"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("top_k"));
}

#[test]
fn root_flag_must_point_to_a_directory() {
    let temp = tempdir().unwrap();
    drift(temp.path())
        .args(["--root", "missing", "stats"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a directory"));
}
