use std::path::Path;
use std::process::Command as StdCommand;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn git(dir: &Path, args: &[&str]) {
    let status = StdCommand::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap();
    assert!(status.success(), "git {args:?} failed");
}

fn init_repo(dir: &Path) {
    git(dir, &["init", "-q"]);
    git(dir, &["config", "user.name", "Test User"]);
    git(dir, &["config", "user.email", "test@example.com"]);
}

fn decree(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("decree").unwrap();
    cmd.current_dir(dir)
        .env_remove("DECREE_HOOK_RUNNING")
        .env_remove("DECREE_SKIP");
    cmd
}

fn initialized_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    init_repo(dir.path());
    decree(dir.path()).arg("init").assert().success();
    dir
}

#[test]
fn test_init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    init_repo(dir.path());

    decree(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Decree initialized."));
    decree(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already initialized"));
}

#[test]
fn test_commands_require_init() {
    let dir = TempDir::new().unwrap();
    init_repo(dir.path());

    decree(dir.path())
        .args(["list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

#[test]
fn test_new_assigns_sequential_ids() {
    let dir = initialized_repo();

    decree(dir.path())
        .args(["new", "-m", "Use Postgres for persistence"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created DR-0001"));
    decree(dir.path())
        .args(["new", "-m", "Adopt trunk-based development"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created DR-0002"));
}

#[test]
fn test_new_reads_body_from_stdin() {
    let dir = initialized_repo();

    decree(dir.path())
        .arg("new")
        .write_stdin("Ship weekly\n\nWe release every Friday.")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created DR-0001"));

    decree(dir.path())
        .args(["show", "DR-0001", "--body"])
        .assert()
        .success()
        .stdout(predicate::str::contains("We release every Friday."));
}

#[test]
fn test_show_resolves_bare_numbers() {
    let dir = initialized_repo();
    decree(dir.path())
        .args(["new", "-m", "Pin toolchain versions"])
        .assert()
        .success();

    decree(dir.path())
        .args(["show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Record:  DR-0001"));
    decree(dir.path())
        .args(["show", "DR-0042"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("DR-0042"));
}

#[test]
fn test_show_json_output() {
    let dir = initialized_repo();
    decree(dir.path())
        .args(["new", "-m", "Pin toolchain versions", "--tag", "build"])
        .assert()
        .success();

    let output = decree(dir.path())
        .args(["show", "DR-0001", "--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["id"], "DR-0001");
    assert_eq!(value["status"], "draft");
    assert_eq!(value["tags"][0], "build");
}

#[test]
fn test_list_filters_by_status() {
    let dir = initialized_repo();
    decree(dir.path())
        .args(["new", "-m", "Accepted thing", "--status", "accepted"])
        .assert()
        .success();
    decree(dir.path())
        .args(["new", "-m", "Draft thing"])
        .assert()
        .success();

    decree(dir.path())
        .args(["list", "--status", "accepted"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("DR-0001").and(predicate::str::contains("DR-0002").not()),
        );
}

#[test]
fn test_rm_removes_record_and_search_entry() {
    let dir = initialized_repo();
    decree(dir.path())
        .args(["new", "-m", "Use vendored protobuf"])
        .assert()
        .success();

    decree(dir.path())
        .args(["rm", "DR-0001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed DR-0001"));
    decree(dir.path())
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No decision records found."));
    decree(dir.path())
        .args(["search", "protobuf"])
        .assert()
        .success()
        .stderr(predicate::str::contains("No results"));
}

#[test]
fn test_search_finds_new_records() {
    let dir = initialized_repo();
    decree(dir.path())
        .args(["new", "-m", "Adopt Kafka for event streaming"])
        .assert()
        .success();

    decree(dir.path())
        .args(["search", "kafka"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DR-0001"));
}

#[test]
fn test_supersede_updates_both_records() {
    let dir = initialized_repo();
    decree(dir.path())
        .args(["new", "-m", "Use MySQL"])
        .assert()
        .success();
    decree(dir.path())
        .args(["new", "-m", "Use Postgres", "--supersedes", "DR-0001"])
        .assert()
        .success();

    decree(dir.path())
        .args(["show", "DR-0001"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("superseded").and(predicate::str::contains("Superseded by: DR-0002")),
        );
    decree(dir.path())
        .args(["show", "DR-0002"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Supersedes: DR-0001"));
}

#[test]
fn test_reindex_check_detects_staleness() {
    let dir = initialized_repo();
    decree(dir.path())
        .args(["new", "-m", "Something"])
        .assert()
        .success();

    decree(dir.path())
        .args(["reindex", "--check"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Index is current."));

    // Drop the index ref behind the store's back.
    git(dir.path(), &["update-ref", "-d", "refs/notes/decree-index"]);
    decree(dir.path())
        .args(["reindex", "--check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("stale"));

    decree(dir.path()).arg("reindex").assert().success();
    decree(dir.path())
        .args(["reindex", "--check"])
        .assert()
        .success();
}

#[test]
fn test_push_pull_between_clones() {
    let root = TempDir::new().unwrap();
    let origin = root.path().join("origin.git");
    git(root.path(), &["init", "-q", "--bare", "origin.git"]);

    let a = root.path().join("a");
    let b = root.path().join("b");
    for clone in [&a, &b] {
        std::fs::create_dir(clone).unwrap();
        init_repo(clone);
        git(clone, &["remote", "add", "origin", origin.to_str().unwrap()]);
        decree(clone).arg("init").assert().success();
    }

    decree(&a)
        .args(["new", "-m", "Records sync through origin"])
        .assert()
        .success();
    decree(&a)
        .arg("push")
        .assert()
        .success()
        .stderr(predicate::str::contains("Pushed 2 ref(s)"));

    decree(&b)
        .arg("pull")
        .assert()
        .success()
        .stderr(predicate::str::contains("Merged").and(predicate::str::contains("Reindexed")));
    decree(&b)
        .args(["show", "DR-0001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Records sync through origin"));
}

#[test]
fn test_sync_merges_divergent_writes() {
    let root = TempDir::new().unwrap();
    let origin = root.path().join("origin.git");
    git(root.path(), &["init", "-q", "--bare", "origin.git"]);

    let a = root.path().join("a");
    let b = root.path().join("b");
    for clone in [&a, &b] {
        std::fs::create_dir(clone).unwrap();
        init_repo(clone);
        git(clone, &["remote", "add", "origin", origin.to_str().unwrap()]);
        decree(clone).arg("init").assert().success();
    }

    decree(&a)
        .args(["new", "-m", "From clone a", "--id", "DR-A"])
        .assert()
        .success();
    decree(&b)
        .args(["new", "-m", "From clone b", "--id", "DR-B"])
        .assert()
        .success();

    decree(&a).arg("sync").assert().success();
    decree(&b).arg("sync").assert().success();
    decree(&a).arg("sync").assert().success();

    for clone in [&a, &b] {
        decree(clone)
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("DR-A").and(predicate::str::contains("DR-B")));
    }
}

#[test]
fn test_hooks_install_status_uninstall() {
    let dir = initialized_repo();
    let hook = dir.path().join(".git/hooks/pre-push");

    decree(dir.path())
        .args(["hooks", "install"])
        .assert()
        .success()
        .stdout(predicate::str::contains("installed"));
    assert!(hook.exists());

    decree(dir.path())
        .args(["hooks", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pre-push: installed"));

    decree(dir.path())
        .args(["hooks", "uninstall"])
        .assert()
        .success()
        .stdout(predicate::str::contains("removed"));
    assert!(!hook.exists());
}

#[test]
fn test_hook_handler_stands_down_when_guarded() {
    let dir = initialized_repo();

    let mut cmd = decree(dir.path());
    cmd.env("DECREE_HOOK_RUNNING", "1");
    cmd.args(["hook-handler", "pre-push", "origin"])
        .assert()
        .success();

    let mut cmd = decree(dir.path());
    cmd.env("DECREE_SKIP", "1");
    cmd.args(["hook-handler", "pre-push", "origin"])
        .assert()
        .success();
}

#[test]
fn test_version_prints_package_version() {
    let dir = TempDir::new().unwrap();
    init_repo(dir.path());

    decree(dir.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
