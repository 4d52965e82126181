mod support;

use std::fs;

use predicates::str::contains;

use support::{run_json, TestRoot};

#[test]
fn owner_set_persists_and_show_reads() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::new();

    root.cmd()
        .args(["owner", "set", "alice"])
        .assert()
        .success()
        .stdout(contains("alice"));

    let contents = fs::read_to_string(root.path().join("owner"))?;
    assert!(contents.contains("alice"));

    root.cmd()
        .args(["owner", "show"])
        .assert()
        .success()
        .stdout(contains("routine owner: alice"));

    Ok(())
}

#[test]
fn persisted_owner_is_used_for_writes() {
    let root = TestRoot::new();
    root.cmd().args(["owner", "set", "alice"]).assert().success();

    let mut cmd = root.cmd();
    cmd.args(["--json", "--today", "2024-01-01", "streak", "log", "run"]);
    let logged = run_json(&mut cmd);
    assert_eq!(logged["owner"], "alice");
    assert_eq!(logged["write"]["status"], "persisted");
    assert_eq!(root.read_table("goal_streaks")[0]["user_id"], "alice");
}

#[test]
fn env_owner_overrides_persisted() {
    let root = TestRoot::new();
    root.cmd().args(["owner", "set", "alice"]).assert().success();

    root.cmd()
        .env("ROUTINE_OWNER", "bob")
        .args(["owner", "show"])
        .assert()
        .success()
        .stdout(contains("bob"));
}

#[test]
fn owner_clear_returns_to_guest() {
    let root = TestRoot::new();
    root.cmd().args(["owner", "set", "alice"]).assert().success();

    let mut cmd = root.cmd();
    cmd.args(["--json", "owner", "clear"]);
    let cleared = run_json(&mut cmd);
    assert_eq!(cleared["removed"], true);

    let mut cmd = root.cmd();
    cmd.args(["--json", "owner", "show"]);
    let shown = run_json(&mut cmd);
    assert_eq!(shown["signed_in"], false);
    assert_eq!(shown["owner"], serde_json::Value::Null);
}

#[test]
fn blank_owner_is_rejected() {
    let root = TestRoot::new();
    root.cmd()
        .args(["owner", "set", "   "])
        .assert()
        .code(2)
        .stderr(contains("owner cannot be empty"));
}
