mod support;

use serde_json::json;

use support::{envelope, run_json, TestRoot};

#[test]
fn unset_trip_is_not_zero_days() {
    let root = TestRoot::new();

    let shown = run_json(root.json_as("alice", "2024-06-01").args(["trip", "show", "japan"]));
    assert_eq!(shown["countdown"], json!({"kind": "unset"}));
    assert_eq!(shown["date"], serde_json::Value::Null);
}

#[test]
fn trip_set_and_clear() {
    let root = TestRoot::new();

    let set = run_json(
        root.json_as("alice", "2024-06-01")
            .args(["trip", "set", "japan", "--date", "2024-06-15"]),
    );
    assert_eq!(set["countdown"], json!({"kind": "days", "days": 14}));

    let later = run_json(root.json_as("alice", "2024-06-20").args(["trip", "show", "japan"]));
    assert_eq!(later["countdown"], json!({"kind": "days", "days": -5}));

    let cleared = run_json(root.json_as("alice", "2024-06-20").args(["trip", "clear", "japan"]));
    assert_eq!(cleared["countdown"], json!({"kind": "unset"}));

    let rows = root.read_table("scheduled_events");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["goal"], "japan");
    assert_eq!(rows[0]["scheduled_date"], serde_json::Value::Null);
}

#[test]
fn plan_fields_set_and_clear_independently() {
    let root = TestRoot::new();

    let set = run_json(root.json_as("alice", "2024-06-01").args([
        "plan",
        "set",
        "long_run",
        "--date",
        "2024-06-08",
        "--distance",
        "21.1",
        "--notes",
        "river loop",
    ]));
    assert_eq!(set["date"], "2024-06-08");
    assert_eq!(set["distance"], 21.1);
    assert_eq!(set["notes"], "river loop");

    let cleared = run_json(
        root.json_as("alice", "2024-06-01")
            .args(["plan", "set", "long_run", "--clear-distance"]),
    );
    assert_eq!(cleared["distance"], serde_json::Value::Null);
    assert_eq!(cleared["date"], "2024-06-08");
    assert_eq!(cleared["notes"], "river loop");

    let shown = run_json(root.json_as("alice", "2024-06-01").args(["plan", "show", "long_run"]));
    assert_eq!(shown["countdown"], json!({"kind": "days", "days": 7}));
}

#[test]
fn plan_and_trip_goals_share_one_table() {
    let root = TestRoot::new();
    run_json(
        root.json_as("alice", "2024-06-01")
            .args(["plan", "set", "long_run", "--date", "2024-06-08"]),
    );
    run_json(
        root.json_as("alice", "2024-06-01")
            .args(["trip", "set", "japan", "--date", "2024-09-01"]),
    );

    assert_eq!(root.read_table("scheduled_events").len(), 2);
}

#[test]
fn plan_set_without_changes_is_user_error() {
    let root = TestRoot::new();
    let (code, env) = envelope(root.json_as("alice", "2024-06-01").args(["plan", "set", "long_run"]));
    assert_eq!(code, 2);
    assert_eq!(env["error"]["kind"], "user_error");
}
