#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// Throwaway data root for one test.
pub struct TestRoot {
    dir: TempDir,
}

impl TestRoot {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn tables_dir(&self) -> PathBuf {
        self.dir.path().join("tables")
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(".routine.toml");
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Rows of a table file, or empty when it was never written.
    pub fn read_table(&self, table: &str) -> Vec<Value> {
        let path = self.tables_dir().join(format!("{table}.json"));
        if !path.exists() {
            return Vec::new();
        }
        let contents = fs::read_to_string(path).expect("read table");
        serde_json::from_str(&contents).expect("parse table")
    }

    /// `routine` bound to this root, isolated from the caller's environment.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("routine").expect("binary");
        cmd.env("ROUTINE_ROOT", self.path())
            .env_remove("ROUTINE_OWNER")
            .env_remove("ROUTINE_TODAY")
            .env_remove("RUST_LOG");
        cmd
    }

    /// `routine --json` as `owner` on `today`.
    pub fn json_as(&self, owner: &str, today: &str) -> Command {
        let mut cmd = self.cmd();
        cmd.args(["--json", "--owner", owner, "--today", today]);
        cmd
    }
}

/// Run a command that must succeed and return its JSON `data`.
pub fn run_json(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("run routine");
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let envelope: Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(envelope["status"], "success");
    envelope["data"].clone()
}

/// Full JSON envelope of a command, regardless of exit status.
pub fn envelope(cmd: &mut Command) -> (i32, Value) {
    let output = cmd.output().expect("run routine");
    let code = output.status.code().unwrap_or(-1);
    let envelope: Value = serde_json::from_slice(&output.stdout).expect("json output");
    (code, envelope)
}
