//! Remote row store boundary.
//!
//! The record store only needs three operations from its backend, per table:
//! `find_one` by natural key, `insert` unless the key is taken, and `upsert`
//! on a conflict key. Rows
//! are flat JSON objects whose column names are the persisted field names
//! (`user_id`, `log_date`, `goal`, ...).
//!
//! Two backends ship with the crate:
//! - [`MemoryRemote`]: in-process tables with call recording and fault
//!   injection, for tests and guest-free demos
//! - [`FileRemote`]: one JSON file per table, guarded by file locks and
//!   written atomically, used by the CLI

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::lock::{self, DEFAULT_LOCK_TIMEOUT_MS};

/// A persisted row.
pub type Row = serde_json::Map<String, Value>;

/// Column/value pairs identifying one logical record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NaturalKey {
    fields: Vec<(String, Value)>,
}

impl NaturalKey {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((column.into(), value.into()));
        self
    }

    pub fn columns(&self) -> Vec<&str> {
        self.fields.iter().map(|(column, _)| column.as_str()).collect()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Whether every key column of `row` holds the key's value.
    pub fn matches(&self, row: &Row) -> bool {
        self.fields
            .iter()
            .all(|(column, value)| row.get(column) == Some(value))
    }

    /// Write the key columns into `row`.
    pub fn apply_to(&self, row: &mut Row) {
        for (column, value) in &self.fields {
            row.insert(column.clone(), value.clone());
        }
    }
}

/// Key built from the conflict columns of an existing row.
fn conflict_key_of(row: &Row, conflict_key: &[&str]) -> NaturalKey {
    conflict_key.iter().fold(NaturalKey::new(), |key, column| {
        key.with(*column, row.get(*column).cloned().unwrap_or(Value::Null))
    })
}

/// Backend collaborator for the record store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// First row of `table` matching `key`, if any.
    async fn find_one(&self, table: &str, key: &NaturalKey) -> Result<Option<Row>>;

    /// Append `row` unless a row with the same `conflict_key` columns
    /// already exists. Returns whether it was appended. The check and the
    /// append happen atomically, so racing lazy creations leave one row.
    async fn insert(&self, table: &str, row: Row, conflict_key: &[&str]) -> Result<bool>;

    /// Replace the row whose `conflict_key` columns match, or append.
    /// Last writer wins; nothing is merged.
    async fn upsert(&self, table: &str, row: Row, conflict_key: &[&str]) -> Result<()>;
}

fn insert_into(rows: &mut Vec<Row>, row: Row, conflict_key: &[&str]) -> bool {
    let key = conflict_key_of(&row, conflict_key);
    if rows.iter().any(|existing| key.matches(existing)) {
        return false;
    }
    rows.push(row);
    true
}

fn upsert_into(rows: &mut Vec<Row>, row: Row, conflict_key: &[&str]) {
    let key = conflict_key_of(&row, conflict_key);
    match rows.iter_mut().find(|existing| key.matches(existing)) {
        Some(existing) => *existing = row,
        None => rows.push(row),
    }
}

// =============================================================================
// In-memory backend
// =============================================================================

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    FindOne { table: String },
    Insert { table: String },
    Upsert { table: String },
}

impl RemoteCall {
    pub fn is_write(&self) -> bool {
        !matches!(self, RemoteCall::FindOne { .. })
    }
}

/// In-process tables with call recording and fault injection.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    calls: Mutex<Vec<RemoteCall>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent read fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent insert/upsert fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// All calls received so far, oldest first.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn write_count(&self) -> usize {
        self.calls().iter().filter(|call| call.is_write()).count()
    }

    /// Snapshot of a table's rows.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, call: RemoteCall) {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(call);
    }

    fn check_write(&self, table: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::RemoteWrite {
                table: table.to_string(),
                reason: "injected write failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn find_one(&self, table: &str, key: &NaturalKey) -> Result<Option<Row>> {
        self.record(RemoteCall::FindOne {
            table: table.to_string(),
        });
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::RemoteRead {
                table: table.to_string(),
                reason: "injected read failure".to_string(),
            });
        }

        let tables = self
            .tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(tables
            .get(table)
            .and_then(|rows| rows.iter().find(|row| key.matches(row)).cloned()))
    }

    async fn insert(&self, table: &str, row: Row, conflict_key: &[&str]) -> Result<bool> {
        self.record(RemoteCall::Insert {
            table: table.to_string(),
        });
        self.check_write(table)?;

        let mut tables = self
            .tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(insert_into(tables.entry(table.to_string()).or_default(), row, conflict_key))
    }

    async fn upsert(&self, table: &str, row: Row, conflict_key: &[&str]) -> Result<()> {
        self.record(RemoteCall::Upsert {
            table: table.to_string(),
        });
        self.check_write(table)?;

        let mut tables = self
            .tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        upsert_into(tables.entry(table.to_string()).or_default(), row, conflict_key);
        Ok(())
    }
}

// =============================================================================
// File backend
// =============================================================================

/// Tables stored as `<dir>/<table>.json` (a JSON array of rows).
///
/// Every operation takes the table's lock file, so several CLI processes can
/// share one directory.
#[derive(Debug, Clone)]
pub struct FileRemote {
    dir: PathBuf,
    lock_timeout_ms: u64,
}

impl FileRemote {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    pub fn with_lock_timeout(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a table file.
    pub fn table_file(&self, table: &str) -> Result<PathBuf> {
        let valid = !table.is_empty()
            && table
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
        if !valid {
            return Err(Error::InvalidArgument(format!("invalid table name: {table}")));
        }
        Ok(self.dir.join(format!("{table}.json")))
    }

    async fn run_blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|err| Error::Io(std::io::Error::other(err.to_string())))?
    }
}

fn read_table(path: &Path) -> Result<Vec<Row>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&content)?)
}

fn write_table(path: &Path, rows: &[Row]) -> Result<()> {
    let json = serde_json::to_string_pretty(rows)?;
    lock::write_atomic(path, json.as_bytes())
}

#[async_trait]
impl RemoteStore for FileRemote {
    async fn find_one(&self, table: &str, key: &NaturalKey) -> Result<Option<Row>> {
        let path = self.table_file(table)?;
        let timeout = self.lock_timeout_ms;
        let key = key.clone();
        self.run_blocking(move || {
            lock::with_locked(&path, timeout, |path| {
                let rows = read_table(path)?;
                Ok(rows.into_iter().find(|row| key.matches(row)))
            })
        })
        .await
    }

    async fn insert(&self, table: &str, row: Row, conflict_key: &[&str]) -> Result<bool> {
        let path = self.table_file(table)?;
        let timeout = self.lock_timeout_ms;
        let conflict_key: Vec<String> = conflict_key.iter().map(|c| c.to_string()).collect();
        self.run_blocking(move || {
            lock::with_locked(&path, timeout, |path| {
                let mut rows = read_table(path)?;
                let columns: Vec<&str> = conflict_key.iter().map(String::as_str).collect();
                if !insert_into(&mut rows, row, &columns) {
                    return Ok(false);
                }
                write_table(path, &rows)?;
                Ok(true)
            })
        })
        .await
    }

    async fn upsert(&self, table: &str, row: Row, conflict_key: &[&str]) -> Result<()> {
        let path = self.table_file(table)?;
        let timeout = self.lock_timeout_ms;
        let conflict_key: Vec<String> = conflict_key.iter().map(|c| c.to_string()).collect();
        self.run_blocking(move || {
            lock::with_locked(&path, timeout, |path| {
                let mut rows = read_table(path)?;
                let columns: Vec<&str> = conflict_key.iter().map(String::as_str).collect();
                upsert_into(&mut rows, row, &columns);
                write_table(path, &rows)
            })
        })
        .await
    }
}
