//! Generic daily record store.
//!
//! [`DailyRecordStore<R>`] implements the record lifecycle shared by every
//! tracker:
//!
//! - `load`: guest -> in-memory default, nothing persisted. Row found ->
//!   decoded record. No row -> default row inserted if still absent (lazy
//!   creation) and returned. Read failure -> warning + default.
//! - `save`: guest -> dropped (`Ephemeral`). Otherwise upsert on the natural
//!   key (last writer wins) and, only if that succeeded, broadcast on the
//!   record's channel.
//! - `update`: load -> pure transformation -> save, returning the new state
//!   (or the last durable state if the write failed). When the load fell back
//!   to defaults because the remote could not be read, nothing is saved: the
//!   change is kept in memory only, as for a guest.
//!
//! Same-key `update`s from two actors race: both load the same row and the
//! second upsert silently discards the first one's change. The store does
//! no merging or compare-and-swap.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::datekey::DateKey;
use crate::error::{Error, Result};
use crate::events::ChangeBus;
use crate::remote::{NaturalKey, RemoteStore, Row};
use crate::session::OwnerId;

pub const OWNER_COLUMN: &str = "user_id";
pub const DATE_COLUMN: &str = "log_date";
pub const GOAL_COLUMN: &str = "goal";

/// A record shape persisted through a [`DailyRecordStore`].
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Remote table holding these records.
    const TABLE: &'static str;
    /// Channel notified after a successful save.
    const CHANNEL: &'static str;

    /// Record used when nothing is stored yet.
    fn default_for(key: &RecordKey) -> Self;
}

/// Which record of an owner: by day, by goal, or both.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub date: Option<DateKey>,
    pub goal: Option<String>,
}

impl RecordKey {
    pub fn day(date: DateKey) -> Self {
        Self {
            date: Some(date),
            goal: None,
        }
    }

    pub fn goal(goal: impl Into<String>) -> Self {
        Self {
            date: None,
            goal: Some(goal.into()),
        }
    }

    pub fn goal_day(goal: impl Into<String>, date: DateKey) -> Self {
        Self {
            date: Some(date),
            goal: Some(goal.into()),
        }
    }

    /// Natural key columns for `owner`.
    pub fn natural_key(&self, owner: &OwnerId) -> NaturalKey {
        let mut key = NaturalKey::new().with(OWNER_COLUMN, owner.as_str());
        if let Some(date) = &self.date {
            key = key.with(DATE_COLUMN, date.to_string());
        }
        if let Some(goal) = &self.goal {
            key = key.with(GOAL_COLUMN, goal.as_str());
        }
        key
    }
}

/// Where a loaded record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Existing remote row.
    Remote,
    /// No row existed; a default one was created.
    Created,
    /// No owner; default kept in memory only.
    Guest,
    /// Remote read failed; default kept in memory only.
    Fallback,
    /// Stored row could not be decoded; default used, the next save
    /// replaces the row.
    Unreadable,
}

/// Result of a `load`, tagged with a sequence number.
///
/// Sequence numbers grow with every load and save issued by a store, so a
/// consumer can tell which of two in-flight results is newer.
#[derive(Debug, Clone)]
pub struct Loaded<R> {
    pub record: R,
    pub seq: u64,
    pub source: LoadSource,
}

/// How a mutation ended up persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum WriteStatus {
    /// Upserted and broadcast.
    Persisted,
    /// No owner; change kept nowhere.
    Ephemeral,
    /// Remote write failed; state rolled back, nothing broadcast.
    Failed(String),
    /// Transformation refused the change; nothing written.
    Rejected(String),
}

impl WriteStatus {
    pub fn is_persisted(&self) -> bool {
        matches!(self, WriteStatus::Persisted)
    }
}

/// State returned by a mutation, plus how it was persisted.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub value: T,
    pub status: WriteStatus,
    pub seq: u64,
}

impl<T> Outcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            status: self.status,
            seq: self.seq,
        }
    }
}

type DefaultFactory<R> = Arc<dyn Fn(&RecordKey) -> R + Send + Sync>;

/// Source of load/save sequence numbers.
///
/// Clones share one counter, so stores built for the same records (one per
/// tracker call) still hand out strictly increasing numbers.
#[derive(Debug, Clone, Default)]
pub struct Sequence(Arc<AtomicU64>);

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Remote-backed store for one record shape.
pub struct DailyRecordStore<R: Record> {
    remote: Arc<dyn RemoteStore>,
    bus: Arc<ChangeBus>,
    default: DefaultFactory<R>,
    seq: Sequence,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> DailyRecordStore<R> {
    pub fn new(remote: Arc<dyn RemoteStore>, bus: Arc<ChangeBus>) -> Self {
        Self {
            remote,
            bus,
            default: Arc::new(R::default_for),
            seq: Sequence::new(),
            _record: PhantomData,
        }
    }

    /// Replace the default factory (e.g. with configured targets).
    pub fn with_default<F>(mut self, factory: F) -> Self
    where
        F: Fn(&RecordKey) -> R + Send + Sync + 'static,
    {
        self.default = Arc::new(factory);
        self
    }

    /// Draw sequence numbers from `seq` instead of a private counter.
    pub fn with_sequence(mut self, seq: Sequence) -> Self {
        self.seq = seq;
        self
    }

    pub fn bus(&self) -> &Arc<ChangeBus> {
        &self.bus
    }

    pub fn default_record(&self, key: &RecordKey) -> R {
        (self.default)(key)
    }

    fn next_seq(&self) -> u64 {
        self.seq.next()
    }

    /// Read the record for `key`, creating a default row on first read.
    pub async fn load(&self, owner: Option<&OwnerId>, key: &RecordKey) -> Loaded<R> {
        let seq = self.next_seq();
        let Some(owner) = owner else {
            return Loaded {
                record: self.default_record(key),
                seq,
                source: LoadSource::Guest,
            };
        };

        let natural = key.natural_key(owner);
        let found = match self.remote.find_one(R::TABLE, &natural).await {
            Ok(found) => found,
            Err(err) => {
                let err = read_failure(R::TABLE, err);
                tracing::warn!(table = R::TABLE, owner = %owner, error = %err, "remote read failed; using defaults");
                return Loaded {
                    record: self.default_record(key),
                    seq,
                    source: LoadSource::Fallback,
                };
            }
        };

        match found {
            Some(row) => match decode::<R>(row) {
                Ok(record) => Loaded {
                    record,
                    seq,
                    source: LoadSource::Remote,
                },
                Err(err) => {
                    tracing::warn!(table = R::TABLE, owner = %owner, error = %err, "stored row is unreadable; using defaults");
                    Loaded {
                        record: self.default_record(key),
                        seq,
                        source: LoadSource::Unreadable,
                    }
                }
            },
            None => {
                let record = self.default_record(key);
                match encode(&record, &natural) {
                    Ok(row) => match self.remote.insert(R::TABLE, row, &natural.columns()).await {
                        Ok(true) => {
                            tracing::debug!(table = R::TABLE, owner = %owner, "created default record");
                        }
                        Ok(false) => {
                            tracing::debug!(table = R::TABLE, owner = %owner, "default record already created");
                        }
                        Err(err) => {
                            tracing::warn!(table = R::TABLE, owner = %owner, error = %err, "lazy create failed");
                        }
                    },
                    Err(err) => {
                        tracing::warn!(table = R::TABLE, error = %err, "cannot encode default record");
                    }
                }
                Loaded {
                    record,
                    seq,
                    source: LoadSource::Created,
                }
            }
        }
    }

    /// Upsert `record` and broadcast on success.
    ///
    /// Guests get `Ok(Ephemeral)` with no remote call. A failed write is an
    /// `Err(RemoteWrite)` and emits nothing.
    pub async fn save(
        &self,
        owner: Option<&OwnerId>,
        key: &RecordKey,
        record: &R,
    ) -> Result<WriteStatus> {
        let Some(owner) = owner else {
            tracing::debug!(table = R::TABLE, "no owner; save dropped");
            return Ok(WriteStatus::Ephemeral);
        };

        let natural = key.natural_key(owner);
        let row = encode(record, &natural).map_err(|err| write_failure(R::TABLE, err))?;
        self.remote
            .upsert(R::TABLE, row, &natural.columns())
            .await
            .map_err(|err| write_failure(R::TABLE, err))?;

        tracing::debug!(table = R::TABLE, owner = %owner, "record saved");
        self.bus.emit(R::CHANNEL);
        Ok(WriteStatus::Persisted)
    }

    /// Load, transform, save.
    ///
    /// If `f` fails the change is `Rejected` and nothing is written. If the
    /// write fails the returned value is the loaded (last durable) record.
    /// If the remote could not be read, the change is applied to the default
    /// but never saved, so a stored row is not clobbered by it.
    pub async fn update<F>(&self, owner: Option<&OwnerId>, key: &RecordKey, f: F) -> Outcome<R>
    where
        F: FnOnce(&mut R) -> Result<()>,
    {
        let loaded = self.load(owner, key).await;
        let mut next = loaded.record.clone();

        if let Err(err) = f(&mut next) {
            tracing::warn!(table = R::TABLE, error = %err, "mutation rejected");
            return Outcome {
                value: loaded.record,
                status: WriteStatus::Rejected(err.to_string()),
                seq: self.next_seq(),
            };
        }

        if loaded.source == LoadSource::Fallback {
            tracing::warn!(table = R::TABLE, "remote unreadable; change kept in memory only");
            return Outcome {
                value: next,
                status: WriteStatus::Failed(format!(
                    "could not read {}; change not saved",
                    R::TABLE
                )),
                seq: self.next_seq(),
            };
        }

        match self.save(owner, key, &next).await {
            Ok(status) => Outcome {
                value: next,
                status,
                seq: self.next_seq(),
            },
            Err(err) => {
                tracing::warn!(table = R::TABLE, error = %err, "save failed; keeping last durable state");
                Outcome {
                    value: loaded.record,
                    status: WriteStatus::Failed(err.to_string()),
                    seq: self.next_seq(),
                }
            }
        }
    }
}

fn read_failure(table: &str, err: Error) -> Error {
    match err {
        Error::RemoteRead { .. } => err,
        other => Error::RemoteRead {
            table: table.to_string(),
            reason: other.to_string(),
        },
    }
}

fn write_failure(table: &str, err: Error) -> Error {
    match err {
        Error::RemoteWrite { .. } => err,
        other => Error::RemoteWrite {
            table: table.to_string(),
            reason: other.to_string(),
        },
    }
}

fn encode<R: Record>(record: &R, key: &NaturalKey) -> Result<Row> {
    let mut row = match serde_json::to_value(record)? {
        Value::Object(map) => map,
        other => {
            return Err(Error::InvalidArgument(format!(
                "{} record must serialize to an object, got {other}",
                R::TABLE
            )))
        }
    };
    key.apply_to(&mut row);
    Ok(row)
}

fn decode<R: Record>(row: Row) -> Result<R> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

/// Latest applied load for one key.
///
/// A slow load that resolves after a newer load (or mutation) has already
/// been applied is discarded instead of overwriting fresher state.
#[derive(Debug, Clone)]
pub struct RecordView<R> {
    current: Option<R>,
    seq: u64,
}

impl<R> Default for RecordView<R> {
    fn default() -> Self {
        Self {
            current: None,
            seq: 0,
        }
    }
}

impl<R: Clone> RecordView<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a load result. Returns false if it was stale.
    pub fn apply(&mut self, loaded: Loaded<R>) -> bool {
        self.accept(loaded.seq, loaded.record)
    }

    /// Apply a mutation result. Returns false if it was stale.
    pub fn apply_outcome(&mut self, outcome: &Outcome<R>) -> bool {
        self.accept(outcome.seq, outcome.value.clone())
    }

    pub fn current(&self) -> Option<&R> {
        self.current.as_ref()
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    fn accept(&mut self, seq: u64, record: R) -> bool {
        if self.current.is_some() && seq <= self.seq {
            tracing::debug!(seq, current = self.seq, "discarding stale result");
            return false;
        }
        self.seq = seq;
        self.current = Some(record);
        true
    }
}
