//! Daily schedule log: which view the day uses and which blocks are done.
//!
//! Exactly one record exists per (owner, date). `completed` is a set, so
//! toggling an index on twice or off when absent changes nothing.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{Datelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::datekey::DateKey;
use crate::error::{Error, Result};
use crate::events::{ChangeBus, SCHEDULE_CHANGED};
use crate::record::{DailyRecordStore, Loaded, Outcome, Record, RecordKey, Sequence};
use crate::remote::RemoteStore;
use crate::session::OwnerId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleView {
    #[default]
    Weekday,
    Weekend,
}

impl ScheduleView {
    /// View a date uses when nothing was chosen.
    pub fn for_date(date: DateKey) -> Self {
        match date.date().weekday() {
            Weekday::Sat | Weekday::Sun => ScheduleView::Weekend,
            _ => ScheduleView::Weekday,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleView::Weekday => "weekday",
            ScheduleView::Weekend => "weekend",
        }
    }
}

impl fmt::Display for ScheduleView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduleView {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekday" => Ok(ScheduleView::Weekday),
            "weekend" => Ok(ScheduleView::Weekend),
            other => Err(Error::InvalidArgument(format!(
                "unknown schedule view '{other}' (expected weekday|weekend)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyScheduleLog {
    #[serde(rename = "log_date")]
    pub date: DateKey,
    #[serde(default)]
    pub view: ScheduleView,
    #[serde(default)]
    pub completed: BTreeSet<u32>,
}

impl DailyScheduleLog {
    pub fn new(date: DateKey, view: ScheduleView) -> Self {
        Self {
            date,
            view,
            completed: BTreeSet::new(),
        }
    }

    /// Mark block `index` done or not done. Returns whether the set changed.
    pub fn toggle(&mut self, index: u32, done: bool) -> bool {
        toggle_completion(&mut self.completed, index, done)
    }

    pub fn is_done(&self, index: u32) -> bool {
        self.completed.contains(&index)
    }
}

/// Set insert/remove; idempotent both ways.
pub fn toggle_completion(completed: &mut BTreeSet<u32>, index: u32, done: bool) -> bool {
    if done {
        completed.insert(index)
    } else {
        completed.remove(&index)
    }
}

impl Record for DailyScheduleLog {
    const TABLE: &'static str = "schedule_logs";
    const CHANNEL: &'static str = SCHEDULE_CHANGED;

    fn default_for(key: &RecordKey) -> Self {
        let date = key.date.unwrap_or_else(crate::datekey::today);
        DailyScheduleLog::new(date, ScheduleView::for_date(date))
    }
}

pub struct ScheduleLog {
    store: DailyRecordStore<DailyScheduleLog>,
}

impl ScheduleLog {
    /// `fixed_view` pins the default view; `None` picks it by weekday.
    pub fn new(remote: Arc<dyn RemoteStore>, bus: Arc<ChangeBus>, fixed_view: Option<ScheduleView>) -> Self {
        let store = DailyRecordStore::new(remote, bus);
        let store = match fixed_view {
            Some(view) => store.with_default(move |key: &RecordKey| {
                let date = key.date.unwrap_or_else(crate::datekey::today);
                DailyScheduleLog::new(date, view)
            }),
            None => store,
        };
        Self { store }
    }

    pub fn with_sequence(mut self, seq: Sequence) -> Self {
        self.store = self.store.with_sequence(seq);
        self
    }

    pub async fn load(&self, owner: Option<&OwnerId>, date: DateKey) -> Loaded<DailyScheduleLog> {
        self.store.load(owner, &RecordKey::day(date)).await
    }

    pub async fn set_view(
        &self,
        owner: Option<&OwnerId>,
        date: DateKey,
        view: ScheduleView,
    ) -> Outcome<DailyScheduleLog> {
        self.store
            .update(owner, &RecordKey::day(date), |log| {
                log.view = view;
                Ok(())
            })
            .await
    }

    pub async fn toggle_completion(
        &self,
        owner: Option<&OwnerId>,
        date: DateKey,
        index: u32,
        done: bool,
    ) -> Outcome<DailyScheduleLog> {
        self.store
            .update(owner, &RecordKey::day(date), |log| {
                log.toggle(index, done);
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{LoadSource, WriteStatus};
    use crate::remote::MemoryRemote;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(s: &str) -> DateKey {
        s.parse().expect("date")
    }

    #[test]
    fn toggling_is_a_set_operation() {
        let mut set = BTreeSet::new();
        assert!(toggle_completion(&mut set, 3, true));
        assert!(!toggle_completion(&mut set, 3, true));
        assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec![3]);

        assert!(!toggle_completion(&mut set, 5, false));
        assert!(toggle_completion(&mut set, 3, false));
        assert!(set.is_empty());
    }

    #[test]
    fn default_view_follows_weekday() {
        assert_eq!(ScheduleView::for_date(key("2024-03-05")), ScheduleView::Weekday);
        assert_eq!(ScheduleView::for_date(key("2024-03-09")), ScheduleView::Weekend);
        assert_eq!("Weekend".parse::<ScheduleView>().unwrap(), ScheduleView::Weekend);
        assert!("holiday".parse::<ScheduleView>().is_err());
    }

    #[test]
    fn row_shape_uses_persisted_names() {
        let mut log = DailyScheduleLog::new(key("2024-03-05"), ScheduleView::Weekday);
        log.toggle(2, true);
        let value = serde_json::to_value(&log).unwrap();
        assert_eq!(
            value,
            json!({"log_date": "2024-03-05", "view": "weekday", "completed": [2]})
        );

        let parsed: DailyScheduleLog = serde_json::from_value(json!({
            "user_id": "alice",
            "log_date": "2024-03-05",
            "view": "weekend",
            "completed": [4, 1, 4]
        }))
        .unwrap();
        assert_eq!(parsed.completed.len(), 2);
        assert_eq!(parsed.view, ScheduleView::Weekend);
    }

    #[tokio::test]
    async fn double_toggle_keeps_single_entry() {
        let remote = Arc::new(MemoryRemote::new());
        let bus = Arc::new(ChangeBus::new());
        let changes = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&changes);
        bus.subscribe(SCHEDULE_CHANGED, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        let log = ScheduleLog::new(remote.clone(), bus, None);
        let owner = OwnerId::new("alice").unwrap();
        let date = key("2024-03-05");

        log.toggle_completion(Some(&owner), date, 3, true).await;
        let outcome = log.toggle_completion(Some(&owner), date, 3, true).await;
        assert_eq!(outcome.status, WriteStatus::Persisted);
        assert_eq!(outcome.value.completed.iter().copied().collect::<Vec<_>>(), vec![3]);

        let rows = remote.rows(DailyScheduleLog::TABLE);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["completed"], json!([3]));
        assert_eq!(changes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn set_view_and_reload() {
        let remote = Arc::new(MemoryRemote::new());
        let log = ScheduleLog::new(remote, Arc::new(ChangeBus::new()), Some(ScheduleView::Weekday));
        let owner = OwnerId::new("alice").unwrap();
        let saturday = key("2024-03-09");

        let first = log.load(Some(&owner), saturday).await;
        assert_eq!(first.source, LoadSource::Created);
        assert_eq!(first.record.view, ScheduleView::Weekday);

        log.set_view(Some(&owner), saturday, ScheduleView::Weekend).await;
        let reloaded = log.load(Some(&owner), saturday).await;
        assert_eq!(reloaded.source, LoadSource::Remote);
        assert_eq!(reloaded.record.view, ScheduleView::Weekend);
        assert_eq!(reloaded.record.date, saturday);
    }

    #[tokio::test]
    async fn days_are_separate_records() {
        let remote = Arc::new(MemoryRemote::new());
        let log = ScheduleLog::new(remote.clone(), Arc::new(ChangeBus::new()), None);
        let owner = OwnerId::new("alice").unwrap();

        log.toggle_completion(Some(&owner), key("2024-03-05"), 1, true).await;
        let next_day = log.load(Some(&owner), key("2024-03-06")).await.record;
        assert!(next_day.completed.is_empty());
        assert_eq!(remote.rows(DailyScheduleLog::TABLE).len(), 2);
    }
}
