//! Date-scheduled goals: the long-run planner and the trip countdown.
//!
//! Both persist a [`ScheduledEventState`] per goal. Nothing ties
//! `scheduled_date` to today; past dates are stored as given.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::datekey::{diff_days, DateKey};
use crate::error::{Error, Result};
use crate::events::{ChangeBus, PLAN_CHANGED};
use crate::record::{DailyRecordStore, Loaded, Outcome, Record, RecordKey, Sequence};
use crate::remote::RemoteStore;
use crate::session::OwnerId;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEventState {
    #[serde(default)]
    pub scheduled_date: Option<DateKey>,
    #[serde(default)]
    pub aux_numeric: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Record for ScheduledEventState {
    const TABLE: &'static str = "scheduled_events";
    const CHANNEL: &'static str = PLAN_CHANGED;

    fn default_for(_key: &RecordKey) -> Self {
        ScheduledEventState::default()
    }
}

/// Change to one optional field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldPatch<T> {
    Keep,
    Set(T),
    Clear,
}

impl<T> Default for FieldPatch<T> {
    fn default() -> Self {
        FieldPatch::Keep
    }
}

impl<T> FieldPatch<T> {
    fn apply_to(self, field: &mut Option<T>) {
        match self {
            FieldPatch::Keep => {}
            FieldPatch::Set(value) => *field = Some(value),
            FieldPatch::Clear => *field = None,
        }
    }

    pub fn is_keep(&self) -> bool {
        matches!(self, FieldPatch::Keep)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPatch {
    pub scheduled_date: FieldPatch<DateKey>,
    pub aux_numeric: FieldPatch<f64>,
    pub notes: FieldPatch<String>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        self.scheduled_date.is_keep() && self.aux_numeric.is_keep() && self.notes.is_keep()
    }
}

impl ScheduledEventState {
    /// Apply a patch. Non-finite numbers are refused; blank notes clear.
    pub fn apply(&mut self, patch: EventPatch) -> Result<()> {
        if let FieldPatch::Set(value) = &patch.aux_numeric {
            if !value.is_finite() {
                return Err(Error::InvalidArgument(format!(
                    "numeric value must be finite, got {value}"
                )));
            }
        }

        let notes = match patch.notes {
            FieldPatch::Set(text) if text.trim().is_empty() => FieldPatch::Clear,
            FieldPatch::Set(text) => FieldPatch::Set(text.trim().to_string()),
            other => other,
        };

        patch.scheduled_date.apply_to(&mut self.scheduled_date);
        patch.aux_numeric.apply_to(&mut self.aux_numeric);
        notes.apply_to(&mut self.notes);
        Ok(())
    }
}

/// Days until a scheduled date, or explicitly unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "days", rename_all = "snake_case")]
pub enum Countdown {
    Unset,
    Days(i64),
}

impl Countdown {
    pub fn from_state(state: &ScheduledEventState, today: DateKey) -> Self {
        match state.scheduled_date {
            Some(date) => Countdown::Days(diff_days(today, date)),
            None => Countdown::Unset,
        }
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Countdown::Unset => f.write_str("unset"),
            Countdown::Days(0) => f.write_str("today"),
            Countdown::Days(1) => f.write_str("1 day left"),
            Countdown::Days(-1) => f.write_str("1 day ago"),
            Countdown::Days(n) if *n > 0 => write!(f, "{n} days left"),
            Countdown::Days(n) => write!(f, "{} days ago", -n),
        }
    }
}

fn scheduled_store(remote: Arc<dyn RemoteStore>, bus: Arc<ChangeBus>) -> DailyRecordStore<ScheduledEventState> {
    DailyRecordStore::new(remote, bus)
}

/// Long-run planner: date, distance and notes for the next long run.
pub struct LongRunPlanner {
    goal: String,
    store: DailyRecordStore<ScheduledEventState>,
}

impl LongRunPlanner {
    pub fn new(remote: Arc<dyn RemoteStore>, bus: Arc<ChangeBus>, goal: &str) -> Self {
        Self {
            goal: goal.to_string(),
            store: scheduled_store(remote, bus),
        }
    }

    pub fn with_sequence(mut self, seq: Sequence) -> Self {
        self.store = self.store.with_sequence(seq);
        self
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    fn key(&self) -> RecordKey {
        RecordKey::goal(self.goal.as_str())
    }

    pub async fn load(&self, owner: Option<&OwnerId>) -> Loaded<ScheduledEventState> {
        self.store.load(owner, &self.key()).await
    }

    pub async fn patch(&self, owner: Option<&OwnerId>, patch: EventPatch) -> Outcome<ScheduledEventState> {
        self.store
            .update(owner, &self.key(), |state| state.apply(patch))
            .await
    }
}

/// Trip countdown: a single date and the days left until it.
pub struct TripCountdown {
    goal: String,
    store: DailyRecordStore<ScheduledEventState>,
}

impl TripCountdown {
    pub fn new(remote: Arc<dyn RemoteStore>, bus: Arc<ChangeBus>, goal: &str) -> Self {
        Self {
            goal: goal.to_string(),
            store: scheduled_store(remote, bus),
        }
    }

    pub fn with_sequence(mut self, seq: Sequence) -> Self {
        self.store = self.store.with_sequence(seq);
        self
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    fn key(&self) -> RecordKey {
        RecordKey::goal(self.goal.as_str())
    }

    pub async fn load(&self, owner: Option<&OwnerId>) -> Loaded<ScheduledEventState> {
        self.store.load(owner, &self.key()).await
    }

    pub async fn countdown(&self, owner: Option<&OwnerId>, today: DateKey) -> Countdown {
        Countdown::from_state(&self.load(owner).await.record, today)
    }

    pub async fn set_date(&self, owner: Option<&OwnerId>, date: DateKey) -> Outcome<ScheduledEventState> {
        self.patch(owner, FieldPatch::Set(date)).await
    }

    pub async fn clear_date(&self, owner: Option<&OwnerId>) -> Outcome<ScheduledEventState> {
        self.patch(owner, FieldPatch::Clear).await
    }

    async fn patch(&self, owner: Option<&OwnerId>, date: FieldPatch<DateKey>) -> Outcome<ScheduledEventState> {
        let patch = EventPatch {
            scheduled_date: date,
            ..EventPatch::default()
        };
        self.store
            .update(owner, &self.key(), |state| state.apply(patch))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::WriteStatus;
    use crate::remote::MemoryRemote;

    fn key(s: &str) -> DateKey {
        s.parse().expect("date")
    }

    fn owner() -> OwnerId {
        OwnerId::new("alice").unwrap()
    }

    #[test]
    fn unset_countdown_is_not_zero() {
        let state = ScheduledEventState::default();
        let countdown = Countdown::from_state(&state, key("2024-06-01"));
        assert_eq!(countdown, Countdown::Unset);
        assert_ne!(countdown, Countdown::Days(0));
        assert_eq!(countdown.to_string(), "unset");
    }

    #[test]
    fn countdown_counts_calendar_days() {
        let state = ScheduledEventState {
            scheduled_date: Some(key("2024-06-10")),
            ..Default::default()
        };
        assert_eq!(Countdown::from_state(&state, key("2024-06-01")), Countdown::Days(9));
        assert_eq!(Countdown::from_state(&state, key("2024-06-10")), Countdown::Days(0));
        assert_eq!(Countdown::from_state(&state, key("2024-06-12")), Countdown::Days(-2));
        assert_eq!(Countdown::Days(0).to_string(), "today");
        assert_eq!(Countdown::Days(9).to_string(), "9 days left");
        assert_eq!(Countdown::Days(-2).to_string(), "2 days ago");
    }

    #[test]
    fn patch_sets_and_clears_fields() {
        let mut state = ScheduledEventState::default();
        state
            .apply(EventPatch {
                scheduled_date: FieldPatch::Set(key("2024-06-10")),
                aux_numeric: FieldPatch::Set(21.1),
                notes: FieldPatch::Set("  easy pace  ".to_string()),
            })
            .unwrap();
        assert_eq!(state.notes.as_deref(), Some("easy pace"));
        assert_eq!(state.aux_numeric, Some(21.1));

        state
            .apply(EventPatch {
                notes: FieldPatch::Set("   ".to_string()),
                aux_numeric: FieldPatch::Clear,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(state.notes, None);
        assert_eq!(state.aux_numeric, None);
        assert_eq!(state.scheduled_date, Some(key("2024-06-10")));
    }

    #[test]
    fn patch_rejects_non_finite_numbers() {
        let mut state = ScheduledEventState::default();
        let err = state
            .apply(EventPatch {
                aux_numeric: FieldPatch::Set(f64::NAN),
                scheduled_date: FieldPatch::Set(key("2024-06-10")),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(state, ScheduledEventState::default());
    }

    #[tokio::test]
    async fn trip_countdown_lifecycle() {
        let remote = Arc::new(MemoryRemote::new());
        let trip = TripCountdown::new(remote, Arc::new(ChangeBus::new()), "trip");
        let owner = owner();
        let today = key("2024-06-01");

        assert_eq!(trip.countdown(Some(&owner), today).await, Countdown::Unset);

        let outcome = trip.set_date(Some(&owner), key("2024-06-15")).await;
        assert_eq!(outcome.status, WriteStatus::Persisted);
        assert_eq!(trip.countdown(Some(&owner), today).await, Countdown::Days(14));

        trip.clear_date(Some(&owner)).await;
        assert_eq!(trip.countdown(Some(&owner), today).await, Countdown::Unset);
    }

    #[tokio::test]
    async fn planner_keeps_past_dates() {
        let remote = Arc::new(MemoryRemote::new());
        let planner = LongRunPlanner::new(remote, Arc::new(ChangeBus::new()), "long_run");
        let owner = owner();

        planner
            .patch(
                Some(&owner),
                EventPatch {
                    scheduled_date: FieldPatch::Set(key("2020-01-01")),
                    aux_numeric: FieldPatch::Set(30.0),
                    ..Default::default()
                },
            )
            .await;
        planner
            .patch(
                Some(&owner),
                EventPatch {
                    notes: FieldPatch::Set("bring gels".to_string()),
                    ..Default::default()
                },
            )
            .await;

        let state = planner.load(Some(&owner)).await.record;
        assert_eq!(state.scheduled_date, Some(key("2020-01-01")));
        assert_eq!(state.aux_numeric, Some(30.0));
        assert_eq!(state.notes.as_deref(), Some("bring gels"));
    }
}
