//! Run/study style streak tracker.

use std::sync::Arc;

use crate::datekey::DateKey;
use crate::events::{ChangeBus, STREAK_CHANGED};
use crate::record::{DailyRecordStore, Loaded, Outcome, Record, RecordKey, Sequence};
use crate::remote::RemoteStore;
use crate::session::OwnerId;
use crate::streak::{advance_streak, reset_streak, StreakState};

impl Record for StreakState {
    const TABLE: &'static str = "goal_streaks";
    const CHANNEL: &'static str = STREAK_CHANGED;

    fn default_for(_key: &RecordKey) -> Self {
        StreakState::default()
    }
}

pub struct StreakTracker {
    goal: String,
    store: DailyRecordStore<StreakState>,
}

impl StreakTracker {
    pub fn new(remote: Arc<dyn RemoteStore>, bus: Arc<ChangeBus>, goal: &str) -> Self {
        Self {
            goal: goal.to_string(),
            store: DailyRecordStore::new(remote, bus),
        }
    }

    /// Share sequence numbers with other trackers over the same records.
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

    pub async fn load(&self, owner: Option<&OwnerId>) -> Loaded<StreakState> {
        self.store.load(owner, &self.key()).await
    }

    /// Credit today's session. A repeat on the same day saves the unchanged
    /// state; a log dated before the last one is rejected.
    pub async fn log_today(&self, owner: Option<&OwnerId>, today: DateKey) -> Outcome<StreakState> {
        self.store
            .update(owner, &self.key(), |state| {
                *state = advance_streak(state, today)?;
                Ok(())
            })
            .await
    }

    pub async fn reset(&self, owner: Option<&OwnerId>) -> Outcome<StreakState> {
        self.store
            .update(owner, &self.key(), |state| {
                *state = reset_streak();
                Ok(())
            })
            .await
    }
}
