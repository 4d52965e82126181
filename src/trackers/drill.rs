//! Drill counter: progress toward a monthly numeric target.
//!
//! Progress always stays in `[0, target]`; steps past either end are
//! clamped, never rejected. The record rolls into a new period (fresh
//! target, zero progress) the first time it is touched in a new month.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::datekey::DateKey;
use crate::events::{ChangeBus, DRILL_CHANGED};
use crate::record::{DailyRecordStore, Loaded, Outcome, Record, RecordKey, Sequence};
use crate::remote::RemoteStore;
use crate::session::OwnerId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterState {
    pub target: u32,
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub period_label: String,
}

impl CounterState {
    pub fn new(target: u32, period_label: impl Into<String>) -> Self {
        Self {
            target: target.max(1),
            progress: 0,
            period_label: period_label.into(),
        }
    }

    /// Move progress by `delta`, clamped to `[0, target]`.
    pub fn step(&mut self, delta: i64) {
        let next = i64::from(self.progress).saturating_add(delta);
        self.progress = next.clamp(0, i64::from(self.target)) as u32;
    }

    pub fn reset_period(&mut self) {
        self.progress = 0;
    }

    /// Restore the invariants on a record read from storage.
    pub fn normalize(&mut self) {
        self.target = self.target.max(1);
        self.progress = self.progress.min(self.target);
    }

    /// Start `label` with `target` unless already in it. Returns whether
    /// the period changed.
    pub fn roll_to(&mut self, label: &str, target: u32) -> bool {
        if self.period_label == label {
            return false;
        }
        *self = CounterState::new(target, label);
        true
    }

    pub fn remaining(&self) -> u32 {
        self.target.saturating_sub(self.progress)
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= self.target
    }
}

impl Record for CounterState {
    const TABLE: &'static str = "drill_counters";
    const CHANNEL: &'static str = DRILL_CHANGED;

    fn default_for(_key: &RecordKey) -> Self {
        CounterState::new(1, "")
    }
}

/// Step size and targets for a drill goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrillPlan {
    pub step: u32,
    pub default_target: u32,
    /// Per-month overrides keyed by `YYYY-MM`.
    pub monthly_targets: BTreeMap<String, u32>,
}

impl Default for DrillPlan {
    fn default() -> Self {
        Self {
            step: 1,
            default_target: 20,
            monthly_targets: BTreeMap::new(),
        }
    }
}

impl DrillPlan {
    pub fn target_for(&self, period_label: &str) -> u32 {
        self.monthly_targets
            .get(period_label)
            .copied()
            .unwrap_or(self.default_target)
            .max(1)
    }
}

pub struct DrillCounter {
    goal: String,
    plan: DrillPlan,
    store: DailyRecordStore<CounterState>,
}

impl DrillCounter {
    pub fn new(remote: Arc<dyn RemoteStore>, bus: Arc<ChangeBus>, goal: &str, plan: DrillPlan) -> Self {
        let default_target = plan.default_target;
        Self {
            goal: goal.to_string(),
            plan,
            store: DailyRecordStore::new(remote, bus)
                .with_default(move |_| CounterState::new(default_target, "")),
        }
    }

    pub fn with_sequence(mut self, seq: Sequence) -> Self {
        self.store = self.store.with_sequence(seq);
        self
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn plan(&self) -> &DrillPlan {
        &self.plan
    }

    fn key(&self) -> RecordKey {
        RecordKey::goal(self.goal.as_str())
    }

    fn ensure_period(&self, state: &mut CounterState, today: DateKey) {
        state.normalize();
        let label = today.month_label();
        let target = self.plan.target_for(&label);
        if state.roll_to(&label, target) {
            tracing::debug!(goal = %self.goal, period = %label, target, "drill period rolled");
        }
    }

    /// Current counter as it reads today. A pending period rollover is
    /// applied in memory only; the next mutation persists it.
    pub async fn load(&self, owner: Option<&OwnerId>, today: DateKey) -> Loaded<CounterState> {
        let mut loaded = self.store.load(owner, &self.key()).await;
        self.ensure_period(&mut loaded.record, today);
        loaded
    }

    pub async fn increment(&self, owner: Option<&OwnerId>, today: DateKey) -> Outcome<CounterState> {
        self.apply_step(owner, today, i64::from(self.plan.step)).await
    }

    pub async fn decrement(&self, owner: Option<&OwnerId>, today: DateKey) -> Outcome<CounterState> {
        self.apply_step(owner, today, -i64::from(self.plan.step)).await
    }

    /// Zero progress for the current period; the target is untouched.
    pub async fn reset_period(&self, owner: Option<&OwnerId>, today: DateKey) -> Outcome<CounterState> {
        let outcome = self
            .store
            .update(owner, &self.key(), |state| {
                self.ensure_period(state, today);
                state.reset_period();
                Ok(())
            })
            .await;
        self.settle(outcome, today)
    }

    async fn apply_step(&self, owner: Option<&OwnerId>, today: DateKey, delta: i64) -> Outcome<CounterState> {
        let outcome = self
            .store
            .update(owner, &self.key(), |state| {
                self.ensure_period(state, today);
                state.step(delta);
                Ok(())
            })
            .await;
        self.settle(outcome, today)
    }

    // A failed write hands back the stored row as-is.
    fn settle(&self, mut outcome: Outcome<CounterState>, today: DateKey) -> Outcome<CounterState> {
        self.ensure_period(&mut outcome.value, today);
        outcome
    }
}
