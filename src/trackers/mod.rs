//! Goal-scoped trackers and the daily schedule log.
//!
//! Each tracker is a thin instantiation of [`DailyRecordStore`]: it picks a
//! record shape and key, and exposes the few mutations that make sense for
//! it. All of them take the owner and "today" explicitly.
//!
//! [`DailyRecordStore`]: crate::record::DailyRecordStore

use std::sync::Arc;

use crate::config::Config;
use crate::events::ChangeBus;
use crate::record::Sequence;
use crate::remote::RemoteStore;

pub mod drill;
pub mod schedule;
pub mod scheduled;
pub mod streak;

pub use drill::{CounterState, DrillCounter, DrillPlan};
pub use schedule::{DailyScheduleLog, ScheduleLog, ScheduleView};
pub use scheduled::{Countdown, EventPatch, FieldPatch, LongRunPlanner, ScheduledEventState, TripCountdown};
pub use streak::StreakTracker;

/// Builds trackers that share one remote, one change bus and one sequence
/// counter, so results from separately built trackers stay ordered.
#[derive(Clone)]
pub struct Trackers {
    remote: Arc<dyn RemoteStore>,
    bus: Arc<ChangeBus>,
    config: Config,
    seq: Sequence,
}

impl Trackers {
    pub fn new(remote: Arc<dyn RemoteStore>, bus: Arc<ChangeBus>, config: Config) -> Self {
        Self {
            remote,
            bus,
            config,
            seq: Sequence::new(),
        }
    }

    pub fn bus(&self) -> &Arc<ChangeBus> {
        &self.bus
    }

    pub fn streak(&self, goal: &str) -> StreakTracker {
        StreakTracker::new(self.remote.clone(), self.bus.clone(), goal).with_sequence(self.seq.clone())
    }

    pub fn drill(&self, goal: &str) -> DrillCounter {
        DrillCounter::new(
            self.remote.clone(),
            self.bus.clone(),
            goal,
            self.config.drill.plan(),
        )
        .with_sequence(self.seq.clone())
    }

    pub fn planner(&self, goal: &str) -> LongRunPlanner {
        LongRunPlanner::new(self.remote.clone(), self.bus.clone(), goal).with_sequence(self.seq.clone())
    }

    pub fn countdown(&self, goal: &str) -> TripCountdown {
        TripCountdown::new(self.remote.clone(), self.bus.clone(), goal).with_sequence(self.seq.clone())
    }

    pub fn schedule(&self) -> ScheduleLog {
        ScheduleLog::new(
            self.remote.clone(),
            self.bus.clone(),
            self.config.schedule.fixed_view(),
        )
        .with_sequence(self.seq.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordView;
    use crate::remote::MemoryRemote;
    use crate::session::OwnerId;

    #[tokio::test]
    async fn factory_built_trackers_feed_one_view_in_order() {
        let trackers = Trackers::new(
            Arc::new(MemoryRemote::new()),
            Arc::new(ChangeBus::new()),
            Config::default(),
        );
        let owner = OwnerId::new("alice").unwrap();
        let mut view = RecordView::new();

        let logged = trackers
            .streak("run")
            .log_today(Some(&owner), "2024-01-01".parse().unwrap())
            .await;
        assert!(view.apply_outcome(&logged));

        // Another caller logs the next day through its own tracker.
        trackers
            .streak("run")
            .log_today(Some(&owner), "2024-01-02".parse().unwrap())
            .await;

        let fresh = trackers.streak("run").load(Some(&owner)).await;
        assert!(fresh.seq > logged.seq);
        assert!(view.apply(fresh));
        assert_eq!(view.current().map(|state| state.streak), Some(2));
    }
}
