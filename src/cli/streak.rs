//! routine streak command implementation

use serde::Serialize;

use crate::datekey::DateKey;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::record::WriteStatus;
use crate::streak::{StreakState, StreakStatus};

use super::Context;

#[derive(Serialize)]
pub(crate) struct StreakReport {
    pub goal: String,
    pub owner: String,
    pub today: DateKey,
    /// Streak as shown today; a lapsed streak reads 0.
    pub streak: u32,
    pub stored_streak: u32,
    pub last_logged_date: Option<DateKey>,
    pub state: StreakStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write: Option<WriteStatus>,
}

impl StreakReport {
    pub fn new(ctx: &Context, goal: &str, state: &StreakState, write: Option<WriteStatus>) -> Self {
        Self {
            goal: goal.to_string(),
            owner: ctx.owner_label(),
            today: ctx.today,
            streak: state.display_streak(ctx.today),
            stored_streak: state.streak,
            last_logged_date: state.last_logged_date,
            state: state.status(ctx.today),
            write,
        }
    }

    fn human(&self, header: String) -> HumanOutput {
        let mut human = HumanOutput::new(header);
        human.push_summary("streak", days(self.streak));
        human.push_summary("status", self.state.label());
        human.push_summary(
            "last logged",
            self.last_logged_date
                .map(|date| date.to_string())
                .unwrap_or_else(|| "never".to_string()),
        );
        if let Some(status) = &self.write {
            human.push_write_status(status);
        }
        if matches!(self.state, StreakStatus::DueToday | StreakStatus::AtRisk | StreakStatus::NoSessions) {
            human.push_next_step(format!("routine streak log {}", self.goal));
        }
        human
    }
}

fn days(n: u32) -> String {
    if n == 1 {
        "1 day".to_string()
    } else {
        format!("{n} days")
    }
}

pub async fn run_show(ctx: &Context, goal: &str) -> Result<()> {
    let loaded = ctx.trackers.streak(goal).load(ctx.owner()).await;
    let report = StreakReport::new(ctx, goal, &loaded.record, None);
    let human = report.human(format!("routine streak: {goal}"));
    emit_success(ctx.output, "streak show", &report, Some(&human))
}

pub async fn run_log(ctx: &Context, goal: &str) -> Result<()> {
    let outcome = ctx.trackers.streak(goal).log_today(ctx.owner(), ctx.today).await;
    let report = StreakReport::new(ctx, goal, &outcome.value, Some(outcome.status));
    let human = report.human(format!("routine streak log: {goal} ({})", ctx.today));
    emit_success(ctx.output, "streak log", &report, Some(&human))
}

pub async fn run_reset(ctx: &Context, goal: &str) -> Result<()> {
    let outcome = ctx.trackers.streak(goal).reset(ctx.owner()).await;
    let report = StreakReport::new(ctx, goal, &outcome.value, Some(outcome.status));
    let human = report.human(format!("routine streak reset: {goal}"));
    emit_success(ctx.output, "streak reset", &report, Some(&human))
}
