//! routine today command implementation
//!
//! One screen for the day: each streak goal plus the schedule log.

use serde::Serialize;

use crate::error::Result;
use crate::output::{emit_success, HumanOutput};

use super::schedule::ScheduleReport;
use super::streak::StreakReport;
use super::Context;

#[derive(Serialize)]
struct TodayReport<'a> {
    today: String,
    owner: String,
    root: String,
    streaks: Vec<StreakReport>,
    schedule: ScheduleReport<'a>,
}

pub async fn run(ctx: &Context, goals: &[String]) -> Result<()> {
    let mut streaks = Vec::with_capacity(goals.len());
    for goal in goals {
        let loaded = ctx.trackers.streak(goal).load(ctx.owner()).await;
        streaks.push(StreakReport::new(ctx, goal, &loaded.record, None));
    }
    let schedule = ctx.trackers.schedule().load(ctx.owner(), ctx.today).await;

    let report = TodayReport {
        today: ctx.today.to_string(),
        owner: ctx.owner_label(),
        root: ctx.root.display().to_string(),
        streaks,
        schedule: ScheduleReport::new(ctx, &schedule.record, None),
    };

    let mut human = HumanOutput::new(format!("routine today: {}", ctx.today));
    human.push_summary("owner", report.owner.clone());
    for streak in &report.streaks {
        human.push_summary(
            format!("{} streak", streak.goal),
            format!("{} ({})", streak.streak, streak.state.label()),
        );
    }
    human.push_summary(
        "schedule",
        format!(
            "{} view, completed: {}",
            report.schedule.view,
            report.schedule.completed_label()
        ),
    );
    if ctx.owner().is_none() {
        human.push_warning("not signed in; nothing will be saved");
        human.push_next_step("routine owner set <id>");
    }

    emit_success(ctx.output, "today", &report, Some(&human))
}
