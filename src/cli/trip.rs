//! routine trip command implementation

use serde::Serialize;

use crate::datekey::DateKey;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::record::WriteStatus;
use crate::trackers::{Countdown, ScheduledEventState};

use super::Context;

#[derive(Serialize)]
struct TripReport<'a> {
    goal: &'a str,
    owner: String,
    date: Option<DateKey>,
    countdown: Countdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    write: Option<WriteStatus>,
}

impl<'a> TripReport<'a> {
    fn new(ctx: &Context, goal: &'a str, state: &ScheduledEventState, write: Option<WriteStatus>) -> Self {
        Self {
            goal,
            owner: ctx.owner_label(),
            date: state.scheduled_date,
            countdown: Countdown::from_state(state, ctx.today),
            write,
        }
    }

    fn human(&self, header: String) -> HumanOutput {
        let mut human = HumanOutput::new(header);
        human.push_summary("countdown", self.countdown.to_string());
        if let Some(date) = self.date {
            human.push_summary("date", date.to_string());
        }
        if let Some(status) = &self.write {
            human.push_write_status(status);
        }
        if self.countdown == Countdown::Unset {
            human.push_next_step(format!("routine trip set {} --date YYYY-MM-DD", self.goal));
        }
        human
    }
}

pub async fn run_show(ctx: &Context, goal: &str) -> Result<()> {
    let loaded = ctx.trackers.countdown(goal).load(ctx.owner()).await;
    let report = TripReport::new(ctx, goal, &loaded.record, None);
    let human = report.human(format!("routine trip: {goal}"));
    emit_success(ctx.output, "trip show", &report, Some(&human))
}

pub async fn run_set(ctx: &Context, goal: &str, raw_date: &str) -> Result<()> {
    let date: DateKey = raw_date.parse()?;
    let outcome = ctx.trackers.countdown(goal).set_date(ctx.owner(), date).await;
    let report = TripReport::new(ctx, goal, &outcome.value, Some(outcome.status));
    let human = report.human(format!("routine trip set: {goal}"));
    emit_success(ctx.output, "trip set", &report, Some(&human))
}

pub async fn run_clear(ctx: &Context, goal: &str) -> Result<()> {
    let outcome = ctx.trackers.countdown(goal).clear_date(ctx.owner()).await;
    let report = TripReport::new(ctx, goal, &outcome.value, Some(outcome.status));
    let human = report.human(format!("routine trip clear: {goal}"));
    emit_success(ctx.output, "trip clear", &report, Some(&human))
}
