//! routine drill command implementation

use serde::Serialize;

use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::record::WriteStatus;
use crate::trackers::CounterState;

use super::Context;

#[derive(Debug, Clone, Copy)]
pub enum Step {
    Increment,
    Decrement,
    Reset,
}

impl Step {
    fn command(self) -> &'static str {
        match self {
            Step::Increment => "drill inc",
            Step::Decrement => "drill dec",
            Step::Reset => "drill reset",
        }
    }
}

#[derive(Serialize)]
struct DrillReport<'a> {
    goal: &'a str,
    owner: String,
    period: &'a str,
    progress: u32,
    target: u32,
    remaining: u32,
    complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    write: Option<WriteStatus>,
}

impl<'a> DrillReport<'a> {
    fn new(ctx: &Context, goal: &'a str, state: &'a CounterState, write: Option<WriteStatus>) -> Self {
        Self {
            goal,
            owner: ctx.owner_label(),
            period: &state.period_label,
            progress: state.progress,
            target: state.target,
            remaining: state.remaining(),
            complete: state.is_complete(),
            write,
        }
    }

    fn human(&self, header: String) -> HumanOutput {
        let mut human = HumanOutput::new(header);
        human.push_summary("period", self.period);
        human.push_summary("progress", format!("{}/{}", self.progress, self.target));
        if self.complete {
            human.push_summary("target reached", "");
        } else {
            human.push_summary("remaining", self.remaining.to_string());
        }
        if let Some(status) = &self.write {
            human.push_write_status(status);
        }
        human
    }
}

pub async fn run_show(ctx: &Context, goal: &str) -> Result<()> {
    let loaded = ctx.trackers.drill(goal).load(ctx.owner(), ctx.today).await;
    let report = DrillReport::new(ctx, goal, &loaded.record, None);
    let human = report.human(format!("routine drill: {goal}"));
    emit_success(ctx.output, "drill show", &report, Some(&human))
}

pub async fn run_step(ctx: &Context, goal: &str, step: Step) -> Result<()> {
    let counter = ctx.trackers.drill(goal);
    let outcome = match step {
        Step::Increment => counter.increment(ctx.owner(), ctx.today).await,
        Step::Decrement => counter.decrement(ctx.owner(), ctx.today).await,
        Step::Reset => counter.reset_period(ctx.owner(), ctx.today).await,
    };
    let report = DrillReport::new(ctx, goal, &outcome.value, Some(outcome.status.clone()));
    let human = report.human(format!("routine {}: {goal}", step.command()));
    emit_success(ctx.output, step.command(), &report, Some(&human))
}
