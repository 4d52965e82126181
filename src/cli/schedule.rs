//! routine schedule command implementation

use std::collections::BTreeSet;

use serde::Serialize;

use crate::datekey::DateKey;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::record::WriteStatus;
use crate::trackers::{DailyScheduleLog, ScheduleView};

use super::Context;

#[derive(Serialize)]
pub(crate) struct ScheduleReport<'a> {
    pub date: DateKey,
    pub owner: String,
    pub view: ScheduleView,
    pub completed: &'a BTreeSet<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write: Option<WriteStatus>,
}

impl<'a> ScheduleReport<'a> {
    pub fn new(ctx: &Context, log: &'a DailyScheduleLog, write: Option<WriteStatus>) -> Self {
        Self {
            date: log.date,
            owner: ctx.owner_label(),
            view: log.view,
            completed: &log.completed,
            write,
        }
    }

    pub fn completed_label(&self) -> String {
        if self.completed.is_empty() {
            return "none".to_string();
        }
        self.completed
            .iter()
            .map(|index| index.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn human(&self, header: String) -> HumanOutput {
        let mut human = HumanOutput::new(header);
        human.push_summary("view", self.view.as_str());
        human.push_summary("completed", self.completed_label());
        if let Some(status) = &self.write {
            human.push_write_status(status);
        }
        human
    }
}

pub async fn run_show(ctx: &Context, date: Option<&str>) -> Result<()> {
    let date = ctx.date_or_today(date)?;
    let loaded = ctx.trackers.schedule().load(ctx.owner(), date).await;
    let report = ScheduleReport::new(ctx, &loaded.record, None);
    let human = report.human(format!("routine schedule: {date}"));
    emit_success(ctx.output, "schedule show", &report, Some(&human))
}

pub async fn run_view(ctx: &Context, view: &str, date: Option<&str>) -> Result<()> {
    let view: ScheduleView = view.parse()?;
    let date = ctx.date_or_today(date)?;
    let outcome = ctx.trackers.schedule().set_view(ctx.owner(), date, view).await;
    let report = ScheduleReport::new(ctx, &outcome.value, Some(outcome.status.clone()));
    let human = report.human(format!("routine schedule view: {date} -> {view}"));
    emit_success(ctx.output, "schedule view", &report, Some(&human))
}

pub async fn run_toggle(ctx: &Context, index: u32, done: bool, date: Option<&str>) -> Result<()> {
    let date = ctx.date_or_today(date)?;
    let outcome = ctx
        .trackers
        .schedule()
        .toggle_completion(ctx.owner(), date, index, done)
        .await;
    let (command, verb) = if done {
        ("schedule done", "done")
    } else {
        ("schedule undo", "not done")
    };
    let report = ScheduleReport::new(ctx, &outcome.value, Some(outcome.status.clone()));
    let human = report.human(format!("routine {command}: block {index} {verb} ({date})"));
    emit_success(ctx.output, command, &report, Some(&human))
}
