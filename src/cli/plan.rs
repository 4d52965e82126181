//! routine plan command implementation
//!
//! The long-run planner: a date, a distance and notes per goal.

use serde::Serialize;

use crate::datekey::DateKey;
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::record::WriteStatus;
use crate::trackers::{Countdown, EventPatch, FieldPatch, ScheduledEventState};

use super::Context;

/// Options for `routine plan set`
pub struct SetOptions {
    pub goal: String,
    pub date: Option<String>,
    pub clear_date: bool,
    pub distance: Option<f64>,
    pub clear_distance: bool,
    pub notes: Option<String>,
    pub clear_notes: bool,
}

impl SetOptions {
    fn patch(&self) -> Result<EventPatch> {
        let scheduled_date = match (&self.date, self.clear_date) {
            (Some(raw), _) => FieldPatch::Set(raw.parse::<DateKey>()?),
            (None, true) => FieldPatch::Clear,
            (None, false) => FieldPatch::Keep,
        };
        let aux_numeric = match (self.distance, self.clear_distance) {
            (Some(distance), _) => FieldPatch::Set(distance),
            (None, true) => FieldPatch::Clear,
            (None, false) => FieldPatch::Keep,
        };
        let notes = match (&self.notes, self.clear_notes) {
            (Some(text), _) => FieldPatch::Set(text.clone()),
            (None, true) => FieldPatch::Clear,
            (None, false) => FieldPatch::Keep,
        };
        Ok(EventPatch {
            scheduled_date,
            aux_numeric,
            notes,
        })
    }
}

#[derive(Serialize)]
struct PlanReport<'a> {
    goal: &'a str,
    owner: String,
    date: Option<DateKey>,
    distance: Option<f64>,
    notes: Option<&'a str>,
    countdown: Countdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    write: Option<WriteStatus>,
}

impl<'a> PlanReport<'a> {
    fn new(ctx: &Context, goal: &'a str, state: &'a ScheduledEventState, write: Option<WriteStatus>) -> Self {
        Self {
            goal,
            owner: ctx.owner_label(),
            date: state.scheduled_date,
            distance: state.aux_numeric,
            notes: state.notes.as_deref(),
            countdown: Countdown::from_state(state, ctx.today),
            write,
        }
    }

    fn human(&self, header: String) -> HumanOutput {
        let mut human = HumanOutput::new(header);
        match self.date {
            Some(date) => human.push_summary("date", format!("{date} ({})", self.countdown)),
            None => human.push_summary("date", "not planned"),
        }
        human.push_summary(
            "distance",
            self.distance
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
        );
        if let Some(notes) = self.notes {
            human.push_detail(notes);
        }
        if let Some(status) = &self.write {
            human.push_write_status(status);
        }
        if self.date.is_none() && self.write.is_none() {
            human.push_next_step(format!("routine plan set {} --date YYYY-MM-DD", self.goal));
        }
        human
    }
}

pub async fn run_show(ctx: &Context, goal: &str) -> Result<()> {
    let loaded = ctx.trackers.planner(goal).load(ctx.owner()).await;
    let report = PlanReport::new(ctx, goal, &loaded.record, None);
    let human = report.human(format!("routine plan: {goal}"));
    emit_success(ctx.output, "plan show", &report, Some(&human))
}

pub async fn run_set(ctx: &Context, options: SetOptions) -> Result<()> {
    let patch = options.patch()?;
    if patch.is_empty() {
        return Err(Error::InvalidArgument(
            "nothing to change; pass --date, --distance or --notes (or a --clear-* flag)".to_string(),
        ));
    }

    let goal = options.goal.as_str();
    let outcome = ctx.trackers.planner(goal).patch(ctx.owner(), patch).await;
    let report = PlanReport::new(ctx, goal, &outcome.value, Some(outcome.status.clone()));
    let human = report.human(format!("routine plan set: {goal}"));
    emit_success(ctx.output, "plan set", &report, Some(&human))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> SetOptions {
        SetOptions {
            goal: "long_run".to_string(),
            date: None,
            clear_date: false,
            distance: None,
            clear_distance: false,
            notes: None,
            clear_notes: false,
        }
    }

    #[test]
    fn empty_options_make_empty_patch() {
        assert!(options().patch().unwrap().is_empty());
    }

    #[test]
    fn flags_map_to_field_patches() {
        let mut opts = options();
        opts.date = Some("2024-06-01".to_string());
        opts.clear_distance = true;
        let patch = opts.patch().unwrap();
        assert_eq!(patch.scheduled_date, FieldPatch::Set("2024-06-01".parse().unwrap()));
        assert_eq!(patch.aux_numeric, FieldPatch::Clear);
        assert_eq!(patch.notes, FieldPatch::Keep);
    }

    #[test]
    fn bad_date_is_user_error() {
        let mut opts = options();
        opts.date = Some("June 1st".to_string());
        assert!(matches!(opts.patch(), Err(Error::InvalidDate(_))));
    }
}
