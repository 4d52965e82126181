//! Command-line interface for routine
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::datekey::{self, DateKey};
use crate::error::{Error, Result};
use crate::events::{ChangeBus, EventDestination};
use crate::output::OutputOptions;
use crate::remote::{FileRemote, RemoteStore};
use crate::session::{self, OwnerId};
use crate::trackers::Trackers;

mod drill;
mod owner;
mod plan;
mod schedule;
mod streak;
mod today;
mod trip;

/// routine - daily progress and streak tracking
///
/// Keeps per-goal streaks, monthly drill counters, a long-run planner,
/// trip countdowns and a daily schedule checklist.
#[derive(Parser, Debug)]
#[command(name = "routine")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (defaults to the platform data directory)
    #[arg(long, global = true, env = "ROUTINE_ROOT")]
    pub root: Option<PathBuf>,

    /// Owner id to act as; without one, nothing is saved
    #[arg(long, global = true, env = "ROUTINE_OWNER")]
    pub owner: Option<String>,

    /// Treat this date (YYYY-MM-DD) as today
    #[arg(long, global = true, env = "ROUTINE_TODAY", hide = true)]
    pub today: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Mirror change events as JSON lines to a file, or `-` for stdout
    #[arg(long, global = true)]
    pub events: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Overview of today's streaks and schedule
    Today {
        /// Streak goals to include
        #[arg(long = "goal", default_values = ["run", "study"])]
        goals: Vec<String>,
    },

    /// Daily streaks (run, study, ...)
    #[command(subcommand)]
    Streak(StreakCommands),

    /// Monthly drill counters
    #[command(subcommand)]
    Drill(DrillCommands),

    /// Long-run planner
    #[command(subcommand)]
    Plan(PlanCommands),

    /// Trip countdowns
    #[command(subcommand)]
    Trip(TripCommands),

    /// Daily schedule checklist
    #[command(subcommand)]
    Schedule(ScheduleCommands),

    /// Set or show the signed-in owner
    #[command(subcommand)]
    Owner(OwnerCommands),
}

/// Streak subcommands
#[derive(Subcommand, Debug)]
pub enum StreakCommands {
    /// Show the streak for a goal
    Show { goal: String },

    /// Log today's session for a goal
    Log { goal: String },

    /// Reset a goal's streak to zero
    Reset { goal: String },
}

/// Drill subcommands
#[derive(Subcommand, Debug)]
pub enum DrillCommands {
    /// Show this month's progress
    Show { goal: String },

    /// Add one step of progress
    Inc { goal: String },

    /// Remove one step of progress
    Dec { goal: String },

    /// Zero this month's progress
    Reset { goal: String },
}

/// Long-run planner subcommands
#[derive(Subcommand, Debug)]
pub enum PlanCommands {
    /// Show the planned run
    Show { goal: String },

    /// Change the planned run
    Set {
        goal: String,

        /// Planned date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "clear_date")]
        date: Option<String>,

        /// Remove the planned date
        #[arg(long)]
        clear_date: bool,

        /// Planned distance
        #[arg(long, conflicts_with = "clear_distance")]
        distance: Option<f64>,

        /// Remove the planned distance
        #[arg(long)]
        clear_distance: bool,

        /// Free-form notes (blank clears)
        #[arg(long, conflicts_with = "clear_notes")]
        notes: Option<String>,

        /// Remove the notes
        #[arg(long)]
        clear_notes: bool,
    },
}

/// Trip countdown subcommands
#[derive(Subcommand, Debug)]
pub enum TripCommands {
    /// Show days left until the trip
    Show { goal: String },

    /// Set the trip date
    Set {
        goal: String,

        /// Trip date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
    },

    /// Remove the trip date
    Clear { goal: String },
}

/// Schedule log subcommands
#[derive(Subcommand, Debug)]
pub enum ScheduleCommands {
    /// Show the day's view and completed blocks
    Show {
        /// Day to show (defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Switch the day's view (weekday or weekend)
    View {
        view: String,

        /// Day to change (defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Mark a block done
    Done {
        index: u32,

        /// Day to change (defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Mark a block not done
    Undo {
        index: u32,

        /// Day to change (defaults to today)
        #[arg(long)]
        date: Option<String>,
    },
}

/// Owner subcommands
#[derive(Subcommand, Debug)]
pub enum OwnerCommands {
    /// Remember an owner id in the data root
    Set { id: String },

    /// Show the owner commands will act as
    Show,

    /// Forget the remembered owner id
    Clear,
}

/// Everything a tracker command needs, resolved once per invocation.
pub(crate) struct Context {
    pub root: PathBuf,
    pub owner: Option<OwnerId>,
    pub today: DateKey,
    pub trackers: Trackers,
    pub output: OutputOptions,
}

impl Context {
    pub fn owner(&self) -> Option<&OwnerId> {
        self.owner.as_ref()
    }

    pub fn owner_label(&self) -> String {
        owner_label(self.owner())
    }

    /// `raw` as a date, or today when absent.
    pub fn date_or_today(&self, raw: Option<&str>) -> Result<DateKey> {
        match raw {
            Some(raw) => raw.parse(),
            None => Ok(self.today),
        }
    }
}

pub(crate) fn owner_label(owner: Option<&OwnerId>) -> String {
    owner
        .map(|owner| owner.to_string())
        .unwrap_or_else(|| "guest".to_string())
}

fn events_to_stdout(events: Option<&str>) -> bool {
    events.map(|value| value.trim() == "-").unwrap_or(false)
}

/// Data root from the flag/env, else the platform data directory.
fn resolve_root(root: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(root) = root {
        return Ok(root);
    }
    directories::ProjectDirs::from("", "", "routine")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            Error::InvalidArgument("cannot determine a data directory; pass --root".to_string())
        })
}

fn resolve_today(raw: Option<&str>) -> Result<DateKey> {
    match raw {
        Some(raw) => raw.parse(),
        None => Ok(datekey::today()),
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let output = OutputOptions {
            json: self.json && !events_to_stdout(self.events.as_deref()),
            quiet: self.quiet,
        };
        let root = resolve_root(self.root)?;

        let command = match self.command {
            Commands::Owner(cmd) => {
                return match cmd {
                    OwnerCommands::Set { id } => owner::run_set(&root, &id, output),
                    OwnerCommands::Show => owner::run_show(&root, self.owner.as_deref(), output),
                    OwnerCommands::Clear => owner::run_clear(&root, output),
                };
            }
            command => command,
        };

        let today = resolve_today(self.today.as_deref())?;
        let owner = session::resolve_owner(Some(&root), self.owner.as_deref())?;
        let config = Config::load_from_root(&root);
        let remote: Arc<dyn RemoteStore> = Arc::new(
            FileRemote::new(config.remote.resolve_dir(&root))
                .with_lock_timeout(config.remote.lock_timeout_ms),
        );
        let bus = Arc::new(ChangeBus::new());
        if let Some(destination) = EventDestination::parse(self.events.as_deref()) {
            destination.open()?.attach(&bus);
        }

        tracing::debug!(root = %root.display(), owner = %owner_label(owner.as_ref()), %today, "starting");

        let ctx = Context {
            root,
            owner,
            today,
            trackers: Trackers::new(remote, bus, config),
            output,
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        runtime.block_on(async move {
            match command {
                Commands::Today { goals } => today::run(&ctx, &goals).await,
                Commands::Streak(cmd) => match cmd {
                    StreakCommands::Show { goal } => streak::run_show(&ctx, &goal).await,
                    StreakCommands::Log { goal } => streak::run_log(&ctx, &goal).await,
                    StreakCommands::Reset { goal } => streak::run_reset(&ctx, &goal).await,
                },
                Commands::Drill(cmd) => match cmd {
                    DrillCommands::Show { goal } => drill::run_show(&ctx, &goal).await,
                    DrillCommands::Inc { goal } => {
                        drill::run_step(&ctx, &goal, drill::Step::Increment).await
                    }
                    DrillCommands::Dec { goal } => {
                        drill::run_step(&ctx, &goal, drill::Step::Decrement).await
                    }
                    DrillCommands::Reset { goal } => {
                        drill::run_step(&ctx, &goal, drill::Step::Reset).await
                    }
                },
                Commands::Plan(cmd) => match cmd {
                    PlanCommands::Show { goal } => plan::run_show(&ctx, &goal).await,
                    PlanCommands::Set {
                        goal,
                        date,
                        clear_date,
                        distance,
                        clear_distance,
                        notes,
                        clear_notes,
                    } => {
                        plan::run_set(
                            &ctx,
                            plan::SetOptions {
                                goal,
                                date,
                                clear_date,
                                distance,
                                clear_distance,
                                notes,
                                clear_notes,
                            },
                        )
                        .await
                    }
                },
                Commands::Trip(cmd) => match cmd {
                    TripCommands::Show { goal } => trip::run_show(&ctx, &goal).await,
                    TripCommands::Set { goal, date } => trip::run_set(&ctx, &goal, &date).await,
                    TripCommands::Clear { goal } => trip::run_clear(&ctx, &goal).await,
                },
                Commands::Schedule(cmd) => match cmd {
                    ScheduleCommands::Show { date } => {
                        schedule::run_show(&ctx, date.as_deref()).await
                    }
                    ScheduleCommands::View { view, date } => {
                        schedule::run_view(&ctx, &view, date.as_deref()).await
                    }
                    ScheduleCommands::Done { index, date } => {
                        schedule::run_toggle(&ctx, index, true, date.as_deref()).await
                    }
                    ScheduleCommands::Undo { index, date } => {
                        schedule::run_toggle(&ctx, index, false, date.as_deref()).await
                    }
                },
                Commands::Owner(_) => Ok(()),
            }
        })
    }
}
