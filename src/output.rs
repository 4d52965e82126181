//! Shared output formatting for routine CLI commands.

use serde::Serialize;

use crate::error::{Error, JsonError, Result};
use crate::record::WriteStatus;

pub const SCHEMA_VERSION: &str = "routine.v1";

/// Command groups that take a subcommand.
const GROUPED_COMMANDS: &[&str] = &["streak", "drill", "plan", "trip", "schedule", "owner"];

/// Global flags that consume the following argument.
const VALUE_FLAGS: &[&str] = &["--root", "--owner", "--events", "--today"];

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    details: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            summary: Vec::new(),
            details: Vec::new(),
            warnings: Vec::new(),
            next_steps: Vec::new(),
        }
    }

    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.details.push(value.into());
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.next_steps.push(value.into());
    }

    /// Add the warning a non-persisted write deserves, if any.
    pub fn push_write_status(&mut self, status: &WriteStatus) {
        if let Some(warning) = write_status_warning(status) {
            self.push_warning(warning);
        }
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// Human-readable warning for a write that did not reach the remote.
pub fn write_status_warning(status: &WriteStatus) -> Option<String> {
    match status {
        WriteStatus::Persisted => None,
        WriteStatus::Ephemeral => {
            Some("not signed in; change was not saved (routine owner set <id>)".to_string())
        }
        WriteStatus::Failed(reason) => Some(format!("save failed, change rolled back: {reason}")),
        WriteStatus::Rejected(reason) => Some(format!("change refused: {reason}")),
    }
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        let warnings = human.map(|h| h.warnings.clone()).unwrap_or_default();
        let next_steps = human.map(|h| h.next_steps.clone()).unwrap_or_default();

        #[derive(Serialize)]
        struct Envelope<'a, T: Serialize> {
            schema_version: &'static str,
            command: &'a str,
            status: &'static str,
            data: &'a T,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            warnings: Vec<String>,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            next_steps: Vec<String>,
        }

        let payload = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            data,
            warnings,
            next_steps,
        };

        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if options.quiet {
        // Warnings still matter when nothing else is printed.
        if let Some(human) = human {
            for warning in &human.warnings {
                eprintln!("warning: {warning}");
            }
        }
        return Ok(());
    }

    if let Some(human) = human {
        println!("{}", format_human(human));
    }

    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let next_steps = error_next_steps(err);
    let hint = next_steps.first().map(|step| step.as_str());
    if json {
        #[derive(Serialize)]
        struct ErrorBody {
            message: String,
            code: i32,
            kind: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<serde_json::Value>,
        }

        #[derive(Serialize)]
        struct Envelope<'a> {
            schema_version: &'static str,
            command: &'a str,
            status: &'static str,
            error: ErrorBody,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            next_steps: Vec<String>,
        }

        let JsonError {
            error,
            code,
            details,
        } = JsonError::from(err);
        let payload = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            error: ErrorBody {
                message: error,
                code,
                kind: err.kind(),
                details,
            },
            next_steps,
        };

        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    eprintln!("error: {err}");
    if let Some(hint) = hint {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

pub fn format_human(output: &HumanOutput) -> String {
    let mut lines = Vec::new();
    lines.push(output.header.clone());

    push_summary(&mut lines, &output.summary);
    push_section(&mut lines, "Details", &output.details);
    push_section(&mut lines, "Warnings", &output.warnings);
    push_section(&mut lines, "Next steps", &output.next_steps);

    lines.join("\n")
}

pub fn infer_command_name_from_args() -> String {
    infer_command_name(std::env::args().skip(1))
}

fn infer_command_name(args: impl IntoIterator<Item = String>) -> String {
    let mut positionals = Vec::new();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            args.next();
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        positionals.push(arg);
        let grouped = GROUPED_COMMANDS.contains(&positionals[0].as_str());
        if positionals.len() == 2 || !grouped {
            break;
        }
    }

    if positionals.is_empty() {
        "routine".to_string()
    } else {
        positionals.join(" ")
    }
}

fn error_next_steps(err: &Error) -> Vec<String> {
    match err {
        Error::InvalidDate(_) => vec!["use a YYYY-MM-DD date, e.g. 2024-03-05".to_string()],
        Error::InvalidConfig(_) => vec!["fix .routine.toml in the data root then retry".to_string()],
        Error::InconsistentState { .. } => vec!["routine streak reset <goal>".to_string()],
        Error::LockFailed(_) => vec!["another routine process holds the lock; retry".to_string()],
        _ => Vec::new(),
    }
}

fn push_summary(lines: &mut Vec<String>, summary: &[(String, String)]) {
    if summary.is_empty() {
        return;
    }

    lines.push(String::new());
    lines.push("Summary:".to_string());
    for (key, value) in summary {
        if value.is_empty() {
            lines.push(format!("- {key}"));
        } else {
            lines.push(format!("- {key}: {value}"));
        }
    }
}

fn push_section(lines: &mut Vec<String>, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }

    lines.push(String::new());
    lines.push(format!("{title}:"));
    for item in items {
        lines.push(format!("- {item}"));
    }
}
