//! routine owner command implementation
//!
//! Provides owner identity helpers (set/show/clear).

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::session::{self, OwnerId};

#[derive(Serialize)]
struct OwnerSetReport {
    owner: OwnerId,
    path: PathBuf,
}

#[derive(Serialize)]
struct OwnerShowReport {
    owner: Option<OwnerId>,
    signed_in: bool,
}

#[derive(Serialize)]
struct OwnerClearReport {
    removed: bool,
    path: PathBuf,
}

pub fn run_set(root: &Path, id: &str, output: OutputOptions) -> Result<()> {
    let owner = OwnerId::new(id)?;
    session::persist_owner(root, &owner)?;
    let path = session::owner_path(root);

    let mut human = HumanOutput::new(format!("routine owner set: {owner}"));
    human.push_summary("owner", owner.to_string());
    human.push_summary("path", path.display().to_string());
    human.push_next_step("routine today");

    emit_success(output, "owner set", &OwnerSetReport { owner, path }, Some(&human))
}

pub fn run_show(root: &Path, cli_owner: Option<&str>, output: OutputOptions) -> Result<()> {
    let owner = session::resolve_owner(Some(root), cli_owner)?;

    let header = match &owner {
        Some(owner) => format!("routine owner: {owner}"),
        None => "routine owner: not set".to_string(),
    };
    let mut human = HumanOutput::new(header);
    if owner.is_none() {
        human.push_warning("running as guest; nothing will be saved");
        human.push_next_step("routine owner set <id>");
    }

    let report = OwnerShowReport {
        signed_in: owner.is_some(),
        owner,
    };
    emit_success(output, "owner show", &report, Some(&human))
}

pub fn run_clear(root: &Path, output: OutputOptions) -> Result<()> {
    let removed = session::clear_persisted_owner(root)?;
    let path = session::owner_path(root);

    let header = if removed {
        "routine owner clear: removed"
    } else {
        "routine owner clear: nothing to remove"
    };
    let human = HumanOutput::new(header);

    emit_success(output, "owner clear", &OwnerClearReport { removed, path }, Some(&human))
}
