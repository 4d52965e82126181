//! Owner identity.
//!
//! The library never reads an ambient "current user": every store call takes
//! `Option<&OwnerId>` explicitly. A [`SessionProvider`] is the only seam to
//! whatever authenticates the user.
//!
//! The CLI resolves the owner in this order:
//! 1) `--owner`, or the `ROUTINE_OWNER` environment variable (clap reads it)
//! 2) Persisted value in `<root>/owner`
//! 3) None: guest mode (reads return defaults, writes are dropped)

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const OWNER_FILENAME: &str = "owner";

/// Authenticated identity a record belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Build an owner id, rejecting blank input.
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        non_empty(Some(raw.as_ref()))
            .map(|value| Self(value.to_string()))
            .ok_or_else(|| Error::InvalidArgument("owner cannot be empty".to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// "Current owner identity, or none."
pub trait SessionProvider: Send + Sync {
    fn current_owner(&self) -> Option<OwnerId>;
}

/// Always the same owner.
#[derive(Debug, Clone)]
pub struct FixedSession(pub OwnerId);

impl SessionProvider for FixedSession {
    fn current_owner(&self) -> Option<OwnerId> {
        Some(self.0.clone())
    }
}

/// Never signed in.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuestSession;

impl SessionProvider for GuestSession {
    fn current_owner(&self) -> Option<OwnerId> {
        None
    }
}

/// Resolve the CLI owner from the flag (or its env fallback), then `root`.
pub fn resolve_owner(root: Option<&Path>, cli_owner: Option<&str>) -> Result<Option<OwnerId>> {
    if let Some(owner) = non_empty(cli_owner) {
        return Ok(Some(OwnerId(owner.to_string())));
    }

    match root {
        Some(root) => load_persisted_owner(root),
        None => Ok(None),
    }
}

/// Persist the owner in `<root>/owner`.
pub fn persist_owner(root: &Path, owner: &OwnerId) -> Result<()> {
    std::fs::create_dir_all(root)?;
    std::fs::write(owner_path(root), format!("{owner}\n"))?;
    Ok(())
}

/// Remove the persisted owner. Returns whether one was present.
pub fn clear_persisted_owner(root: &Path) -> Result<bool> {
    let path = owner_path(root);
    if !path.exists() {
        return Ok(false);
    }
    std::fs::remove_file(path)?;
    Ok(true)
}

/// Load the owner from `<root>/owner`, if present and non-blank.
pub fn load_persisted_owner(root: &Path) -> Result<Option<OwnerId>> {
    let path = owner_path(root);
    if !path.exists() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(path)?;
    Ok(non_empty(Some(raw.as_str())).map(|owner| OwnerId(owner.to_string())))
}

pub fn owner_path(root: &Path) -> PathBuf {
    root.join(OWNER_FILENAME)
}

fn non_empty(input: Option<&str>) -> Option<&str> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}
