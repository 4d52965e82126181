//! routine - Daily Progress and Streak Tracking Library
//!
//! This library provides the engine behind the routine CLI: per-owner daily
//! records kept in a remote table store, with change notification.
//!
//! # Core Concepts
//!
//! - **Date keys**: local calendar dates, compared by whole-day distance
//! - **Streaks**: consecutive-day counters advanced by a pure transition
//! - **Daily records**: lazily created, upserted per natural key
//! - **Guest mode**: without an owner nothing is read or written remotely
//! - **Change channels**: payload-free broadcasts after each persisted write
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.routine.toml`
//! - `datekey`: Calendar date keys and day arithmetic
//! - `error`: Error types and result aliases
//! - `events`: Change bus and JSONL event mirroring
//! - `lock`: File locking and atomic writes
//! - `output`: Shared human/JSON output
//! - `record`: Generic daily record store
//! - `remote`: Remote table store trait plus memory and file backends
//! - `session`: Owner identity
//! - `streak`: Streak state machine
//! - `trackers`: Goal-scoped trackers and the schedule log

pub mod cli;
pub mod config;
pub mod datekey;
pub mod error;
pub mod events;
pub mod lock;
pub mod output;
pub mod record;
pub mod remote;
pub mod session;
pub mod streak;
pub mod trackers;

pub use error::{Error, Result};
