//! Change notification.
//!
//! After a successful save the record store broadcasts a [`ChangeEvent`] on
//! the record's named channel (e.g. `schedule:changed`). Delivery is
//! synchronous, fire-and-forget, and untargeted: every listener on the
//! channel (plus every wildcard listener) is called in subscription order.
//! Each listener runs under `catch_unwind`, so a panicking observer cannot
//! poison the bus or stop the others from hearing the event.
//!
//! The CLI can mirror events as JSON lines to stdout or a file via
//! [`EventSink`].

use std::collections::BTreeMap;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};

pub const EVENT_SCHEMA_VERSION: &str = "routine.event.v1";

pub const SCHEDULE_CHANGED: &str = "schedule:changed";
pub const STREAK_CHANGED: &str = "streak:changed";
pub const DRILL_CHANGED: &str = "drill:changed";
pub const PLAN_CHANGED: &str = "plan:changed";

/// Payload-free notification that a channel's records changed.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    pub schema_version: &'static str,
    pub channel: String,
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            schema_version: EVENT_SCHEMA_VERSION,
            channel: channel.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

pub type Listener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Channel name that matches every channel.
const WILDCARD: &str = "*";

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: BTreeMap<ListenerId, (String, Listener)>,
}

/// Process-wide publish/subscribe for change events.
#[derive(Default)]
pub struct ChangeBus {
    registry: Mutex<Registry>,
}

impl std::fmt::Debug for ChangeBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen on one channel.
    pub fn subscribe<F>(&self, channel: &str, listener: F) -> ListenerId
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.register(channel.to_string(), Arc::new(listener))
    }

    /// Listen on every channel.
    pub fn subscribe_all<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.register(WILDCARD.to_string(), Arc::new(listener))
    }

    /// Returns whether the listener was still registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.lock().listeners.remove(&id).is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Broadcast on `channel`. Returns how many listeners ran to completion.
    pub fn emit(&self, channel: &str) -> usize {
        let event = ChangeEvent::new(channel);

        // Snapshot so listeners may (un)subscribe while being notified.
        let targets: Vec<(ListenerId, Listener)> = self
            .lock()
            .listeners
            .iter()
            .filter(|(_, (name, _))| name == channel || name == WILDCARD)
            .map(|(id, (_, listener))| (*id, Arc::clone(listener)))
            .collect();

        let mut delivered = 0;
        for (id, listener) in targets {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(&event))) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    tracing::error!(channel, listener = id.0, "change listener panicked");
                }
            }
        }
        tracing::debug!(channel, delivered, "change event broadcast");
        delivered
    }

    fn register(&self, channel: String, listener: Listener) -> ListenerId {
        let mut registry = self.lock();
        let id = ListenerId(registry.next_id);
        registry.next_id += 1;
        registry.listeners.insert(id, (channel, listener));
        id
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// =============================================================================
// JSONL mirror
// =============================================================================

#[derive(Debug, Clone)]
pub enum EventDestination {
    Stdout,
    File(PathBuf),
}

impl EventDestination {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|value| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return None;
            }
            if trimmed == "-" {
                return Some(EventDestination::Stdout);
            }
            Some(EventDestination::File(PathBuf::from(trimmed)))
        })
    }

    pub fn open(&self) -> Result<EventSink> {
        match self {
            EventDestination::Stdout => Ok(EventSink::stdout()),
            EventDestination::File(path) => EventSink::file(path),
        }
    }
}

/// Event sink that writes JSONL output to a destination.
pub struct EventSink {
    writer: Box<dyn Write + Send>,
}

impl EventSink {
    pub fn stdout() -> Self {
        Self {
            writer: Box::new(std::io::stdout()),
        }
    }

    /// Append to a file, creating it if necessary.
    pub fn file(path: &Path) -> Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            writer: Box::new(file),
        })
    }

    /// Write a single event as JSONL.
    pub fn emit(&mut self, event: &ChangeEvent) -> Result<()> {
        let serialized = serde_json::to_vec(event)?;
        self.writer.write_all(&serialized)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush().map_err(Error::Io)?;
        Ok(())
    }

    /// Subscribe this sink to every channel of `bus`.
    pub fn attach(self, bus: &ChangeBus) -> ListenerId {
        let sink = Mutex::new(self);
        bus.subscribe_all(move |event| {
            let mut sink = sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Err(err) = sink.emit(event) {
                tracing::warn!(error = %err, "failed to mirror change event");
            }
        })
    }
}
