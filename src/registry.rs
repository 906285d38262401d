//! In-memory registry of launched service terminals
//!
//! Entries are appended in spawn order and never modified. The orchestrator
//! owns the registry, so all mutation goes through `&mut self`.

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;

/// Identifier that terminates a launched terminal together with everything it
/// spawned. On POSIX this is the process group id (the child is its own
/// session leader, so it equals the pid); on Windows it is the root pid of
/// the tree passed to `taskkill /T`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(pub u32);

impl GroupId {
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a launcher hands back once the terminal is running on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchedProcess {
    pub pid: u32,
    pub group: GroupId,
}

/// One running service terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedProcess {
    pub name: String,
    pub command: String,
    pub working_dir: PathBuf,
    pub pid: u32,
    pub group: GroupId,
    pub started_at: DateTime<Utc>,
}

impl ManagedProcess {
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        working_dir: impl Into<PathBuf>,
        launched: LaunchedProcess,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            working_dir: working_dir.into(),
            pid: launched.pid,
            group: launched.group,
            started_at,
        }
    }
}

#[derive(Debug, Default)]
pub struct ProcessRegistry {
    entries: Vec<ManagedProcess>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: ManagedProcess) {
        self.entries.push(entry);
    }

    /// Entries in insertion order.
    pub fn all(&self) -> &[ManagedProcess] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }
}
