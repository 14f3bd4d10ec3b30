//! Domain model types used throughout tnsync.
//!
//! These types bridge the descriptor parser, the directory mirror reader,
//! the reconciler, and the sync executor.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tns::parser::{extract_addresses, extract_service};

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// A `(HOST=..)(PORT=..)` pair found inside a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// One network-service alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TnsEntry {
    /// Upper-cased alias, the registry key.
    pub name: String,
    /// Raw descriptor text following `alias =`.
    pub description: String,
    /// File path or directory DN the entry came from.
    pub source: String,
    /// `SERVICE_NAME` value, empty if the descriptor has none.
    pub service: String,
    /// Every host/port pair in order of appearance.
    pub addresses: Vec<Address>,
}

impl TnsEntry {
    /// Build an entry, deriving `service` and `addresses` from the descriptor.
    pub fn new(
        name: impl AsRef<str>,
        description: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        let description = description.into();
        Self {
            name: name.as_ref().to_uppercase(),
            service: extract_service(&description),
            addresses: extract_addresses(&description),
            description,
            source: source.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Alias -> entry map. Inserting an existing alias replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    entries: BTreeMap<String, TnsEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert under the entry's upper-cased name, returning the entry it
    /// replaced.
    pub fn insert(&mut self, mut entry: TnsEntry) -> Option<TnsEntry> {
        entry.name = entry.name.to_uppercase();
        self.entries.insert(entry.name.clone(), entry)
    }

    /// Exact key lookup. Callers wanting domain qualification use
    /// [`crate::tns::resolver::resolve_alias`].
    pub fn get(&self, name: &str) -> Option<&TnsEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Merge `other` into `self`; entries from `other` win on collision.
    pub fn merge(&mut self, other: Registry) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TnsEntry> {
        self.entries.values()
    }
}

impl FromIterator<TnsEntry> for Registry {
    fn from_iter<I: IntoIterator<Item = TnsEntry>>(iter: I) -> Self {
        let mut registry = Registry::new();
        for entry in iter {
            registry.insert(entry);
        }
        registry
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Reconciliation state of one alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStatus {
    Unchanged,
    New,
    Modified,
    AbsentLocally,
    Skip,
}

impl SyncStatus {
    pub const ALL: [SyncStatus; 5] = [
        SyncStatus::Unchanged,
        SyncStatus::New,
        SyncStatus::Modified,
        SyncStatus::AbsentLocally,
        SyncStatus::Skip,
    ];
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unchanged => write!(f, "unchanged"),
            Self::New => write!(f, "new"),
            Self::Modified => write!(f, "modified"),
            Self::AbsentLocally => write!(f, "absent-locally"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// Alias -> [`SyncStatus`] for every alias in `local ∪ mirror`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    states: BTreeMap<String, SyncStatus>,
}

impl Classification {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, alias: impl Into<String>, status: SyncStatus) -> Option<SyncStatus> {
        self.states.insert(alias.into(), status)
    }

    pub fn remove(&mut self, alias: &str) -> Option<SyncStatus> {
        self.states.remove(alias)
    }

    pub fn get(&self, alias: &str) -> Option<SyncStatus> {
        self.states.get(alias).copied()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SyncStatus)> {
        self.states.iter().map(|(alias, status)| (alias.as_str(), *status))
    }

    /// Number of aliases in the given state.
    pub fn count(&self, status: SyncStatus) -> usize {
        self.states.values().filter(|s| **s == status).count()
    }
}

// ---------------------------------------------------------------------------
// Work tally
// ---------------------------------------------------------------------------

/// A directory operation that did not go through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
    pub alias: String,
    /// The state the alias was classified as before the failure.
    pub intended: SyncStatus,
    pub reason: String,
}

/// Per-status outcome counts of one sync pass.
///
/// `AbsentLocally` counts successful deletions. Any alias that could not be
/// applied is counted under `Skip` and listed in `failures`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkTally {
    pub counts: BTreeMap<SyncStatus, usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<SyncFailure>,
}

impl Default for WorkTally {
    fn default() -> Self {
        Self {
            counts: SyncStatus::ALL.iter().map(|s| (*s, 0)).collect(),
            failures: Vec::new(),
        }
    }
}

impl WorkTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, status: SyncStatus) {
        *self.counts.entry(status).or_insert(0) += 1;
    }

    /// Count a skip and remember why.
    pub fn record_failure(
        &mut self,
        alias: impl Into<String>,
        intended: SyncStatus,
        reason: impl Into<String>,
    ) {
        self.record(SyncStatus::Skip);
        self.failures.push(SyncFailure {
            alias: alias.into(),
            intended,
            reason: reason.into(),
        });
    }

    pub fn count(&self, status: SyncStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// True when nothing was skipped.
    pub fn is_converged(&self) -> bool {
        self.count(SyncStatus::Skip) == 0
    }
}

impl fmt::Display for WorkTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = SyncStatus::ALL
            .iter()
            .map(|s| format!("{}: {}", s, self.count(*s)))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Result of a full [`crate::sync_engine::SyncEngine::run`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub tally: WorkTally,
    pub local_count: usize,
    pub mirror_count: usize,
    pub started_at: String,
    pub completed_at: Option<String>,
}
