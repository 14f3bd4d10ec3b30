//! In-process [`Directory`] for dry runs and tests.
//!
//! Entries are keyed by lowercased DN. Only single-assertion filters are
//! understood: `(attr=value)` and `(attr=*)`. Failures can be injected per
//! DN and operation to exercise partial-failure handling.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use super::{split_dn, Attributes, Directory, DirectoryEntry, SearchRequest, SearchScope};
use crate::errors::DirectoryError;

/// Operation kinds, used for failure injection and the operation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Search,
    Add,
    Modify,
    Delete,
}

impl Operation {
    fn as_str(self) -> &'static str {
        match self {
            Operation::Search => "search",
            Operation::Add => "add",
            Operation::Modify => "modify",
            Operation::Delete => "delete",
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryDirectory {
    entries: BTreeMap<String, DirectoryEntry>,
    failures: HashSet<(Operation, String)>,
    log: Vec<(Operation, String)>,
}

fn key(dn: &str) -> String {
    dn.trim().to_ascii_lowercase()
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an entry directly, bypassing the operation log.
    pub fn insert(&mut self, entry: DirectoryEntry) {
        self.entries.insert(key(&entry.dn), entry);
    }

    pub fn get(&self, dn: &str) -> Option<&DirectoryEntry> {
        self.entries.get(&key(dn))
    }

    pub fn contains(&self, dn: &str) -> bool {
        self.entries.contains_key(&key(dn))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.entries.values()
    }

    /// Make the next and every later `operation` on `dn` fail.
    /// For searches `dn` is the search base.
    pub fn fail_on(&mut self, operation: Operation, dn: &str) {
        self.failures.insert((operation, key(dn)));
    }

    /// Mutating operations attempted so far, in order, with their DNs.
    pub fn operations(&self) -> &[(Operation, String)] {
        &self.log
    }

    fn injected(&mut self, operation: Operation, dn: &str) -> Result<(), DirectoryError> {
        if operation != Operation::Search {
            self.log.push((operation, dn.to_string()));
        }
        if self.failures.contains(&(operation, key(dn))) {
            debug!(operation = operation.as_str(), dn, "injected directory failure");
            return Err(DirectoryError::OperationFailed {
                operation: operation.as_str(),
                dn: dn.to_string(),
                detail: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn in_scope(entry_dn: &str, base: &str, scope: SearchScope) -> bool {
        let entry = key(entry_dn);
        let base = key(base);
        match scope {
            SearchScope::Base => entry == base,
            SearchScope::OneLevel => key(split_dn(&entry).1) == base,
            SearchScope::Subtree => entry == base || entry.ends_with(&format!(",{base}")),
        }
    }
}

/// Parsed `(attr=value)` assertion. `None` value means presence.
fn parse_filter(filter: &str) -> Option<(&str, Option<&str>)> {
    let inner = filter.trim().strip_prefix('(')?.strip_suffix(')')?;
    let (attr, value) = inner.split_once('=')?;
    let value = match value {
        "*" => None,
        v => Some(v),
    };
    Some((attr.trim(), value))
}

fn matches_filter(entry: &DirectoryEntry, filter: (&str, Option<&str>)) -> bool {
    let (attr, expected) = filter;
    if attr.eq_ignore_ascii_case("objectClass") && expected.is_none() {
        return true;
    }
    match (entry.values(attr), expected) {
        (Some(values), None) => !values.is_empty(),
        (Some(values), Some(expected)) => values.iter().any(|v| v.eq_ignore_ascii_case(expected)),
        (None, _) => false,
    }
}

impl Directory for MemoryDirectory {
    async fn search(
        &mut self,
        request: &SearchRequest,
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        self.injected(Operation::Search, &request.base)
            .map_err(|e| DirectoryError::SearchFailed {
                base: request.base.clone(),
                detail: e.to_string(),
            })?;
        if !self.contains(&request.base) {
            return Err(DirectoryError::NoSuchEntry(request.base.clone()));
        }
        let filter = parse_filter(&request.filter).ok_or_else(|| DirectoryError::SearchFailed {
            base: request.base.clone(),
            detail: format!("unsupported filter '{}'", request.filter),
        })?;

        let found = self
            .entries
            .values()
            .filter(|e| Self::in_scope(&e.dn, &request.base, request.scope))
            .filter(|e| matches_filter(e, filter))
            .map(|e| {
                let mut projected = DirectoryEntry::new(e.dn.clone());
                for (name, values) in &e.attributes {
                    if request.attributes.is_empty()
                        || request.attributes.iter().any(|a| a.eq_ignore_ascii_case(name))
                    {
                        projected.attributes.insert(name.clone(), values.clone());
                    }
                }
                projected
            })
            .collect();
        Ok(found)
    }

    async fn add(&mut self, dn: &str, attributes: Attributes) -> Result<(), DirectoryError> {
        self.injected(Operation::Add, dn)?;
        if self.contains(dn) {
            return Err(DirectoryError::AlreadyExists(dn.to_string()));
        }
        self.insert(DirectoryEntry {
            dn: dn.to_string(),
            attributes: attributes.into_iter().collect(),
        });
        Ok(())
    }

    async fn modify_replace(
        &mut self,
        dn: &str,
        attribute: &str,
        values: Vec<String>,
    ) -> Result<(), DirectoryError> {
        self.injected(Operation::Modify, dn)?;
        let entry = self
            .entries
            .get_mut(&key(dn))
            .ok_or_else(|| DirectoryError::NoSuchEntry(dn.to_string()))?;
        entry
            .attributes
            .retain(|name, _| !name.eq_ignore_ascii_case(attribute));
        if !values.is_empty() {
            entry.attributes.insert(attribute.to_string(), values);
        }
        Ok(())
    }

    async fn delete(&mut self, dn: &str) -> Result<(), DirectoryError> {
        self.injected(Operation::Delete, dn)?;
        self.entries
            .remove(&key(dn))
            .map(|_| ())
            .ok_or_else(|| DirectoryError::NoSuchEntry(dn.to_string()))
    }
}
