use std::collections::HashSet;

use crate::npm::{ClientEntry, Directive};

/// Ordered, duplicate-free list of addresses that should be allowed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredSet {
    entries: Vec<String>,
}

impl DesiredSet {
    /// Collects entries, keeping the first occurrence of each address
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let entries = entries
            .into_iter()
            .map(Into::into)
            .filter(|entry: &String| seen.insert(entry.clone()))
            .collect();
        Self { entries }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Difference between the desired set and an access list's current clients
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientDiff {
    /// Desired addresses with no `allow` entry yet
    pub added: Vec<String>,
    /// Current entries that must go: denies, stale addresses and repeats
    pub removed: Vec<ClientEntry>,
}

impl ClientDiff {
    pub fn compute(desired: &DesiredSet, current: &[ClientEntry]) -> Self {
        let wanted: HashSet<&str> = desired.as_slice().iter().map(String::as_str).collect();
        let mut kept: HashSet<&str> = HashSet::with_capacity(current.len());

        let removed = current
            .iter()
            .filter(|entry| {
                let keep = entry.directive == Directive::Allow
                    && wanted.contains(entry.address.as_str())
                    && kept.insert(entry.address.as_str());
                !keep
            })
            .cloned()
            .collect();

        let added = desired
            .as_slice()
            .iter()
            .filter(|address| !kept.contains(address.as_str()))
            .cloned()
            .collect();

        Self { added, removed }
    }

    /// True when the access list already holds exactly the desired set
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}
