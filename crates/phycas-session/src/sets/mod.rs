//! Named subsets of the character, taxon and tree index domains.
//!
//! The backend is authoritative for indexed sets: each command state carries
//! a snapshot per domain and [`SetManager::merge_snapshot`] folds it into the
//! resident table. Sets and aliases are never removed during a session.

mod range;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use range::{
    MemberRange, MemberSpecError, compact_ranges, expand, format_member_spec, format_ranges,
    parse_member_ranges, parse_member_spec,
};

/// The index domains the backend maintains sets for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetKind {
    /// Characters (alignment columns).
    Character,
    /// Taxa.
    Taxon,
    /// Trees.
    Tree,
}

impl SetKind {
    /// Every domain, in wire order.
    pub const ALL: [Self; 3] = [Self::Character, Self::Taxon, Self::Tree];

    /// Tag of the element carrying this domain's snapshot.
    #[must_use]
    pub const fn element_name(self) -> &'static str {
        match self {
            Self::Character => "char_set_manager",
            Self::Taxon => "tax_set_manager",
            Self::Tree => "tree_set_manager",
        }
    }

    /// Resolves a snapshot element tag to its domain.
    #[must_use]
    pub fn from_element_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.element_name() == name)
    }

    /// Short user-facing name (`char`, `tax` or `tree`).
    #[must_use]
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::Character => "char",
            Self::Taxon => "tax",
            Self::Tree => "tree",
        }
    }

    /// Resolves a short user-facing name.
    #[must_use]
    pub fn from_short_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.short_name().eq_ignore_ascii_case(name))
    }
}

/// A labelled subset of a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedSet {
    label: String,
    members: Vec<MemberRange>,
}

impl IndexedSet {
    /// Creates a set from already parsed members.
    #[must_use]
    pub fn new(label: impl Into<String>, members: Vec<MemberRange>) -> Self {
        Self {
            label: label.into(),
            members,
        }
    }

    /// Set label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Members as written by the backend.
    #[must_use]
    pub fn members(&self) -> &[MemberRange] {
        &self.members
    }

    /// Member indices in order.
    #[must_use]
    pub fn indices(&self) -> Vec<u32> {
        expand(&self.members)
    }

    /// Members in canonical compact notation.
    #[must_use]
    pub fn member_spec(&self) -> String {
        format_member_spec(&self.indices())
    }
}

/// One domain's worth of set information as broadcast by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetSnapshot {
    aliases: BTreeMap<u32, String>,
    sets: Vec<(String, String)>,
    max_index: Option<u32>,
}

impl SetSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an index alias.
    #[must_use]
    pub fn with_alias(mut self, index: u32, label: impl Into<String>) -> Self {
        self.aliases.insert(index, label.into());
        self
    }

    /// Adds a set with its member description.
    #[must_use]
    pub fn with_set(mut self, label: impl Into<String>, members: impl Into<String>) -> Self {
        self.sets.push((label.into(), members.into()));
        self
    }

    /// Sets the domain upper bound.
    #[must_use]
    pub const fn with_max_index(mut self, max_index: u32) -> Self {
        self.max_index = Some(max_index);
        self
    }

    /// Index aliases.
    #[must_use]
    pub const fn aliases(&self) -> &BTreeMap<u32, String> {
        &self.aliases
    }

    /// Set labels paired with unparsed member descriptions.
    #[must_use]
    pub fn sets(&self) -> &[(String, String)] {
        &self.sets
    }

    /// Domain upper bound, when broadcast.
    #[must_use]
    pub const fn max_index(&self) -> Option<u32> {
        self.max_index
    }
}

/// A set whose member description could not be parsed during a merge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("set '{label}' has invalid members: {source}")]
pub struct SetMergeError {
    /// Label of the rejected set.
    pub label: String,
    /// Parse failure.
    #[source]
    pub source: MemberSpecError,
}

/// Resident table of named sets for one domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetManager {
    aliases: BTreeMap<u32, String>,
    sets: Vec<IndexedSet>,
    max_index: Option<u32>,
}

impl SetManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a snapshot into the table.
    ///
    /// Aliases are merged, sets with a known label have their members
    /// replaced, new labels are appended and the domain bound is replaced only
    /// when the snapshot carries one. Sets whose members fail to parse are
    /// left untouched and reported.
    pub fn merge_snapshot(&mut self, snapshot: &SetSnapshot) -> Vec<SetMergeError> {
        self.aliases.extend(
            snapshot
                .aliases
                .iter()
                .map(|(index, label)| (*index, label.clone())),
        );
        if let Some(max_index) = snapshot.max_index {
            self.max_index = Some(max_index);
        }

        let mut failures = Vec::new();
        for (label, spec) in &snapshot.sets {
            match parse_member_ranges(spec) {
                Ok(members) => self.upsert(label, members),
                Err(source) => failures.push(SetMergeError {
                    label: label.clone(),
                    source,
                }),
            }
        }
        failures
    }

    fn upsert(&mut self, label: &str, members: Vec<MemberRange>) {
        match self.sets.iter_mut().find(|set| set.label == label) {
            Some(existing) => existing.members = members,
            None => self.sets.push(IndexedSet::new(label, members)),
        }
    }

    /// Number of indices in the domain.
    #[must_use]
    pub fn domain_size(&self) -> u32 {
        self.max_index
            .unwrap_or_else(|| u32::try_from(self.aliases.len()).unwrap_or(u32::MAX))
    }

    /// One display label per domain index, aliases taking precedence.
    #[must_use]
    pub fn get_domain(&self) -> Vec<String> {
        (1..=self.domain_size())
            .map(|index| {
                self.aliases
                    .get(&index)
                    .cloned()
                    .unwrap_or_else(|| index.to_string())
            })
            .collect()
    }

    /// Looks up a set by label.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&IndexedSet> {
        self.sets.iter().find(|set| set.label == label)
    }

    /// Sets in the order they were first seen.
    #[must_use]
    pub fn sets(&self) -> &[IndexedSet] {
        &self.sets
    }

    /// Set labels in the order they were first seen.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.sets.iter().map(IndexedSet::label)
    }

    /// Alias for an index.
    #[must_use]
    pub fn alias(&self, index: u32) -> Option<&str> {
        self.aliases.get(&index).map(String::as_str)
    }

    /// Domain bound broadcast by the backend.
    #[must_use]
    pub const fn max_index(&self) -> Option<u32> {
        self.max_index
    }
}
