//! Cached character class over letters and substitution leading characters.

use std::collections::HashSet;

use crate::substitutions::SubstitutionTable;

/// Decides whether a character could plausibly continue a dictionary match.
///
/// The class accepts any plain letter plus the leading character of every
/// registered substitute. The compiled set is cached against the owning
/// [`SubstitutionTable`]'s revision and rebuilt by [`refresh`] when the table
/// has changed; the trie builder refreshes it once at build time, so analyses
/// only ever read it.
///
/// [`refresh`]: AlphabetPattern::refresh
#[derive(Debug, Clone, Default)]
pub struct AlphabetPattern {
    leads: HashSet<char>,
    built_revision: Option<u64>,
}

impl AlphabetPattern {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompiles the class if `table` has changed since the last build.
    pub fn refresh(&mut self, table: &SubstitutionTable) {
        if self.built_revision == Some(table.revision()) {
            return;
        }
        self.leads = table.leading_chars().collect();
        self.built_revision = Some(table.revision());
    }

    /// True when `c` is a letter or begins a registered substitution.
    pub fn matches(&self, c: char) -> bool {
        c.is_ascii_alphabetic() || self.leads.contains(&c)
    }
}
