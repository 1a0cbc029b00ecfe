//! Letter substitution table for leetspeak-style lookalikes.

use std::collections::BTreeMap;

/// Registered substitutes for base letters, e.g. `a -> ["4", "@"]`.
///
/// Substitutes are deduplicated by their *leading* character: for a given
/// base letter only one substitute may start with any particular character,
/// and a later collision is dropped. A substitute may be longer than one
/// character; the characters after the first must literally follow in the
/// password for the substitution to apply.
#[derive(Debug, Clone, Default)]
pub struct SubstitutionTable {
    entries: BTreeMap<char, Vec<String>>,
    revision: u64,
}

/// A candidate resolved by [`SubstitutionTable::lookup`].
#[derive(Debug, Clone, PartialEq)]
pub struct SubstitutionMatch {
    /// The base letter the typed character stands in for.
    pub base: char,
    /// Characters that must literally follow the typed character.
    pub tail: String,
    /// Bit bonus charged for substituting this base letter.
    pub bonus_bits: f64,
}

impl SubstitutionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `substitute` as standing in for `base`.
    ///
    /// Returns `false` when the substitute was dropped because an earlier
    /// substitute for the same base letter shares its leading character.
    /// Empty substitutes and non-letter bases are accepted as no-ops.
    pub fn add(&mut self, base: char, substitute: &str) -> bool {
        let base = base.to_ascii_lowercase();
        if !base.is_ascii_alphabetic() {
            return true;
        }
        let Some(lead) = substitute.chars().next() else {
            return true;
        };

        let substitutes = self.entries.entry(base).or_default();
        if substitutes.iter().any(|s| s.chars().next() == Some(lead)) {
            return false;
        }

        substitutes.push(substitute.to_string());
        self.revision += 1;
        true
    }

    /// Every substitution whose typed leading character is `typed`.
    pub fn lookup(&self, typed: char) -> Vec<SubstitutionMatch> {
        let mut found = Vec::new();
        for (&base, substitutes) in &self.entries {
            let Some(matched) = substitutes.iter().find(|s| s.chars().next() == Some(typed))
            else {
                continue;
            };
            found.push(SubstitutionMatch {
                base,
                tail: matched.chars().skip(1).collect(),
                bonus_bits: ((substitutes.len() + 1) as f64).log2(),
            });
        }
        found
    }

    /// The bit bonus for substituting `base`: `log2(substitute count + 1)`.
    ///
    /// Returns `None` when the letter has no substitutes registered.
    pub fn bonus_bits(&self, base: char) -> Option<f64> {
        self.entries
            .get(&base)
            .map(|substitutes| ((substitutes.len() + 1) as f64).log2())
    }

    /// True when no substitutes are registered at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counter bumped on every successful mutation; drives pattern caching.
    pub(crate) fn revision(&self) -> u64 {
        self.revision
    }

    /// Leading characters of every registered substitute.
    pub(crate) fn leading_chars(&self) -> impl Iterator<Item = char> + '_ {
        self.entries
            .values()
            .flatten()
            .filter_map(|s| s.chars().next())
    }
}
