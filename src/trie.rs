//! Dictionary trie construction over a word list and numeric patterns.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::corpus::{BuildDiagnostic, NumberPattern, WordEntry};
use crate::pattern::AlphabetPattern;
use crate::substitutions::SubstitutionTable;

pub(crate) type NodeId = usize;

/// Index of the root node in the arena.
pub(crate) const ROOT: NodeId = 0;

/// A single trie node, stored in the arena owned by [`DictionaryTrie`].
///
/// A node's depth equals the number of characters consumed to reach it from
/// the root; `terminal_bits` is set exactly when a recognized word or number
/// of that length ends here.
#[derive(Debug, Default)]
pub(crate) struct DictionaryNode {
    /// Child nodes keyed by one lowercase letter or digit.
    pub(crate) children: HashMap<char, NodeId>,
    /// Bit cost of a recognized unit ending exactly at this node.
    pub(crate) terminal_bits: Option<f64>,
    /// Parent index; `None` only for the root.
    parent: Option<NodeId>,
    /// The character consumed to step from the parent to this node.
    key: Option<char>,
}

/// A prefix trie over known words and numeric patterns, plus the
/// substitution table used to match obfuscated spellings.
///
/// Built once per corpus by [`TrieBuilder`] and immutable afterwards;
/// analyses only take `&self`, so separate passwords may be analyzed
/// concurrently against one trie.
#[derive(Debug)]
pub struct DictionaryTrie {
    pub(crate) nodes: Vec<DictionaryNode>,
    pub(crate) substitutions: SubstitutionTable,
    pub(crate) pattern: AlphabetPattern,
}

impl DictionaryTrie {
    /// The substitution table this trie matches against.
    pub fn substitutions(&self) -> &SubstitutionTable {
        &self.substitutions
    }

    /// Reconstructs the literal spelled along the path to `id` by walking
    /// parent indices back to the root.
    pub(crate) fn word_of(&self, id: NodeId) -> String {
        let mut letters = Vec::new();
        let mut cursor = Some(id);
        while let Some(index) = cursor {
            let node = &self.nodes[index];
            if let Some(key) = node.key {
                letters.push(key);
            }
            cursor = node.parent;
        }
        letters.into_iter().rev().collect()
    }
}

/// A number pattern with its text split into characters for depth routing.
#[derive(Debug, Clone)]
struct RoutedNumber {
    prefix: Vec<char>,
    bits: f64,
    continuation: Vec<char>,
    multiplier: f64,
}

/// Builds a [`DictionaryTrie`] from caller-supplied word, number, and
/// substitution lists.
///
/// Malformed entries are rejected with a [`BuildDiagnostic`] and skipped;
/// they never abort the build.
#[derive(Debug, Default)]
pub struct TrieBuilder {
    words: Vec<(String, Option<f64>)>,
    numbers: Vec<NumberPattern>,
    substitutions: SubstitutionTable,
    diagnostics: Vec<BuildDiagnostic>,
    word_index: usize,
    number_index: usize,
}

impl TrieBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one word entry. Bare entries are costed uniformly at
    /// `log2(word count)` when the trie is built.
    pub fn push_word(&mut self, entry: impl Into<WordEntry>) {
        let entry = entry.into();
        let index = self.word_index;
        self.word_index += 1;

        if entry.word().is_empty() {
            self.diagnostics.push(BuildDiagnostic::MalformedWordEntry {
                index,
                reason: "empty word".to_string(),
            });
            return;
        }
        if let Some(bits) = entry.explicit_bits() {
            if !bits.is_finite() || bits < 0.0 {
                self.diagnostics.push(BuildDiagnostic::MalformedWordEntry {
                    index,
                    reason: format!("bit cost {bits} is not finite and non-negative"),
                });
                return;
            }
        }

        self.words
            .push((entry.word().to_lowercase(), entry.explicit_bits()));
    }

    pub fn extend_words<I, E>(&mut self, entries: I)
    where
        I: IntoIterator<Item = E>,
        E: Into<WordEntry>,
    {
        for entry in entries {
            self.push_word(entry);
        }
    }

    /// Adds one numeric pattern.
    pub fn push_number(&mut self, pattern: NumberPattern) {
        let index = self.number_index;
        self.number_index += 1;

        if pattern.prefix.is_empty() {
            self.diagnostics
                .push(BuildDiagnostic::MalformedNumberPattern {
                    index,
                    reason: "empty prefix".to_string(),
                });
            return;
        }
        let numeric = |c: char| c.is_ascii_digit() || c == '.';
        if !pattern.prefix.chars().all(numeric) || !pattern.continuation.chars().all(numeric) {
            self.diagnostics
                .push(BuildDiagnostic::MalformedNumberPattern {
                    index,
                    reason: "prefix and continuation may only contain digits or '.'".to_string(),
                });
            return;
        }
        if !pattern.prefix_bits.is_finite()
            || pattern.prefix_bits < 0.0
            || !pattern.multiplier.is_finite()
            || pattern.multiplier < 0.0
        {
            self.diagnostics
                .push(BuildDiagnostic::MalformedNumberPattern {
                    index,
                    reason: "bit cost and multiplier must be finite and non-negative".to_string(),
                });
            return;
        }

        self.numbers.push(pattern);
    }

    pub fn extend_numbers<I>(&mut self, patterns: I)
    where
        I: IntoIterator<Item = NumberPattern>,
    {
        for pattern in patterns {
            self.push_number(pattern);
        }
    }

    /// Registers `substitute` for every letter in `bases`.
    ///
    /// A substitute whose leading character collides with an earlier one for
    /// the same base letter is dropped and reported.
    pub fn add_substitution(&mut self, bases: &str, substitute: &str) {
        if substitute.is_empty() {
            return;
        }
        for base in bases.chars().filter(char::is_ascii_alphabetic) {
            if !self.substitutions.add(base, substitute) {
                self.diagnostics.push(BuildDiagnostic::AmbiguousSubstitution {
                    base: base.to_ascii_lowercase(),
                    substitute: substitute.to_string(),
                });
            }
        }
    }

    /// Registers every substitute for every letter in `bases`.
    pub fn add_substitutions(&mut self, bases: &str, substitutes: &[&str]) {
        for substitute in substitutes {
            self.add_substitution(bases, substitute);
        }
    }

    /// Consumes the builder, producing the trie and the diagnostics
    /// collected along the way.
    pub fn build(self) -> (DictionaryTrie, Vec<BuildDiagnostic>) {
        // uniform prior over the word list for entries without explicit bits
        let uniform_bits = if self.words.is_empty() {
            0.0
        } else {
            (self.words.len() as f64).log2()
        };

        let words: Vec<(Vec<char>, f64)> = self
            .words
            .iter()
            .map(|(word, bits)| (word.chars().collect(), bits.unwrap_or(uniform_bits)))
            .collect();
        let numbers: Vec<RoutedNumber> = self
            .numbers
            .iter()
            .map(|pattern| RoutedNumber {
                prefix: pattern.prefix.chars().collect(),
                bits: pattern.prefix_bits,
                continuation: pattern.continuation.chars().collect(),
                multiplier: pattern.multiplier,
            })
            .collect();

        let mut nodes = vec![DictionaryNode::default()];
        route(&mut nodes, ROOT, 0, words, numbers);

        let mut pattern = AlphabetPattern::new();
        pattern.refresh(&self.substitutions);

        #[cfg(feature = "tracing")]
        {
            tracing::info!(
                "dictionary trie built: {} nodes from {} words and {} number patterns",
                nodes.len(),
                self.words.len(),
                self.numbers.len()
            );
            if !self.diagnostics.is_empty() {
                tracing::warn!("{} corpus entries rejected during build", self.diagnostics.len());
            }
        }

        (
            DictionaryTrie {
                nodes,
                substitutions: self.substitutions,
                pattern,
            },
            self.diagnostics,
        )
    }
}

/// Routes word and number entries into the node at `id`, creating children
/// as needed and recursing until no entries remain.
fn route(
    nodes: &mut Vec<DictionaryNode>,
    id: NodeId,
    depth: usize,
    words: Vec<(Vec<char>, f64)>,
    numbers: Vec<RoutedNumber>,
) {
    let mut child_words: BTreeMap<char, Vec<(Vec<char>, f64)>> = BTreeMap::new();
    let mut child_numbers: BTreeMap<char, Vec<RoutedNumber>> = BTreeMap::new();

    for (word, bits) in words {
        match word.get(depth).copied() {
            // the word ends exactly here; last write wins
            None => nodes[id].terminal_bits = Some(bits),
            Some(c) => child_words.entry(c).or_default().push((word, bits)),
        }
    }

    for number in numbers {
        if depth < number.prefix.len() {
            let c = number.prefix[depth];
            child_numbers.entry(c).or_default().push(number);
            continue;
        }

        // inside the continuation: the pattern terminates here and, unlike a
        // word, may keep going into the next predicted digit
        let past = depth - number.prefix.len();
        nodes[id].terminal_bits =
            Some(number.bits + number.multiplier * ((past + 1) as f64).log2());
        if let Some(&c) = number.continuation.get(past) {
            child_numbers.entry(c).or_default().push(number);
        }
    }

    let mut keys: BTreeSet<char> = child_words.keys().copied().collect();
    keys.extend(child_numbers.keys().copied());

    for key in keys {
        let child = nodes.len();
        nodes.push(DictionaryNode {
            parent: Some(id),
            key: Some(key),
            ..DictionaryNode::default()
        });
        nodes[id].children.insert(key, child);
        route(
            nodes,
            child,
            depth + 1,
            child_words.remove(&key).unwrap_or_default(),
            child_numbers.remove(&key).unwrap_or_default(),
        );
    }
}
