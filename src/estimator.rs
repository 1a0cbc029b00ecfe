//! Worst-case decomposition search and the public estimation entry points.

use secrecy::{ExposeSecret, SecretString};

#[cfg(feature = "async")]
use tokio::sync::mpsc;

#[cfg(feature = "async")]
use tokio_util::sync::CancellationToken;

use crate::analysis::{MatchState, Segment};
use crate::trie::{DictionaryTrie, NodeId, ROOT};

/// Bit cost of one arbitrary printable ASCII character, `log2(95)`.
///
/// This is the fallback cost charged per character that neither matches the
/// dictionary nor any substitution.
pub fn printable_char_bits() -> f64 {
    f64::from(u32::from(b'~') - u32::from(b' ') + 1).log2()
}

/// The result of estimating one password: the worst-case (lowest-cost)
/// decomposition the dictionary admits.
#[derive(Debug, Clone, PartialEq)]
pub struct EntropyEstimate {
    /// Total bit cost of the cheapest decomposition.
    pub bits: f64,
    /// The decomposition itself, in password order.
    pub segments: Vec<Segment>,
}

/// Estimates the entropy of a password against a dictionary trie.
///
/// The search is exhaustive: every viable decomposition is explored and the
/// weakest one (full coverage first, then lowest bit total) is returned, so
/// the result is the attacker-favorable lower bound. For the cheaper greedy
/// approximation use [`DictionaryTrie::analyze`] with `exhaustive = false`.
///
/// # Arguments
/// * `trie` - The dictionary to decompose against
/// * `password` - The password to estimate
pub fn estimate_password_entropy(trie: &DictionaryTrie, password: &SecretString) -> EntropyEstimate {
    let analysis = trie.analyze(password.expose_secret(), true);
    EntropyEstimate {
        bits: analysis.total_bits(),
        segments: analysis.segments().to_vec(),
    }
}

/// Async version that sends the estimate via channel.
///
/// Waits out a short debounce first, so a caller re-estimating on every
/// keystroke can cancel superseded requests; the token is checked before the
/// search and again before sending, never inside it.
#[cfg(feature = "async")]
pub async fn estimate_password_entropy_tx(
    trie: &DictionaryTrie,
    password: &SecretString,
    token: CancellationToken,
    tx: mpsc::Sender<EntropyEstimate>,
) {
    use std::time::Duration;

    #[cfg(feature = "tracing")]
    tracing::info!("estimation is about to start...");

    tokio::time::sleep(Duration::from_millis(300)).await;

    if token.is_cancelled() {
        #[cfg(feature = "tracing")]
        tracing::info!("estimation cancelled before starting");
        return;
    }

    let estimate = estimate_password_entropy(trie, password);

    if token.is_cancelled() {
        return;
    }

    if tx.send(estimate).await.is_err() {
        #[cfg(feature = "tracing")]
        tracing::error!("Failed to send password entropy estimate: receiver dropped");
    }
}

impl DictionaryTrie {
    /// Finds the weakest decomposition of `password`.
    ///
    /// With `exhaustive = false` the search is a bounded greedy variant: at a
    /// terminal node it only stops if the next character no longer looks like
    /// dictionary material, which can miss cheaper decompositions further
    /// along the same branch. With `exhaustive = true` every terminal
    /// opportunity and every fallback is explored and the comparator reduces
    /// them to the true minimum.
    pub fn analyze(&self, password: &str, exhaustive: bool) -> MatchState {
        let initial = MatchState::new(password);
        self.search(ROOT, &initial, 0, exhaustive, 0.0)
            .unwrap_or(initial)
    }

    /// One recursive step of the decomposition search at `node`, matching
    /// `state.remainder()[depth..]` against the subtrie below it.
    ///
    /// `substitution_bits` carries the bonus accumulated for substitutions
    /// used since the current unit began; it is charged when the unit
    /// completes and reset on every restart from the root.
    fn search(
        &self,
        node: NodeId,
        state: &MatchState,
        depth: usize,
        exhaustive: bool,
        substitution_bits: f64,
    ) -> Option<MatchState> {
        let current = &self.nodes[node];
        let c = state.char_at(depth);

        let mut worst: Option<MatchState> = None;

        // a unit ends here: take it unless the next character still looks
        // like part of a dictionary match (always take it when exhaustive)
        if let Some(bits) = current.terminal_bits {
            let continues = c.is_some_and(|next| self.pattern.matches(next));
            if exhaustive || !continues {
                worst = Some(state.with_word(depth, self.word_of(node), bits, substitution_bits));
            }
        }

        let Some(c) = c else {
            // nothing left to match; an exhausted remainder is itself a
            // complete decomposition
            if state.remainder_is_empty() {
                return worst.or_else(|| Some(state.clone()));
            }
            return worst;
        };

        if let Some(&child) = current.children.get(&c) {
            worst = weakest(
                worst,
                self.search(child, state, depth + 1, exhaustive, substitution_bits),
            );
        } else {
            // no direct child: the typed character may stand in for a base
            // letter whose subtrie continues the walk
            for candidate in self.substitutions.lookup(c) {
                let Some(&child) = current.children.get(&candidate.base) else {
                    continue;
                };
                if !state.tail_follows(depth + 1, &candidate.tail) {
                    continue;
                }
                let consumed = 1 + candidate.tail.chars().count();
                let rewritten = state.with_substitution(depth, candidate.base, consumed);
                worst = weakest(
                    worst,
                    self.search(
                        child,
                        &rewritten,
                        depth + 1,
                        exhaustive,
                        substitution_bits + candidate.bonus_bits,
                    ),
                );
            }
        }

        // cross-word continuation: restart from the root on whatever the
        // best candidate left unmatched
        let continued = match &worst {
            Some(candidate) if !candidate.remainder_is_empty() => {
                self.search(ROOT, candidate, 0, exhaustive, 0.0)
            }
            _ => None,
        };
        worst = weakest(worst, continued);

        // fallback: concede one raw character and restart from the root
        if worst.is_none() || exhaustive {
            let skipped = state.with_raw_char(printable_char_bits());
            worst = weakest(worst, self.search(ROOT, &skipped, 0, exhaustive, 0.0));
        }

        worst
    }
}

/// Picks the weaker of two candidates: the shorter unmatched remainder wins,
/// then the lower bit total. An absent candidate loses to any present one.
fn weakest(a: Option<MatchState>, b: Option<MatchState>) -> Option<MatchState> {
    match (a, b) {
        (None, b) => b,
        (a, None) => a,
        (Some(a), Some(b)) => {
            if b.remainder_len() < a.remainder_len() {
                Some(b)
            } else if a.remainder_len() < b.remainder_len() {
                Some(a)
            } else if b.total_bits() < a.total_bits() {
                Some(b)
            } else {
                Some(a)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::NumberPattern;
    use crate::trie::TrieBuilder;

    const EPS: f64 = 1e-9;

    fn secret(password: &str) -> SecretString {
        SecretString::new(password.to_string().into())
    }

    fn small_trie() -> DictionaryTrie {
        let mut builder = TrieBuilder::new();
        builder.push_word(("password", 10.0));
        builder.push_word(("correct", 4.7));
        builder.push_word(("horse", 5.5));
        builder.push_number(NumberPattern::new("19", 6.0, "99"));
        builder.add_substitution("a", "4");
        let (trie, diagnostics) = builder.build();
        assert!(diagnostics.is_empty());
        trie
    }

    #[test]
    fn test_empty_password_zero_bits() {
        let trie = small_trie();
        let estimate = estimate_password_entropy(&trie, &secret(""));
        assert_eq!(estimate.bits, 0.0);
        assert!(estimate.segments.is_empty());
    }

    #[test]
    fn test_pure_fallback_cost() {
        let trie = small_trie();
        let estimate = estimate_password_entropy(&trie, &secret("!?"));
        assert!((estimate.bits - 2.0 * printable_char_bits()).abs() < EPS);
        let labels: Vec<&str> = estimate.segments.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["!", "?"]);
    }

    #[test]
    fn test_known_word_exact_bits() {
        let trie = small_trie();
        let estimate = estimate_password_entropy(&trie, &secret("password"));
        assert!((estimate.bits - 10.0).abs() < EPS);
        assert_eq!(estimate.segments.len(), 1);
        assert_eq!(estimate.segments[0].label, "password");
        assert_eq!(estimate.segments[0].substitution_bonus, 0.0);
    }

    #[test]
    fn test_case_insensitive() {
        let trie = small_trie();
        let estimate = estimate_password_entropy(&trie, &secret("PaSsWoRd"));
        assert!((estimate.bits - 10.0).abs() < EPS);
    }

    #[test]
    fn test_substitution_adds_bonus() {
        let trie = small_trie();
        let estimate = estimate_password_entropy(&trie, &secret("p4ssword"));
        // one substitute registered for 'a': bonus = log2(1 + 1) = 1 bit
        assert!((estimate.bits - 11.0).abs() < EPS);
        assert_eq!(estimate.segments.len(), 1);
        assert_eq!(estimate.segments[0].label, "password");
        assert!((estimate.segments[0].substitution_bonus - 1.0).abs() < EPS);
    }

    #[test]
    fn test_multi_char_substitution_collapses() {
        let mut builder = TrieBuilder::new();
        builder.push_word(("pkss", 7.0));
        builder.add_substitution("k", "|<");
        let (trie, _) = builder.build();

        let estimate = estimate_password_entropy(&trie, &secret("p|<ss"));
        assert!((estimate.bits - 8.0).abs() < EPS);
        assert_eq!(estimate.segments[0].label, "pkss");
    }

    #[test]
    fn test_cross_word_concatenation() {
        let trie = small_trie();
        let estimate = estimate_password_entropy(&trie, &secret("correcthorse"));
        assert!((estimate.bits - (4.7 + 5.5)).abs() < EPS);
        let labels: Vec<&str> = estimate.segments.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["correct", "horse"]);
    }

    #[test]
    fn test_word_then_raw_tail() {
        let trie = small_trie();
        let estimate = estimate_password_entropy(&trie, &secret("password!"));
        assert!((estimate.bits - (10.0 + printable_char_bits())).abs() < EPS);
        assert_eq!(estimate.segments.len(), 2);
        assert_eq!(estimate.segments[1].label, "!");
    }

    #[test]
    fn test_number_pattern_match() {
        let trie = small_trie();
        let estimate = estimate_password_entropy(&trie, &secret("1999"));
        // prefix "19" plus two predicted digits
        let expected = 6.0 + 0.1 * 3.0_f64.log2();
        assert!((estimate.bits - expected).abs() < EPS);
        assert_eq!(estimate.segments[0].label, "1999");
    }

    #[test]
    fn test_word_and_number_combined() {
        let trie = small_trie();
        let estimate = estimate_password_entropy(&trie, &secret("password19"));
        assert!((estimate.bits - 16.0).abs() < EPS);
        let labels: Vec<&str> = estimate.segments.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["password", "19"]);
    }

    #[test]
    fn test_picks_cheapest_full_decomposition() {
        let mut builder = TrieBuilder::new();
        builder.push_word(("pass", 30.0));
        builder.push_word(("password", 10.0));
        let (trie, _) = builder.build();

        let estimate = estimate_password_entropy(&trie, &secret("password"));
        assert!((estimate.bits - 10.0).abs() < EPS);
    }

    #[test]
    fn test_idempotent() {
        let trie = small_trie();
        let first = estimate_password_entropy(&trie, &secret("p4ssword1999!"));
        let second = estimate_password_entropy(&trie, &secret("p4ssword1999!"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_appending_fallback_char_never_lowers_bits() {
        let trie = small_trie();
        for password in ["", "password", "correcthorse", "zzz"] {
            let base = estimate_password_entropy(&trie, &secret(password));
            let extended = estimate_password_entropy(&trie, &secret(&format!("{password}~")));
            assert!(
                extended.bits >= base.bits,
                "'{password}~' scored below '{password}'"
            );
        }
    }

    #[test]
    fn test_bits_never_negative() {
        let trie = small_trie();
        for password in ["", "a", "password", "p4ss", "!!!", "correct1999horse"] {
            let estimate = estimate_password_entropy(&trie, &secret(password));
            assert!(estimate.bits >= 0.0);
        }
    }

    #[test]
    fn test_total_is_sum_of_segments() {
        let trie = small_trie();
        let estimate = estimate_password_entropy(&trie, &secret("p4ssword19xy"));
        let sum: f64 = estimate.segments.iter().map(Segment::bits).sum();
        assert!((estimate.bits - sum).abs() < EPS);
    }

    #[test]
    fn test_greedy_never_beats_exhaustive() {
        let trie = small_trie();
        for password in ["password", "correcthorse", "p4ssword!", "1999"] {
            let greedy = trie.analyze(password, false);
            let exhaustive = trie.analyze(password, true);
            assert!(greedy.total_bits() >= exhaustive.total_bits() - EPS);
        }
    }

    #[test]
    fn test_greedy_terminates_early_on_letter_boundary() {
        // at the end of "correct" the next character is a letter, so the
        // greedy search refuses to stop there, loses the walk, and concedes
        // the first word character by character before finding "horse"
        let trie = small_trie();
        let greedy = trie.analyze("correcthorse", false);
        let expected = 7.0 * printable_char_bits() + 5.5;
        assert!((greedy.total_bits() - expected).abs() < EPS);
        assert!(greedy.remainder().is_empty());
    }

    #[test]
    fn test_greedy_stops_on_symbol_boundary() {
        let trie = small_trie();
        let greedy = trie.analyze("password!", false);
        assert!((greedy.total_bits() - (10.0 + printable_char_bits())).abs() < EPS);
    }
}
