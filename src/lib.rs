//! Dictionary-aware password entropy estimation.
//!
//! Models an attacker who already knows the user's dictionary: a password is
//! decomposed into known words, numeric patterns, leetspeak substitutions,
//! and literal fallback characters, and the decomposition with the *lowest*
//! total bit cost wins. That minimum is a worst-case lower bound on the
//! password's resistance to a dictionary attack; what to do with the number
//! (thresholds, pass/fail) is left to the caller.
//!
//! # Features
//!
//! - `async` (default): Enables channel-based estimation with cancellation
//! - `tracing`: Enables logging via tracing crate
//!
//! # Example
//!
//! ```rust
//! use pwd_entropy::{estimate_password_entropy, NumberPattern, TrieBuilder};
//! use secrecy::SecretString;
//!
//! // Build the trie once per corpus
//! let mut builder = TrieBuilder::new();
//! builder.extend_words(["password", "correct", "horse"]);
//! builder.push_number(NumberPattern::new("19", 6.0, "99"));
//! builder.add_substitutions("a", &["4", "@"]);
//! let (trie, diagnostics) = builder.build();
//! assert!(diagnostics.is_empty());
//!
//! // Estimate as many passwords as needed against it
//! let password = SecretString::new("p4ssword1999".to_string().into());
//! let estimate = estimate_password_entropy(&trie, &password);
//!
//! println!("{:.1} bits", estimate.bits);
//! for segment in &estimate.segments {
//!     println!("  {:?}: {:.1} bits", segment.label, segment.bits());
//! }
//! ```

// Internal modules
mod analysis;
mod corpus;
mod estimator;
mod pattern;
mod substitutions;
mod trie;

// Public API
pub use analysis::{MatchState, Segment};
pub use corpus::{BuildDiagnostic, NumberPattern, WordEntry};
pub use estimator::{estimate_password_entropy, printable_char_bits, EntropyEstimate};
pub use pattern::AlphabetPattern;
pub use substitutions::{SubstitutionMatch, SubstitutionTable};
pub use trie::{DictionaryTrie, TrieBuilder};

#[cfg(feature = "async")]
pub use estimator::estimate_password_entropy_tx;
