//! Pattern compilation
//!
//! Turns a configured word or phrase spec into a reusable matcher. The little
//! DSL understood here: plain text is matched literally, `*` matches any
//! sequence, and a pattern written `/like this/` is taken as a raw regular
//! expression. Matchers are stateless `Regex` values, so reuse across calls
//! and tasks can never skip a match through leftover cursor state.

use crate::FILTER_TARGET;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::policy::FilterMode;

/// Whether a pattern came from the word list or the phrase list
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Single banned word
    #[display("word")]
    Word,
    /// Banned phrase, matched as a normalized substring
    #[display("phrase")]
    Phrase,
}

/// A compiled, reusable matcher for one configured pattern
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// The configured source text, as written
    pub source: String,
    /// Word or phrase
    pub kind: MatchKind,
    /// Whether the source contained a `*` wildcard
    pub wildcard: bool,
    regex: regex::Regex,
}

impl CompiledPattern {
    /// Test the pattern against already-normalized text.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Compile one pattern spec into a matcher.
///
/// Returns `None` for empty sources and for malformed raw regexes; a bad
/// pattern is logged and skipped, never allowed to poison the rest of the
/// pattern list.
#[must_use]
pub fn compile_pattern(source: &str, mode: FilterMode, kind: MatchKind) -> Option<CompiledPattern> {
    let source = source.trim();
    if source.is_empty() {
        return None;
    }
    let lowered = source.to_lowercase();

    let raw_regex =
        lowered.len() > 2 && lowered.starts_with('/') && lowered.ends_with('/');

    let (body, wildcard) = if raw_regex {
        (lowered[1..lowered.len() - 1].to_string(), false)
    } else {
        let wildcard = lowered.contains('*');
        let escaped = lowered
            .split('*')
            .map(|segment| regex::escape(segment))
            .collect::<Vec<_>>()
            .join(".*");
        (escaped, wildcard)
    };

    // Exact mode pins single words to word boundaries. Wildcards, phrases and
    // raw regexes always match as substrings of the normalized text.
    let anchored = if !raw_regex
        && !wildcard
        && mode == FilterMode::Exact
        && kind == MatchKind::Word
    {
        format!(r"\b{body}\b")
    } else {
        body
    };

    match RegexBuilder::new(&anchored).case_insensitive(true).build() {
        Ok(regex) => Some(CompiledPattern {
            source: source.to_string(),
            kind,
            wildcard,
            regex,
        }),
        Err(error) => {
            warn!(
                target: FILTER_TARGET,
                pattern = %source,
                error = %error,
                "Skipping pattern that failed to compile"
            );
            None
        }
    }
}
