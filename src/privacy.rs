//! Heuristic detection of personal or identifying narrative text.
//!
//! The filter runs twice in the pipeline: once over whole documents during
//! ingestion and again over every assembled chunk, since chunk boundaries can
//! isolate a disclosure that was diluted at document level.

use regex::Regex;
use std::sync::LazyLock;

/// First-person disclosure phrases, matched as lowercase substrings.
pub const TRIGGER_PHRASES: &[&str] = &[
    "i was diagnosed",
    "my chemo",
    "my surgery",
    "i had radiation",
    "my doctor",
    "i went to",
    "my cancer",
    "when i found out",
];

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(19|20)\d{2}\b").unwrap());

static FAMILY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bmy (mom|dad|sister|brother|aunt|uncle)\b").unwrap());

static AGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bi (was|am) \d{1,2}\b").unwrap());

/// Decides whether a piece of text must be kept out of the corpus.
///
/// Implementations must be pure: the same text always yields the same answer.
pub trait PrivacyClassifier: Send + Sync {
    fn is_personal(&self, text: &str) -> bool;
}

/// Rule-based classifier over trigger phrases, years, family possessives and
/// first-person age statements.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicPrivacyFilter;

impl PrivacyClassifier for HeuristicPrivacyFilter {
    fn is_personal(&self, text: &str) -> bool {
        let t = text.to_lowercase();
        if TRIGGER_PHRASES.iter().any(|k| t.contains(k)) {
            return true;
        }
        if YEAR_RE.is_match(&t) {
            return true;
        }
        if FAMILY_RE.is_match(&t) {
            return true;
        }
        AGE_RE.is_match(&t)
    }
}

/// Convenience wrapper around [`HeuristicPrivacyFilter`].
pub fn is_personal(text: &str) -> bool {
    HeuristicPrivacyFilter.is_personal(text)
}
