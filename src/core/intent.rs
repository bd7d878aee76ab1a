//! Intent matching
//!
//! Resolves recognized text against the three phrase catalogs: wake words,
//! interrupt words and commands. Commands are scored on the whole utterance
//! ([`score`]); wake and interrupt words are spotted inside it
//! ([`partial_score`]), which inflates scores, so their thresholds are kept
//! separate and usually higher.
//!
//! Ties go to the entry inserted first: iteration follows insertion order and
//! a later entry only wins with a strictly higher score.

use crate::utils::fuzzy::{partial_score, score};
use serde::{Deserialize, Serialize};

/// Per-catalog similarity thresholds (0-100, exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchThresholds {
    /// Partial-similarity threshold for wake word spotting
    pub wake: f64,
    /// Partial-similarity threshold for interrupt word spotting
    pub interrupt: f64,
    /// Whole-utterance threshold for command resolution
    pub command: f64,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            wake: 80.0,
            interrupt: 80.0,
            command: 50.0,
        }
    }
}

/// Normalize a phrase or utterance before matching
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Trigger-only catalog (wake and interrupt words)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhraseSet {
    phrases: Vec<String>,
}

impl PhraseSet {
    /// Build a set, normalizing each phrase and skipping blanks and repeats
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for phrase in phrases {
            let phrase = normalize(phrase.as_ref());
            if !phrase.is_empty() && !set.phrases.contains(&phrase) {
                set.phrases.push(phrase);
            }
        }
        set
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.phrases.iter().map(String::as_str)
    }
}

/// Ordered phrase → value mapping, immutable once the session starts
#[derive(Debug, Clone)]
pub struct PhraseCatalog<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for PhraseCatalog<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> PhraseCatalog<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Returns `false` (and keeps the earlier binding) when
    /// the normalized phrase is blank or already present.
    pub fn insert(&mut self, phrase: &str, value: T) -> bool {
        let phrase = normalize(phrase);
        if phrase.is_empty() || self.entries.iter().any(|(p, _)| *p == phrase) {
            return false;
        }
        self.entries.push((phrase, value));
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(p, v)| (p.as_str(), v))
    }

    pub fn phrases(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(p, _)| p.as_str())
    }
}

impl<S: AsRef<str>, T> FromIterator<(S, T)> for PhraseCatalog<T> {
    fn from_iter<I: IntoIterator<Item = (S, T)>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for (phrase, value) in iter {
            catalog.insert(phrase.as_ref(), value);
        }
        catalog
    }
}

/// A catalog entry that beat the threshold
#[derive(Debug)]
pub struct PhraseMatch<'a, T> {
    pub phrase: &'a str,
    pub value: &'a T,
    pub score: f64,
}

/// Best-scoring catalog entry, if its score is strictly above `threshold`
pub fn match_best<'a, T>(
    query: &str,
    catalog: &'a PhraseCatalog<T>,
    threshold: f64,
) -> Option<PhraseMatch<'a, T>> {
    let mut best: Option<PhraseMatch<'a, T>> = None;

    for (phrase, value) in catalog.iter() {
        let s = score(phrase, query);
        let better = match &best {
            Some(current) => s > current.score,
            None => true,
        };
        if better {
            best = Some(PhraseMatch {
                phrase,
                value,
                score: s,
            });
        }
    }

    best.filter(|m| m.score > threshold)
}

/// Whether any phrase of `set` partially matches `query` above `threshold`
pub fn contains_phrase(query: &str, set: &PhraseSet, threshold: f64) -> bool {
    set.iter().any(|phrase| partial_score(phrase, query) > threshold)
}

/// Wake/interrupt spotting and command resolution with configured thresholds
#[derive(Debug, Clone)]
pub struct IntentMatcher {
    thresholds: MatchThresholds,
    wake: PhraseSet,
    interrupt: PhraseSet,
}

impl IntentMatcher {
    pub fn new(thresholds: MatchThresholds, wake: PhraseSet, interrupt: PhraseSet) -> Self {
        Self {
            thresholds,
            wake,
            interrupt,
        }
    }

    pub fn thresholds(&self) -> MatchThresholds {
        self.thresholds
    }

    /// Utterance contains a wake word
    pub fn is_wake(&self, text: &str) -> bool {
        contains_phrase(text, &self.wake, self.thresholds.wake)
    }

    /// Utterance contains an interrupt word
    pub fn is_interrupt(&self, text: &str) -> bool {
        contains_phrase(text, &self.interrupt, self.thresholds.interrupt)
    }

    /// Resolve an utterance against the command catalog
    pub fn resolve<'a, T>(
        &self,
        text: &str,
        catalog: &'a PhraseCatalog<T>,
    ) -> Option<PhraseMatch<'a, T>> {
        match_best(text, catalog, self.thresholds.command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn music_catalog() -> PhraseCatalog<&'static str> {
        [("play music", "A1"), ("open firefox", "A2")]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_match_best_picks_closest_command() {
        let catalog = music_catalog();
        let m = match_best("play musik", &catalog, 60.0).expect("should match");
        assert_eq!(m.phrase, "play music");
        assert_eq!(*m.value, "A1");
        assert!(m.score > 60.0);
    }

    #[test]
    fn test_match_best_rejects_garbage() {
        let catalog = music_catalog();
        assert!(match_best("asdkjasd", &catalog, 50.0).is_none());
    }

    #[test]
    fn test_match_best_empty_catalog() {
        let catalog: PhraseCatalog<()> = PhraseCatalog::new();
        assert!(match_best("play music", &catalog, 0.0).is_none());
    }

    #[test]
    fn test_match_best_threshold_is_exclusive() {
        let catalog = music_catalog();
        // exact match scores 100, which is not above 100
        assert!(match_best("play music", &catalog, 100.0).is_none());
        assert!(match_best("play music", &catalog, 99.9).is_some());
    }

    #[test]
    fn test_raising_threshold_never_adds_matches() {
        let catalog = music_catalog();
        let queries = ["play musik", "open fire fox", "play", "asdkjasd", ""];
        for query in queries {
            let mut matched_before = true;
            for step in 0..=20 {
                let threshold = step as f64 * 5.0;
                let matched = match_best(query, &catalog, threshold).is_some();
                assert!(
                    matched_before || !matched,
                    "'{query}' matched again at threshold {threshold}"
                );
                matched_before = matched;
            }
        }
    }

    #[test]
    fn test_first_entry_wins_ties() {
        // both are one substitution away from "ab"
        let catalog: PhraseCatalog<u8> = [("aa", 1), ("bb", 2), ("ba", 3)].into_iter().collect();
        let m = match_best("ab", &catalog, 0.0).expect("should match");
        assert_eq!(*m.value, 1);
    }

    #[test]
    fn test_catalog_rejects_duplicates_and_blanks() {
        let mut catalog = PhraseCatalog::new();
        assert!(catalog.insert("Play Music", 1));
        assert!(!catalog.insert("play music ", 2));
        assert!(!catalog.insert("   ", 3));
        assert_eq!(catalog.len(), 1);
        let m = match_best("play music", &catalog, 50.0).expect("should match");
        assert_eq!(*m.value, 1);
    }

    #[test]
    fn test_contains_phrase_wake_word() {
        let wake = PhraseSet::new(["hey"]);
        assert!(contains_phrase("hey there", &wake, 80.0));
        assert!(!contains_phrase("hi there", &wake, 80.0));
    }

    #[test]
    fn test_contains_phrase_empty_set() {
        let empty = PhraseSet::new(Vec::<String>::new());
        assert!(!contains_phrase("hey there", &empty, 0.0));
    }

    #[test]
    fn test_matcher_uses_its_own_thresholds() {
        let matcher = IntentMatcher::new(
            MatchThresholds {
                wake: 80.0,
                interrupt: 80.0,
                command: 95.0,
            },
            PhraseSet::new(["hey"]),
            PhraseSet::new(["stop", "shut up"]),
        );
        let catalog = music_catalog();

        assert!(matcher.is_wake("hey there"));
        assert!(matcher.is_interrupt("okay shut up now"));
        assert!(!matcher.is_interrupt("play music"));
        // 90 is not enough at a 95 command threshold
        assert!(matcher.resolve("play musik", &catalog).is_none());
        assert!(matcher.resolve("play music", &catalog).is_some());
    }
}
