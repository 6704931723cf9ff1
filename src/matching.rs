//! Fuzzy title equivalence.
//!
//! Two titles are the same song when their comparison keys are equal, when
//! one key contains the other and the shorter one is long enough to mean
//! something, or when their word sets overlap strongly.

use rustc_hash::FxHashSet;

use crate::config::MatcherConfig;
use crate::models::Titled;
use crate::normalize::Normalizer;

/// Split a key into lowercase alphanumeric words.
pub fn words(key: &str) -> FxHashSet<&str> {
    key.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Jaccard similarity of the word sets of two keys (0.0 when both are empty).
pub fn word_overlap(a: &str, b: &str) -> f64 {
    let words_a = words(a);
    let words_b = words(b);

    if words_a.is_empty() && words_b.is_empty() {
        return 0.0;
    }

    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();

    intersection as f64 / union as f64
}

/// How two keys were found to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Containment,
    WordOverlap,
}

#[derive(Clone, Debug)]
pub struct SongMatcher {
    normalizer: Normalizer,
    min_containment_len: usize,
    word_overlap_threshold: f64,
}

impl Default for SongMatcher {
    fn default() -> Self {
        Self::new(&MatcherConfig::default(), Normalizer::default())
    }
}

impl SongMatcher {
    pub fn new(config: &MatcherConfig, normalizer: Normalizer) -> Self {
        Self {
            normalizer,
            min_containment_len: config.min_containment_len,
            word_overlap_threshold: config.word_overlap_threshold,
        }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Comparison key for a title.
    pub fn key(&self, title: &str) -> String {
        self.normalizer.normalize_title(title)
    }

    /// Compare two already-normalized keys.
    pub fn match_keys(&self, a: &str, b: &str) -> Option<MatchKind> {
        if a.is_empty() || b.is_empty() {
            return None;
        }
        if a == b {
            return Some(MatchKind::Exact);
        }

        let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };
        if shorter.chars().count() >= self.min_containment_len && longer.contains(shorter) {
            return Some(MatchKind::Containment);
        }

        if word_overlap(a, b) > self.word_overlap_threshold {
            return Some(MatchKind::WordOverlap);
        }

        None
    }

    pub fn keys_match(&self, a: &str, b: &str) -> bool {
        self.match_keys(a, b).is_some()
    }

    /// Compare two raw titles.
    pub fn titles_match(&self, a: &str, b: &str) -> bool {
        self.keys_match(&self.key(a), &self.key(b))
    }

    /// True if the two items are the same song. Only titles are compared.
    pub fn songs_match<A, B>(&self, a: &A, b: &B) -> bool
    where
        A: Titled + ?Sized,
        B: Titled + ?Sized,
    {
        self.titles_match(a.title(), b.title())
    }

    /// Index of the best match for `key` among `keys`: the first exact match,
    /// otherwise the first fuzzy one.
    pub fn find_match<S: AsRef<str>>(&self, key: &str, keys: &[S]) -> Option<usize> {
        if key.is_empty() {
            return None;
        }
        keys.iter()
            .position(|k| k.as_ref() == key)
            .or_else(|| keys.iter().position(|k| self.keys_match(key, k.as_ref())))
    }
}
