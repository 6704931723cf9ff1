//! Last resort: title-looking lines of the page text.

use log::debug;
use rustc_hash::FxHashSet;

use super::{ExtractionContext, ExtractionStrategy};
use crate::config::ExtractionConfig;
use crate::models::{RawCandidate, Snapshot, StrategyId};

const SKIP_PREFIXES: &[&str] = &["http", "www", "ftp"];

pub struct TextParsingStrategy {
    min_len: usize,
    max_len: usize,
    max_candidates: usize,
}

impl TextParsingStrategy {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            min_len: config.min_text_line_length,
            max_len: config.max_text_line_length,
            max_candidates: config.max_text_candidates,
        }
    }

    pub fn looks_like_title(&self, line: &str) -> bool {
        let len = line.chars().count();
        if len < self.min_len || len > self.max_len {
            return false;
        }

        let lower = line.to_lowercase();
        if SKIP_PREFIXES.iter().any(|p| lower.starts_with(p)) {
            return false;
        }

        // Mostly digits or symbols: timestamps, counters, separators
        let letters = line.chars().filter(|c| c.is_alphabetic()).count();
        let non_space = line.chars().filter(|c| !c.is_whitespace()).count();
        if letters * 2 < non_space {
            return false;
        }

        !is_repetitive(&lower)
    }
}

/// "la la la la la la": fewer than a third of the words are distinct.
fn is_repetitive(lower: &str) -> bool {
    let words: Vec<&str> = lower.split_whitespace().collect();
    if words.len() < 3 {
        return false;
    }
    let unique: FxHashSet<&str> = words.iter().copied().collect();
    unique.len() * 3 < words.len()
}

impl ExtractionStrategy for TextParsingStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::TextParsing
    }

    fn attempt(&self, snapshot: &Snapshot, _ctx: &ExtractionContext) -> Vec<RawCandidate> {
        let mut seen = FxHashSet::default();
        let candidates: Vec<RawCandidate> = snapshot
            .raw_text
            .lines()
            .map(str::trim)
            .filter(|line| self.looks_like_title(line))
            .filter(|line| seen.insert(line.to_lowercase()))
            .take(self.max_candidates)
            .map(|line| RawCandidate::new(line, StrategyId::TextParsing))
            .collect();
        debug!("text parsing: {} candidates", candidates.len());
        candidates
    }
}
