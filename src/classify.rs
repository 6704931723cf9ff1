//! UI-noise classification.
//!
//! Decides whether a piece of page text is interface chrome (buttons,
//! headers, timestamps, empty-state messages) rather than a song title.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;

use crate::config::ClassifierConfig;

/// Phrases that mark text as chrome wherever they appear in it.
pub const DEFAULT_UI_PHRASES: &[&str] = &[
    "no songs in queue",
    "queue is empty",
    "song requests",
    "song request list",
    "song queue",
    "song history",
    "requested by",
    "request a song",
    "moobot",
    "search youtube",
    "youtube search",
    "sign in to",
    "log in to",
    "click here",
    "please wait",
    "this page requires javascript",
    "seconds ago",
    "minutes ago",
    "hours ago",
    "days ago",
];

/// Texts that are chrome when they are the whole text.
pub const DEFAULT_UI_EXACT: &[&str] = &[
    "refresh", "loading", "loading...", "error", "menu", "home", "back", "next",
    "previous", "search", "youtube", "queue", "history", "settings", "profile",
    "help", "about", "contact", "submit", "cancel", "close", "play", "pause",
    "skip", "playing", "playing now", "playing next", "now playing", "up next",
    "empty", "none", "null", "not found", "no results", "login", "logout",
    "sign in", "sign up", "title", "duration", "requester", "status",
];

/// Structural chrome: timestamps, counters, status and requester labels.
pub const DEFAULT_UI_PATTERNS: &[&str] = &[
    // Duration or clock only: "04:17", "1:02:33"
    r"^\d{1,2}:\d{2}(?::\d{2})?$",
    // Bare number
    r"^\d+$",
    // Pagination
    r"(?i)^page\s*\d+$",
    // "By Hell_wing2 9 hours ago", "Played 9 hours ago"
    r"(?i)^(?:by|requested\s+by|played)\s+.*\d+\s+(?:second|minute|hour|day)s?\s+ago$",
    // Requester label alone: "By Hell_wing2". Only handle-shaped names, so
    // titles like "By Myself" survive. Plain-word requesters are caught by
    // the row label reader instead.
    r"(?i)^by\s+\w*[\d_]\w*$",
    // Queue position labels: "Playing in 5 minutes"
    r"(?i)^playing\s+in\s+",
    // Counters: "3 songs", "12 requests"
    r"(?i)^\d+\s+(?:songs?|requests?|items?)$",
    // Dates and times without words: "2024-01-01 12:00"
    r"^[\d\s:./-]+$",
];

static DEFAULT_COMPILED_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    DEFAULT_UI_PATTERNS
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

/// Seam for swapping in a different noise filter.
pub trait NoiseFilter {
    /// True if `text` is UI noise and must not become a song title.
    fn is_noise(&self, text: &str) -> bool;
}

#[derive(Clone, Debug)]
pub struct TextClassifier {
    min_len: usize,
    max_len: usize,
    phrases: Vec<String>,
    exact: FxHashSet<String>,
    patterns: Vec<Regex>,
}

impl Default for TextClassifier {
    fn default() -> Self {
        let config = ClassifierConfig::default();
        Self {
            min_len: config.min_title_length,
            max_len: config.max_title_length,
            phrases: lowercase_all(&config.ui_phrases),
            exact: lowercase_all(&config.ui_exact).into_iter().collect(),
            patterns: DEFAULT_COMPILED_PATTERNS.clone(),
        }
    }
}

fn lowercase_all(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl TextClassifier {
    /// Build from config. Fails if a UI pattern is not a valid regex.
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        let patterns = config
            .ui_patterns
            .iter()
            .map(|p| Regex::new(p).with_context(|| format!("Invalid UI pattern: {}", p)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            min_len: config.min_title_length,
            max_len: config.max_title_length,
            phrases: lowercase_all(&config.ui_phrases),
            exact: lowercase_all(&config.ui_exact).into_iter().collect(),
            patterns,
        })
    }

    /// Add a phrase at runtime (e.g. a channel-specific banner).
    pub fn add_phrase(&mut self, phrase: &str) {
        let phrase = phrase.trim().to_lowercase();
        if !phrase.is_empty() {
            self.phrases.push(phrase);
        }
    }

    pub fn add_pattern(&mut self, pattern: &str) -> Result<()> {
        let regex =
            Regex::new(pattern).with_context(|| format!("Invalid UI pattern: {}", pattern))?;
        self.patterns.push(regex);
        Ok(())
    }

    pub fn is_ui_text(&self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return true;
        }

        let len = text.chars().count();
        if len > self.max_len || len < self.min_len {
            return true;
        }

        if !text.chars().any(char::is_alphanumeric) {
            return true;
        }

        let lower = text.to_lowercase();
        if self.exact.contains(lower.as_str()) {
            return true;
        }
        if self.phrases.iter().any(|p| lower.contains(p.as_str())) {
            return true;
        }

        self.patterns.iter().any(|re| re.is_match(text))
    }
}

impl NoiseFilter for TextClassifier {
    fn is_noise(&self, text: &str) -> bool {
        self.is_ui_text(text)
    }
}
