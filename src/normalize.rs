//! Title normalization for queue entries.
//!
//! Two forms are produced from a scraped title:
//! - the display form (`clean_song_title`): what gets stored and shown
//! - the comparison key (`normalize_title`): what the matcher compares
//!
//! Both are iterated to a fixed point, so applying either twice gives the
//! same result as applying it once.

use anyhow::{Context, Result};
use any_ascii::any_ascii;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::config::NormalizerConfig;

// ============================================================================
// DEFAULT TABLES
// ============================================================================

/// Prefixes the widget or the page puts in front of the current song.
pub const DEFAULT_LEADING_MARKERS: &[&str] = &[
    "Now Playing:",
    "Current:",
    "Playing:",
    "\u{266A}",     // ♪
    "\u{266B}",     // ♫
    "\u{1F3B5}",    // 🎵
    "\u{1F3B6}",    // 🎶
];

/// Upload annotations that say nothing about which song it is.
pub const DEFAULT_ANNOTATION_PATTERNS: &[&str] = &[
    // "(Official Video)", "[Official Music Video]", "(Official Lyric Video)", "(Official Visualizer)"
    r"(?i)\s*[\(\[]\s*official\s+(?:music\s+|lyric\s+|hd\s+)?(?:video|audio|visuali[sz]er)\s*[\)\]]",
    // "(Official)"
    r"(?i)\s*[\(\[]\s*official\s*[\)\]]",
    // "(Lyrics)", "[Lyric Video]", "(With Lyrics)"
    r"(?i)\s*[\(\[]\s*(?:with\s+)?lyrics?(?:\s+video)?\s*[\)\]]",
    // "[HD]", "(4K)", "[1080p]"
    r"(?i)\s*[\(\[]\s*(?:hd|hq|4k|1080p|720p)\s*[\)\]]",
    // "(Audio)", "(Visualiser)", "(Video Oficial)", "(Clip Officiel)"
    r"(?i)\s*[\(\[]\s*(?:audio|visuali[sz]er|video\s+oficial|clip\s+officiel)\s*[\)\]]",
    // "Song M/V"
    r"(?i)\s+m/v\s*$",
    // "Song | Lyrics"
    r"(?i)\s*\|\s*lyrics\s*$",
];

// ============================================================================
// REGEX PATTERNS
// ============================================================================

static DEFAULT_ANNOTATIONS: Lazy<Vec<Regex>> = Lazy::new(|| {
    DEFAULT_ANNOTATION_PATTERNS
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

/// Any run of whitespace, including tabs and newlines from element text.
pub static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// ============================================================================
// HELPERS
// ============================================================================

/// Collapse internal whitespace runs to one space and trim.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s, " ").trim().to_string()
}

/// Check if a character is a Unicode combining mark (diacritical mark).
pub fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0xFE20..=0xFE2F)
}

/// Fold Unicode text to lowercase ASCII: NFKD, drop combining marks, transliterate.
/// e.g., "Beyoncé" → "beyonce", "Motörhead" → "motorhead"
pub fn fold_to_ascii(s: &str) -> String {
    let stripped: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    any_ascii(&stripped).to_lowercase()
}

/// Straighten quotes and spell out a standalone ampersand.
pub fn normalize_punctuation(s: &str) -> String {
    s.replace(['\u{2018}', '\u{2019}', '\u{00B4}', '`'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(" & ", " and ")
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return None;
    }
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

// ============================================================================
// NORMALIZER
// ============================================================================

#[derive(Clone, Debug)]
pub struct Normalizer {
    markers: Vec<String>,
    annotations: Vec<Regex>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            markers: DEFAULT_LEADING_MARKERS.iter().map(|m| m.to_string()).collect(),
            annotations: DEFAULT_ANNOTATIONS.clone(),
        }
    }
}

impl Normalizer {
    /// Build from config. Fails if an annotation pattern is not a valid regex.
    pub fn new(config: &NormalizerConfig) -> Result<Self> {
        let annotations = config
            .annotation_patterns
            .iter()
            .map(|p| Regex::new(p).with_context(|| format!("Invalid annotation pattern: {}", p)))
            .collect::<Result<Vec<_>>>()?;
        let markers = config
            .leading_markers
            .iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        Ok(Self {
            markers,
            annotations,
        })
    }

    /// Display form: whitespace collapsed, leading markers and annotations removed.
    pub fn clean_song_title(&self, title: &str) -> String {
        fixed_point(title, |s| self.display_pass(s))
    }

    /// Comparison key: display form, punctuation normalized, folded to lowercase ASCII.
    pub fn normalize_title(&self, title: &str) -> String {
        fixed_point(title, |s| self.key_pass(s))
    }

    /// Both forms at once.
    pub fn display_and_key(&self, title: &str) -> (String, String) {
        let display = self.clean_song_title(title);
        let key = self.normalize_title(&display);
        (display, key)
    }

    fn strip_leading_markers<'a>(&self, s: &'a str) -> &'a str {
        let mut rest = s.trim_start();
        loop {
            let before = rest.len();
            for marker in &self.markers {
                if let Some(stripped) = strip_prefix_ignore_case(rest, marker) {
                    rest = stripped.trim_start();
                }
            }
            if rest.len() == before {
                return rest;
            }
        }
    }

    /// Strip markers and annotations until nothing more comes off. Every
    /// step only removes text, so the loop ends.
    fn display_pass(&self, s: &str) -> String {
        let mut current = collapse_whitespace(s);
        loop {
            let mut result = self.strip_leading_markers(&current).to_string();
            for pattern in &self.annotations {
                // End-anchored patterns take one suffix per replace
                loop {
                    let next = pattern.replace_all(&result, "");
                    if next == result {
                        break;
                    }
                    result = next.into_owned();
                }
            }
            let result = collapse_whitespace(&result);
            if result == current {
                return current;
            }
            current = result;
        }
    }

    fn key_pass(&self, s: &str) -> String {
        // Markers must go before folding: any_ascii spells emoji out as words.
        let display = self.display_pass(s);
        let folded = fold_to_ascii(&display);
        collapse_whitespace(&normalize_punctuation(&folded))
    }
}

/// Apply `pass` until the output stops changing. After the first pass the
/// text is lowercase ASCII, and later passes only shrink it apart from
/// spelling out an ampersand, which uses one up each time.
fn fixed_point<F>(input: &str, pass: F) -> String
where
    F: Fn(&str) -> String,
{
    let mut current = pass(input);
    loop {
        let next = pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}
