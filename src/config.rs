//! Pipeline configuration.
//!
//! Every tunable list and threshold lives here as data. All fields default,
//! so a config file only needs the keys it overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::classify::{DEFAULT_UI_EXACT, DEFAULT_UI_PATTERNS, DEFAULT_UI_PHRASES};
use crate::extract::{
    DEFAULT_GENERAL_CLASS_FRAGMENTS, DEFAULT_GENERAL_CLASS_HINTS, DEFAULT_LABEL_CLASSES,
    DEFAULT_LINK_ATTRIBUTES, DEFAULT_ROW_ROLES, DEFAULT_ROW_TAGS, DEFAULT_TITLE_CLASSES,
    DEFAULT_VIDEO_HOSTS,
};
use crate::normalize::{DEFAULT_ANNOTATION_PATTERNS, DEFAULT_LEADING_MARKERS};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub classifier: ClassifierConfig,
    pub normalizer: NormalizerConfig,
    pub matcher: MatcherConfig,
    pub extraction: ExtractionConfig,
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse pipeline config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("Invalid config {}", path.display()))
    }
}

/// UI-noise denylists and title length bounds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub min_title_length: usize,
    pub max_title_length: usize,
    /// Rejected when contained anywhere in the text (case-insensitive).
    pub ui_phrases: Vec<String>,
    /// Rejected when equal to the whole text (case-insensitive).
    pub ui_exact: Vec<String>,
    /// Regexes; a match anywhere rejects the text.
    pub ui_patterns: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_title_length: 3,
            max_title_length: 100,
            ui_phrases: strings(DEFAULT_UI_PHRASES),
            ui_exact: strings(DEFAULT_UI_EXACT),
            ui_patterns: strings(DEFAULT_UI_PATTERNS),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub leading_markers: Vec<String>,
    pub annotation_patterns: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            leading_markers: strings(DEFAULT_LEADING_MARKERS),
            annotation_patterns: strings(DEFAULT_ANNOTATION_PATTERNS),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Containment only counts when the shorter key has at least this many chars.
    pub min_containment_len: usize,
    /// Word-set Jaccard overlap must exceed this to match.
    pub word_overlap_threshold: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            min_containment_len: 6,
            word_overlap_threshold: 0.7,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub video_hosts: Vec<String>,
    /// Attributes that may carry a video URL besides `href`.
    pub link_attributes: Vec<String>,
    pub row_tags: Vec<String>,
    pub row_roles: Vec<String>,
    pub title_classes: Vec<String>,
    pub label_classes: Vec<String>,
    pub general_class_hints: Vec<String>,
    pub general_class_fragments: Vec<String>,
    pub min_text_line_length: usize,
    pub max_text_line_length: usize,
    pub max_text_candidates: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            video_hosts: strings(DEFAULT_VIDEO_HOSTS),
            link_attributes: strings(DEFAULT_LINK_ATTRIBUTES),
            row_tags: strings(DEFAULT_ROW_TAGS),
            row_roles: strings(DEFAULT_ROW_ROLES),
            title_classes: strings(DEFAULT_TITLE_CLASSES),
            label_classes: strings(DEFAULT_LABEL_CLASSES),
            general_class_hints: strings(DEFAULT_GENERAL_CLASS_HINTS),
            general_class_fragments: strings(DEFAULT_GENERAL_CLASS_FRAGMENTS),
            min_text_line_length: 5,
            max_text_line_length: 200,
            max_text_candidates: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = PipelineConfig::from_json_str(
            r#"{"matcher": {"min_containment_len": 10}, "classifier": {"ui_exact": ["skip"]}}"#,
        )
        .unwrap();
        assert_eq!(config.matcher.min_containment_len, 10);
        assert_eq!(config.matcher.word_overlap_threshold, 0.7);
        assert_eq!(config.classifier.ui_exact, vec!["skip".to_string()]);
        assert_eq!(config.classifier.max_title_length, 100);
        assert_eq!(config.extraction, ExtractionConfig::default());
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = PipelineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_load_reports_path() {
        let err = PipelineConfig::load(Path::new("/nonexistent/moobot.json")).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/moobot.json"));
    }
}
