//! Core data models for song-queue extraction.
//!
//! This module contains the snapshot records handed over by the browser side,
//! the candidates produced by extraction strategies, and the song requests
//! kept in the daily store.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

// ============================================================================
// Snapshot Model
// ============================================================================

/// One element record of a captured page.
///
/// `text` is the visible text of the element including its descendants,
/// one line per block, the way a browser reports `innerText`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Element {
    pub tag: String,
    pub classes: Vec<String>,
    pub role: Option<String>,
    pub text: String,
    pub href: Option<String>,
    pub attributes: FxHashMap<String, String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Self::default()
        }
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_href(mut self, href: &str) -> Self {
        self.href = Some(href.to_string());
        self
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c.eq_ignore_ascii_case(class))
    }

    /// True if any class contains `fragment` (case-insensitive), like `[class*='song']`.
    pub fn class_contains(&self, fragment: &str) -> bool {
        let fragment = fragment.to_lowercase();
        self.classes
            .iter()
            .any(|c| c.to_lowercase().contains(&fragment))
    }

    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }

    /// Descendants in document order, excluding `self`.
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        let mut stack: Vec<&Element> = self.children.iter().rev().collect();
        while let Some(el) = stack.pop() {
            out.push(el);
            stack.extend(el.children.iter().rev());
        }
        out
    }

    pub fn find_descendant<F>(&self, pred: F) -> Option<&Element>
    where
        F: Fn(&Element) -> bool,
    {
        self.descendants().into_iter().find(|el| pred(el))
    }
}

/// An element together with its ancestor chain (root first, parent last).
#[derive(Clone, Debug)]
pub struct ElementRef<'a> {
    pub element: &'a Element,
    pub ancestors: Vec<&'a Element>,
}

impl<'a> ElementRef<'a> {
    pub fn parent(&self) -> Option<&'a Element> {
        self.ancestors.last().copied()
    }
}

/// Point-in-time capture of the monitored page.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub elements: Vec<Element>,
    pub raw_text: String,
    pub captured_at: Option<NaiveDateTime>,
    pub source_url: Option<String>,
}

impl Snapshot {
    pub fn new(elements: Vec<Element>, raw_text: &str) -> Self {
        Self {
            elements,
            raw_text: raw_text.to_string(),
            ..Self::default()
        }
    }

    /// Snapshot with no structure, only page text.
    pub fn from_text(raw_text: &str) -> Self {
        Self::new(Vec::new(), raw_text)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse snapshot JSON")
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("Invalid snapshot {}", path.display()))
    }

    /// Every element of the forest in document order, with ancestors.
    pub fn walk(&self) -> Vec<ElementRef<'_>> {
        let mut out = Vec::new();
        let mut stack: Vec<(&Element, Vec<&Element>)> =
            self.elements.iter().rev().map(|el| (el, Vec::new())).collect();
        while let Some((el, ancestors)) = stack.pop() {
            let mut child_ancestors = ancestors.clone();
            child_ancestors.push(el);
            for child in el.children.iter().rev() {
                stack.push((child, child_ancestors.clone()));
            }
            out.push(ElementRef {
                element: el,
                ancestors,
            });
        }
        out
    }
}

// ============================================================================
// Extraction Models
// ============================================================================

/// Extraction strategies, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyId {
    StructuredRow,
    LinkAnchored,
    GeneralElement,
    TextParsing,
}

impl StrategyId {
    pub const ALL: [StrategyId; 4] = [
        StrategyId::StructuredRow,
        StrategyId::LinkAnchored,
        StrategyId::GeneralElement,
        StrategyId::TextParsing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyId::StructuredRow => "structured_row",
            StrategyId::LinkAnchored => "link_anchored",
            StrategyId::GeneralElement => "general_element",
            StrategyId::TextParsing => "text_parsing",
        }
    }

    /// Rank for sorting: lower is more trusted.
    pub fn rank(self) -> usize {
        match self {
            StrategyId::StructuredRow => 0,
            StrategyId::LinkAnchored => 1,
            StrategyId::GeneralElement => 2,
            StrategyId::TextParsing => 3,
        }
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Queue position reported by the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Playing,
    Next,
    Queued,
}

impl Status {
    /// Interpret a status label such as "Playing now", "Playing next" or
    /// "Playing in 5 minutes". Returns None for anything else.
    pub fn from_label(label: &str) -> Option<Status> {
        let lower = label.trim().to_lowercase();
        if lower.is_empty() {
            return None;
        }
        if lower == "playing" || lower.contains("playing now") || lower.contains("now playing") {
            Some(Status::Playing)
        } else if lower == "next" || lower.contains("playing next") || lower.contains("up next") {
            Some(Status::Next)
        } else if lower == "queued" || lower.contains("playing in") || lower.contains("minute") {
            Some(Status::Queued)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Playing => "playing",
            Status::Next => "next",
            Status::Queued => "queued",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unvalidated song observation produced by one strategy.
#[derive(Clone, Debug, PartialEq)]
pub struct RawCandidate {
    pub title: String,
    pub duration: Option<String>,
    pub requester: Option<String>,
    pub status: Option<Status>,
    pub video_url: Option<String>,
    pub strategy: StrategyId,
}

impl RawCandidate {
    pub fn new(title: &str, strategy: StrategyId) -> Self {
        Self {
            title: title.to_string(),
            duration: None,
            requester: None,
            status: None,
            video_url: None,
            strategy,
        }
    }

    pub fn with_duration(mut self, duration: &str) -> Self {
        self.duration = Some(duration.to_string());
        self
    }

    pub fn with_requester(mut self, requester: &str) -> Self {
        self.requester = Some(requester.to_string());
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_video_url(mut self, url: &str) -> Self {
        self.video_url = Some(url.to_string());
        self
    }

    /// Video URL if present and non-empty.
    pub fn video_link(&self) -> Option<&str> {
        self.video_url.as_deref().filter(|u| !u.trim().is_empty())
    }
}

/// Anything with a title the matcher can compare.
pub trait Titled {
    fn title(&self) -> &str;
}

impl Titled for RawCandidate {
    fn title(&self) -> &str {
        &self.title
    }
}

impl Titled for SongRequest {
    fn title(&self) -> &str {
        &self.title
    }
}

impl Titled for str {
    fn title(&self) -> &str {
        self
    }
}

impl Titled for String {
    fn title(&self) -> &str {
        self
    }
}

/// Per-strategy counts recorded by the coordinator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StrategyAttempt {
    pub strategy: StrategyId,
    pub raw: usize,
    pub accepted: usize,
}

/// Output of one coordinator run.
#[derive(Clone, Debug, Default)]
pub struct ExtractionResult {
    pub candidates: Vec<RawCandidate>,
    pub success: bool,
    pub strategy: Option<StrategyId>,
    pub attempts: Vec<StrategyAttempt>,
    pub links_resolved: usize,
    pub link_lookups_skipped: usize,
}

impl ExtractionResult {
    /// Unsuccessful result: nothing plausible on the page.
    pub fn empty(attempts: Vec<StrategyAttempt>) -> Self {
        Self {
            attempts,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

// ============================================================================
// Stored Models
// ============================================================================

/// A song request as kept in the daily store.
///
/// `video_url` is monotonic: once populated it is never cleared or replaced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SongRequest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, alias = "youtube_url", skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    pub first_seen: NaiveDateTime,
    pub last_seen: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyId>,
}

impl SongRequest {
    /// New entry first seen at `now`. `title` is expected to be cleaned already.
    pub fn from_candidate(title: String, candidate: &RawCandidate, now: NaiveDateTime) -> Self {
        Self {
            title,
            duration: candidate.duration.clone(),
            requester: candidate.requester.clone(),
            status: candidate.status,
            video_url: candidate.video_link().map(str::to_string),
            first_seen: now,
            last_seen: now,
            strategy: Some(candidate.strategy),
        }
    }

    pub fn has_video_link(&self) -> bool {
        self.video_url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }

    /// Title with metadata for display: `Title [3:24] - bob (playing)`.
    pub fn enhanced_title(&self) -> String {
        let mut out = self.title.clone();
        if let Some(duration) = &self.duration {
            out.push_str(&format!(" [{}]", duration));
        }
        if let Some(requester) = &self.requester {
            out.push_str(&format!(" - {}", requester));
        }
        if let Some(status) = self.status {
            out.push_str(&format!(" ({})", status));
        }
        out
    }

    /// Human-readable first-seen time.
    pub fn scraped_at(&self) -> String {
        self.first_seen.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Song requests attributed to one calendar date, in insertion order.
#[derive(Clone, Debug, PartialEq)]
pub struct DailyCollection {
    pub date: NaiveDate,
    pub songs: Vec<SongRequest>,
}

impl DailyCollection {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            songs: Vec::new(),
        }
    }

    pub fn with_songs(date: NaiveDate, songs: Vec<SongRequest>) -> Self {
        Self { date, songs }
    }

    /// Store key: `YYYY-MM-DD`.
    pub fn date_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SongRequest> {
        self.songs.iter()
    }

    pub fn linked_count(&self) -> usize {
        self.songs.iter().filter(|s| s.has_video_link()).count()
    }
}

// ============================================================================
// Statistics (Instrumentation)
// ============================================================================

/// Counters for one or more scans, logged like the matching stats of the
/// extraction pipeline this crate grew out of.
#[derive(Default, Debug, Clone, Serialize)]
pub struct ScanStats {
    pub snapshots: usize,
    pub failed_snapshots: usize,
    pub unsuccessful_scans: usize,

    // Extraction
    pub structured_row_wins: usize,
    pub link_anchored_wins: usize,
    pub general_element_wins: usize,
    pub text_parsing_wins: usize,
    pub candidates: usize,
    pub links_resolved: usize,
    pub link_lookups_skipped: usize,

    // Reconciliation
    pub songs_added: usize,
    pub songs_updated: usize,
    pub links_backfilled: usize,
    pub candidates_rejected: usize,

    // Totals
    pub total_songs: usize,
    pub elapsed_seconds: f64,
}

impl ScanStats {
    pub fn record_extraction(&mut self, result: &ExtractionResult) {
        self.snapshots += 1;
        self.candidates += result.len();
        self.links_resolved += result.links_resolved;
        self.link_lookups_skipped += result.link_lookups_skipped;
        match result.strategy {
            Some(StrategyId::StructuredRow) => self.structured_row_wins += 1,
            Some(StrategyId::LinkAnchored) => self.link_anchored_wins += 1,
            Some(StrategyId::GeneralElement) => self.general_element_wins += 1,
            Some(StrategyId::TextParsing) => self.text_parsing_wins += 1,
            None => self.unsuccessful_scans += 1,
        }
    }

    /// Log stats to stderr in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            eprintln!("[STATS:{}]\n{}", phase, json);
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write stats to {}", path.display()))?;
        Ok(())
    }
}
