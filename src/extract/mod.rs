//! Extraction strategies.
//!
//! Each strategy reads a snapshot one way and returns raw candidates. They
//! never fail: a page the strategy does not understand yields an empty list.
//! Filtering, cleaning and choosing between strategies is the coordinator's job.

pub mod general_element;
pub mod link_anchored;
pub mod structured_row;
pub mod text_parsing;

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;

use crate::config::ExtractionConfig;
use crate::matching::SongMatcher;
use crate::models::{DailyCollection, RawCandidate, Snapshot, StrategyId};
use crate::normalize::Normalizer;

pub use general_element::GeneralElementStrategy;
pub use link_anchored::{LinkAnchoredStrategy, LinkHit};
pub use structured_row::StructuredRowStrategy;
pub use text_parsing::TextParsingStrategy;

// ============================================================================
// DEFAULT TABLES
// ============================================================================

pub const DEFAULT_VIDEO_HOSTS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "m.youtube.com",
    "music.youtube.com",
];

pub const DEFAULT_LINK_ATTRIBUTES: &[&str] = &["data-url", "data-href", "data-video-url"];

pub const DEFAULT_ROW_TAGS: &[&str] = &["tr", "li"];

pub const DEFAULT_ROW_ROLES: &[&str] = &["row", "listitem"];

pub const DEFAULT_TITLE_CLASSES: &[&str] = &[
    "moobot-input-label-text-text",
    "song-title",
    "track-title",
];

pub const DEFAULT_LABEL_CLASSES: &[&str] = &[
    "moobot-input-label-text-label",
    "song-meta",
    "track-meta",
];

pub const DEFAULT_GENERAL_CLASS_HINTS: &[&str] = &[
    "queue-item",
    "song-item",
    "music-item",
    "song-title",
    "title",
];

pub const DEFAULT_GENERAL_CLASS_FRAGMENTS: &[&str] = &["song", "music"];

// ============================================================================
// STRATEGY SEAM
// ============================================================================

/// Inputs a strategy may consult besides the snapshot.
#[derive(Clone, Debug, Default)]
pub struct ExtractionContext {
    known_links: Vec<String>,
    exact: FxHashSet<String>,
    matcher: Option<SongMatcher>,
}

impl ExtractionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys of songs in `existing` that already carry a video URL. Lookups
    /// use `matcher`, so any title the merge would fold into a linked song
    /// counts as linked.
    pub fn from_collection(existing: &DailyCollection, matcher: &SongMatcher) -> Self {
        let mut ctx = Self {
            matcher: Some(matcher.clone()),
            ..Self::default()
        };
        for song in existing.iter().filter(|song| song.has_video_link()) {
            ctx.insert(matcher.key(&song.title));
        }
        ctx
    }

    pub fn with_known_key(mut self, key: &str) -> Self {
        self.insert(key.to_string());
        self
    }

    fn insert(&mut self, key: String) {
        if !key.is_empty() && self.exact.insert(key.clone()) {
            self.known_links.push(key);
        }
    }

    /// True if a song matching this comparison key already has a link stored.
    /// Without a matcher only exact keys count.
    pub fn has_link(&self, key: &str) -> bool {
        if self.exact.contains(key) {
            return true;
        }
        match &self.matcher {
            Some(matcher) => matcher.find_match(key, &self.known_links).is_some(),
            None => false,
        }
    }

    pub fn known_link_count(&self) -> usize {
        self.known_links.len()
    }
}

pub trait ExtractionStrategy {
    fn id(&self) -> StrategyId;

    /// Candidates found in `snapshot`; empty when nothing matches.
    fn attempt(&self, snapshot: &Snapshot, ctx: &ExtractionContext) -> Vec<RawCandidate>;
}

/// All strategies in priority order.
pub fn default_strategies(
    config: &ExtractionConfig,
    normalizer: &Normalizer,
) -> Vec<Box<dyn ExtractionStrategy>> {
    vec![
        Box::new(StructuredRowStrategy::new(config)),
        Box::new(LinkAnchoredStrategy::new(config, normalizer.clone())),
        Box::new(GeneralElementStrategy::new(config)),
        Box::new(TextParsingStrategy::new(config)),
    ]
}

// ============================================================================
// VIDEO LINKS
// ============================================================================

/// Video id patterns, tried in order.
static VIDEO_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"[?&]v=([A-Za-z0-9_-]{6,})").unwrap(),
        Regex::new(r"youtu\.be/([A-Za-z0-9_-]{6,})").unwrap(),
        Regex::new(r"/(?:embed|v|shorts|live)/([A-Za-z0-9_-]{6,})").unwrap(),
        // Thumbnails: i.ytimg.com/vi/<id>/hqdefault.jpg
        Regex::new(r"/vi(?:_webp)?/([A-Za-z0-9_-]{6,})/").unwrap(),
    ]
});

/// Host allow-list check for video links.
#[derive(Clone, Debug)]
pub struct VideoHosts {
    hosts: Vec<String>,
}

impl VideoHosts {
    pub fn new(hosts: &[String]) -> Self {
        Self {
            hosts: hosts
                .iter()
                .map(|h| h.trim().trim_start_matches("www.").to_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    pub fn is_video_url(&self, url: &str) -> bool {
        match host_of(url) {
            Some(host) => self
                .hosts
                .iter()
                .any(|h| host == *h || host.ends_with(&format!(".{}", h))),
            None => false,
        }
    }
}

/// Lowercase host of an absolute or scheme-relative URL, without `www.`.
pub fn host_of(url: &str) -> Option<String> {
    let url = url.trim();
    let rest = if let Some(idx) = url.find("://") {
        &url[idx + 3..]
    } else if let Some(stripped) = url.strip_prefix("//") {
        stripped
    } else {
        url
    };
    let authority = rest.split(['/', '?', '#']).next()?;
    let host = authority.rsplit('@').next()?.split(':').next()?.to_lowercase();
    if host.is_empty() || !host.contains('.') {
        return None;
    }
    Some(host.trim_start_matches("www.").to_string())
}

pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Canonical watch URL when an id can be read, otherwise the URL unchanged.
pub fn canonical_video_url(url: &str) -> String {
    match extract_video_id(url) {
        Some(id) => format!("https://www.youtube.com/watch?v={}", id),
        None => url.trim().to_string(),
    }
}

/// First non-empty line of a text block, trimmed.
pub fn first_line(text: &str) -> &str {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
}

pub fn is_single_line(text: &str) -> bool {
    text.trim().lines().filter(|l| !l.trim().is_empty()).count() <= 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SongRequest;
    use chrono::NaiveDate;

    fn hosts() -> VideoHosts {
        let defaults: Vec<String> = DEFAULT_VIDEO_HOSTS.iter().map(|h| h.to_string()).collect();
        VideoHosts::new(&defaults)
    }

    #[test]
    fn test_video_hosts() {
        let h = hosts();
        assert!(h.is_video_url("https://www.youtube.com/watch?v=7wtfhZwyrcc"));
        assert!(h.is_video_url("https://youtu.be/7wtfhZwyrcc"));
        assert!(h.is_video_url("//m.youtube.com/watch?v=7wtfhZwyrcc"));
        assert!(h.is_video_url("https://music.youtube.com/watch?v=7wtfhZwyrcc"));
        assert!(!h.is_video_url("https://notyoutube.com/watch?v=7wtfhZwyrcc"));
        assert!(!h.is_video_url("https://moo.bot/r/queue"));
        assert!(!h.is_video_url("/watch?v=7wtfhZwyrcc"));
        assert!(!h.is_video_url(""));
    }

    #[test]
    fn test_extract_video_id() {
        let id = Some("7wtfhZwyrcc".to_string());
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=7wtfhZwyrcc&t=3"), id);
        assert_eq!(extract_video_id("https://www.youtube.com/watch?list=x&v=7wtfhZwyrcc"), id);
        assert_eq!(extract_video_id("https://youtu.be/7wtfhZwyrcc?si=abc"), id);
        assert_eq!(extract_video_id("https://www.youtube.com/embed/7wtfhZwyrcc"), id);
        assert_eq!(extract_video_id("https://www.youtube.com/shorts/7wtfhZwyrcc"), id);
        assert_eq!(extract_video_id("https://i.ytimg.com/vi/7wtfhZwyrcc/hqdefault.jpg"), id);
        assert_eq!(extract_video_id("https://www.youtube.com/results?search_query=x"), None);
    }

    #[test]
    fn test_canonical_video_url() {
        assert_eq!(
            canonical_video_url("https://youtu.be/7wtfhZwyrcc"),
            "https://www.youtube.com/watch?v=7wtfhZwyrcc"
        );
        assert_eq!(
            canonical_video_url(" https://www.youtube.com/channel/UC123 "),
            "https://www.youtube.com/channel/UC123"
        );
    }

    #[test]
    fn test_line_helpers() {
        assert_eq!(first_line("\n  Believer \n3:24"), "Believer");
        assert_eq!(first_line("   "), "");
        assert!(is_single_line(" Believer \n\n"));
        assert!(!is_single_line("Believer\n3:24"));
    }

    #[test]
    fn test_context_from_collection() {
        let now = NaiveDate::from_ymd_opt(2026, 10, 17)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap();
        let linked = SongRequest {
            title: "Imagine Dragons - Believer".to_string(),
            duration: None,
            requester: None,
            status: None,
            video_url: Some("https://www.youtube.com/watch?v=7wtfhZwyrcc".to_string()),
            first_seen: now,
            last_seen: now,
            strategy: None,
        };
        let unlinked = SongRequest {
            title: "Conga".to_string(),
            video_url: None,
            ..linked.clone()
        };
        let short = SongRequest {
            title: "Heads Will Roll".to_string(),
            video_url: Some("https://youtu.be/auSo1MyWf8g".to_string()),
            ..linked.clone()
        };
        let collection = DailyCollection::with_songs(now.date(), vec![linked, unlinked, short]);
        let ctx = ExtractionContext::from_collection(&collection, &SongMatcher::default());
        assert!(ctx.has_link("imagine dragons - believer"));
        assert!(!ctx.has_link("conga"));
        assert_eq!(ctx.known_link_count(), 2);

        // Titles the merge would fold into a linked song count as linked
        assert!(ctx.has_link("believer"));
        assert!(ctx.has_link("yeah yeah yeahs - heads will roll"));
        assert!(!ctx.has_link("gloria estefan - conga"));
    }

    #[test]
    fn test_context_without_matcher_is_exact() {
        let ctx = ExtractionContext::new().with_known_key("heads will roll");
        assert!(ctx.has_link("heads will roll"));
        assert!(!ctx.has_link("yeah yeah yeahs - heads will roll"));
        assert!(!ctx.has_link(""));
    }
}
