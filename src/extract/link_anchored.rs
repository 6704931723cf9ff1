//! Video links and the text around them.
//!
//! Besides plain anchors, the queue widget keeps video URLs in button data
//! attributes and the history table only shows video thumbnails, so all three
//! feed the same link index.

use log::debug;

use super::{
    canonical_video_url, extract_video_id, first_line, host_of, ExtractionContext,
    ExtractionStrategy, VideoHosts,
};
use crate::config::ExtractionConfig;
use crate::models::{ElementRef, RawCandidate, Snapshot, StrategyId};
use crate::normalize::Normalizer;

/// How many ancestors to climb looking for a title.
const MAX_TITLE_DEPTH: usize = 3;

/// A video link found on the page with the title it is shown next to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkHit {
    pub title: String,
    /// Canonical watch URL when the video id is known.
    pub url: String,
}

pub struct LinkAnchoredStrategy {
    hosts: VideoHosts,
    link_attributes: Vec<String>,
    normalizer: Normalizer,
}

fn looks_like_url(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("www.")
}

impl LinkAnchoredStrategy {
    pub fn new(config: &ExtractionConfig, normalizer: Normalizer) -> Self {
        Self {
            hosts: VideoHosts::new(&config.video_hosts),
            link_attributes: config.link_attributes.clone(),
            normalizer,
        }
    }

    fn is_thumbnail(&self, src: &str) -> bool {
        let from_video_cdn = host_of(src).is_some_and(|h| h.ends_with("ytimg.com"));
        (from_video_cdn || self.hosts.is_video_url(src)) && extract_video_id(src).is_some()
    }

    /// The video URL an element carries, if any.
    fn video_url_of(&self, r: &ElementRef<'_>) -> Option<String> {
        let el = r.element;
        if let Some(href) = el.href.as_deref() {
            if self.hosts.is_video_url(href) {
                return Some(href.trim().to_string());
            }
        }
        for attr in &self.link_attributes {
            if let Some(value) = el.attr(attr) {
                if self.hosts.is_video_url(value) {
                    return Some(value.trim().to_string());
                }
            }
        }
        if el.is_tag("img") {
            if let Some(src) = el.attr("src") {
                if self.is_thumbnail(src) {
                    return Some(src.trim().to_string());
                }
            }
        }
        None
    }

    /// Link text, or the nearest enclosing text with the URL taken out.
    fn title_for(&self, r: &ElementRef<'_>, url: &str) -> Option<String> {
        let own = r.element.trimmed_text();
        if !own.is_empty() && !own.contains(url) && !looks_like_url(own) {
            let line = first_line(own);
            if !line.is_empty() {
                return Some(line.to_string());
            }
        }

        for ancestor in r.ancestors.iter().rev().take(MAX_TITLE_DEPTH) {
            let text = ancestor.text.replace(url, "");
            let line = text
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty() && !looks_like_url(l));
            if let Some(line) = line {
                return Some(line.to_string());
            }
        }
        None
    }

    /// Every video link on the page that has some title next to it.
    pub fn link_index(&self, snapshot: &Snapshot) -> Vec<LinkHit> {
        snapshot
            .walk()
            .iter()
            .filter_map(|r| {
                let raw_url = self.video_url_of(r)?;
                let title = self.title_for(r, &raw_url)?;
                Some(LinkHit {
                    title,
                    url: canonical_video_url(&raw_url),
                })
            })
            .collect()
    }
}

impl ExtractionStrategy for LinkAnchoredStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::LinkAnchored
    }

    fn attempt(&self, snapshot: &Snapshot, ctx: &ExtractionContext) -> Vec<RawCandidate> {
        let mut skipped = 0;
        let candidates: Vec<RawCandidate> = self
            .link_index(snapshot)
            .into_iter()
            .map(|hit| {
                let candidate = RawCandidate::new(&hit.title, StrategyId::LinkAnchored);
                if ctx.has_link(&self.normalizer.normalize_title(&hit.title)) {
                    skipped += 1;
                    candidate
                } else {
                    candidate.with_video_url(&hit.url)
                }
            })
            .collect();
        debug!(
            "link anchored: {} candidates, {} already linked",
            candidates.len(),
            skipped
        );
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Element;

    fn strategy() -> LinkAnchoredStrategy {
        LinkAnchoredStrategy::new(&ExtractionConfig::default(), Normalizer::default())
    }

    #[test]
    fn test_anchor_text_is_title() {
        let a = Element::new("a")
            .with_href("https://youtu.be/7wtfhZwyrcc")
            .with_text("Imagine Dragons - Believer");
        let snapshot = Snapshot::new(vec![Element::new("div").with_child(a)], "");
        let found = strategy().attempt(&snapshot, &ExtractionContext::new());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Imagine Dragons - Believer");
        assert_eq!(
            found[0].video_url.as_deref(),
            Some("https://www.youtube.com/watch?v=7wtfhZwyrcc")
        );
    }

    #[test]
    fn test_url_text_falls_back_to_parent() {
        let url = "https://www.youtube.com/watch?v=7wtfhZwyrcc";
        let a = Element::new("a").with_href(url).with_text(url);
        let li = Element::new("li")
            .with_text(&format!("{}\nBeliever", url))
            .with_child(a);
        let snapshot = Snapshot::new(vec![li], "");
        let found = strategy().attempt(&snapshot, &ExtractionContext::new());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Believer");
    }

    #[test]
    fn test_button_data_url_and_thumbnail() {
        let button = Element::new("button")
            .with_class("button-type-link")
            .with_attr("data-url", "https://www.youtube.com/watch?v=abcdef12345");
        let row = Element::new("tr")
            .with_text("Conga\n3:00")
            .with_child(Element::new("td").with_text("Conga"))
            .with_child(Element::new("td").with_child(button));
        let thumb = Element::new("img").with_attr("src", "https://i.ytimg.com/vi/zyxwvu98765/hqdefault.jpg");
        let history = Element::new("tr")
            .with_text("Heads Will Roll")
            .with_child(Element::new("td").with_child(thumb));
        let snapshot = Snapshot::new(vec![row, history], "");

        let index = strategy().link_index(&snapshot);
        assert_eq!(
            index,
            vec![
                LinkHit {
                    title: "Conga".to_string(),
                    url: "https://www.youtube.com/watch?v=abcdef12345".to_string(),
                },
                LinkHit {
                    title: "Heads Will Roll".to_string(),
                    url: "https://www.youtube.com/watch?v=zyxwvu98765".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_known_link_skips_resolution() {
        let a = Element::new("a")
            .with_href("https://youtu.be/7wtfhZwyrcc")
            .with_text("Imagine Dragons - Believer");
        let snapshot = Snapshot::new(vec![a], "");
        let ctx = ExtractionContext::new().with_known_key("imagine dragons - believer");
        let found = strategy().attempt(&snapshot, &ctx);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].video_url, None);
    }

    #[test]
    fn test_other_hosts_and_bare_links_are_ignored() {
        let other = Element::new("a").with_href("https://moo.bot/r/queue").with_text("Queue");
        let bare = Element::new("a").with_href("https://youtu.be/7wtfhZwyrcc");
        let snapshot = Snapshot::new(vec![other, bare], "");
        assert!(strategy().attempt(&snapshot, &ExtractionContext::new()).is_empty());
    }
}
