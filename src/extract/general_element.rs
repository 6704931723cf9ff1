//! Elements whose class names suggest a song or queue entry.

use log::debug;

use super::{first_line, is_single_line, ExtractionContext, ExtractionStrategy, VideoHosts};
use crate::config::ExtractionConfig;
use crate::models::{Element, RawCandidate, Snapshot, StrategyId};

pub struct GeneralElementStrategy {
    class_hints: Vec<String>,
    class_fragments: Vec<String>,
    hosts: VideoHosts,
}

impl GeneralElementStrategy {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            class_hints: config.general_class_hints.clone(),
            class_fragments: config.general_class_fragments.clone(),
            hosts: VideoHosts::new(&config.video_hosts),
        }
    }

    fn is_song_like(&self, el: &Element) -> bool {
        self.class_hints.iter().any(|h| el.has_class(h))
            || self.class_fragments.iter().any(|f| el.class_contains(f))
    }

    /// Text of the first video link inside, else the element's own text.
    /// Containers spanning several lines are not single entries.
    fn title_of(&self, el: &Element) -> Option<String> {
        let link_text = el
            .find_descendant(|d| {
                d.href.as_deref().is_some_and(|h| self.hosts.is_video_url(h))
                    && !d.trimmed_text().is_empty()
            })
            .map(|d| first_line(&d.text));
        if let Some(text) = link_text {
            return Some(text.to_string());
        }

        let text = el.trimmed_text();
        if text.is_empty() || !is_single_line(text) {
            return None;
        }
        Some(text.to_string())
    }
}

impl ExtractionStrategy for GeneralElementStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::GeneralElement
    }

    fn attempt(&self, snapshot: &Snapshot, _ctx: &ExtractionContext) -> Vec<RawCandidate> {
        let candidates: Vec<RawCandidate> = snapshot
            .walk()
            .iter()
            .filter(|r| self.is_song_like(r.element))
            .filter_map(|r| self.title_of(r.element))
            .map(|title| RawCandidate::new(&title, StrategyId::GeneralElement))
            .collect();
        debug!("general elements: {} candidates", candidates.len());
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strategy() -> GeneralElementStrategy {
        GeneralElementStrategy::new(&ExtractionConfig::default())
    }

    #[test]
    fn test_song_classes() {
        let items = vec![
            Element::new("div").with_class("queue-item").with_text("Believer"),
            Element::new("div").with_class("my-song-card").with_text("Conga"),
            Element::new("div").with_class("sidebar").with_text("Not a song"),
        ];
        let found = strategy().attempt(&Snapshot::new(items, ""), &ExtractionContext::new());
        let titles: Vec<&str> = found.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Believer", "Conga"]);
        assert!(found.iter().all(|c| c.video_url.is_none()));
    }

    #[test]
    fn test_link_text_preferred_and_containers_skipped() {
        let item = Element::new("div")
            .with_class("song-item")
            .with_text("Heads Will Roll\nBy bob")
            .with_child(
                Element::new("a")
                    .with_href("https://youtu.be/abcdef12345")
                    .with_text("Heads Will Roll"),
            );
        let container = Element::new("section")
            .with_class("music-list")
            .with_text("One\nTwo\nThree");
        let found = strategy().attempt(
            &Snapshot::new(vec![item, container], ""),
            &ExtractionContext::new(),
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Heads Will Roll");
        assert_eq!(found[0].video_url, None);
    }

    #[test]
    fn test_empty_snapshot() {
        assert!(strategy()
            .attempt(&Snapshot::default(), &ExtractionContext::new())
            .is_empty());
    }
}
