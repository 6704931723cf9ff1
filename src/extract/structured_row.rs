//! Rows with distinguishable title and label sub-fields.
//!
//! The Moobot queue table renders each request as a row holding a title span
//! and a handful of label spans (duration, requester, queue position).

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{first_line, ExtractionContext, ExtractionStrategy};
use crate::config::ExtractionConfig;
use crate::models::{Element, RawCandidate, Snapshot, Status, StrategyId};

static DURATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}:\d{2}(?::\d{2})?$").unwrap());

static REQUESTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:requested\s+)?by\s+(.+)$").unwrap());

/// What a label sub-field turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    Duration(String),
    Requester(String),
    Status(Status),
    Unknown,
}

pub fn classify_label(text: &str) -> Label {
    let text = text.trim();
    if DURATION.is_match(text) {
        return Label::Duration(text.to_string());
    }
    if let Some(caps) = REQUESTER.captures(text) {
        let name = caps[1].trim();
        if !name.is_empty() {
            return Label::Requester(name.to_string());
        }
    }
    match Status::from_label(text) {
        Some(status) => Label::Status(status),
        None => Label::Unknown,
    }
}

pub struct StructuredRowStrategy {
    row_tags: Vec<String>,
    row_roles: Vec<String>,
    title_classes: Vec<String>,
    label_classes: Vec<String>,
}

impl StructuredRowStrategy {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            row_tags: config.row_tags.clone(),
            row_roles: config.row_roles.clone(),
            title_classes: config.title_classes.clone(),
            label_classes: config.label_classes.clone(),
        }
    }

    fn is_row(&self, el: &Element) -> bool {
        self.row_tags.iter().any(|t| el.is_tag(t))
            || el
                .role
                .as_deref()
                .is_some_and(|r| self.row_roles.iter().any(|rr| rr.eq_ignore_ascii_case(r)))
    }

    fn is_title(&self, el: &Element) -> bool {
        self.title_classes.iter().any(|c| el.has_class(c))
    }

    fn is_label(&self, el: &Element) -> bool {
        self.label_classes.iter().any(|c| el.has_class(c))
    }

    /// Candidate for one row, if it has a non-empty title sub-field.
    fn read_row(&self, row: &Element) -> Option<RawCandidate> {
        let title_el = row.find_descendant(|el| self.is_title(el))?;
        let title = first_line(&title_el.text);
        if title.is_empty() {
            return None;
        }

        let mut candidate = RawCandidate::new(title, StrategyId::StructuredRow);
        for label in row.descendants().into_iter().filter(|el| self.is_label(el)) {
            match classify_label(&label.text) {
                Label::Duration(d) if candidate.duration.is_none() => candidate.duration = Some(d),
                Label::Requester(r) if candidate.requester.is_none() => {
                    candidate.requester = Some(r)
                }
                Label::Status(s) if candidate.status.is_none() => candidate.status = Some(s),
                _ => {}
            }
        }
        Some(candidate)
    }
}

impl ExtractionStrategy for StructuredRowStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::StructuredRow
    }

    fn attempt(&self, snapshot: &Snapshot, _ctx: &ExtractionContext) -> Vec<RawCandidate> {
        let candidates: Vec<RawCandidate> = snapshot
            .walk()
            .into_iter()
            .filter(|r| self.is_row(r.element))
            // Nested rows: only the innermost row describes a single song
            .filter(|r| !r.element.descendants().iter().any(|d| self.is_row(d)))
            .filter_map(|r| self.read_row(r.element))
            .collect();
        debug!("structured rows: {} candidates", candidates.len());
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TITLE: &str = "moobot-input-label-text-text";
    const LABEL: &str = "moobot-input-label-text-label";

    fn row(title: &str, labels: &[&str]) -> Element {
        let mut tr = Element::new("tr").with_child(
            Element::new("td").with_child(Element::new("span").with_class(TITLE).with_text(title)),
        );
        for label in labels {
            tr = tr.with_child(
                Element::new("td").with_child(Element::new("span").with_class(LABEL).with_text(label)),
            );
        }
        tr
    }

    fn strategy() -> StructuredRowStrategy {
        StructuredRowStrategy::new(&ExtractionConfig::default())
    }

    #[test]
    fn test_classify_label() {
        assert_eq!(classify_label("3:24"), Label::Duration("3:24".to_string()));
        assert_eq!(classify_label(" 1:02:33 "), Label::Duration("1:02:33".to_string()));
        assert_eq!(classify_label("By Hell_wing2"), Label::Requester("Hell_wing2".to_string()));
        assert_eq!(classify_label("requested by bob"), Label::Requester("bob".to_string()));
        assert_eq!(classify_label("Playing now"), Label::Status(Status::Playing));
        assert_eq!(classify_label("Playing in 6 minutes"), Label::Status(Status::Queued));
        assert_eq!(classify_label("YouTube"), Label::Unknown);
        assert_eq!(classify_label("By "), Label::Unknown);
    }

    #[test]
    fn test_reads_rows_with_labels() {
        let table = Element::new("table").with_child(
            Element::new("tbody")
                .with_child(row("Imagine Dragons - Believer", &["3:24", "By bob", "Playing now"]))
                .with_child(row("Conga", &["Playing next"])),
        );
        let snapshot = Snapshot::new(vec![table], "");
        let found = strategy().attempt(&snapshot, &ExtractionContext::new());

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].title, "Imagine Dragons - Believer");
        assert_eq!(found[0].duration.as_deref(), Some("3:24"));
        assert_eq!(found[0].requester.as_deref(), Some("bob"));
        assert_eq!(found[0].status, Some(Status::Playing));
        assert_eq!(found[0].video_url, None);

        assert_eq!(found[1].title, "Conga");
        assert_eq!(found[1].duration, None);
        assert_eq!(found[1].requester, None);
        assert_eq!(found[1].status, Some(Status::Next));
    }

    #[test]
    fn test_rows_without_title_field_are_skipped() {
        let header = Element::new("tr").with_child(Element::new("th").with_text("Title"));
        let empty_title = row("   ", &["3:24"]);
        let snapshot = Snapshot::new(vec![header, empty_title], "");
        assert!(strategy().attempt(&snapshot, &ExtractionContext::new()).is_empty());
    }

    #[test]
    fn test_role_rows_and_nested_rows() {
        let inner = Element::new("div")
            .with_role("row")
            .with_child(Element::new("span").with_class("song-title").with_text("Heads Will Roll"));
        let outer = Element::new("li").with_child(inner);
        let snapshot = Snapshot::new(vec![outer], "");
        let found = strategy().attempt(&snapshot, &ExtractionContext::new());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Heads Will Roll");
    }

    #[test]
    fn test_no_structure_yields_nothing() {
        let snapshot = Snapshot::from_text("Believer\nConga");
        assert!(strategy().attempt(&snapshot, &ExtractionContext::new()).is_empty());
    }
}
