//! Merging extracted candidates into the day's collection.
//!
//! Entries are only ever appended or updated in place: never removed, never
//! reordered. A stored video URL is never cleared or replaced.

use chrono::NaiveDateTime;
use log::debug;
use serde::Serialize;
use std::sync::Arc;

use crate::classify::NoiseFilter;
use crate::matching::SongMatcher;
use crate::models::{DailyCollection, RawCandidate, SongRequest};

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub added: usize,
    pub updated: usize,
    pub links_backfilled: usize,
    pub rejected: usize,
}

pub struct Reconciler {
    matcher: SongMatcher,
    filter: Arc<dyn NoiseFilter>,
}

impl Reconciler {
    pub fn new(matcher: SongMatcher, filter: Arc<dyn NoiseFilter>) -> Self {
        Self { matcher, filter }
    }

    /// Merge `candidates` into a copy of `existing`.
    ///
    /// A candidate matching an entry (including one appended earlier in the
    /// same batch) refreshes it; anything else is appended.
    pub fn update_songs_data(
        &self,
        existing: &DailyCollection,
        candidates: &[RawCandidate],
        now: NaiveDateTime,
    ) -> (DailyCollection, ReconcileReport) {
        let normalizer = self.matcher.normalizer();
        let mut collection = existing.clone();
        let mut keys: Vec<String> = collection
            .songs
            .iter()
            .map(|s| self.matcher.key(&s.title))
            .collect();
        let mut report = ReconcileReport::default();

        for candidate in candidates {
            let (title, key) = normalizer.display_and_key(&candidate.title);
            if key.is_empty() || self.filter.is_noise(&title) {
                report.rejected += 1;
                continue;
            }

            match self.matcher.find_match(&key, &keys) {
                Some(idx) => {
                    let song = &mut collection.songs[idx];
                    if merge_into(song, candidate, now) {
                        report.links_backfilled += 1;
                    }
                    report.updated += 1;
                }
                None => {
                    debug!("new song: {}", title);
                    collection
                        .songs
                        .push(SongRequest::from_candidate(title, candidate, now));
                    keys.push(key);
                    report.added += 1;
                }
            }
        }

        (collection, report)
    }
}

/// Refresh a stored entry from a newer observation. Returns true if the
/// entry gained a video URL.
fn merge_into(song: &mut SongRequest, candidate: &RawCandidate, now: NaiveDateTime) -> bool {
    if let Some(status) = candidate.status {
        song.status = Some(status);
    }
    if now > song.last_seen {
        song.last_seen = now;
    }
    if song.duration.is_none() {
        song.duration = candidate.duration.clone();
    }
    if song.requester.is_none() {
        song.requester = candidate.requester.clone();
    }

    if !song.has_video_link() {
        if let Some(url) = candidate.video_link() {
            debug!("link backfilled for {}: {}", song.title, url);
            song.video_url = Some(url.to_string());
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::TextClassifier;
    use crate::models::{Status, StrategyId};
    use chrono::NaiveDate;

    const URL: &str = "https://www.youtube.com/watch?v=7wtfhZwyrcc";

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 17)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn reconciler() -> Reconciler {
        Reconciler::new(SongMatcher::default(), Arc::new(TextClassifier::default()))
    }

    fn stored(title: &str, url: Option<&str>) -> SongRequest {
        SongRequest {
            title: title.to_string(),
            duration: None,
            requester: None,
            status: Some(Status::Queued),
            video_url: url.map(str::to_string),
            first_seen: at(20, 0),
            last_seen: at(20, 0),
            strategy: Some(StrategyId::StructuredRow),
        }
    }

    fn day(songs: Vec<SongRequest>) -> DailyCollection {
        DailyCollection::with_songs(at(0, 0).date(), songs)
    }

    #[test]
    fn test_new_song_is_appended() {
        let existing = day(vec![stored("Conga", None)]);
        let candidates = vec![RawCandidate::new("Believer", StrategyId::TextParsing)
            .with_requester("bob")];
        let (merged, report) = reconciler().update_songs_data(&existing, &candidates, at(20, 5));

        assert_eq!(merged.len(), 2);
        assert_eq!(merged.songs[0], existing.songs[0]);
        assert_eq!(merged.songs[1].title, "Believer");
        assert_eq!(merged.songs[1].first_seen, at(20, 5));
        assert_eq!(merged.songs[1].last_seen, at(20, 5));
        assert_eq!(merged.songs[1].requester.as_deref(), Some("bob"));
        assert_eq!(report.added, 1);
        // Input untouched
        assert_eq!(existing.len(), 1);
    }

    #[test]
    fn test_match_updates_in_place_and_backfills_link() {
        let existing = day(vec![stored("Believer", None)]);
        let candidates = vec![RawCandidate::new("Imagine Dragons - Believer", StrategyId::LinkAnchored)
            .with_status(Status::Playing)
            .with_video_url(URL)];
        let (merged, report) = reconciler().update_songs_data(&existing, &candidates, at(20, 5));

        assert_eq!(merged.len(), 1);
        let song = &merged.songs[0];
        assert_eq!(song.title, "Believer");
        assert_eq!(song.status, Some(Status::Playing));
        assert_eq!(song.video_url.as_deref(), Some(URL));
        assert_eq!(song.first_seen, at(20, 0));
        assert_eq!(song.last_seen, at(20, 5));
        assert_eq!(report.updated, 1);
        assert_eq!(report.links_backfilled, 1);
    }

    #[test]
    fn test_existing_link_is_never_replaced_or_cleared() {
        let existing = day(vec![stored("Believer", Some(URL))]);
        let candidates = vec![
            RawCandidate::new("Believer", StrategyId::LinkAnchored)
                .with_video_url("https://www.youtube.com/watch?v=other000000"),
            RawCandidate::new("Believer", StrategyId::TextParsing),
        ];
        let (merged, report) = reconciler().update_songs_data(&existing, &candidates, at(20, 5));
        assert_eq!(merged.songs[0].video_url.as_deref(), Some(URL));
        assert_eq!(report.links_backfilled, 0);
    }

    #[test]
    fn test_status_kept_when_candidate_has_none() {
        let existing = day(vec![stored("Believer", None)]);
        let candidates = vec![RawCandidate::new("Believer", StrategyId::TextParsing)];
        let (merged, _) = reconciler().update_songs_data(&existing, &candidates, at(20, 5));
        assert_eq!(merged.songs[0].status, Some(Status::Queued));
    }

    #[test]
    fn test_duplicates_within_batch_collapse() {
        let candidates = vec![
            RawCandidate::new("Believer", StrategyId::TextParsing),
            RawCandidate::new("Imagine Dragons - Believer", StrategyId::TextParsing).with_video_url(URL),
            RawCandidate::new("BELIEVER", StrategyId::TextParsing),
        ];
        let (merged, report) = reconciler().update_songs_data(&day(vec![]), &candidates, at(20, 5));
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.songs[0].video_url.as_deref(), Some(URL));
        assert_eq!(report.added, 1);
        assert_eq!(report.updated, 2);
    }

    #[test]
    fn test_noise_and_empty_candidates_are_rejected() {
        let candidates = vec![
            RawCandidate::new("Refresh", StrategyId::TextParsing),
            RawCandidate::new("(Official Video)", StrategyId::TextParsing),
            RawCandidate::new("   ", StrategyId::TextParsing),
        ];
        let existing = day(vec![stored("Conga", None)]);
        let (merged, report) = reconciler().update_songs_data(&existing, &candidates, at(20, 5));
        assert_eq!(merged, existing);
        assert_eq!(report.rejected, 3);
    }

    #[test]
    fn test_metadata_backfilled_only_when_missing() {
        let mut song = stored("Believer", None);
        song.duration = Some("3:24".to_string());
        let existing = day(vec![song]);
        let candidates = vec![RawCandidate::new("Believer", StrategyId::StructuredRow)
            .with_duration("9:99")
            .with_requester("bob")];
        let (merged, _) = reconciler().update_songs_data(&existing, &candidates, at(20, 5));
        assert_eq!(merged.songs[0].duration.as_deref(), Some("3:24"));
        assert_eq!(merged.songs[0].requester.as_deref(), Some("bob"));
    }

    #[test]
    fn test_never_removes_or_reorders() {
        let existing = day(vec![
            stored("Conga", None),
            stored("Heads Will Roll", None),
            stored("You Should Be Dancing", None),
        ]);
        let candidates = vec![
            RawCandidate::new("You Should Be Dancing", StrategyId::TextParsing),
            RawCandidate::new("Believer", StrategyId::TextParsing),
        ];
        let (merged, _) = reconciler().update_songs_data(&existing, &candidates, at(20, 5));
        let titles: Vec<&str> = merged.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Conga", "Heads Will Roll", "You Should Be Dancing", "Believer"]
        );
    }
}
