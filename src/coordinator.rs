//! Strategy selection.
//!
//! Strategies run in priority order; the first one whose output survives
//! cleaning and noise filtering wins. Candidates without a video URL are then
//! looked up in the page's link index, unless the store already has a link
//! for that song.

use anyhow::Result;
use log::{debug, info};
use rustc_hash::FxHashSet;
use std::sync::Arc;

use crate::classify::{NoiseFilter, TextClassifier};
use crate::config::PipelineConfig;
use crate::extract::{
    default_strategies, ExtractionContext, ExtractionStrategy, LinkAnchoredStrategy, LinkHit,
};
use crate::matching::SongMatcher;
use crate::models::{ExtractionResult, RawCandidate, Snapshot, StrategyAttempt, StrategyId};
use crate::normalize::Normalizer;

/// Raw and accepted output of a single strategy, for diagnostics.
#[derive(Debug, Clone)]
pub struct StrategyReport {
    pub strategy: StrategyId,
    pub raw: Vec<RawCandidate>,
    pub accepted: Vec<RawCandidate>,
}

pub struct Coordinator {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
    links: LinkAnchoredStrategy,
    filter: Arc<dyn NoiseFilter>,
    matcher: SongMatcher,
}

impl Coordinator {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let normalizer = Normalizer::new(&config.normalizer)?;
        let filter: Arc<dyn NoiseFilter> = Arc::new(TextClassifier::new(&config.classifier)?);
        let matcher = SongMatcher::new(&config.matcher, normalizer.clone());
        Ok(Self {
            strategies: default_strategies(&config.extraction, &normalizer),
            links: LinkAnchoredStrategy::new(&config.extraction, normalizer),
            filter,
            matcher,
        })
    }

    /// Assemble from parts, e.g. with a custom strategy list or filter.
    pub fn with_parts(
        strategies: Vec<Box<dyn ExtractionStrategy>>,
        links: LinkAnchoredStrategy,
        filter: Arc<dyn NoiseFilter>,
        matcher: SongMatcher,
    ) -> Self {
        Self {
            strategies,
            links,
            filter,
            matcher,
        }
    }

    pub fn strategy_ids(&self) -> Vec<StrategyId> {
        self.strategies.iter().map(|s| s.id()).collect()
    }

    pub fn filter(&self) -> Arc<dyn NoiseFilter> {
        Arc::clone(&self.filter)
    }

    pub fn matcher(&self) -> &SongMatcher {
        &self.matcher
    }

    /// Clean titles, drop noise and exact duplicates (by comparison key).
    pub fn screen(&self, raw: &[RawCandidate]) -> Vec<RawCandidate> {
        let normalizer = self.matcher.normalizer();
        let mut seen = FxHashSet::default();
        raw.iter()
            .filter_map(|c| {
                let (title, key) = normalizer.display_and_key(&c.title);
                if key.is_empty() || self.filter.is_noise(&title) || !seen.insert(key) {
                    return None;
                }
                Some(RawCandidate {
                    title,
                    ..c.clone()
                })
            })
            .collect()
    }

    /// First strategy with any acceptable candidates wins.
    pub fn extract(&self, snapshot: &Snapshot, ctx: &ExtractionContext) -> ExtractionResult {
        let mut attempts = Vec::new();
        for strategy in &self.strategies {
            let raw = strategy.attempt(snapshot, ctx);
            let accepted = self.screen(&raw);
            attempts.push(StrategyAttempt {
                strategy: strategy.id(),
                raw: raw.len(),
                accepted: accepted.len(),
            });
            debug!(
                "{}: {} raw, {} accepted",
                strategy.id(),
                raw.len(),
                accepted.len()
            );

            if !accepted.is_empty() {
                info!("Extracted {} songs with {}", accepted.len(), strategy.id());
                let mut result = ExtractionResult {
                    candidates: accepted,
                    success: true,
                    strategy: Some(strategy.id()),
                    attempts,
                    ..ExtractionResult::default()
                };
                self.enrich_links(&mut result, snapshot, ctx);
                return result;
            }
        }

        info!("No strategy found songs on the page");
        ExtractionResult::empty(attempts)
    }

    /// Every strategy's accepted output, merged in priority order and
    /// deduplicated with the matcher.
    pub fn extract_all(&self, snapshot: &Snapshot, ctx: &ExtractionContext) -> ExtractionResult {
        let mut attempts = Vec::new();
        let mut merged: Vec<RawCandidate> = Vec::new();
        let mut keys: Vec<String> = Vec::new();

        for strategy in &self.strategies {
            let raw = strategy.attempt(snapshot, ctx);
            let accepted = self.screen(&raw);
            attempts.push(StrategyAttempt {
                strategy: strategy.id(),
                raw: raw.len(),
                accepted: accepted.len(),
            });
            for candidate in accepted {
                let key = self.matcher.key(&candidate.title);
                match self.matcher.find_match(&key, &keys) {
                    Some(idx) => {
                        // Keep the higher-priority entry, but take a link it lacks
                        if merged[idx].video_link().is_none() {
                            if let Some(url) = candidate.video_link() {
                                merged[idx].video_url = Some(url.to_string());
                            }
                        }
                    }
                    None => {
                        keys.push(key);
                        merged.push(candidate);
                    }
                }
            }
        }

        if merged.is_empty() {
            return ExtractionResult::empty(attempts);
        }

        let strategy = merged.iter().map(|c| c.strategy).min_by_key(|s| s.rank());
        let mut result = ExtractionResult {
            candidates: merged,
            success: true,
            strategy,
            attempts,
            ..ExtractionResult::default()
        };
        self.enrich_links(&mut result, snapshot, ctx);
        result
    }

    /// Per-strategy raw and accepted candidates, without picking a winner.
    pub fn inspect(&self, snapshot: &Snapshot, ctx: &ExtractionContext) -> Vec<StrategyReport> {
        self.strategies
            .iter()
            .map(|strategy| {
                let raw = strategy.attempt(snapshot, ctx);
                let accepted = self.screen(&raw);
                StrategyReport {
                    strategy: strategy.id(),
                    raw,
                    accepted,
                }
            })
            .collect()
    }

    pub fn link_index(&self, snapshot: &Snapshot) -> Vec<LinkHit> {
        self.links.link_index(snapshot)
    }

    /// Attach page links to unlinked candidates. Songs the store already has
    /// a link for are skipped; the index is only built when something needs it.
    fn enrich_links(
        &self,
        result: &mut ExtractionResult,
        snapshot: &Snapshot,
        ctx: &ExtractionContext,
    ) {
        let mut index: Option<Vec<(String, String)>> = None;

        for candidate in result.candidates.iter_mut() {
            if candidate.video_link().is_some() {
                continue;
            }
            let key = self.matcher.key(&candidate.title);
            if ctx.has_link(&key) {
                result.link_lookups_skipped += 1;
                continue;
            }

            let index = index.get_or_insert_with(|| {
                self.links
                    .link_index(snapshot)
                    .into_iter()
                    .map(|hit| (self.matcher.key(&hit.title), hit.url))
                    .filter(|(k, _)| !k.is_empty())
                    .collect()
            });
            let keys: Vec<&str> = index.iter().map(|(k, _)| k.as_str()).collect();
            if let Some(idx) = self.matcher.find_match(&key, &keys) {
                candidate.video_url = Some(index[idx].1.clone());
                result.links_resolved += 1;
            }
        }

        if result.links_resolved > 0 || result.link_lookups_skipped > 0 {
            debug!(
                "links: {} resolved, {} skipped (already stored)",
                result.links_resolved, result.link_lookups_skipped
            );
        }
    }
}
