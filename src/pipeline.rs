//! One scan: snapshot in, updated day collection out.

use anyhow::Result;
use chrono::NaiveDateTime;

use crate::config::PipelineConfig;
use crate::coordinator::Coordinator;
use crate::extract::ExtractionContext;
use crate::models::{DailyCollection, ExtractionResult, Snapshot};
use crate::reconcile::{ReconcileReport, Reconciler};

/// Which coordinator entry point a scan uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// First strategy with acceptable output wins.
    #[default]
    FirstMatch,
    /// All strategies, deduplicated.
    AllStrategies,
}

#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub collection: DailyCollection,
    pub extraction: ExtractionResult,
    pub report: ReconcileReport,
}

pub struct Pipeline {
    coordinator: Coordinator,
    reconciler: Reconciler,
}

impl Pipeline {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let coordinator = Coordinator::new(config)?;
        let reconciler = Reconciler::new(coordinator.matcher().clone(), coordinator.filter());
        Ok(Self {
            coordinator,
            reconciler,
        })
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Extract from `snapshot` and merge into `existing`, as of `now`.
    pub fn scan(
        &self,
        snapshot: &Snapshot,
        existing: &DailyCollection,
        mode: ScanMode,
        now: NaiveDateTime,
    ) -> ScanOutcome {
        let ctx = ExtractionContext::from_collection(existing, self.coordinator.matcher());
        let extraction = match mode {
            ScanMode::FirstMatch => self.coordinator.extract(snapshot, &ctx),
            ScanMode::AllStrategies => self.coordinator.extract_all(snapshot, &ctx),
        };
        let (collection, report) =
            self.reconciler
                .update_songs_data(existing, &extraction.candidates, now);
        ScanOutcome {
            collection,
            extraction,
            report,
        }
    }
}
