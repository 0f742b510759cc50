//! Run summary.

use chrono::{DateTime, Utc};

use crate::reconcile::{RecordOutcome, RecordResult};

/// Outcome of one reconciliation run.
#[derive(Debug)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<RecordResult>,
}

impl SyncReport {
    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Created(_)))
    }

    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Updated(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Failed(_)))
    }

    /// Failed records in input order.
    pub fn failures(&self) -> impl Iterator<Item = &RecordResult> {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, RecordOutcome::Failed(_)))
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at.signed_duration_since(self.started_at)
    }

    fn count(&self, pred: impl Fn(&RecordOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }
}
