//! Per-record create, update or skip decisions.
//!
//! ## Per-record protocol
//!
//! 1. Fingerprint the record's front and back source.
//! 2. Look up `(deck, external id)` in the remote store.
//!    - no match → create
//!    - one match → read its stored fingerprint
//!      - read fails or field absent → update (forced, logged)
//!      - equal → skip, no further remote calls
//!      - different → update
//!    - several matches → failed, nothing written
//! 3. Render both sides.
//! 4. Store both images as `<fp>_front.svg` / `<fp>_back.svg`.
//! 5. Create the note, or overwrite the existing note's fields.
//!
//! Any per-record error marks that record failed and the run moves on.
//! Only a workspace cleanup failure aborts the run.

use std::collections::HashSet;

use chrono::Utc;

use flashtex_core::{
    fingerprint, ContentFingerprint, FlashcardRecord, NoteFields, NoteId, RemoteCardRef,
};
use flashtex_renderer::{RenderError, RenderPipeline};

use crate::error::{RemoteError, SyncError};
use crate::remote::{NoteLookup, RemoteStore};
use crate::report::SyncReport;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What the reconciler decided to do with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    Create,
    Update(NoteId),
    Skip(NoteId),
}

/// The remote write a rendered record ends in.
#[derive(Debug, Clone, Copy)]
enum Write {
    Create,
    Update(NoteId),
}

/// Why a record could not be synced.
#[derive(Debug, thiserror::Error)]
pub enum FailureReason {
    #[error("render failed: {0}")]
    Render(#[source] RenderError),

    #[error("{count} notes share this id in the deck; refusing to pick one")]
    AmbiguousMatch { count: usize },

    #[error("remote store call failed: {0}")]
    Remote(#[source] RemoteError),
}

/// Terminal state of one record.
#[derive(Debug)]
pub enum RecordOutcome {
    Skipped(NoteId),
    Created(NoteId),
    Updated(NoteId),
    Failed(FailureReason),
}

/// One record's outcome, tagged with what identifies it.
#[derive(Debug)]
pub struct RecordResult {
    pub external_id: String,
    pub fingerprint: ContentFingerprint,
    pub outcome: RecordOutcome,
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Syncs records into one deck of one store using one render pipeline.
pub struct Reconciler<'a, S: RemoteStore + ?Sized> {
    store: &'a S,
    pipeline: &'a RenderPipeline,
    deck: &'a str,
    model: &'a str,
}

impl<'a, S: RemoteStore + ?Sized> Reconciler<'a, S> {
    pub fn new(store: &'a S, pipeline: &'a RenderPipeline, deck: &'a str, model: &'a str) -> Self {
        Self {
            store,
            pipeline,
            deck,
            model,
        }
    }

    /// Reconcile every record in order.
    ///
    /// Per-record failures are collected in the report; only
    /// [`SyncError::WorkspaceCleanup`] stops the run early.
    pub fn run(&self, records: &[FlashcardRecord]) -> Result<SyncReport, SyncError> {
        let started_at = Utc::now();
        warn_duplicate_ids(records);

        let mut results = Vec::with_capacity(records.len());
        for record in records {
            results.push(self.reconcile_record(record)?);
        }

        Ok(SyncReport {
            started_at,
            finished_at: Utc::now(),
            results,
        })
    }

    /// Reconcile a single record.
    pub fn reconcile_record(&self, record: &FlashcardRecord) -> Result<RecordResult, SyncError> {
        let fp = fingerprint(&record.front_source, &record.back_source);
        let outcome = match self.plan(record, &fp) {
            Ok(Plan::Skip(note)) => {
                tracing::info!(external_id = %record.external_id, %note, "unchanged; skipped");
                RecordOutcome::Skipped(note)
            }
            Ok(Plan::Create) => self.finish(record, &fp, Write::Create)?,
            Ok(Plan::Update(note)) => self.finish(record, &fp, Write::Update(note))?,
            Err(reason) => RecordOutcome::Failed(reason),
        };

        if let RecordOutcome::Failed(reason) = &outcome {
            tracing::error!(external_id = %record.external_id, fingerprint = %fp, error = %reason, "record failed");
        }

        Ok(RecordResult {
            external_id: record.external_id.clone(),
            fingerprint: fp,
            outcome,
        })
    }

    /// Decide what to do with `record`, touching the store read-only.
    pub fn plan(
        &self,
        record: &FlashcardRecord,
        fp: &ContentFingerprint,
    ) -> Result<Plan, FailureReason> {
        let Some(existing) = self.resolve(record)? else {
            return Ok(Plan::Create);
        };
        match existing.stored_fingerprint.as_deref() {
            Some(stored) if fp.matches(stored) => Ok(Plan::Skip(existing.note_id)),
            _ => Ok(Plan::Update(existing.note_id)),
        }
    }

    /// The note already holding `record`, with its stored fingerprint.
    ///
    /// An unreadable fingerprint is logged and reported as absent, which
    /// forces an update.
    pub fn resolve(&self, record: &FlashcardRecord) -> Result<Option<RemoteCardRef>, FailureReason> {
        let lookup = self
            .store
            .find_note(self.deck, &record.external_id)
            .map_err(FailureReason::Remote)?;

        let note = match lookup {
            NoteLookup::Missing => return Ok(None),
            NoteLookup::Found(note) => note,
            NoteLookup::Ambiguous(ids) => {
                return Err(FailureReason::AmbiguousMatch { count: ids.len() })
            }
        };

        let stored_fingerprint = match self.store.get_field(note, NoteFields::FINGERPRINT) {
            Ok(Some(stored)) => Some(stored),
            Ok(None) => {
                tracing::warn!(external_id = %record.external_id, %note, "note has no stored fingerprint; updating");
                None
            }
            Err(err) => {
                tracing::warn!(
                    external_id = %record.external_id,
                    %note,
                    error = %err,
                    "unable to read stored fingerprint; forcing update"
                );
                None
            }
        };

        Ok(Some(RemoteCardRef {
            note_id: note,
            stored_fingerprint,
        }))
    }

    /// Run the write, turning per-record errors into `Failed` and a cleanup
    /// failure into a run-level error.
    fn finish(
        &self,
        record: &FlashcardRecord,
        fp: &ContentFingerprint,
        write: Write,
    ) -> Result<RecordOutcome, SyncError> {
        match self.apply(record, fp, write) {
            Ok(outcome) => Ok(outcome),
            Err(FailureReason::Render(err)) if err.is_fatal() => {
                Err(SyncError::WorkspaceCleanup(err))
            }
            Err(reason) => Ok(RecordOutcome::Failed(reason)),
        }
    }

    fn apply(
        &self,
        record: &FlashcardRecord,
        fp: &ContentFingerprint,
        write: Write,
    ) -> Result<RecordOutcome, FailureReason> {
        let (front, back) = self
            .pipeline
            .render(&record.front_source, &record.back_source, fp)
            .map_err(FailureReason::Render)?;

        let front_name = self
            .store
            .store_media(&front.filename, &front.data)
            .map_err(FailureReason::Remote)?;
        let back_name = self
            .store
            .store_media(&back.filename, &back.data)
            .map_err(FailureReason::Remote)?;

        let fields = NoteFields::new(&record.external_id, fp, &front_name, &back_name);
        match write {
            Write::Create => {
                let note = self
                    .store
                    .create_note(self.deck, self.model, &fields)
                    .map_err(FailureReason::Remote)?;
                tracing::info!(external_id = %record.external_id, %note, fingerprint = %fp, "created");
                Ok(RecordOutcome::Created(note))
            }
            Write::Update(note) => {
                self.store
                    .update_note_fields(note, &fields)
                    .map_err(FailureReason::Remote)?;
                tracing::info!(external_id = %record.external_id, %note, fingerprint = %fp, "updated");
                Ok(RecordOutcome::Updated(note))
            }
        }
    }
}

fn warn_duplicate_ids(records: &[FlashcardRecord]) {
    let mut seen = HashSet::new();
    for record in records {
        if !seen.insert(record.external_id.as_str()) {
            tracing::warn!(external_id = %record.external_id, "external id appears more than once in this run");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
