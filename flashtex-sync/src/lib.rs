//! # flashtex-sync
//!
//! Fingerprint-gated reconciliation of flashcard records against a remote
//! flashcard store.
//!
//! Call [`bootstrap`] once per run to make sure the deck and note model
//! exist, then [`Reconciler::run`] to create, update or skip every record.

pub mod anki;
pub mod bootstrap;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod memory;
pub mod reconcile;
pub mod remote;
pub mod report;

pub use anki::AnkiConnect;
pub use bootstrap::{bootstrap, ensure_deck, ensure_model};
pub use error::{RemoteError, SyncError};
#[cfg(any(test, feature = "mock"))]
pub use memory::MemoryStore;
pub use reconcile::{FailureReason, Plan, RecordOutcome, RecordResult, Reconciler};
pub use remote::{CardTemplate, ModelSpec, NoteLookup, RemoteStore};
pub use report::SyncReport;
