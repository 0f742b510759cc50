//! One-time setup before reconciling: reachability, deck, note model.

use crate::error::SyncError;
use crate::remote::{ModelSpec, RemoteStore};

/// Check the store is reachable, then make sure `deck` and `model` exist.
///
/// Any failure here is fatal for the run.
pub fn bootstrap<S: RemoteStore + ?Sized>(
    store: &S,
    deck: &str,
    model: &ModelSpec,
) -> Result<(), SyncError> {
    let version = store.version().map_err(|source| SyncError::Setup {
        step: "reach the remote store",
        source,
    })?;
    tracing::debug!(version, "remote store reachable");

    ensure_deck(store, deck)?;
    ensure_model(store, model)?;
    Ok(())
}

/// Create `deck` unless it already exists. Returns `true` when created.
pub fn ensure_deck<S: RemoteStore + ?Sized>(store: &S, deck: &str) -> Result<bool, SyncError> {
    let decks = store.list_decks().map_err(|source| SyncError::Setup {
        step: "list decks",
        source,
    })?;
    if decks.contains(deck) {
        return Ok(false);
    }

    store.create_deck(deck).map_err(|source| SyncError::Setup {
        step: "create the deck",
        source,
    })?;
    tracing::info!(deck, "created deck");
    Ok(true)
}

/// Create the note model unless one with the same name exists.
///
/// An existing model is trusted as-is; its fields are not compared.
pub fn ensure_model<S: RemoteStore + ?Sized>(
    store: &S,
    model: &ModelSpec,
) -> Result<bool, SyncError> {
    let models = store.list_models().map_err(|source| SyncError::Setup {
        step: "list note models",
        source,
    })?;
    if models.contains(&model.name) {
        return Ok(false);
    }

    store.create_model(model).map_err(|source| SyncError::Setup {
        step: "create the note model",
        source,
    })?;
    tracing::info!(model = %model.name, "created note model");
    Ok(true)
}
