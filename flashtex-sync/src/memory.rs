//! In-memory [`RemoteStore`] for tests.
//!
//! Keeps decks, models, notes and media in maps behind a [`Mutex`] so every
//! trait method works on `&self`. Every write is counted in a [`CallLog`],
//! and faults can be switched on to exercise error paths.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use flashtex_core::{NoteFields, NoteId};

use crate::error::RemoteError;
use crate::remote::{ModelSpec, NoteLookup, RemoteStore};

/// A note as held by the in-memory store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNote {
    pub deck: String,
    pub model: String,
    pub fields: BTreeMap<String, String>,
}

/// Counts of calls made against the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallLog {
    pub lookups: usize,
    pub field_reads: usize,
    pub created_decks: usize,
    pub created_models: usize,
    pub created_notes: usize,
    pub updated_notes: usize,
    /// Media filenames in write order.
    pub stored_media: Vec<String>,
}

impl CallLog {
    /// Number of calls that changed remote state.
    pub fn writes(&self) -> usize {
        self.created_decks
            + self.created_models
            + self.created_notes
            + self.updated_notes
            + self.stored_media.len()
    }
}

#[derive(Debug, Default)]
struct State {
    decks: BTreeSet<String>,
    models: BTreeMap<String, ModelSpec>,
    notes: BTreeMap<NoteId, StoredNote>,
    media: BTreeMap<String, String>,
    next_id: i64,
    calls: CallLog,
    offline: bool,
    fail_field_reads: bool,
}

/// In-memory remote store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a note directly, bypassing the call log.
    pub fn insert_note(&self, deck: &str, model: &str, fields: BTreeMap<String, String>) -> NoteId {
        let mut state = self.lock();
        state.next_id += 1;
        let id = NoteId(state.next_id);
        state.notes.insert(
            id,
            StoredNote {
                deck: deck.to_string(),
                model: model.to_string(),
                fields,
            },
        );
        id
    }

    /// Every call fails with a transport error while `offline` is set.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// `get_field` fails with a transport error while set.
    pub fn set_fail_field_reads(&self, fail: bool) {
        self.lock().fail_field_reads = fail;
    }

    pub fn calls(&self) -> CallLog {
        self.lock().calls.clone()
    }

    pub fn reset_calls(&self) {
        self.lock().calls = CallLog::default();
    }

    pub fn note(&self, id: NoteId) -> Option<StoredNote> {
        self.lock().notes.get(&id).cloned()
    }

    pub fn note_count(&self) -> usize {
        self.lock().notes.len()
    }

    pub fn media(&self, filename: &str) -> Option<String> {
        self.lock().media.get(filename).cloned()
    }

    pub fn has_deck(&self, name: &str) -> bool {
        self.lock().decks.contains(name)
    }

    pub fn model(&self, name: &str) -> Option<ModelSpec> {
        self.lock().models.get(name).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panicking test thread must not wedge the others.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn online(&self) -> Result<MutexGuard<'_, State>, RemoteError> {
        let state = self.lock();
        if state.offline {
            return Err(RemoteError::Transport("connection refused".to_string()));
        }
        Ok(state)
    }
}

impl RemoteStore for MemoryStore {
    fn version(&self) -> Result<u32, RemoteError> {
        let _state = self.online()?;
        Ok(6)
    }

    fn list_decks(&self) -> Result<BTreeSet<String>, RemoteError> {
        Ok(self.online()?.decks.clone())
    }

    fn create_deck(&self, name: &str) -> Result<(), RemoteError> {
        let mut state = self.online()?;
        state.calls.created_decks += 1;
        state.decks.insert(name.to_string());
        Ok(())
    }

    fn list_models(&self) -> Result<BTreeSet<String>, RemoteError> {
        Ok(self.online()?.models.keys().cloned().collect())
    }

    fn create_model(&self, model: &ModelSpec) -> Result<(), RemoteError> {
        let mut state = self.online()?;
        if state.models.contains_key(&model.name) {
            return Err(RemoteError::Unclassified(
                "Model name already exists".to_string(),
            ));
        }
        state.calls.created_models += 1;
        state.models.insert(model.name.clone(), model.clone());
        Ok(())
    }

    fn find_note(&self, deck: &str, external_id: &str) -> Result<NoteLookup, RemoteError> {
        let mut state = self.online()?;
        state.calls.lookups += 1;
        let ids = state
            .notes
            .iter()
            .filter(|(_, note)| {
                note.deck == deck && note.fields.get("id").map(String::as_str) == Some(external_id)
            })
            .map(|(id, _)| *id)
            .collect();
        Ok(NoteLookup::from_ids(ids))
    }

    fn get_field(&self, note: NoteId, field: &str) -> Result<Option<String>, RemoteError> {
        let mut state = self.online()?;
        state.calls.field_reads += 1;
        if state.fail_field_reads {
            return Err(RemoteError::Transport("read timed out".to_string()));
        }
        let stored = state
            .notes
            .get(&note)
            .ok_or_else(|| RemoteError::NotFound(format!("note {note}")))?;
        Ok(stored.fields.get(field).cloned())
    }

    fn create_note(
        &self,
        deck: &str,
        model: &str,
        fields: &NoteFields,
    ) -> Result<NoteId, RemoteError> {
        let mut state = self.online()?;
        if !state.decks.contains(deck) {
            return Err(RemoteError::NotFound(format!("deck was not found: {deck}")));
        }
        if !state.models.contains_key(model) {
            return Err(RemoteError::NotFound(format!("model was not found: {model}")));
        }
        state.calls.created_notes += 1;
        state.next_id += 1;
        let id = NoteId(state.next_id);
        state.notes.insert(
            id,
            StoredNote {
                deck: deck.to_string(),
                model: model.to_string(),
                fields: fields.to_map(),
            },
        );
        Ok(id)
    }

    fn update_note_fields(&self, note: NoteId, fields: &NoteFields) -> Result<(), RemoteError> {
        let mut state = self.online()?;
        state.calls.updated_notes += 1;
        let stored = state
            .notes
            .get_mut(&note)
            .ok_or_else(|| RemoteError::NotFound(format!("note {note}")))?;
        stored.fields.extend(fields.to_map());
        Ok(())
    }

    fn store_media(&self, filename: &str, data: &str) -> Result<String, RemoteError> {
        let mut state = self.online()?;
        state.calls.stored_media.push(filename.to_string());
        state.media.insert(filename.to_string(), data.to_string());
        Ok(filename.to_string())
    }
}
