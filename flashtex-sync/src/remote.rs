//! Remote store capability consumed by the reconciler.

use std::collections::BTreeSet;

use serde::Serialize;

use flashtex_core::{NoteFields, NoteId};

use crate::error::RemoteError;

/// Result of looking up `(deck, external id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteLookup {
    Missing,
    Found(NoteId),
    /// More than one note matched. Never resolved by picking one.
    Ambiguous(Vec<NoteId>),
}

impl NoteLookup {
    pub fn from_ids(mut ids: Vec<NoteId>) -> Self {
        ids.sort();
        ids.dedup();
        match ids.len() {
            0 => NoteLookup::Missing,
            1 => NoteLookup::Found(ids[0]),
            _ => NoteLookup::Ambiguous(ids),
        }
    }
}

/// One card template of a note model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardTemplate {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Front")]
    pub front: String,
    #[serde(rename = "Back")]
    pub back: String,
}

/// A note model: ordered field names plus card templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub fields: Vec<String>,
    pub templates: Vec<CardTemplate>,
}

impl ModelSpec {
    /// The model every flashtex note uses: `front, back, id, hash` and a
    /// single front/back template.
    pub fn flashcard(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: NoteFields::NAMES.iter().map(|f| (*f).to_string()).collect(),
            templates: vec![CardTemplate {
                name: name.to_string(),
                front: "{{front}}".to_string(),
                back: "{{back}}".to_string(),
            }],
        }
    }
}

/// Deck, model, note and media operations of a flashcard store.
///
/// Implementations classify every failure into [`RemoteError`].
pub trait RemoteStore {
    /// Protocol version; doubles as the reachability check.
    fn version(&self) -> Result<u32, RemoteError>;

    fn list_decks(&self) -> Result<BTreeSet<String>, RemoteError>;
    fn create_deck(&self, name: &str) -> Result<(), RemoteError>;

    fn list_models(&self) -> Result<BTreeSet<String>, RemoteError>;
    fn create_model(&self, model: &ModelSpec) -> Result<(), RemoteError>;

    /// Notes in exactly `deck` whose `id` field equals `external_id`.
    fn find_note(&self, deck: &str, external_id: &str) -> Result<NoteLookup, RemoteError>;

    /// Value of one field; `Ok(None)` when the note has no such field.
    fn get_field(&self, note: NoteId, field: &str) -> Result<Option<String>, RemoteError>;

    fn create_note(
        &self,
        deck: &str,
        model: &str,
        fields: &NoteFields,
    ) -> Result<NoteId, RemoteError>;
    fn update_note_fields(&self, note: NoteId, fields: &NoteFields) -> Result<(), RemoteError>;

    /// Store base64 `data` under `filename`, overwriting any file of that
    /// name. Returns the name the store actually used.
    fn store_media(&self, filename: &str, data: &str) -> Result<String, RemoteError>;
}
