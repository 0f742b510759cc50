//! AnkiConnect client: JSON over HTTP [`RemoteStore`].
//!
//! Every call posts `{"action", "version", "params"}` to the endpoint and
//! receives `{"result", "error"}`. A non-null `error` wins over `result`.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use flashtex_core::{Config, NoteFields, NoteId};

use crate::error::RemoteError;
use crate::remote::{ModelSpec, NoteLookup, RemoteStore};

/// Client for one AnkiConnect endpoint. Holds no global state.
pub struct AnkiConnect {
    endpoint: String,
    version: u32,
    agent: ureq::Agent,
}

#[derive(Debug, Deserialize)]
struct Envelope<R> {
    result: Option<R>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct NoteInfo {
    #[serde(rename = "noteId")]
    note_id: Option<i64>,
    #[serde(default)]
    fields: HashMap<String, FieldInfo>,
}

#[derive(Debug, Deserialize)]
struct FieldInfo {
    value: String,
}

impl AnkiConnect {
    pub fn new(endpoint: impl Into<String>, version: u32, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            endpoint: endpoint.into(),
            version,
            agent,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.endpoint.clone(),
            config.api_version,
            config.request_timeout(),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Perform one action. `Ok(None)` means the store answered `null`.
    fn invoke<R: DeserializeOwned>(
        &self,
        action: &str,
        params: Option<Value>,
    ) -> Result<Option<R>, RemoteError> {
        let body = request_body(action, self.version, params);
        tracing::debug!(action, endpoint = %self.endpoint, "remote call");
        let response = match self.agent.post(&self.endpoint).send_json(body) {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => {
                return Err(RemoteError::Transport(format!(
                    "{action}: unexpected HTTP status {code}"
                )))
            }
            Err(ureq::Error::Transport(err)) => {
                return Err(RemoteError::Transport(format!("{action}: {err}")))
            }
        };
        let value: Value = response.into_json().map_err(|err| {
            RemoteError::Transport(format!("{action}: unreadable response body: {err}"))
        })?;
        decode_envelope(action, value)
    }

    /// Like [`Self::invoke`] but a `null` result is an error.
    fn invoke_required<R: DeserializeOwned>(
        &self,
        action: &str,
        params: Option<Value>,
    ) -> Result<R, RemoteError> {
        self.invoke(action, params)?
            .ok_or_else(|| RemoteError::Unclassified(format!("{action}: empty result")))
    }
}

impl RemoteStore for AnkiConnect {
    fn version(&self) -> Result<u32, RemoteError> {
        self.invoke_required("version", None)
    }

    fn list_decks(&self) -> Result<BTreeSet<String>, RemoteError> {
        let names: Vec<String> = self.invoke_required("deckNames", None)?;
        Ok(names.into_iter().collect())
    }

    fn create_deck(&self, name: &str) -> Result<(), RemoteError> {
        self.invoke_required::<i64>("createDeck", Some(json!({ "deck": name })))?;
        Ok(())
    }

    fn list_models(&self) -> Result<BTreeSet<String>, RemoteError> {
        let names: Vec<String> = self.invoke_required("modelNames", None)?;
        Ok(names.into_iter().collect())
    }

    fn create_model(&self, model: &ModelSpec) -> Result<(), RemoteError> {
        let params = json!({
            "modelName": model.name,
            "inOrderFields": model.fields,
            "isCloze": false,
            "cardTemplates": model.templates,
        });
        self.invoke::<Value>("createModel", Some(params))?;
        Ok(())
    }

    fn find_note(&self, deck: &str, external_id: &str) -> Result<NoteLookup, RemoteError> {
        let params = json!({ "query": note_query(deck, external_id) });
        let ids: Vec<i64> = self.invoke("findNotes", Some(params))?.unwrap_or_default();
        Ok(NoteLookup::from_ids(ids.into_iter().map(NoteId).collect()))
    }

    fn get_field(&self, note: NoteId, field: &str) -> Result<Option<String>, RemoteError> {
        let infos: Vec<NoteInfo> =
            self.invoke_required("notesInfo", Some(json!({ "notes": [note.0] })))?;
        let info = match infos.as_slice() {
            [info] if info.note_id.is_some() => info,
            [_] | [] => return Err(RemoteError::NotFound(format!("note {note}"))),
            many => return Err(RemoteError::Ambiguous { count: many.len() }),
        };
        Ok(info.fields.get(field).map(|f| f.value.clone()))
    }

    fn create_note(
        &self,
        deck: &str,
        model: &str,
        fields: &NoteFields,
    ) -> Result<NoteId, RemoteError> {
        let params = json!({
            "note": {
                "deckName": deck,
                "modelName": model,
                "fields": fields.to_map(),
                "options": { "allowDuplicate": false },
            }
        });
        self.invoke_required::<i64>("addNote", Some(params))
            .map(NoteId)
    }

    fn update_note_fields(&self, note: NoteId, fields: &NoteFields) -> Result<(), RemoteError> {
        let params = json!({
            "note": {
                "id": note.0,
                "fields": fields.to_map(),
            }
        });
        self.invoke::<Value>("updateNoteFields", Some(params))?;
        Ok(())
    }

    fn store_media(&self, filename: &str, data: &str) -> Result<String, RemoteError> {
        let params = json!({ "filename": filename, "data": data });
        let stored: Option<String> = self.invoke("storeMediaFile", Some(params))?;
        Ok(stored.unwrap_or_else(|| filename.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Wire helpers
// ---------------------------------------------------------------------------

fn request_body(action: &str, version: u32, params: Option<Value>) -> Value {
    let mut body = json!({ "action": action, "version": version });
    if let Some(params) = params {
        body["params"] = params;
    }
    body
}

fn decode_envelope<R: DeserializeOwned>(action: &str, value: Value) -> Result<Option<R>, RemoteError> {
    let envelope: Envelope<R> = serde_json::from_value(value).map_err(|err| {
        RemoteError::Transport(format!("{action}: malformed response envelope: {err}"))
    })?;
    match envelope.error {
        None | Some(Value::Null) => Ok(envelope.result),
        Some(Value::String(message)) => Err(RemoteError::classify(message)),
        Some(other) => Err(RemoteError::Unclassified(other.to_string())),
    }
}

/// Search query for notes in exactly `deck` (subdecks excluded) whose `id`
/// field is `external_id`.
pub fn note_query(deck: &str, external_id: &str) -> String {
    let deck = escape_search(deck);
    format!(
        "\"deck:{deck}\" -\"deck:{deck}::*\" \"id:{}\"",
        escape_search(external_id)
    )
}

/// Escape characters Anki's search syntax treats specially inside quotes.
fn escape_search(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '"' | '*' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_omits_missing_params() {
        let body = request_body("deckNames", 6, None);
        assert_eq!(body, json!({ "action": "deckNames", "version": 6 }));

        let body = request_body("createDeck", 6, Some(json!({ "deck": "math" })));
        assert_eq!(body["params"]["deck"], "math");
    }

    #[test]
    fn envelope_result_is_returned_when_error_is_null() {
        let names: Option<Vec<String>> =
            decode_envelope("deckNames", json!({ "result": ["a", "b"], "error": null })).unwrap();
        assert_eq!(names, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn envelope_null_result_is_none() {
        let unit: Option<Value> =
            decode_envelope("updateNoteFields", json!({ "result": null, "error": null })).unwrap();
        assert!(unit.is_none());
    }

    #[test]
    fn envelope_string_error_is_classified() {
        let err = decode_envelope::<Vec<i64>>(
            "findNotes",
            json!({ "result": null, "error": "deck was not found" }),
        )
        .unwrap_err();
        assert!(matches!(err, RemoteError::NotFound(_)), "got: {err}");
    }

    #[test]
    fn envelope_non_string_error_is_unclassified() {
        let err = decode_envelope::<Vec<i64>>("findNotes", json!({ "result": null, "error": 3 }))
            .unwrap_err();
        assert_eq!(err, RemoteError::Unclassified("3".to_string()));
    }

    #[test]
    fn envelope_wrong_result_type_is_transport_error() {
        let err = decode_envelope::<Vec<i64>>("findNotes", json!({ "result": "nope", "error": null }))
            .unwrap_err();
        assert!(matches!(err, RemoteError::Transport(_)), "got: {err}");
    }

    #[test]
    fn note_query_quotes_and_escapes() {
        assert_eq!(
            note_query("Linear Algebra", "eq_1"),
            r#""deck:Linear Algebra" -"deck:Linear Algebra::*" "id:eq\_1""#
        );
        assert_eq!(escape_search(r#"a"b*c\"#), r#"a\"b\*c\\"#);
    }
}
