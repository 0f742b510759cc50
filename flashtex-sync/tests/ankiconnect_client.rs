//! AnkiConnect client against a local `tiny_http` stand-in.

use std::io::Read;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};
use tiny_http::{Header, Response, Server};

use flashtex_core::{fingerprint, NoteFields, NoteId};
use flashtex_sync::{AnkiConnect, ModelSpec, NoteLookup, RemoteError, RemoteStore};

type Requests = Arc<Mutex<Vec<Value>>>;

/// Serves `responses` in order, one per request, recording each request body
/// before replying.
fn serve(responses: Vec<Value>) -> (String, Requests) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}", server.server_addr().to_ip().unwrap());
    let requests: Requests = Arc::default();
    let seen = Arc::clone(&requests);

    thread::spawn(move || {
        for response in responses {
            let mut request = server.recv().unwrap();
            let mut body = String::new();
            request.as_reader().read_to_string(&mut body).unwrap();
            seen.lock().unwrap().push(serde_json::from_str(&body).unwrap());

            let json_type = Header::from_bytes("Content-Type", "application/json").unwrap();
            request
                .respond(Response::from_string(response.to_string()).with_header(json_type))
                .unwrap();
        }
    });

    (endpoint, requests)
}

fn ok(result: Value) -> Value {
    json!({ "result": result, "error": null })
}

fn client(endpoint: &str) -> AnkiConnect {
    AnkiConnect::new(endpoint, 6, Duration::from_secs(5))
}

#[test]
fn requests_carry_action_version_and_params() {
    let (endpoint, requests) = serve(vec![ok(json!(1_650_000_000_000_i64))]);
    client(&endpoint).create_deck("calculus").unwrap();

    let requests = requests.lock().unwrap();
    assert_eq!(
        requests[0],
        json!({ "action": "createDeck", "version": 6, "params": { "deck": "calculus" } })
    );
}

#[test]
fn version_and_deck_listing() {
    let (endpoint, _) = serve(vec![ok(json!(6)), ok(json!(["Default", "calculus"]))]);
    let anki = client(&endpoint);

    assert_eq!(anki.version().unwrap(), 6);
    let decks = anki.list_decks().unwrap();
    assert!(decks.contains("calculus"));
    assert_eq!(decks.len(), 2);
}

#[test]
fn create_model_sends_ordered_fields_and_templates() {
    let (endpoint, requests) = serve(vec![ok(json!({ "id": 1 }))]);
    client(&endpoint)
        .create_model(&ModelSpec::flashcard("texgoanki"))
        .unwrap();

    let requests = requests.lock().unwrap();
    let params = &requests[0]["params"];
    assert_eq!(requests[0]["action"], "createModel");
    assert_eq!(params["modelName"], "texgoanki");
    assert_eq!(params["inOrderFields"], json!(["front", "back", "id", "hash"]));
    assert_eq!(params["cardTemplates"][0]["Front"], "{{front}}");
    assert_eq!(params["cardTemplates"][0]["Back"], "{{back}}");
}

#[test]
fn find_note_classifies_match_counts() {
    let (endpoint, requests) = serve(vec![ok(json!([])), ok(json!([42])), ok(json!([7, 9]))]);
    let anki = client(&endpoint);

    assert_eq!(anki.find_note("calculus", "eq1").unwrap(), NoteLookup::Missing);
    assert_eq!(
        anki.find_note("calculus", "eq1").unwrap(),
        NoteLookup::Found(NoteId(42))
    );
    assert_eq!(
        anki.find_note("calculus", "eq1").unwrap(),
        NoteLookup::Ambiguous(vec![NoteId(7), NoteId(9)])
    );

    let requests = requests.lock().unwrap();
    assert_eq!(requests[0]["action"], "findNotes");
    let query = requests[0]["params"]["query"].as_str().unwrap();
    assert!(query.contains("\"deck:calculus\""), "{query}");
    assert!(query.contains("\"id:eq1\""), "{query}");
}

#[test]
fn get_field_reads_named_field_value() {
    let info = json!([{
        "noteId": 42,
        "fields": {
            "hash": { "value": "abc", "order": 3 },
            "id": { "value": "eq1", "order": 2 }
        }
    }]);
    let (endpoint, _) = serve(vec![ok(info.clone()), ok(info), ok(json!([{}]))]);
    let anki = client(&endpoint);

    assert_eq!(anki.get_field(NoteId(42), "hash").unwrap().as_deref(), Some("abc"));
    assert_eq!(anki.get_field(NoteId(42), "missing").unwrap(), None);
    assert!(matches!(
        anki.get_field(NoteId(42), "hash").unwrap_err(),
        RemoteError::NotFound(_)
    ));
}

#[test]
fn add_and_update_send_all_four_fields() {
    let (endpoint, requests) = serve(vec![ok(json!(1001)), ok(json!(null))]);
    let anki = client(&endpoint);
    let fp = fingerprint("$x^2$", "$y^2$");
    let fields = NoteFields::new("eq1", &fp, "a_front.svg", "a_back.svg");

    let note = anki.create_note("calculus", "texgoanki", &fields).unwrap();
    assert_eq!(note, NoteId(1001));
    anki.update_note_fields(note, &fields).unwrap();

    let requests = requests.lock().unwrap();
    let added = &requests[0]["params"]["note"];
    assert_eq!(added["deckName"], "calculus");
    assert_eq!(added["modelName"], "texgoanki");
    assert_eq!(added["fields"]["hash"], fp.as_str());
    assert_eq!(added["fields"]["front"], "<img src=\"a_front.svg\">");
    assert_eq!(added["options"]["allowDuplicate"], false);

    assert_eq!(requests[1]["action"], "updateNoteFields");
    assert_eq!(requests[1]["params"]["note"]["id"], 1001);
    assert_eq!(requests[1]["params"]["note"]["fields"]["id"], "eq1");
}

#[test]
fn store_media_returns_stored_name() {
    let (endpoint, requests) = serve(vec![ok(json!("h_front.svg")), ok(json!(null))]);
    let anki = client(&endpoint);

    assert_eq!(anki.store_media("h_front.svg", "PHN2Zy8+").unwrap(), "h_front.svg");
    assert_eq!(anki.store_media("h_back.svg", "PHN2Zy8+").unwrap(), "h_back.svg");
    assert_eq!(requests.lock().unwrap()[0]["params"]["data"], "PHN2Zy8+");
}

#[test]
fn envelope_error_wins_over_result() {
    let (endpoint, _) = serve(vec![json!({ "result": 5, "error": "model was not found: x" })]);
    let err = client(&endpoint).version().unwrap_err();
    assert!(matches!(err, RemoteError::NotFound(_)), "got: {err}");
}

#[test]
fn unreachable_endpoint_is_transport_error() {
    // Bind then drop so nothing is listening on the port.
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let anki = AnkiConnect::new(format!("http://127.0.0.1:{port}"), 6, Duration::from_secs(2));

    let err = anki.version().unwrap_err();
    assert!(matches!(err, RemoteError::Transport(_)), "got: {err}");
}
