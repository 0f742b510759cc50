//! Domain types shared by the renderer, the reconciler and the CLI.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// File extension of every rendered image.
pub const IMAGE_EXTENSION: &str = "svg";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Hex-encoded SHA-256 digest of a card's content. See [`crate::fingerprint`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentFingerprint(pub String);

impl ContentFingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Storage filename for one side's image: `<fingerprint>_<side>.svg`.
    pub fn media_filename(&self, side: Side) -> String {
        format!("{}{}.{IMAGE_EXTENSION}", self.0, side.suffix())
    }

    /// Whether a value read back from the remote store matches this digest.
    pub fn matches(&self, stored: &str) -> bool {
        self.0 == stored.trim()
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ContentFingerprint {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ContentFingerprint {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Remote store identifier of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub i64);

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for NoteId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// One face of a flashcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Front,
    Back,
}

impl Side {
    /// Both sides in render order.
    pub fn all() -> &'static [Side] {
        &[Side::Front, Side::Back]
    }

    /// Suffix appended to the fingerprint to form the media filename stem.
    pub fn suffix(&self) -> &'static str {
        match self {
            Side::Front => "_front",
            Side::Back => "_back",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Front => write!(f, "front"),
            Side::Back => write!(f, "back"),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// One front/back pair as produced by the external extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardRecord {
    /// Stable identifier chosen by the document author.
    #[serde(rename = "id")]
    pub external_id: String,
    #[serde(rename = "front")]
    pub front_source: String,
    #[serde(rename = "back")]
    pub back_source: String,
}

impl FlashcardRecord {
    pub fn new(
        external_id: impl Into<String>,
        front_source: impl Into<String>,
        back_source: impl Into<String>,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            front_source: front_source.into(),
            back_source: back_source.into(),
        }
    }

    pub fn source(&self, side: Side) -> &str {
        match side {
            Side::Front => &self.front_source,
            Side::Back => &self.back_source,
        }
    }
}

/// An existing note found for `(deck, external id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCardRef {
    pub note_id: NoteId,
    /// `None` when the note carries no fingerprint or it could not be read.
    pub stored_fingerprint: Option<String>,
}

/// Files a compile needs besides the snippet itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderContext {
    /// Directory the auxiliary paths are relative to.
    pub root: PathBuf,
    /// Files or directories copied into every workspace, in order.
    pub auxiliary_paths: Vec<PathBuf>,
    /// Name the snippet is written to inside the workspace, e.g. `main.tex`.
    pub main_entry: String,
}

impl RenderContext {
    pub fn new(
        root: impl Into<PathBuf>,
        auxiliary_paths: Vec<PathBuf>,
        main_entry: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            auxiliary_paths,
            main_entry: main_entry.into(),
        }
    }

    /// Absolute (root-joined) location of every auxiliary path.
    pub fn sources(&self) -> impl Iterator<Item = (&Path, PathBuf)> + '_ {
        self.auxiliary_paths
            .iter()
            .map(|rel| (rel.as_path(), self.root.join(rel)))
    }

    /// File stem of the main entry; the compiled document is `<stem>.pdf`.
    pub fn main_entry_stem(&self) -> String {
        Path::new(&self.main_entry)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.main_entry.clone())
    }
}

/// A rendered, base64-encoded image ready to hand to the media store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderArtifact {
    pub side: Side,
    /// `<fingerprint>_<side>.svg`
    pub filename: String,
    /// Standard base64 of the image bytes.
    pub data: String,
}

/// Field values written to a note. Field names match the note model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteFields {
    pub front: String,
    pub back: String,
    pub id: String,
    pub hash: String,
}

impl NoteFields {
    /// Field names in model order.
    pub const NAMES: [&'static str; 4] = ["front", "back", "id", "hash"];
    /// Name of the field holding the stored fingerprint.
    pub const FINGERPRINT: &'static str = "hash";

    /// Build fields referencing the stored media filenames of both sides.
    pub fn new(
        external_id: &str,
        fingerprint: &ContentFingerprint,
        front_media: &str,
        back_media: &str,
    ) -> Self {
        Self {
            front: image_tag(front_media),
            back: image_tag(back_media),
            id: external_id.to_string(),
            hash: fingerprint.0.clone(),
        }
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        let values = [&self.front, &self.back, &self.id, &self.hash];
        Self::NAMES
            .iter()
            .zip(values)
            .map(|(name, value)| ((*name).to_string(), value.clone()))
            .collect()
    }
}

/// HTML image reference placed in a note field.
pub fn image_tag(filename: &str) -> String {
    format!("<img src=\"{filename}\">")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
