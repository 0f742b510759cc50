//! flashtex core library: domain types, content fingerprints and configuration.
//!
//! Public API surface:
//! - [`types`]: flashcard records, remote references, render inputs/outputs
//! - [`fingerprint`]: deterministic content digest over a card's two sides
//! - [`config`]: optional `~/.flashtex/config.yaml`
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod types;

pub use config::{Config, ToolsConfig};
pub use error::ConfigError;
pub use fingerprint::fingerprint;
pub use types::{
    ContentFingerprint, FlashcardRecord, NoteFields, NoteId, RemoteCardRef, RenderArtifact,
    RenderContext, Side, IMAGE_EXTENSION,
};
