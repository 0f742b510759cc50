//! Error types for flashtex-sync.

use thiserror::Error;

use flashtex_renderer::RenderError;

/// Normalized failure of a single remote store call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The store reported that a deck, model or note does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A lookup that must match at most once matched several entries.
    #[error("ambiguous match: {count} entries")]
    Ambiguous { count: usize },

    /// The store could not be reached or answered with something unreadable.
    #[error("transport error: {0}")]
    Transport(String),

    /// Any other error message carried in the response envelope.
    #[error("remote store error: {0}")]
    Unclassified(String),
}

impl RemoteError {
    /// Map an envelope error message onto a variant.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.to_ascii_lowercase().contains("not found") {
            RemoteError::NotFound(message)
        } else {
            RemoteError::Unclassified(message)
        }
    }
}

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Reaching the store or preparing the deck/model failed.
    #[error("setup failed while trying to {step}: {source}")]
    Setup {
        step: &'static str,
        #[source]
        source: RemoteError,
    },

    /// A scratch workspace could not be removed; the scratch root is unreliable.
    #[error("aborting run: {0}")]
    WorkspaceCleanup(#[source] RenderError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_detects_not_found_case_insensitively() {
        assert!(matches!(
            RemoteError::classify("model was not found: texgoanki"),
            RemoteError::NotFound(_)
        ));
        assert!(matches!(
            RemoteError::classify("Deck Not Found"),
            RemoteError::NotFound(_)
        ));
    }

    #[test]
    fn classify_keeps_other_messages_unclassified() {
        let err = RemoteError::classify("cannot create note because it is a duplicate");
        assert_eq!(
            err,
            RemoteError::Unclassified("cannot create note because it is a duplicate".to_string())
        );
    }

    #[test]
    fn setup_error_names_the_step() {
        let err = SyncError::Setup {
            step: "list decks",
            source: RemoteError::Transport("connection refused".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("list decks"), "got: {msg}");
        assert!(msg.contains("connection refused"), "got: {msg}");
    }
}
