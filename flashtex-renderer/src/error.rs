//! Error types for flashtex-renderer.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// All errors that can arise from rendering a snippet.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Auxiliary files add up to more than [`crate::CONTEXT_SIZE_CAP`].
    ///
    /// `size` is the total seen when the walk stopped, so it may be lower
    /// than the full tree size.
    #[error("render context too large: at least {size} bytes, cap is {cap} bytes")]
    ContextTooLarge { size: u64, cap: u64 },

    /// An auxiliary path or entry name is absolute or climbs out of its root.
    #[error("context path must be relative and stay inside its root: {path}")]
    InvalidContextPath { path: PathBuf },

    /// The compiler left no document behind.
    #[error("compilation failed: no document at {expected}")]
    CompileFailure { expected: PathBuf },

    /// The converter left no image behind.
    #[error("conversion failed for {expected}: {reason}")]
    ConversionFailure { expected: PathBuf, reason: String },

    /// An external program could not be started or waited on.
    #[error("failed to run {tool}: {source}")]
    Tool {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// An external program exited unsuccessfully where that matters.
    #[error("{tool} exited with {status}")]
    ToolFailed { tool: String, status: String },

    /// An external program outlived its time budget and was killed.
    #[error("{tool} did not finish within {timeout:?} and was killed")]
    ToolTimeout { tool: String, timeout: Duration },

    /// The scratch directory could not be removed. Always fatal.
    #[error("failed to remove workspace {path}: {source}")]
    WorkspaceCleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Filesystem error while preparing or reading a workspace.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RenderError {
    /// Whether the whole run must stop rather than just this record.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RenderError::WorkspaceCleanup { .. })
    }
}

/// Convenience constructor for [`RenderError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io {
        path: path.into(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_cleanup_failure_is_fatal() {
        let cleanup = RenderError::WorkspaceCleanup {
            path: PathBuf::from("/dev/shm/flashtex/x"),
            source: std::io::Error::other("busy"),
        };
        assert!(cleanup.is_fatal());
        assert!(!RenderError::ContextTooLarge { size: 2, cap: 1 }.is_fatal());
        assert!(!RenderError::CompileFailure {
            expected: PathBuf::from("main.pdf")
        }
        .is_fatal());
    }

    #[test]
    fn messages_name_the_offending_path() {
        let err = RenderError::CompileFailure {
            expected: PathBuf::from("/scratch/ws/main.pdf"),
        };
        assert!(err.to_string().contains("/scratch/ws/main.pdf"));
    }
}
