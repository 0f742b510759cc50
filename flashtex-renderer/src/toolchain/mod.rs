//! External toolchain capabilities.
//!
//! The pipeline only talks to the three traits below. [`subprocess`] backs
//! them with real programs; [`fake`] backs them with deterministic
//! in-process code for tests.

use std::path::Path;

use crate::error::RenderError;
use crate::workspace::Workspace;

mod exec;
#[cfg(any(test, feature = "fake"))]
pub mod fake;
pub mod subprocess;

pub use exec::run_with_timeout;

/// Compiles the workspace's main entry into a document.
///
/// Implementations may report success even when the document is missing;
/// the pipeline checks [`Workspace::document_path`] afterwards.
pub trait Compiler: Send + Sync {
    fn compile(&self, workspace: &Workspace) -> Result<(), RenderError>;
}

/// Converts a compiled document into a vector image.
pub trait Converter: Send + Sync {
    fn convert(&self, document: &Path, image: &Path) -> Result<(), RenderError>;
}

/// Shrinks an image's canvas to its visible content, in place.
pub trait Trimmer: Send + Sync {
    fn trim(&self, image: &Path) -> Result<(), RenderError>;
}

/// The three capabilities a render needs.
pub struct Toolchain {
    pub compiler: Box<dyn Compiler>,
    pub converter: Box<dyn Converter>,
    pub trimmer: Box<dyn Trimmer>,
}

impl Toolchain {
    pub fn new(
        compiler: impl Compiler + 'static,
        converter: impl Converter + 'static,
        trimmer: impl Trimmer + 'static,
    ) -> Self {
        Self {
            compiler: Box::new(compiler),
            converter: Box::new(converter),
            trimmer: Box::new(trimmer),
        }
    }
}
