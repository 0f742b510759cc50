//! Deterministic in-process toolchain for tests.
//!
//! The fake compiler "compiles" by copying the snippet into a document
//! behind a fixed header, and the fake converter wraps that document in an
//! SVG. Output therefore depends only on the snippet, never on the machine.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::{Compiler, Converter, Toolchain, Trimmer};
use crate::error::{io_err, RenderError};
use crate::workspace::Workspace;

const DOCUMENT_HEADER: &str = "%PDF-fake\n";

/// Shared record of what the fake toolchain saw.
#[derive(Debug, Clone, Default)]
pub struct FakeLog {
    workspaces: Arc<Mutex<Vec<PathBuf>>>,
    trims: Arc<Mutex<usize>>,
}

impl FakeLog {
    /// Every workspace directory the compiler ran in, in call order.
    pub fn workspaces(&self) -> Vec<PathBuf> {
        self.workspaces.lock().map(|w| w.clone()).unwrap_or_default()
    }

    pub fn compile_count(&self) -> usize {
        self.workspaces().len()
    }

    pub fn trim_count(&self) -> usize {
        self.trims.lock().map(|t| *t).unwrap_or_default()
    }
}

/// Writes `<stem>.pdf` unless the snippet contains the failure marker.
#[derive(Debug, Clone, Default)]
pub struct FakeCompiler {
    log: FakeLog,
    fail_marker: Option<String>,
}

impl FakeCompiler {
    pub fn new(log: &FakeLog) -> Self {
        Self {
            log: log.clone(),
            fail_marker: None,
        }
    }

    /// Produce no document for snippets containing `marker`.
    pub fn failing_on(mut self, marker: impl Into<String>) -> Self {
        self.fail_marker = Some(marker.into());
        self
    }
}

impl Compiler for FakeCompiler {
    fn compile(&self, workspace: &Workspace) -> Result<(), RenderError> {
        if let Ok(mut seen) = self.log.workspaces.lock() {
            seen.push(workspace.path().to_path_buf());
        }
        let source = std::fs::read_to_string(workspace.main_entry())
            .map_err(|e| io_err(workspace.main_entry(), e))?;
        if let Some(marker) = &self.fail_marker {
            if source.contains(marker.as_str()) {
                return Ok(());
            }
        }
        let document = workspace.document_path();
        std::fs::write(document, format!("{DOCUMENT_HEADER}{source}"))
            .map_err(|e| io_err(document, e))
    }
}

/// Wraps the document body in an SVG, or writes nothing when failing.
#[derive(Debug, Clone, Default)]
pub struct FakeConverter {
    fail: bool,
}

impl FakeConverter {
    pub fn failing() -> Self {
        Self { fail: true }
    }
}

impl Converter for FakeConverter {
    fn convert(&self, document: &Path, image: &Path) -> Result<(), RenderError> {
        if self.fail {
            return Ok(());
        }
        let content = std::fs::read_to_string(document).map_err(|e| io_err(document, e))?;
        let body = content.strip_prefix(DOCUMENT_HEADER).unwrap_or(&content);
        std::fs::write(image, expected_svg(body)).map_err(|e| io_err(image, e))
    }
}

/// Counts calls; optionally fails every one of them.
#[derive(Debug, Clone, Default)]
pub struct FakeTrimmer {
    log: FakeLog,
    fail: bool,
}

impl FakeTrimmer {
    pub fn new(log: &FakeLog) -> Self {
        Self {
            log: log.clone(),
            fail: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl Trimmer for FakeTrimmer {
    fn trim(&self, _image: &Path) -> Result<(), RenderError> {
        if let Ok(mut trims) = self.log.trims.lock() {
            *trims += 1;
        }
        if self.fail {
            return Err(RenderError::ToolFailed {
                tool: "fake-trim".to_string(),
                status: "exit status: 1".to_string(),
            });
        }
        Ok(())
    }
}

/// The SVG the fake toolchain produces for `source`.
pub fn expected_svg(source: &str) -> String {
    format!("<svg xmlns=\"http://www.w3.org/2000/svg\"><desc>{source}</desc></svg>")
}

impl Toolchain {
    /// A fake toolchain that succeeds at every step.
    pub fn fake(log: &FakeLog) -> Self {
        Toolchain::new(
            FakeCompiler::new(log),
            FakeConverter::default(),
            FakeTrimmer::new(log),
        )
    }
}
