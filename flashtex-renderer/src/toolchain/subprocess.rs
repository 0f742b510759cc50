//! Real toolchain: `latexmk` → `pdf2svg` → `inkscape`.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use flashtex_core::ToolsConfig;

use super::{run_with_timeout, Compiler, Converter, Toolchain, Trimmer};
use crate::error::RenderError;
use crate::workspace::Workspace;

impl Toolchain {
    /// Toolchain backed by the configured programs, each call bounded by `timeout`.
    pub fn subprocess(tools: &ToolsConfig, timeout: Duration) -> Self {
        Toolchain::new(
            Latexmk {
                program: tools.compiler.clone(),
                timeout,
            },
            Pdf2Svg {
                program: tools.converter.clone(),
                timeout,
            },
            InkscapeTrim {
                program: tools.trimmer.clone(),
                timeout,
            },
        )
    }
}

/// Configured programs that cannot be found on `PATH`.
pub fn missing_programs(tools: &ToolsConfig) -> Vec<String> {
    [&tools.compiler, &tools.converter, &tools.trimmer]
        .into_iter()
        .filter(|program| which::which(program.as_str()).is_err())
        .cloned()
        .collect()
}

/// LuaLaTeX through `latexmk`, forced through errors.
#[derive(Debug, Clone)]
pub struct Latexmk {
    pub program: String,
    pub timeout: Duration,
}

impl Compiler for Latexmk {
    fn compile(&self, workspace: &Workspace) -> Result<(), RenderError> {
        let mut command = Command::new(&self.program);
        command
            .args(["-pdf", "-f", "-norc", "-lualatex", "-interaction=batchmode"])
            .arg(format!("-outdir={}", workspace.path().display()))
            .arg("-cd")
            .arg(workspace.main_entry());

        // latexmk exits nonzero on recoverable warnings; the document's
        // presence decides success. A compiler that cannot even start leaves
        // no document either.
        let status = match run_with_timeout(&mut command, &self.program, self.timeout) {
            Ok(status) => status,
            Err(RenderError::Tool { tool, source }) => {
                tracing::debug!(%tool, error = %source, "compiler could not be run");
                return Err(RenderError::CompileFailure {
                    expected: workspace.document_path().to_path_buf(),
                });
            }
            Err(err) => return Err(err),
        };
        if !status.success() {
            tracing::debug!(tool = %self.program, %status, "compiler reported failure");
        }
        Ok(())
    }
}

/// PDF to SVG via `pdf2svg <pdf> <svg>`.
#[derive(Debug, Clone)]
pub struct Pdf2Svg {
    pub program: String,
    pub timeout: Duration,
}

impl Converter for Pdf2Svg {
    fn convert(&self, document: &Path, image: &Path) -> Result<(), RenderError> {
        let mut command = Command::new(&self.program);
        command.arg(document).arg(image);

        let status = run_with_timeout(&mut command, &self.program, self.timeout)?;
        if !status.success() {
            return Err(RenderError::ConversionFailure {
                expected: image.to_path_buf(),
                reason: format!("{} exited with {status}", self.program),
            });
        }
        Ok(())
    }
}

/// Fit the SVG canvas to its drawing with Inkscape actions.
#[derive(Debug, Clone)]
pub struct InkscapeTrim {
    pub program: String,
    pub timeout: Duration,
}

impl Trimmer for InkscapeTrim {
    fn trim(&self, image: &Path) -> Result<(), RenderError> {
        let mut command = Command::new(&self.program);
        command
            .args([
                "--actions",
                "select-all;fit-canvas-to-selection",
                "--export-overwrite",
            ])
            .arg(image);

        let status = run_with_timeout(&mut command, &self.program, self.timeout)?;
        if !status.success() {
            return Err(RenderError::ToolFailed {
                tool: self.program.clone(),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}
