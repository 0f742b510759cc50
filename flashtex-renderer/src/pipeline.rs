//! Render pipeline: compile → convert → trim → encode, one workspace per side.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use flashtex_core::{ContentFingerprint, RenderArtifact, RenderContext, Side};

use crate::error::{io_err, RenderError};
use crate::toolchain::Toolchain;
use crate::workspace::with_workspace;

/// Renders card sides with a fixed toolchain, context and scratch root.
pub struct RenderPipeline {
    toolchain: Toolchain,
    context: RenderContext,
    scratch_root: PathBuf,
}

impl RenderPipeline {
    pub fn new(toolchain: Toolchain, context: RenderContext, scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            toolchain,
            context,
            scratch_root: scratch_root.into(),
        }
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    pub fn scratch_root(&self) -> &Path {
        &self.scratch_root
    }

    /// Render both sides of a card, front first.
    ///
    /// Artifacts are named `<fingerprint>_front.svg` / `<fingerprint>_back.svg`.
    /// A failure on the front skips the back entirely.
    pub fn render(
        &self,
        front: &str,
        back: &str,
        fingerprint: &ContentFingerprint,
    ) -> Result<(RenderArtifact, RenderArtifact), RenderError> {
        let front = self.render_artifact(Side::Front, front, fingerprint)?;
        let back = self.render_artifact(Side::Back, back, fingerprint)?;
        Ok((front, back))
    }

    fn render_artifact(
        &self,
        side: Side,
        source: &str,
        fingerprint: &ContentFingerprint,
    ) -> Result<RenderArtifact, RenderError> {
        let data = self.render_side(source)?;
        Ok(RenderArtifact {
            side,
            filename: fingerprint.media_filename(side),
            data,
        })
    }

    /// Render one snippet to a base64-encoded SVG in its own workspace.
    pub fn render_side(&self, source: &str) -> Result<String, RenderError> {
        with_workspace(&self.context, &self.scratch_root, source, |workspace| {
            self.toolchain.compiler.compile(workspace)?;
            let document = workspace.document_path();
            if !document.is_file() {
                return Err(RenderError::CompileFailure {
                    expected: document.to_path_buf(),
                });
            }

            let image = workspace.image_path();
            self.toolchain.converter.convert(document, &image)?;
            if !image.is_file() {
                return Err(RenderError::ConversionFailure {
                    expected: image,
                    reason: "converter produced no image".to_string(),
                });
            }

            if let Err(err) = self.toolchain.trimmer.trim(&image) {
                tracing::warn!(error = %err, "trim failed; keeping untrimmed image");
            }

            let bytes = std::fs::read(&image).map_err(|e| io_err(&image, e))?;
            Ok(BASE64.encode(bytes))
        })
    }
}
