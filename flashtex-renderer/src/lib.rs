//! # flashtex-renderer
//!
//! Turns one LaTeX snippet into one base64-encoded SVG.
//!
//! Every render runs inside a fresh [`Workspace`]: a uniquely named scratch
//! directory holding copies of the auxiliary context files and the snippet.
//! The workspace is removed before the render returns, whatever the outcome.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use flashtex_core::{fingerprint, Config, RenderContext};
//! use flashtex_renderer::{RenderPipeline, Toolchain};
//!
//! let config = Config::default();
//! let context = RenderContext::new("/home/me/notes", vec!["preamble.sty".into()], "main.tex");
//! let toolchain = Toolchain::subprocess(&config.tools, Duration::from_secs(60));
//! let pipeline = RenderPipeline::new(toolchain, context, config.scratch_root.clone());
//!
//! let fp = fingerprint("$x^2$", "$y^2$");
//! if let Ok((front, back)) = pipeline.render("$x^2$", "$y^2$", &fp) {
//!     println!("{} / {}", front.filename, back.filename);
//! }
//! ```

pub mod error;
pub mod pipeline;
pub mod toolchain;
pub mod workspace;

pub use error::RenderError;
pub use pipeline::RenderPipeline;
#[cfg(any(test, feature = "fake"))]
pub use toolchain::fake;
pub use toolchain::{Compiler, Converter, Toolchain, Trimmer};
pub use workspace::{context_size, with_workspace, Workspace, CONTEXT_SIZE_CAP};
