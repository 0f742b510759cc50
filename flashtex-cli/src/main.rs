//! flashtex: render LaTeX flashcards to SVG and sync them into Anki.
//!
//! # Usage
//!
//! ```text
//! flashtex <deck> <source> <entry> <root> [context]...
//! ```
//!
//! `<source>` is handed to the configured extractor, which prints the
//! records as JSON. Each card side is written to `<entry>` inside a fresh
//! workspace next to copies of every `[context]` path (relative to `<root>`).

mod extract;
mod summary;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use flashtex_core::{config, Config, RenderContext};
use flashtex_renderer::toolchain::subprocess::missing_programs;
use flashtex_renderer::{RenderPipeline, Toolchain};
use flashtex_sync::{bootstrap, AnkiConnect, ModelSpec, Reconciler};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "flashtex",
    version,
    about = "Render LaTeX flashcards to SVG and sync them into an Anki deck",
    long_about = None,
)]
struct Cli {
    /// Deck to sync into. Created when missing.
    deck: String,

    /// Source document the flashcard records are extracted from.
    source: PathBuf,

    /// File name each card side is written to inside the workspace, e.g. `main.tex`.
    entry: String,

    /// Directory the context paths are resolved against.
    root: PathBuf,

    /// Files or directories copied into every workspace.
    context: Vec<PathBuf>,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = config::load().context("failed to load configuration")?;

    let records = extract::extract(&config.extractor, &cli.source)
        .with_context(|| format!("failed to extract flashcards from {}", cli.source.display()))?;
    tracing::info!(count = records.len(), source = %cli.source.display(), "extracted records");

    preflight(&config);

    let store = AnkiConnect::from_config(&config);
    let model = ModelSpec::flashcard(&config.model_name);
    bootstrap(&store, &cli.deck, &model)
        .with_context(|| format!("unable to prepare deck '{}' at {}", cli.deck, store.endpoint()))?;

    let pipeline = RenderPipeline::new(
        Toolchain::subprocess(&config.tools, config.tool_timeout()),
        RenderContext::new(&cli.root, cli.context, cli.entry),
        &config.scratch_root,
    );
    let report = Reconciler::new(&store, &pipeline, &cli.deck, &config.model_name)
        .run(&records)
        .context("sync aborted")?;

    summary::print(&report);
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Missing tools are reported but do not stop the run; every render fails instead.
fn preflight(config: &Config) {
    let missing = missing_programs(&config.tools);
    if !missing.is_empty() {
        tracing::error!(
            missing = %missing.join(", "),
            "render tools not found on PATH; every record will fail to render"
        );
    }
}
