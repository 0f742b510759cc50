//! Record extraction: `<extractor> <source>` prints a JSON array of
//! `{ "id", "front", "back" }`.

use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};

use flashtex_core::FlashcardRecord;

pub fn extract(extractor: &str, source: &Path) -> Result<Vec<FlashcardRecord>> {
    if !source.is_file() {
        bail!("source document {} does not exist", source.display());
    }

    let output = Command::new(extractor)
        .arg(source)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("failed to run extractor '{extractor}'"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "extractor '{extractor}' exited with {}: {}",
            output.status,
            stderr.trim()
        );
    }

    parse_records(&output.stdout)
        .with_context(|| format!("extractor '{extractor}' printed invalid records"))
}

pub fn parse_records(stdout: &[u8]) -> Result<Vec<FlashcardRecord>> {
    let records: Vec<FlashcardRecord> = serde_json::from_slice(stdout)?;
    Ok(records)
}
