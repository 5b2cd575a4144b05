//! `vibecode instrument`: show what the preview frame actually mounts.

use anyhow::{Context, Result};
use std::path::Path;

pub fn cmd_instrument(file: &Path, out: Option<&Path>) -> Result<()> {
    let html = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let mounted = vibecode::sandbox::instrument(&html);

    match out {
        Some(path) => std::fs::write(path, mounted)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => print!("{}", mounted),
    }
    Ok(())
}
