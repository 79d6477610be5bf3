//! CLI command implementations

mod batch;
mod convert;
mod info;
mod validate;

pub use batch::batch;
pub use convert::convert;
pub use info::info;
pub use validate::validate;

use anyhow::{Context, Result};
use comicon_core::cir::read_comic;
use comicon_core::progress::silently;
use comicon_core::{create_cir, Comic};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A comic loaded as a CIR folder, either in place or imported into scratch space
pub(crate) struct Loaded {
    pub comic: Comic,
    pub cir: PathBuf,
    _scratch: Option<TempDir>,
}

/// Read a CIR folder directly, or import any other source into a scratch CIR
pub(crate) fn load(input: &Path) -> Result<Loaded> {
    if input.is_dir() {
        let comic = read_comic(input)
            .with_context(|| format!("Failed to read CIR folder {}", input.display()))?;
        return Ok(Loaded {
            comic,
            cir: input.to_path_buf(),
            _scratch: None,
        });
    }

    let scratch = TempDir::new().context("Failed to create scratch directory")?;
    silently(|progress| create_cir(input, scratch.path(), progress))
        .with_context(|| format!("Failed to import {}", input.display()))?;
    let comic = read_comic(scratch.path())
        .with_context(|| format!("Imported {} has no readable comic", input.display()))?;

    Ok(Loaded {
        comic,
        cir: scratch.path().to_path_buf(),
        _scratch: Some(scratch),
    })
}
