//! Conversions between formats, always through a CIR folder
//!
//! Every conversion imports the source into a scratch CIR, validates it and
//! exports it to the destination. The scratch folder is removed when the
//! conversion ends, whether it succeeded or not.

use crate::cir::{same_folder, validate};
use crate::error::{ComiconError, Result};
use crate::format::Format;
use crate::progress::{Progress, ProgressEvent};
use std::path::Path;

/// Which half of a conversion a progress event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Reading the source into the scratch CIR
    Import,
    /// Writing the scratch CIR to the destination
    Export,
}

/// Import `source` into a new CIR folder at `dest`.
///
/// The source format is detected from its path; `dest` must be missing or
/// empty.
pub fn create_cir(source: &Path, dest: &Path, progress: Progress<'_>) -> Result<()> {
    if !source.exists() {
        return Err(ComiconError::NotFound(source.to_path_buf()));
    }
    let format = Format::from_path(source)?;
    let importer = format.importer()?;

    tracing::debug!("Importing {:?} as {}", source, importer.format_name());
    importer.import(source, dest, progress)
}

/// Validate the CIR folder `cir` and export it to `dest`.
///
/// The output format is detected from the destination path.
pub fn create_comic(cir: &Path, dest: &Path, progress: Progress<'_>) -> Result<()> {
    validate(cir)?;
    let format = Format::from_path(dest)?;
    let exporter = format.exporter();

    tracing::debug!("Exporting {:?} as {}", cir, exporter.format_name());
    exporter.export(cir, dest, progress)
}

/// Convert `source` to `dest`, discarding progress
pub fn convert(source: &Path, dest: &Path) -> Result<()> {
    convert_with_progress(source, dest, &mut |_, _| {})
}

/// Convert `source` to `dest`, reporting progress for both stages to `sink`.
///
/// Converting a CIR folder onto itself only validates it.
pub fn convert_with_progress(
    source: &Path,
    dest: &Path,
    sink: &mut dyn FnMut(Stage, ProgressEvent),
) -> Result<()> {
    if !source.exists() {
        return Err(ComiconError::NotFound(source.to_path_buf()));
    }
    if source.is_dir() && same_folder(source, dest) {
        validate(source)?;
        tracing::info!("{:?} is already a CIR folder; nothing to do", source);
        return Ok(());
    }

    // Fail on an unusable destination before doing any work
    let target = Format::from_path(dest)?;

    let scratch = tempfile::Builder::new().prefix("comicon-").tempdir()?;
    let cir = scratch.path();

    let mut on_import = |event| sink(Stage::Import, event);
    create_cir(source, cir, Progress::new(&mut on_import))?;

    let mut on_export = |event| sink(Stage::Export, event);
    create_comic(cir, dest, Progress::new(&mut on_export))?;

    tracing::info!("Converted {:?} to {} at {:?}", source, target, dest);
    Ok(())
}
