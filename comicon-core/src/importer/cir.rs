//! CIR importer: the source already is a CIR folder

use crate::cir::{copy_tree, same_folder};
use crate::error::Result;
use crate::progress::Progress;
use std::path::Path;

/// Importer that copies an existing CIR folder
pub struct CirImporter;

impl CirImporter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CirImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl super::Importer for CirImporter {
    fn import(&self, source: &Path, dest: &Path, progress: Progress<'_>) -> Result<()> {
        if same_folder(source, dest) {
            tracing::debug!("CIR import source and destination are both {:?}", source);
            progress.start(0);
            return Ok(());
        }
        copy_tree(source, dest, progress)
    }

    fn format_name(&self) -> &str {
        "CIR"
    }
}
