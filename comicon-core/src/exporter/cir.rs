//! CIR exporter: write the CIR folder itself

use crate::cir::{copy_tree, same_folder};
use crate::error::Result;
use crate::progress::Progress;
use std::path::Path;

/// Exporter that copies the CIR folder to a new location
pub struct CirExporter;

impl CirExporter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CirExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl super::Exporter for CirExporter {
    fn export(&self, cir: &Path, dest: &Path, progress: Progress<'_>) -> Result<()> {
        if same_folder(cir, dest) {
            tracing::debug!("CIR export source and destination are both {:?}", cir);
            progress.start(0);
            return Ok(());
        }
        copy_tree(cir, dest, progress)
    }

    fn format_name(&self) -> &str {
        "CIR"
    }

    fn file_extension(&self) -> &str {
        ""
    }
}
