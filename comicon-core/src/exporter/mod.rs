//! Exporters for turning a CIR folder into output files

mod cbz;
mod cir;
mod epub;
mod mobi;
mod pdf;

pub use cbz::CbzExporter;
pub use cir::CirExporter;
pub use epub::EpubExporter;
pub use mobi::MobiExporter;
pub use pdf::PdfExporter;

use crate::cir::{chapter_pages, read_comic};
use crate::error::Result;
use crate::progress::Progress;
use crate::types::{Chapter, Comic};
use std::path::{Path, PathBuf};

/// Trait for exporting a validated CIR folder to an output format
pub trait Exporter: Send + Sync {
    /// Export the CIR folder `cir` to `dest`
    fn export(&self, cir: &Path, dest: &Path, progress: Progress<'_>) -> Result<()>;

    /// Format name (e.g., "CBZ", "PDF")
    fn format_name(&self) -> &str;

    /// File extension for this format (empty for folders)
    fn file_extension(&self) -> &str;
}

/// A CIR folder loaded for export: the comic and each chapter's page files
#[derive(Debug)]
pub(crate) struct LoadedCir {
    pub comic: Comic,
    pub chapters: Vec<(Chapter, Vec<PathBuf>)>,
}

impl LoadedCir {
    pub fn load(cir: &Path) -> Result<Self> {
        let comic = read_comic(cir)?;
        let chapters = comic
            .chapters()
            .iter()
            .map(|chapter| Ok((chapter.clone(), chapter_pages(cir, &chapter.slug)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { comic, chapters })
    }

    /// Number of pages across every chapter
    pub fn page_count(&self) -> usize {
        self.chapters.iter().map(|(_, pages)| pages.len()).sum()
    }

    /// Absolute path of the cover image, if one is declared
    pub fn cover(&self, cir: &Path) -> Option<PathBuf> {
        self.comic
            .metadata
            .cover_path_rel
            .as_ref()
            .map(|rel| cir.join(rel))
    }
}

/// File name component of a path, as a string
pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
