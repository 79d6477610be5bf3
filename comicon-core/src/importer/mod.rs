//! Importers for turning source files into a CIR folder

mod cbz;
mod cir;
mod epub;
mod pdf;

pub use cbz::CbzImporter;
pub use cir::CirImporter;
pub use epub::EpubImporter;
pub use pdf::PdfImporter;

use crate::chapters::ChapterSpan;
use crate::cir::CirWriter;
use crate::error::Result;
use crate::media::extension_of;
use crate::progress::Progress;
use crate::types::{Comic, FALLBACK_SLUG};
use std::io::{Read, Seek};
use std::path::Path;
use zip::ZipArchive;

/// Trait for importing a source format into a CIR folder
pub trait Importer: Send + Sync {
    /// Import `source` into the CIR folder `dest`, which must be missing or empty
    fn import(&self, source: &Path, dest: &Path, progress: Progress<'_>) -> Result<()>;

    /// Format name (e.g., "CBZ", "PDF")
    fn format_name(&self) -> &str;
}

/// Title used when a source carries no title of its own
pub(crate) fn fallback_title(source: &Path) -> String {
    source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_SLUG.to_string())
}

/// How the entries of a zip-based source map onto a comic
#[derive(Debug)]
pub(crate) struct ZipLayout {
    pub comic: Comic,
    pub spans: Vec<ChapterSpan>,
    /// Page entry names in global reading order
    pub pages: Vec<String>,
    /// Entry holding the cover image, if any
    pub cover_entry: Option<String>,
}

impl ZipLayout {
    /// Copy the pages and cover out of `archive` into a new CIR folder
    pub fn write<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        dest: &Path,
        progress: Progress<'_>,
    ) -> Result<()> {
        let writer = CirWriter::create(dest)?;
        let mut tracker = progress.start(self.pages.len());

        for span in &self.spans {
            for (n, index) in span.pages.clone().enumerate() {
                let name = &self.pages[index];
                let data = read_entry(archive, name)?;
                let ext = extension_of(name).unwrap_or_default();
                writer.write_page(&span.chapter.slug, n + 1, &ext, &data)?;
                tracker.item(name.as_str());
            }
        }

        if let (Some(cover), Some(entry)) = (&self.comic.metadata.cover_path_rel, &self.cover_entry)
        {
            let data = read_entry(archive, entry)?;
            writer.write_cover(cover, &data)?;
        }

        tracing::debug!(
            "Wrote {} pages in {} chapters to {:?}",
            self.pages.len(),
            self.spans.len(),
            dest
        );
        writer.finish(&self.comic)
    }
}

/// Read a whole archive entry
pub(crate) fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>> {
    let mut entry = archive.by_name(name)?;
    let mut data = Vec::new();
    entry.read_to_end(&mut data)?;
    Ok(data)
}
