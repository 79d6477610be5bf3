//! CBZ exporter implementation

use super::{file_name, LoadedCir};
use crate::chapters::{page_file_name, ChapterSpan};
use crate::cir::DATA_FILE;
use crate::comic_info::{ComicInfo, COMIC_INFO_FILE};
use crate::error::{ComiconError, Result};
use crate::media::extension_of;
use crate::progress::Progress;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Exporter for zip-based page archives (CBZ)
///
/// Besides the pages and a `ComicInfo.xml` for other readers, the archive
/// carries the canonical document so it can be imported back losslessly.
pub struct CbzExporter;

impl CbzExporter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CbzExporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Page spans implied by the chapter folders, in reading order
fn spans_of(loaded: &LoadedCir) -> Vec<ChapterSpan> {
    let mut start = 0;
    loaded
        .chapters
        .iter()
        .map(|(chapter, pages)| {
            let span = ChapterSpan {
                chapter: chapter.clone(),
                pages: start..start + pages.len(),
            };
            start += pages.len();
            span
        })
        .collect()
}

impl super::Exporter for CbzExporter {
    fn export(&self, cir: &Path, dest: &Path, progress: Progress<'_>) -> Result<()> {
        if dest.is_dir() {
            return Err(ComiconError::IsADirectory(dest.to_path_buf()));
        }
        let loaded = LoadedCir::load(cir)?;
        let mut comic = loaded.comic.clone();

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut zip = ZipWriter::new(File::create(dest)?);
        let text = FileOptions::default().compression_method(CompressionMethod::Deflated);
        let stored = FileOptions::default().compression_method(CompressionMethod::Stored);

        let info = ComicInfo::from_comic(&comic, &spans_of(&loaded));
        zip.start_file(COMIC_INFO_FILE, text)?;
        zip.write_all(info.to_xml().as_bytes())?;

        if let Some(cover) = loaded.cover(cir) {
            let name = match extension_of(&cover) {
                Some(ext) => format!("cover.{ext}"),
                None => "cover".to_string(),
            };
            zip.start_file(name.as_str(), stored)?;
            zip.write_all(&fs::read(&cover)?)?;
            comic.metadata.cover_path_rel = Some(name);
        }

        zip.start_file(DATA_FILE, text)?;
        zip.write_all(comic.to_json()?.as_bytes())?;

        let mut tracker = progress.start(loaded.page_count());
        for (index, (chapter, pages)) in loaded.chapters.iter().enumerate() {
            let folder = format!("{:05}-{}", index + 1, chapter.slug);
            for (n, page) in pages.iter().enumerate() {
                let ext = extension_of(page).unwrap_or_default();
                let name = format!("{}/{}", folder, page_file_name(n + 1, &ext));
                zip.start_file(name.as_str(), stored)?;
                zip.write_all(&fs::read(page)?)?;
                tracker.item(file_name(page));
            }
        }

        zip.finish()?;
        tracing::debug!(
            "Wrote {} pages of '{}' to {:?}",
            loaded.page_count(),
            comic.title(),
            dest
        );
        Ok(())
    }

    fn format_name(&self) -> &str {
        "CBZ"
    }

    fn file_extension(&self) -> &str {
        "cbz"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chapter, Comic, Metadata};
    use std::path::PathBuf;

    #[test]
    fn test_spans_follow_chapter_sizes() {
        let comic = Comic::new(
            Metadata::new("Spans"),
            vec![Chapter::new("A"), Chapter::new("B")],
        )
        .unwrap();
        let loaded = LoadedCir {
            chapters: vec![
                (
                    Chapter::new("A"),
                    vec![PathBuf::from("A/00001.png"), PathBuf::from("A/00002.png")],
                ),
                (Chapter::new("B"), vec![PathBuf::from("B/00001.png")]),
            ],
            comic,
        };

        let spans = spans_of(&loaded);
        assert_eq!(spans[0].pages, 0..2);
        assert_eq!(spans[1].pages, 2..3);
    }
}
