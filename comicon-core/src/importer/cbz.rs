//! CBZ importer implementation

use super::{fallback_title, read_entry, ZipLayout};
use crate::chapters::{reconstruct, without_empty, ChapterHint, ChapterSpan};
use crate::cir::DATA_FILE;
use crate::comic_info::{ComicInfo, COMIC_INFO_FILE};
use crate::error::{FormatError, Result};
use crate::media::{extension_of, is_accepted_image};
use crate::progress::Progress;
use crate::types::{Chapter, Comic, Metadata};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use zip::ZipArchive;

/// Importer for zip-based page archives (CBZ)
///
/// Archives written by this crate carry `comicon.json` and name their page
/// folders `{NNNNN}-{slug}`, which restores the exact chapter layout. Any
/// other archive is read as a flat list of pages, split by the bookmarks of
/// its `ComicInfo.xml` if there is one.
pub struct CbzImporter;

impl CbzImporter {
    pub fn new() -> Self {
        Self
    }

    /// Lay out a comic produced by this crate from its canonical document
    fn canonical_layout(
        comic: Comic,
        info: Option<&ComicInfo>,
        images: &[String],
        source: &Path,
    ) -> Result<ZipLayout> {
        let mut by_slug: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for name in images {
            if let Some((folder, _)) = name.split_once('/') {
                by_slug
                    .entry(slug_of_folder(folder).to_string())
                    .or_default()
                    .push(name.clone());
            }
        }

        let mut pages = Vec::new();
        let mut spans = Vec::new();
        for chapter in comic.chapters() {
            let chapter_pages = by_slug.remove(&chapter.slug).unwrap_or_default();
            if chapter_pages.is_empty() {
                tracing::warn!("Chapter '{}' has no pages in the archive", chapter.title);
                continue;
            }
            let start = pages.len();
            pages.extend(chapter_pages);
            spans.push(ChapterSpan {
                chapter: chapter.clone(),
                pages: start..pages.len(),
            });
        }
        if pages.is_empty() {
            return Err(FormatError::NoPages(source.to_path_buf()).into());
        }

        let mut metadata = match info {
            Some(info) => info
                .to_metadata(&fallback_title(source))
                .merged_with(&comic.metadata),
            None => comic.metadata.clone(),
        };
        if let Some(cover) = &metadata.cover_path_rel {
            if !images.contains(cover) {
                tracing::warn!("Declared cover {} is missing from the archive", cover);
                metadata.cover_path_rel = None;
            }
        }
        let cover_entry = metadata.cover_path_rel.clone();

        let chapters: Vec<Chapter> = spans.iter().map(|span| span.chapter.clone()).collect();
        Ok(ZipLayout {
            comic: Comic::new(metadata, chapters)?,
            spans,
            pages,
            cover_entry,
        })
    }

    /// Lay out an archive that was not produced by this crate
    fn foreign_layout(
        info: Option<&ComicInfo>,
        images: &[String],
        source: &Path,
    ) -> Result<ZipLayout> {
        let cover_index = images.iter().position(|name| is_cover_name(name));

        let pages: Vec<String> = images
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != cover_index)
            .map(|(_, name)| name.clone())
            .collect();
        if pages.is_empty() {
            return Err(FormatError::NoPages(source.to_path_buf()).into());
        }

        // Bookmarks index every image in the archive, the cover included
        let hints: Vec<ChapterHint> = info
            .map(|info| info.bookmarks.clone())
            .unwrap_or_default()
            .into_iter()
            .map(|hint| match cover_index {
                Some(cover) if cover < hint.start => ChapterHint::new(hint.title, hint.start - 1),
                _ => hint,
            })
            .collect();

        let spans = without_empty(reconstruct(pages.len(), hints));

        let fallback = fallback_title(source);
        let mut metadata = match info {
            Some(info) => info.to_metadata(&fallback),
            None => Metadata::new(fallback),
        };
        let cover_entry = cover_index.map(|i| images[i].clone());
        if let Some(ext) = cover_entry.as_deref().and_then(extension_of) {
            metadata.cover_path_rel = Some(format!("cover.{ext}"));
        }

        let chapters: Vec<Chapter> = spans.iter().map(|span| span.chapter.clone()).collect();
        Ok(ZipLayout {
            comic: Comic::new(metadata, chapters)?,
            spans,
            pages,
            cover_entry,
        })
    }
}

impl Default for CbzImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl super::Importer for CbzImporter {
    fn import(&self, source: &Path, dest: &Path, progress: Progress<'_>) -> Result<()> {
        let file = File::open(source)?;
        let mut archive = ZipArchive::new(file)
            .map_err(|e| FormatError::InvalidArchive(format!("{}: {}", source.display(), e)))?;

        // Scan everything before deciding how to read the archive
        let mut images = Vec::new();
        let mut has_data_file = false;
        let mut info_name = None;
        for i in 0..archive.len() {
            let entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            if name == DATA_FILE {
                has_data_file = true;
            } else if name.eq_ignore_ascii_case(COMIC_INFO_FILE) {
                info_name = Some(name);
            } else if is_accepted_image(&name) {
                images.push(name);
            }
        }
        images.sort();

        let info = match info_name {
            Some(name) => {
                let content = read_entry(&mut archive, &name)?;
                Some(ComicInfo::parse(&String::from_utf8_lossy(&content))?)
            }
            None => None,
        };

        let layout = if has_data_file {
            let data = read_entry(&mut archive, DATA_FILE)?;
            let comic = Comic::from_slice(&data).map_err(|e| {
                FormatError::InvalidArchive(format!("Unreadable {}: {}", DATA_FILE, e))
            })?;
            tracing::debug!("Found canonical document for '{}'", comic.title());
            Self::canonical_layout(comic, info.as_ref(), &images, source)?
        } else {
            Self::foreign_layout(info.as_ref(), &images, source)?
        };

        layout.write(&mut archive, dest, progress)
    }

    fn format_name(&self) -> &str {
        "CBZ"
    }
}

/// Page folders are named `{NNNNN}-{slug}`; drop the ordering prefix
fn slug_of_folder(folder: &str) -> &str {
    folder.split_once('-').map(|(_, slug)| slug).unwrap_or(folder)
}

/// Heuristic for archives without a canonical document
fn is_cover_name(name: &str) -> bool {
    Path::new(name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_lowercase().contains("cover"))
        .unwrap_or(false)
}
