//! EPUB importer implementation

mod package;

use super::{fallback_title, read_entry, ZipLayout};
use crate::chapters::{reconstruct, without_empty, ChapterHint, ChapterSpan};
use crate::cir::DATA_FILE;
use crate::epub::{chapter_folder, IMAGE_DIR, STATIC_DIR};
use crate::error::{FormatError, Result};
use crate::media::{extension_of, is_accepted_image};
use crate::progress::Progress;
use crate::types::{Chapter, Comic, Metadata};
use package::{
    decode_path, parse_container, parse_nav, parse_ncx, parse_opf, resolve_href, resolve_path,
    strip_bom, Package, TocEntry, CONTAINER_PATH,
};
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use std::sync::LazyLock;
use zip::ZipArchive;

/// Matches `<img src="...">` and SVG `<image href="...">` / `xlink:href`
static IMAGE_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<(?:img\b[^>]*?\bsrc|image\b[^>]*?\bhref)\s*=\s*["']([^"']+)["']"#).unwrap()
});

/// Importer for EPUB packages
///
/// Packages written by this crate carry `static/comicon.json` and keep
/// each chapter's pages under `img/{NNNNN}-{slug}/`. Any other package is
/// read in spine order, one page per referenced image, with chapters taken
/// from the table of contents.
pub struct EpubImporter;

/// The package document of an opened EPUB and where it lives
struct OpenedPackage {
    opf_path: String,
    package: Package,
}

impl OpenedPackage {
    fn open<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Self> {
        let container = read_entry(archive, CONTAINER_PATH)
            .map_err(|e| FormatError::InvalidPackage(format!("{}: {}", CONTAINER_PATH, e)))?;
        let opf_path = parse_container(&String::from_utf8_lossy(strip_bom(&container)))?;

        let opf = read_entry(archive, &opf_path)
            .map_err(|e| FormatError::InvalidPackage(format!("{}: {}", opf_path, e)))?;
        let package = parse_opf(&String::from_utf8_lossy(strip_bom(&opf)))?;

        Ok(Self { opf_path, package })
    }

    /// Zip entry path of a manifest href
    fn entry(&self, href: &str) -> String {
        resolve_path(&self.opf_path, href)
    }

    /// Metadata from the package document
    fn metadata(&self, fallback: &str) -> Metadata {
        let package = &self.package;
        let mut metadata = Metadata::new(package.title.as_deref().unwrap_or(fallback));
        metadata.authors = package.creators.clone();
        metadata.description = package.description.clone();
        metadata.genres = package.subjects.clone();
        metadata
    }

    /// Table of contents, from the NCX or else the EPUB 3 nav document.
    /// Hrefs are resolved to zip entry paths.
    fn toc<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Vec<TocEntry> {
        if let Some(href) = self.package.ncx_href() {
            let path = self.entry(href);
            match read_entry(archive, &path).map(|data| {
                parse_ncx(&String::from_utf8_lossy(strip_bom(&data)))
            }) {
                Ok(Ok(entries)) if !entries.is_empty() => {
                    return resolve_toc(&path, entries);
                }
                Ok(Err(e)) => tracing::warn!("Ignoring unreadable NCX {}: {}", path, e),
                Err(e) => tracing::warn!("Ignoring missing NCX {}: {}", path, e),
                Ok(Ok(_)) => {}
            }
        }

        if let Some(href) = self.package.nav_href() {
            let path = self.entry(href);
            if let Ok(data) = read_entry(archive, &path) {
                return resolve_toc(&path, parse_nav(&String::from_utf8_lossy(strip_bom(&data))));
            }
        }

        Vec::new()
    }
}

fn resolve_toc(base: &str, entries: Vec<TocEntry>) -> Vec<TocEntry> {
    entries
        .into_iter()
        .map(|entry| TocEntry {
            href: resolve_href(base, &entry.href),
            title: entry.title,
        })
        .collect()
}

impl EpubImporter {
    pub fn new() -> Self {
        Self
    }

    /// Lay out a package produced by this crate from its canonical document
    fn canonical_layout(
        opened: &OpenedPackage,
        comic: Comic,
        source: &Path,
    ) -> Result<ZipLayout> {
        let image_prefix = format!("{}/", IMAGE_DIR);
        let mut by_folder: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
        for item in opened.package.manifest.values() {
            let href = decode_path(&item.href);
            if let Some((folder, name)) = href
                .strip_prefix(&image_prefix)
                .and_then(|rest| rest.split_once('/'))
            {
                by_folder
                    .entry(folder.to_string())
                    .or_default()
                    .push((name.to_string(), opened.entry(&item.href)));
            }
        }

        let mut pages = Vec::new();
        let mut spans = Vec::new();
        for (index, chapter) in comic.chapters().iter().enumerate() {
            let mut chapter_pages = by_folder
                .remove(&chapter_folder(index, &chapter.slug))
                .unwrap_or_default();
            if chapter_pages.is_empty() {
                tracing::warn!("Chapter '{}' has no pages in the package", chapter.title);
                continue;
            }
            chapter_pages.sort();
            let start = pages.len();
            pages.extend(chapter_pages.into_iter().map(|(_, entry)| entry));
            spans.push(ChapterSpan {
                chapter: chapter.clone(),
                pages: start..pages.len(),
            });
        }
        if pages.is_empty() {
            return Err(FormatError::NoPages(source.to_path_buf()).into());
        }

        let mut metadata = opened
            .metadata(&fallback_title(source))
            .merged_with(&comic.metadata);
        let cover_entry = opened.package.cover_href().map(|href| opened.entry(href));
        if metadata.cover_path_rel.is_some() && cover_entry.is_none() {
            tracing::warn!("Declared cover is missing from the package");
            metadata.cover_path_rel = None;
        }

        let chapters: Vec<Chapter> = spans.iter().map(|span| span.chapter.clone()).collect();
        Ok(ZipLayout {
            comic: Comic::new(metadata, chapters)?,
            spans,
            pages,
            cover_entry,
        })
    }

    /// Lay out a package that was not produced by this crate
    fn foreign_layout<R: Read + Seek>(
        opened: &OpenedPackage,
        archive: &mut ZipArchive<R>,
        source: &Path,
    ) -> Result<ZipLayout> {
        let entries: HashSet<String> = archive.file_names().map(str::to_string).collect();

        let mut pages: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        // Spine document -> index of the first page at or after it
        let mut positions: HashMap<String, usize> = HashMap::new();

        let spine: Vec<(String, bool)> = opened
            .package
            .spine_items()
            .map(|item| (opened.entry(&item.href), item.is_image()))
            .collect();

        for (path, is_image) in spine {
            positions.entry(path.clone()).or_insert(pages.len());

            let refs = if is_image {
                vec![path.clone()]
            } else {
                let data = match read_entry(archive, &path) {
                    Ok(data) => data,
                    Err(e) => {
                        tracing::warn!("Skipping unreadable spine document {}: {}", path, e);
                        continue;
                    }
                };
                image_refs(&String::from_utf8_lossy(&data))
                    .into_iter()
                    .map(|href| resolve_href(&path, &href))
                    .collect()
            };

            for image in refs {
                if !entries.contains(&image) {
                    tracing::warn!("Page image {} is missing from the package", image);
                } else if !is_accepted_image(&image) {
                    tracing::warn!("Skipping unsupported page image {}", image);
                } else if seen.insert(image.clone()) {
                    pages.push(image);
                }
            }
        }

        if pages.is_empty() {
            return Err(FormatError::NoPages(source.to_path_buf()).into());
        }

        let hints: Vec<ChapterHint> = opened
            .toc(archive)
            .into_iter()
            .filter_map(|entry| match positions.get(&entry.href) {
                Some(&start) => Some(ChapterHint::new(entry.title, start)),
                None => {
                    tracing::debug!("TOC entry '{}' is not in the spine", entry.title);
                    None
                }
            })
            .collect();
        let spans = without_empty(reconstruct(pages.len(), hints));

        let mut metadata = opened.metadata(&fallback_title(source));
        let cover_entry = opened
            .package
            .cover_href()
            .map(|href| opened.entry(href))
            .filter(|entry| entries.contains(entry) && is_accepted_image(entry));
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

impl Default for EpubImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl super::Importer for EpubImporter {
    fn import(&self, source: &Path, dest: &Path, progress: Progress<'_>) -> Result<()> {
        let file = File::open(source)?;
        let mut archive = ZipArchive::new(file)
            .map_err(|e| FormatError::InvalidPackage(format!("{}: {}", source.display(), e)))?;
        let opened = OpenedPackage::open(&mut archive)?;

        let data_href = format!("{}/{}", STATIC_DIR, DATA_FILE);
        let canonical = opened
            .package
            .manifest
            .values()
            .find(|item| item.href == data_href)
            .map(|item| opened.entry(&item.href));

        let layout = match canonical {
            Some(path) => {
                let data = read_entry(&mut archive, &path)?;
                let comic = Comic::from_slice(&data).map_err(|e| {
                    FormatError::InvalidPackage(format!("Unreadable {}: {}", path, e))
                })?;
                tracing::debug!("Found canonical document for '{}'", comic.title());
                Self::canonical_layout(&opened, comic, source)?
            }
            None => Self::foreign_layout(&opened, &mut archive, source)?,
        };

        layout.write(&mut archive, dest, progress)
    }

    fn format_name(&self) -> &str {
        "EPUB"
    }
}

/// Image references of an XHTML page, in document order
fn image_refs(xhtml: &str) -> Vec<String> {
    IMAGE_REF_RE
        .captures_iter(xhtml)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|href| !href.starts_with("data:"))
        .collect()
}
