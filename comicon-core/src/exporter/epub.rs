//! EPUB exporter implementation

use super::{file_name, LoadedCir};
use crate::cir::DATA_FILE;
use crate::epub::{chapter_folder, encode_href, IMAGE_DIR, PAGE_DIR, STATIC_DIR};
use crate::error::{ComiconError, FormatError, Result};
use crate::media::{extension_of, mime_for_extension};
use crate::progress::Progress;
use crate::xml::escape;
use epub_builder::{EpubBuilder, EpubContent, EpubVersion, ReferenceType, ZipLibrary};
use std::fs::{self, File};
use std::path::Path;

const STYLESHEET: &str = "\
body { margin: 0; padding: 0; text-align: center; }
div.page { width: 100%; height: 100%; }
div.page img { max-width: 100%; max-height: 100%; }
";

/// Encoder for fixed-layout comic EPUBs
///
/// Every page image gets its own XHTML document; the first page of each
/// chapter carries the chapter title so it appears in the table of
/// contents. The canonical document travels along as `static/comicon.json`.
pub struct EpubExporter {
    language: String,
}

impl EpubExporter {
    pub fn new() -> Self {
        Self {
            language: "en".to_string(),
        }
    }

    /// Set the package language (BCP 47 tag)
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// XHTML document wrapping a single page image
    fn page_to_xhtml(&self, title: &str, image_href: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head>
    <title>{title}</title>
    <meta charset="UTF-8"/>
    <link rel="stylesheet" type="text/css" href="../stylesheet.css"/>
</head>
<body>
<div class="page"><img src="{src}" alt="{title}"/></div>
</body>
</html>"#,
            title = escape(title),
            src = escape(&encode_href(image_href)),
        )
    }

    /// Build the package and write it to `writer`
    pub(crate) fn write_package(
        &self,
        cir: &Path,
        writer: impl std::io::Write,
        progress: Progress<'_>,
    ) -> Result<()> {
        let loaded = LoadedCir::load(cir)?;
        let comic = &loaded.comic;
        let metadata = &comic.metadata;

        let mut builder = EpubBuilder::new(ZipLibrary::new().map_err(|e| {
            FormatError::EncodingFailed(format!("Failed to create zip: {}", e))
        })?)
        .map_err(|e| FormatError::EncodingFailed(format!("Failed to create EPUB builder: {}", e)))?;
        builder.epub_version(EpubVersion::V30);

        builder
            .metadata("title", metadata.title())
            .map_err(encoding_failed)?;
        for author in &metadata.authors {
            builder.metadata("author", author).map_err(encoding_failed)?;
        }
        builder
            .metadata("lang", &self.language)
            .map_err(encoding_failed)?;
        if let Some(description) = &metadata.description {
            builder
                .metadata("description", description)
                .map_err(encoding_failed)?;
        }
        for genre in &metadata.genres {
            builder.metadata("subject", genre).map_err(encoding_failed)?;
        }
        builder
            .stylesheet(STYLESHEET.as_bytes())
            .map_err(encoding_failed)?;

        if let Some(cover) = loaded.cover(cir) {
            let ext = extension_of(&cover).unwrap_or_default();
            let mime = mime_for_extension(&ext).unwrap_or("application/octet-stream");
            builder
                .add_cover_image(format!("cover.{ext}"), fs::read(&cover)?.as_slice(), mime)
                .map_err(encoding_failed)?;
        }

        builder
            .add_resource(
                format!("{}/{}", STATIC_DIR, DATA_FILE),
                comic.to_json()?.as_bytes(),
                "application/json",
            )
            .map_err(encoding_failed)?;

        let mut tracker = progress.start(loaded.chapters.len());
        for (index, (chapter, pages)) in loaded.chapters.iter().enumerate() {
            let folder = chapter_folder(index, &chapter.slug);
            for (i, page) in pages.iter().enumerate() {
                let name = file_name(page);
                let ext = extension_of(page).unwrap_or_default();
                let mime = mime_for_extension(&ext).unwrap_or("application/octet-stream");
                let image_path = format!("{}/{}/{}", IMAGE_DIR, folder, name);
                builder
                    .add_resource(&image_path, fs::read(page)?.as_slice(), mime)
                    .map_err(encoding_failed)?;

                let page_title = format!("{} {}", chapter.title, i + 1);
                let xhtml = self.page_to_xhtml(&page_title, &format!("../{}", image_path));
                let href = format!("{}/{}-{}.xhtml", PAGE_DIR, folder, i + 1);
                let mut content = EpubContent::new(href, xhtml.as_bytes());
                if i == 0 {
                    content = content.title(chapter.title.as_str());
                    if index == 0 {
                        content = content.reftype(ReferenceType::Text);
                    }
                }
                builder.add_content(content).map_err(encoding_failed)?;
            }
            tracker.item(chapter.title.as_str());
        }

        builder.generate(writer).map_err(encoding_failed)?;
        tracing::debug!(
            "Packaged {} chapters of '{}' as EPUB",
            loaded.chapters.len(),
            comic.title()
        );
        Ok(())
    }
}

impl Default for EpubExporter {
    fn default() -> Self {
        Self::new()
    }
}

fn encoding_failed(err: impl std::fmt::Display) -> ComiconError {
    FormatError::EncodingFailed(err.to_string()).into()
}

impl super::Exporter for EpubExporter {
    fn export(&self, cir: &Path, dest: &Path, progress: Progress<'_>) -> Result<()> {
        if dest.is_dir() {
            return Err(ComiconError::IsADirectory(dest.to_path_buf()));
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(dest)?;
        self.write_package(cir, file, progress)
    }

    fn format_name(&self) -> &str {
        "EPUB"
    }

    fn file_extension(&self) -> &str {
        "epub"
    }
}
