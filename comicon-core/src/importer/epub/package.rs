//! EPUB package parsing (container.xml, OPF, NCX and EPUB 3 nav)

use crate::error::FormatError;
use crate::xml::{attr, local_name, resolve_ref};
use quick_xml::events::{BytesStart, Event};
use percent_encoding::percent_decode_str;
use quick_xml::Reader;
use std::collections::HashMap;

/// Location of the container document inside every EPUB
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// One `<item>` of the OPF manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub href: String,
    pub media_type: String,
    pub properties: Option<String>,
}

impl ManifestItem {
    fn has_property(&self, property: &str) -> bool {
        self.properties
            .as_deref()
            .is_some_and(|props| props.split_ascii_whitespace().any(|p| p == property))
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}

/// Parsed OPF package document
#[derive(Debug, Default)]
pub struct Package {
    pub title: Option<String>,
    pub creators: Vec<String>,
    pub description: Option<String>,
    pub subjects: Vec<String>,
    /// Manifest id -> item
    pub manifest: HashMap<String, ManifestItem>,
    /// Manifest ids in reading order
    pub spine: Vec<String>,
    toc_id: Option<String>,
    epub2_cover_id: Option<String>,
}

impl Package {
    /// Href of the cover image (EPUB 3 property first, then EPUB 2 meta)
    pub fn cover_href(&self) -> Option<&str> {
        self.manifest
            .values()
            .find(|item| item.has_property("cover-image"))
            .or_else(|| {
                self.epub2_cover_id
                    .as_ref()
                    .and_then(|id| self.manifest.get(id))
            })
            .map(|item| item.href.as_str())
    }

    /// Href of the NCX table of contents
    pub fn ncx_href(&self) -> Option<&str> {
        self.toc_id
            .as_ref()
            .and_then(|id| self.manifest.get(id))
            .or_else(|| {
                self.manifest
                    .values()
                    .find(|item| item.media_type == "application/x-dtbncx+xml")
            })
            .map(|item| item.href.as_str())
    }

    /// Href of the EPUB 3 navigation document
    pub fn nav_href(&self) -> Option<&str> {
        self.manifest
            .values()
            .find(|item| item.has_property("nav"))
            .map(|item| item.href.as_str())
    }

    /// Spine items in reading order, skipping dangling references
    pub fn spine_items(&self) -> impl Iterator<Item = &ManifestItem> {
        self.spine.iter().filter_map(|id| self.manifest.get(id))
    }
}

/// A table of contents entry, flattened in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub title: String,
    pub href: String,
}

fn invalid(what: &str, err: impl std::fmt::Display) -> FormatError {
    FormatError::InvalidPackage(format!("Malformed {}: {}", what, err))
}

/// Strip a UTF-8 byte order mark
pub fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data)
}

/// Find the OPF path in META-INF/container.xml
pub fn parse_container(content: &str) -> Result<String, FormatError> {
    let mut reader = Reader::from_str(content);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if local_name(e.name().as_ref()) == b"rootfile" =>
            {
                if let Some(path) = attr(&e, b"full-path") {
                    return Ok(path);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(invalid("container.xml", e)),
            _ => {}
        }
    }

    Err(FormatError::InvalidPackage(
        "No rootfile found in container.xml".to_string(),
    ))
}

/// Parse the OPF package document
pub fn parse_opf(content: &str) -> Result<Package, FormatError> {
    let mut reader = Reader::from_str(content);
    let mut package = Package::default();

    let mut in_metadata = false;
    let mut current: Option<Vec<u8>> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                match local {
                    b"metadata" => in_metadata = true,
                    b"title" | b"creator" | b"description" | b"subject" if in_metadata => {
                        current = Some(local.to_vec());
                        text.clear();
                    }
                    _ => package.read_element(local, &e),
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.name();
                package.read_element(local_name(name.as_ref()), &e);
            }
            Ok(Event::Text(e)) => {
                if current.is_some() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if current.is_some() {
                    if let Some(resolved) = resolve_ref(&e) {
                        text.push_str(&resolved);
                    }
                }
            }
            Ok(Event::End(e)) => {
                if local_name(e.name().as_ref()) == b"metadata" {
                    in_metadata = false;
                }
                if let Some(element) = current.take() {
                    let value = text.trim().to_string();
                    if !value.is_empty() {
                        match element.as_slice() {
                            b"title" if package.title.is_none() => package.title = Some(value),
                            b"creator" => package.creators.push(value),
                            b"description" => package.description = Some(value),
                            b"subject" => package.subjects.push(value),
                            _ => {}
                        }
                    }
                    text.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(invalid("OPF", e)),
            _ => {}
        }
    }

    Ok(package)
}

impl Package {
    fn read_element(&mut self, local: &[u8], e: &BytesStart<'_>) {
        match local {
            b"item" => {
                if let (Some(id), Some(href)) = (attr(e, b"id"), attr(e, b"href")) {
                    self.manifest.insert(
                        id,
                        ManifestItem {
                            href,
                            media_type: attr(e, b"media-type").unwrap_or_default(),
                            properties: attr(e, b"properties"),
                        },
                    );
                }
            }
            b"itemref" => {
                if let Some(idref) = attr(e, b"idref") {
                    self.spine.push(idref);
                }
            }
            b"spine" => self.toc_id = attr(e, b"toc"),
            b"meta" => {
                if attr(e, b"name").as_deref() == Some("cover") {
                    self.epub2_cover_id = attr(e, b"content");
                }
            }
            _ => {}
        }
    }
}

/// Parse an NCX table of contents, flattening nested navPoints
pub fn parse_ncx(content: &str) -> Result<Vec<TocEntry>, FormatError> {
    let mut reader = Reader::from_str(content);

    // One (label, src) slot per open navPoint; entries are emitted in start order
    let mut entries: Vec<Option<TocEntry>> = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    let mut in_text = false;
    let mut label = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match local_name(e.name().as_ref()) {
                b"navPoint" => {
                    open.push(entries.len());
                    entries.push(Some(TocEntry {
                        title: String::new(),
                        href: String::new(),
                    }));
                }
                b"text" => {
                    in_text = true;
                    label.clear();
                }
                b"content" => set_src(&mut entries, &open, &e),
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if local_name(e.name().as_ref()) == b"content" {
                    set_src(&mut entries, &open, &e);
                }
            }
            Ok(Event::Text(e)) => {
                if in_text {
                    label.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_text {
                    if let Some(resolved) = resolve_ref(&e) {
                        label.push_str(&resolved);
                    }
                }
            }
            Ok(Event::End(e)) => match local_name(e.name().as_ref()) {
                b"text" => {
                    in_text = false;
                    if let Some(Some(entry)) = open.last().and_then(|&i| entries.get_mut(i)) {
                        if entry.title.is_empty() {
                            entry.title = label.trim().to_string();
                        }
                    }
                }
                b"navPoint" => {
                    open.pop();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(invalid("NCX", e)),
            _ => {}
        }
    }

    Ok(entries
        .into_iter()
        .flatten()
        .filter(|entry| !entry.title.is_empty() && !entry.href.is_empty())
        .collect())
}

fn set_src(entries: &mut [Option<TocEntry>], open: &[usize], e: &BytesStart<'_>) {
    if let (Some(src), Some(Some(entry))) = (
        attr(e, b"src"),
        open.last().and_then(|&i| entries.get_mut(i)),
    ) {
        entry.href = src;
    }
}

/// Parse the `toc` nav of an EPUB 3 navigation document.
///
/// Navigation documents are XHTML and may use HTML entities the XML reader
/// does not know, so parsing stops quietly at the first error and keeps
/// whatever entries were read.
pub fn parse_nav(content: &str) -> Vec<TocEntry> {
    let mut reader = Reader::from_str(content);
    let mut entries = Vec::new();

    let mut nav_depth = 0usize;
    let mut in_toc = false;
    let mut link: Option<(String, String)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match local_name(e.name().as_ref()) {
                b"nav" => {
                    if in_toc {
                        nav_depth += 1;
                    } else if attr(&e, b"type")
                        .is_some_and(|t| t.split_ascii_whitespace().any(|t| t == "toc"))
                    {
                        in_toc = true;
                        nav_depth = 1;
                    }
                }
                b"a" if in_toc => {
                    link = attr(&e, b"href").map(|href| (href, String::new()));
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if let Some((_, label)) = link.as_mut() {
                    label.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if let Some((_, label)) = link.as_mut() {
                    if let Some(resolved) = resolve_ref(&e) {
                        label.push_str(&resolved);
                    }
                }
            }
            Ok(Event::End(e)) => match local_name(e.name().as_ref()) {
                b"a" => {
                    if let Some((href, label)) = link.take() {
                        let title = label.split_whitespace().collect::<Vec<_>>().join(" ");
                        if !title.is_empty() {
                            entries.push(TocEntry { title, href });
                        }
                    }
                }
                b"nav" if in_toc => {
                    nav_depth -= 1;
                    if nav_depth == 0 {
                        break;
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::debug!("Stopped reading navigation document: {}", e);
                break;
            }
            _ => {}
        }
    }

    entries
}

/// Resolve an href found in the document at `base` (a zip entry path)
/// into a zip entry path, dropping any fragment.
pub fn resolve_href(base: &str, href: &str) -> String {
    resolve_path(base, href.split('#').next().unwrap_or_default())
}

/// Resolve a manifest href, which names a whole resource, into a zip entry
/// path. A `#` here is part of the file name.
pub fn resolve_path(base: &str, path: &str) -> String {
    let path = decode_path(path);

    let mut parts: Vec<&str> = match base.rsplit_once('/') {
        Some((dir, _)) if !path.starts_with('/') => dir.split('/').collect(),
        _ => Vec::new(),
    };
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Percent-decode an href without interpreting fragments
pub fn decode_path(path: &str) -> String {
    percent_decode_str(path).decode_utf8_lossy().into_owned()
}
