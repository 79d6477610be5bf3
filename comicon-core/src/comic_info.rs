//! ComicInfo.xml, the metadata descriptor carried by CBZ archives

use crate::chapters::{ChapterHint, ChapterSpan};
use crate::error::FormatError;
use crate::types::{split_list, Comic, Metadata};
use crate::xml::{attr, escape, local_name, resolve_ref};
use quick_xml::events::Event;
use quick_xml::Reader;

/// Name of the descriptor entry inside an archive
pub const COMIC_INFO_FILE: &str = "ComicInfo.xml";

/// The subset of ComicInfo.xml that maps onto comic metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComicInfo {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub writers: Vec<String>,
    pub genres: Vec<String>,
    pub page_count: Option<usize>,
    /// Pages carrying a `Bookmark` attribute, as chapter hints
    pub bookmarks: Vec<ChapterHint>,
}

impl ComicInfo {
    /// Parse a ComicInfo.xml document
    pub fn parse(content: &str) -> Result<Self, FormatError> {
        let mut reader = Reader::from_str(content);
        let mut info = ComicInfo::default();
        let mut current: Option<Vec<u8>> = None;
        let mut text = String::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = e.name();
                    let local = local_name(name.as_ref());
                    match local {
                        b"Title" | b"Summary" | b"Writer" | b"Genre" | b"PageCount" => {
                            current = Some(local.to_vec());
                            text.clear();
                        }
                        b"Page" => info.push_page(&e),
                        _ => {}
                    }
                }
                Ok(Event::Empty(e)) => {
                    if local_name(e.name().as_ref()) == b"Page" {
                        info.push_page(&e);
                    }
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
                Ok(Event::End(_)) => {
                    if let Some(element) = current.take() {
                        let value = text.trim().to_string();
                        match element.as_slice() {
                            b"Title" if !value.is_empty() => info.title = Some(value),
                            b"Summary" if !value.is_empty() => info.summary = Some(value),
                            b"Writer" => info.writers = split_list(&value),
                            b"Genre" => info.genres = split_list(&value),
                            b"PageCount" => info.page_count = value.parse().ok(),
                            _ => {}
                        }
                        text.clear();
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(FormatError::InvalidArchive(format!(
                        "Malformed {}: {}",
                        COMIC_INFO_FILE, e
                    )))
                }
                _ => {}
            }
        }

        Ok(info)
    }

    fn push_page(&mut self, element: &quick_xml::events::BytesStart<'_>) {
        let image = attr(element, b"Image").and_then(|v| v.trim().parse::<usize>().ok());
        let bookmark = attr(element, b"Bookmark").filter(|b| !b.trim().is_empty());
        match (image, bookmark) {
            (Some(image), Some(bookmark)) => {
                self.bookmarks.push(ChapterHint::new(bookmark.trim(), image));
            }
            (image, None) => {
                if let Some(kind) = attr(element, b"Type") {
                    tracing::debug!("Ignoring {} page {:?} without a bookmark", kind, image);
                }
            }
            _ => {}
        }
    }

    /// Metadata described by this document, falling back to `fallback_title`
    pub fn to_metadata(&self, fallback_title: &str) -> Metadata {
        let mut metadata = Metadata::new(self.title.as_deref().unwrap_or(fallback_title));
        metadata.description = self.summary.clone();
        metadata.authors = self.writers.clone();
        metadata.genres = self.genres.clone();
        metadata
    }

    /// Describe a comic whose pages are laid out as `spans`
    pub fn from_comic(comic: &Comic, spans: &[ChapterSpan]) -> Self {
        let metadata = &comic.metadata;
        Self {
            title: Some(metadata.title().to_string()),
            summary: metadata.description.clone(),
            writers: metadata.authors.clone(),
            genres: metadata.genres.clone(),
            page_count: Some(spans.iter().map(ChapterSpan::len).sum()),
            bookmarks: spans
                .iter()
                .map(|span| ChapterHint::new(span.chapter.title.clone(), span.pages.start))
                .collect(),
        }
    }

    /// Render the document
    pub fn to_xml(&self) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
             <ComicInfo xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
             xmlns:xsd=\"http://www.w3.org/2001/XMLSchema\">\n",
        );

        if let Some(title) = &self.title {
            xml.push_str(&format!("  <Title>{}</Title>\n", escape(title)));
        }
        if let Some(summary) = &self.summary {
            xml.push_str(&format!("  <Summary>{}</Summary>\n", escape(summary)));
        }
        if !self.writers.is_empty() {
            xml.push_str(&format!("  <Writer>{}</Writer>\n", escape(&self.writers.join(", "))));
        }
        if !self.genres.is_empty() {
            xml.push_str(&format!("  <Genre>{}</Genre>\n", escape(&self.genres.join(", "))));
        }

        if let Some(page_count) = self.page_count {
            xml.push_str(&format!("  <PageCount>{}</PageCount>\n", page_count));
            xml.push_str("  <Pages>\n");
            for image in 0..page_count {
                match self.bookmarks.iter().find(|b| b.start == image) {
                    Some(bookmark) => xml.push_str(&format!(
                        "    <Page Image=\"{}\" Bookmark=\"{}\" />\n",
                        image,
                        escape(&bookmark.title)
                    )),
                    None => xml.push_str(&format!("    <Page Image=\"{}\" />\n", image)),
                }
            }
            xml.push_str("  </Pages>\n");
        }

        xml.push_str("</ComicInfo>\n");
        xml
    }
}
