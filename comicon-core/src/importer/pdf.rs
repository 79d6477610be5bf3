//! PDF importer implementation

use super::fallback_title;
use crate::chapters::{reconstruct, split_by_counts, without_empty, ChapterHint, ChapterSpan};
use crate::cir::CirWriter;
use crate::error::{FormatError, Result};
use crate::pdf::{decode_text_string, resolve, PDF_PAGES_KEY, PRODUCER};
use crate::progress::Progress;
use crate::types::{split_list, Chapter, Comic, Metadata};
use flate2::read::ZlibDecoder;
use image::{GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::Path;

/// An image pulled out of a PDF page, ready to be written as a file
#[derive(Debug, Clone, PartialEq, Eq)]
struct PageImage {
    ext: &'static str,
    data: Vec<u8>,
}

/// Importer for page-image PDF documents
///
/// Documents written by this crate embed the canonical comic in the
/// `Creator` field (recognised by the `comicon` producer) along with the
/// page count of every chapter. Other documents yield one page per image:
/// the first image becomes the cover and outline entries become chapters.
pub struct PdfImporter;

impl PdfImporter {
    pub fn new() -> Self {
        Self
    }

    /// Pull every image out of the document, in page order.
    ///
    /// Returns the images and, for each PDF page, the index of its first
    /// image. Reports one progress item per PDF page.
    fn extract_images(
        doc: &Document,
        progress: Progress<'_>,
    ) -> (Vec<PageImage>, HashMap<ObjectId, usize>) {
        let pages = doc.get_pages();
        let mut tracker = progress.start(pages.len());

        let mut images = Vec::new();
        let mut first_image = HashMap::new();
        for (number, page_id) in pages {
            first_image.insert(page_id, images.len());
            for (name, stream) in page_images(doc, page_id) {
                match extract_image(doc, stream) {
                    Some(image) => images.push(image),
                    None => tracing::warn!(
                        "Skipping unsupported image {} on page {}",
                        String::from_utf8_lossy(&name),
                        number
                    ),
                }
            }
            tracker.item(format!("page {number}"));
        }

        (images, first_image)
    }
}

impl Default for PdfImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl super::Importer for PdfImporter {
    fn import(&self, source: &Path, dest: &Path, progress: Progress<'_>) -> Result<()> {
        let doc = Document::load(source)
            .map_err(|e| FormatError::InvalidDocument(format!("{}: {}", source.display(), e)))?;

        let info = DocumentInfo::read(&doc);
        let native = info.to_metadata(&fallback_title(source));
        let embedded = info.embedded_comic();

        let (mut images, first_image) = Self::extract_images(&doc, progress);
        if images.is_empty() {
            return Err(FormatError::NoPages(source.to_path_buf()).into());
        }

        let (comic, spans, cover) = match embedded {
            Some(embedded) => {
                tracing::debug!("Found embedded comic '{}'", embedded.title());
                from_embedded(embedded, native, &mut images)?
            }
            None => {
                let hints = outline_hints(&doc, &first_image);
                from_images(native, hints, &mut images)?
            }
        };
        if images.is_empty() {
            return Err(FormatError::NoPages(source.to_path_buf()).into());
        }

        let writer = CirWriter::create(dest)?;
        for span in &spans {
            for (n, index) in span.pages.clone().enumerate() {
                let image = &images[index];
                writer.write_page(&span.chapter.slug, n + 1, image.ext, &image.data)?;
            }
        }
        if let (Some(cover_path), Some(cover)) = (&comic.metadata.cover_path_rel, &cover) {
            writer.write_cover(cover_path, &cover.data)?;
        }

        tracing::debug!(
            "Imported {} pages in {} chapters from {:?}",
            images.len(),
            spans.len(),
            source
        );
        writer.finish(&comic)
    }

    fn format_name(&self) -> &str {
        "PDF"
    }
}

type Reconstructed = (Comic, Vec<ChapterSpan>, Option<PageImage>);

/// Rebuild a comic written by this crate.
///
/// The first image is the cover iff the embedded comic declares one; the
/// rest are sliced by the recorded page counts.
fn from_embedded(
    mut embedded: Comic,
    native: Metadata,
    images: &mut Vec<PageImage>,
) -> Result<Reconstructed> {
    let counts: Vec<usize> = embedded
        .metadata
        .extra_metadata
        .remove(PDF_PAGES_KEY)
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default();

    let mut metadata = native.merged_with(&embedded.metadata);
    let cover = if metadata.cover_path_rel.is_some() && images.len() > 1 {
        Some(images.remove(0))
    } else {
        metadata.cover_path_rel = None;
        None
    };
    if let (Some(cover), Some(path)) = (&cover, &metadata.cover_path_rel) {
        // Keep the declared name but match the extracted encoding
        let stem = path.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(path);
        metadata.cover_path_rel = Some(format!("{}.{}", stem, cover.ext));
    }

    let spans = without_empty(split_by_counts(embedded.chapters(), &counts, images.len()));
    let chapters: Vec<Chapter> = spans.iter().map(|span| span.chapter.clone()).collect();
    Ok((Comic::new(metadata, chapters)?, spans, cover))
}

/// Lay out a document not written by this crate: the first image is the
/// cover (when there is more than one) and outline entries are chapter hints.
fn from_images(
    mut metadata: Metadata,
    hints: Vec<ChapterHint>,
    images: &mut Vec<PageImage>,
) -> Result<Reconstructed> {
    let cover = if images.len() > 1 {
        Some(images.remove(0))
    } else {
        None
    };
    if let Some(cover) = &cover {
        metadata.cover_path_rel = Some(format!("cover.{}", cover.ext));
    }

    let offset = usize::from(cover.is_some());
    let hints = hints
        .into_iter()
        .map(|hint| ChapterHint::new(hint.title, hint.start.saturating_sub(offset)))
        .collect();

    let spans = without_empty(reconstruct(images.len(), hints));
    let chapters: Vec<Chapter> = spans.iter().map(|span| span.chapter.clone()).collect();
    Ok((Comic::new(metadata, chapters)?, spans, cover))
}

/// The document information dictionary
#[derive(Debug, Default)]
struct DocumentInfo {
    title: Option<String>,
    author: Option<String>,
    subject: Option<String>,
    keywords: Option<String>,
    creator: Option<String>,
    producer: Option<String>,
}

impl DocumentInfo {
    fn read(doc: &Document) -> Self {
        let dict = doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|info| resolve(doc, info))
            .and_then(|info| info.as_dict().ok());
        let Some(dict) = dict else {
            return Self::default();
        };

        let text = |key: &[u8]| -> Option<String> {
            let object = resolve(doc, dict.get(key).ok()?)?;
            let value = decode_text_string(object.as_str().ok()?);
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        };

        Self {
            title: text(b"Title"),
            author: text(b"Author"),
            subject: text(b"Subject"),
            keywords: text(b"Keywords"),
            creator: text(b"Creator"),
            producer: text(b"Producer"),
        }
    }

    fn to_metadata(&self, fallback: &str) -> Metadata {
        let mut metadata = Metadata::new(self.title.as_deref().unwrap_or(fallback));
        metadata.authors = self.author.as_deref().map(split_list).unwrap_or_default();
        metadata.description = self.subject.clone();
        metadata.genres = self.keywords.as_deref().map(split_list).unwrap_or_default();
        metadata
    }

    /// The canonical comic stored by this crate's exporter, if any
    fn embedded_comic(&self) -> Option<Comic> {
        if self.producer.as_deref() != Some(PRODUCER) {
            return None;
        }
        let creator = self.creator.as_deref()?;
        match Comic::from_json(creator) {
            Ok(comic) => Some(comic),
            Err(e) => {
                tracing::warn!("Ignoring unreadable embedded comic: {}", e);
                None
            }
        }
    }
}

/// Image XObjects drawn by a page, in resource order
fn page_images(doc: &Document, page_id: ObjectId) -> Vec<(Vec<u8>, &Stream)> {
    let Some(resources) = page_resources(doc, page_id) else {
        return Vec::new();
    };
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|x| resolve(doc, x))
        .and_then(|x| x.as_dict().ok())
    else {
        return Vec::new();
    };

    xobjects
        .iter()
        .filter_map(|(name, object)| {
            let stream = resolve(doc, object)?.as_stream().ok()?;
            let subtype = stream.dict.get(b"Subtype").ok()?.as_name().ok()?;
            (subtype == b"Image").then(|| (name.clone(), stream))
        })
        .collect()
}

/// Resources of a page, inherited from its ancestors when absent
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_object(page_id).ok()?.as_dict().ok()?;
    // Bounded walk up the page tree
    for _ in 0..32 {
        if let Some(resources) = node
            .get(b"Resources")
            .ok()
            .and_then(|r| resolve(doc, r))
            .and_then(|r| r.as_dict().ok())
        {
            return Some(resources);
        }
        node = resolve(doc, node.get(b"Parent").ok()?)?.as_dict().ok()?;
    }
    None
}

fn name_of(doc: &Document, object: Option<&Object>) -> Option<Vec<u8>> {
    let object = resolve(doc, object?)?;
    match object {
        Object::Name(name) => Some(name.clone()),
        Object::Array(items) => items
            .last()
            .and_then(|item| resolve(doc, item))
            .and_then(|item| item.as_name().ok())
            .map(|name| name.to_vec()),
        _ => None,
    }
}

/// Number of colour components of an image colour space
fn components(doc: &Document, stream: &Stream) -> Option<u32> {
    let space = resolve(doc, stream.dict.get(b"ColorSpace").ok()?)?;
    match space {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" => Some(1),
            b"DeviceRGB" | b"CalRGB" => Some(3),
            _ => None,
        },
        Object::Array(items) => {
            let family = items.first()?.as_name().ok()?;
            if family != b"ICCBased" {
                return None;
            }
            let profile = resolve(doc, items.get(1)?)?.as_stream().ok()?;
            profile.dict.get(b"N").ok()?.as_i64().ok().map(|n| n as u32)
        }
        _ => None,
    }
}

/// Turn an image XObject into an image file.
///
/// JPEG and JPEG 2000 data is kept verbatim; 8-bit gray or RGB samples
/// (raw or Flate-compressed) are re-encoded as PNG. Anything else is
/// not supported.
fn extract_image(doc: &Document, stream: &Stream) -> Option<PageImage> {
    let filter = name_of(doc, stream.dict.get(b"Filter").ok());
    match filter.as_deref() {
        Some(b"DCTDecode") => {
            return Some(PageImage {
                ext: "jpg",
                data: stream.content.clone(),
            })
        }
        Some(b"JPXDecode") => {
            return Some(PageImage {
                ext: "jp2",
                data: stream.content.clone(),
            })
        }
        Some(b"FlateDecode") | None => {}
        Some(_) => return None,
    }

    let int = |key: &[u8]| -> Option<u32> {
        let value = resolve(doc, stream.dict.get(key).ok()?)?.as_i64().ok()?;
        u32::try_from(value).ok()
    };
    let width = int(b"Width")?;
    let height = int(b"Height")?;
    if int(b"BitsPerComponent")? != 8 {
        return None;
    }
    if stream.dict.get(b"DecodeParms").is_ok() {
        // Predictors are not handled
        return None;
    }

    let samples = if filter.is_some() {
        let mut samples = Vec::new();
        ZlibDecoder::new(stream.content.as_slice())
            .read_to_end(&mut samples)
            .ok()?;
        samples
    } else {
        stream.content.clone()
    };

    let channels = components(doc, stream)?;
    let expected = (width as usize) * (height as usize) * (channels as usize);
    if samples.len() < expected {
        return None;
    }
    let mut samples = samples;
    samples.truncate(expected);

    let mut png = Cursor::new(Vec::new());
    let written = match channels {
        1 => GrayImage::from_raw(width, height, samples)?.write_to(&mut png, ImageFormat::Png),
        3 => RgbImage::from_raw(width, height, samples)?.write_to(&mut png, ImageFormat::Png),
        _ => return None,
    };
    written.ok()?;

    Some(PageImage {
        ext: "png",
        data: png.into_inner(),
    })
}

/// Top-level outline entries as chapter hints, indexed by image
fn outline_hints(doc: &Document, first_image: &HashMap<ObjectId, usize>) -> Vec<ChapterHint> {
    let outlines = doc
        .trailer
        .get(b"Root")
        .ok()
        .and_then(|root| resolve(doc, root))
        .and_then(|root| root.as_dict().ok())
        .and_then(|root| root.get(b"Outlines").ok())
        .and_then(|outlines| resolve(doc, outlines))
        .and_then(|outlines| outlines.as_dict().ok());
    let Some(outlines) = outlines else {
        return Vec::new();
    };

    let mut hints = Vec::new();
    let mut next = outlines.get(b"First").ok().and_then(|f| f.as_reference().ok());
    let mut visited = 0;
    while let Some(id) = next {
        visited += 1;
        if visited > 10_000 {
            break;
        }
        let Some(item) = doc.get_object(id).ok().and_then(|o| o.as_dict().ok()) else {
            break;
        };

        let title = item
            .get(b"Title")
            .ok()
            .and_then(|t| resolve(doc, t))
            .and_then(|t| t.as_str().ok())
            .map(decode_text_string);
        let start = destination_page(doc, item).and_then(|page| first_image.get(&page));
        if let (Some(title), Some(&start)) = (title, start) {
            hints.push(ChapterHint::new(title.trim(), start));
        }

        next = item.get(b"Next").ok().and_then(|n| n.as_reference().ok());
    }
    hints
}

/// Page targeted by an outline item (`/Dest` or a GoTo `/A` action)
fn destination_page(doc: &Document, item: &Dictionary) -> Option<ObjectId> {
    let dest = match item.get(b"Dest") {
        Ok(dest) => resolve(doc, dest)?,
        Err(_) => {
            let action = resolve(doc, item.get(b"A").ok()?)?.as_dict().ok()?;
            resolve(doc, action.get(b"D").ok()?)?
        }
    };
    dest.as_array().ok()?.first()?.as_reference().ok()
}
