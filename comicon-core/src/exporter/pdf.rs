//! PDF exporter implementation

use super::LoadedCir;
use crate::error::{ComiconError, FormatError, Result};
use crate::media::extension_of;
use crate::pdf::{jp2_size, text_string, PDF_PAGES_KEY, PRODUCER};
use crate::progress::Progress;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegDecoder;
use image::{ColorType, ImageDecoder};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};

/// An image ready to be embedded as an XObject
struct EmbeddedImage {
    width: u32,
    height: u32,
    dict: Dictionary,
    data: Vec<u8>,
}

/// Encoder for page-image PDFs
///
/// Every page holds one image, sized to the image at the configured
/// resolution. The canonical comic, with the page count of every chapter,
/// is stored in the `Creator` field so the document can be imported back.
pub struct PdfExporter {
    /// Upper bound on images per progress batch
    max_batch: usize,
    /// Share of the page count that makes up one batch
    batch_fraction: f64,
    /// Pixels per inch used to size pages
    dpi: u32,
}

impl PdfExporter {
    pub fn new() -> Self {
        Self {
            max_batch: 200,
            batch_fraction: 0.12,
            dpi: 100,
        }
    }

    /// Set the largest number of images per batch
    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch.max(1);
        self
    }

    /// Set the share of the page count processed per batch
    pub fn with_batch_fraction(mut self, fraction: f64) -> Self {
        self.batch_fraction = fraction;
        self
    }

    /// Set the resolution used to turn pixel sizes into page sizes
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi.max(1);
        self
    }

    /// Images per batch for a document of `pages` images
    pub fn batch_interval(&self, pages: usize) -> usize {
        let interval = (pages as f64 * self.batch_fraction)
            .max(1.0)
            .min(self.max_batch as f64);
        (interval.round() as usize).max(1)
    }

    /// Page size in points for an image size in pixels
    fn points(&self, pixels: u32) -> i64 {
        (i64::from(pixels) * 72 + i64::from(self.dpi) / 2) / i64::from(self.dpi)
    }

    /// Add one page showing `image` and return its id
    fn add_page(&self, doc: &mut Document, pages_id: ObjectId, image: EmbeddedImage) -> ObjectId {
        let width = self.points(image.width);
        let height = self.points(image.height);

        let image_id = doc.add_object(Stream::new(image.dict, image.data));
        let content = format!("q {} 0 0 {} 0 0 cm /Im0 Do Q", width, height);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

        doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "Im0" => image_id,
                },
            },
        })
    }
}

impl Default for PdfExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl super::Exporter for PdfExporter {
    fn export(&self, cir: &Path, dest: &Path, progress: Progress<'_>) -> Result<()> {
        if dest.is_dir() {
            return Err(ComiconError::IsADirectory(dest.to_path_buf()));
        }
        let loaded = LoadedCir::load(cir)?;

        // Cover first, then every page in reading order
        let mut files: Vec<PathBuf> = loaded.cover(cir).into_iter().collect();
        files.extend(loaded.chapters.iter().flat_map(|(_, pages)| pages.iter().cloned()));

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let interval = self.batch_interval(files.len());
        let mut tracker = progress.start(files.len().div_ceil(interval));
        let mut kids: Vec<Object> = Vec::with_capacity(files.len());
        for (batch, chunk) in files.chunks(interval).enumerate() {
            for file in chunk {
                let image = embed_image(file)?;
                kids.push(self.add_page(&mut doc, pages_id, image).into());
            }
            tracing::debug!("Embedded batch {} ({} images)", batch + 1, chunk.len());
            tracker.item(format!("{}", batch + 1));
        }

        // First page of every chapter, for the outline
        let offset = usize::from(loaded.cover(cir).is_some());
        let mut starts = Vec::with_capacity(loaded.chapters.len());
        let mut next = offset;
        for (chapter, pages) in &loaded.chapters {
            if let Some(Object::Reference(page)) = kids.get(next) {
                starts.push((chapter.title.as_str(), *page));
            }
            next += pages.len();
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let outline_id = add_outline(&mut doc, &starts);
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
            "Outlines" => outline_id,
            "PageMode" => "UseOutlines",
        });
        doc.trailer.set("Root", catalog_id);

        // The embedded copy records how many pages each chapter has
        let mut embedded = loaded.comic.clone();
        let counts: Vec<usize> = loaded.chapters.iter().map(|(_, pages)| pages.len()).collect();
        embedded
            .metadata
            .extra_metadata
            .insert(PDF_PAGES_KEY.to_string(), serde_json::to_value(counts)?);

        let metadata = &loaded.comic.metadata;
        let mut info = dictionary! {
            "Title" => text_string(metadata.title()),
            "Creator" => text_string(&embedded.to_json()?),
            "Producer" => text_string(PRODUCER),
        };
        if !metadata.authors.is_empty() {
            info.set("Author", text_string(&metadata.authors.join(", ")));
        }
        if let Some(description) = &metadata.description {
            info.set("Subject", text_string(description));
        }
        if !metadata.genres.is_empty() {
            info.set("Keywords", text_string(&metadata.genres.join(", ")));
        }
        let info_id = doc.add_object(info);
        doc.trailer.set("Info", info_id);

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(dest)?);
        doc.save_to(&mut writer)
            .map_err(|e| FormatError::EncodingFailed(format!("Failed to write PDF: {}", e)))?;
        writer.flush()?;

        tracing::debug!(
            "Wrote {} pages of '{}' to {:?}",
            count,
            loaded.comic.title(),
            dest
        );
        Ok(())
    }

    fn format_name(&self) -> &str {
        "PDF"
    }

    fn file_extension(&self) -> &str {
        "pdf"
    }
}

/// Add a flat outline with one entry per chapter start
fn add_outline(doc: &mut Document, starts: &[(&str, ObjectId)]) -> ObjectId {
    let outline_id = doc.new_object_id();
    let item_ids: Vec<ObjectId> = starts.iter().map(|_| doc.new_object_id()).collect();

    for (i, (title, page)) in starts.iter().enumerate() {
        let mut item = dictionary! {
            "Title" => text_string(title),
            "Parent" => outline_id,
            "Dest" => vec![Object::Reference(*page), "Fit".into()],
        };
        if i > 0 {
            item.set("Prev", item_ids[i - 1]);
        }
        if let Some(next) = item_ids.get(i + 1) {
            item.set("Next", *next);
        }
        doc.objects.insert(item_ids[i], Object::Dictionary(item));
    }

    let mut outline = dictionary! {
        "Type" => "Outlines",
        "Count" => item_ids.len() as i64,
    };
    if let (Some(first), Some(last)) = (item_ids.first(), item_ids.last()) {
        outline.set("First", *first);
        outline.set("Last", *last);
    }
    doc.objects.insert(outline_id, Object::Dictionary(outline));
    outline_id
}

/// Prepare an image file for embedding.
///
/// Gray and RGB JPEGs and all JPEG 2000 data are embedded verbatim; every
/// other image is decoded and stored as Flate-compressed 8-bit RGB.
fn embed_image(path: &Path) -> Result<EmbeddedImage> {
    let data = fs::read(path)?;
    let failed = |reason: &str| -> ComiconError {
        FormatError::EncodingFailed(format!("{}: {}", path.display(), reason)).into()
    };

    match extension_of(path).as_deref() {
        Some("jpg") | Some("jpeg") => {
            let decoder = JpegDecoder::new(Cursor::new(data.as_slice()))
                .map_err(|e| failed(&e.to_string()))?;
            let (width, height) = decoder.dimensions();
            let color_space = match decoder.color_type() {
                ColorType::L8 => "DeviceGray",
                ColorType::Rgb8 => "DeviceRGB",
                other => {
                    tracing::debug!("Re-encoding {:?} JPEG {:?}", other, path);
                    return flate_rgb(&data).map_err(|e| failed(&e));
                }
            };
            Ok(EmbeddedImage {
                width,
                height,
                dict: image_dict(width, height, color_space, "DCTDecode"),
                data,
            })
        }
        Some("jp2") => {
            let (width, height) = jp2_size(&data).ok_or_else(|| failed("unreadable JPEG 2000 header"))?;
            let mut dict = image_dict(width, height, "DeviceRGB", "JPXDecode");
            // The codestream carries its own colour space
            dict.remove(b"ColorSpace");
            dict.remove(b"BitsPerComponent");
            Ok(EmbeddedImage {
                width,
                height,
                dict,
                data,
            })
        }
        _ => flate_rgb(&data).map_err(|e| failed(&e)),
    }
}

/// Decode any supported image into Flate-compressed 8-bit RGB
fn flate_rgb(data: &[u8]) -> std::result::Result<EmbeddedImage, String> {
    let rgb = image::load_from_memory(data)
        .map_err(|e| e.to_string())?
        .to_rgb8();
    let (width, height) = rgb.dimensions();
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(rgb.as_raw())
        .map_err(|e| e.to_string())?;
    Ok(EmbeddedImage {
        width,
        height,
        dict: image_dict(width, height, "DeviceRGB", "FlateDecode"),
        data: encoder.finish().map_err(|e| e.to_string())?,
    })
}

fn image_dict(width: u32, height: u32, color_space: &str, filter: &str) -> Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(width),
        "Height" => i64::from(height),
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
        "Filter" => filter,
    }
}
