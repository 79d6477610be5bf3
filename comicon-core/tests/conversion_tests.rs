//! Conversion tests for comicon-core
//!
//! These tests build small comics on disk, convert them between formats and
//! check what comes back.
//!
//! ## Test Strategy
//!
//! 1. **Round-trip tests**: CIR -> format -> CIR keeps chapters, pages and
//!    metadata for files written by this crate
//! 2. **Foreign sources**: archives, packages and documents without the
//!    canonical document are reconstructed from their own metadata
//! 3. **Validation**: malformed CIR folders are rejected before export

use comicon_core::cir::{chapter_pages, read_comic, validate, CirWriter};
use comicon_core::error::{ComiconError, FormatError, InvalidCirError};
use comicon_core::{convert, convert_with_progress, Chapter, Comic, Metadata, ProgressEvent, Stage};
use image::{ImageFormat, Rgb, RgbImage};
use lopdf::{Document, Object};
use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::Path;
use tempfile::TempDir;
use zip::write::FileOptions;
use zip::ZipWriter;

// =============================================================================
// Fixtures
// =============================================================================

/// Encode a solid-colour image
fn image_bytes(width: u32, height: u32, shade: u8, format: ImageFormat) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([shade, 255 - shade, shade / 2]));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, format).unwrap();
    out.into_inner()
}

fn png(shade: u8) -> Vec<u8> {
    image_bytes(8, 12, shade, ImageFormat::Png)
}

fn sample_metadata() -> Metadata {
    let mut metadata = Metadata::new("The Lost Pages")
        .with_author("Ada Ink")
        .with_author("Ben Brush")
        .with_description("Two short stories.")
        .with_genre("Adventure")
        .with_cover("cover.png");
    metadata
        .extra_metadata
        .insert("source".to_string(), serde_json::json!("scan"));
    metadata
}

/// A CIR with a cover, a two-page chapter and a one-page chapter
fn sample_cir(root: &Path) -> Comic {
    let comic = Comic::new(
        sample_metadata(),
        vec![Chapter::new("Prologue"), Chapter::new("Part: Two/Three")],
    )
    .unwrap();

    let writer = CirWriter::create(root).unwrap();
    writer.write_cover("cover.png", &png(0)).unwrap();
    writer.write_page("Prologue", 1, "png", &png(40)).unwrap();
    writer.write_page("Prologue", 2, "png", &png(80)).unwrap();
    writer
        .write_page("Part; TwoThree", 1, "png", &png(120))
        .unwrap();
    writer.finish(&comic).unwrap();
    comic
}

/// Number of pages in every chapter folder of a CIR
fn page_counts(cir: &Path) -> Vec<usize> {
    let comic = read_comic(cir).unwrap();
    comic
        .chapters()
        .iter()
        .map(|chapter| chapter_pages(cir, &chapter.slug).unwrap().len())
        .collect()
}

fn chapter_titles(comic: &Comic) -> Vec<&str> {
    comic.chapters().iter().map(|c| c.title.as_str()).collect()
}

fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    for (name, data) in entries {
        zip.start_file(*name, FileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
}

// =============================================================================
// Round-trip Tests
// =============================================================================

#[test]
fn test_cbz_round_trip() {
    let dir = TempDir::new().unwrap();
    let original = sample_cir(&dir.path().join("original"));
    let cbz = dir.path().join("comic.cbz");
    let back = dir.path().join("back");

    convert(&dir.path().join("original"), &cbz).unwrap();
    convert(&cbz, &back).unwrap();

    validate(&back).unwrap();
    let comic = read_comic(&back).unwrap();
    assert_eq!(comic, original);
    assert_eq!(page_counts(&back), vec![2, 1]);

    // Pages are stored verbatim
    let pages = chapter_pages(&back, "Prologue").unwrap();
    assert_eq!(fs::read(&pages[1]).unwrap(), png(80));
    assert_eq!(fs::read(back.join("cover.png")).unwrap(), png(0));
}

#[test]
fn test_cbz_contains_comic_info() {
    let dir = TempDir::new().unwrap();
    sample_cir(&dir.path().join("original"));
    let cbz = dir.path().join("comic.cbz");
    convert(&dir.path().join("original"), &cbz).unwrap();

    let mut archive = zip::ZipArchive::new(File::open(&cbz).unwrap()).unwrap();
    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    assert!(names.contains(&"comicon.json".to_string()));
    assert!(names.contains(&"cover.png".to_string()));
    assert!(names.contains(&"00001-Prologue/00002.png".to_string()));
    assert!(names.contains(&"00002-Part; TwoThree/00001.png".to_string()));

    let mut info = String::new();
    std::io::Read::read_to_string(&mut archive.by_name("ComicInfo.xml").unwrap(), &mut info)
        .unwrap();
    assert!(info.contains("<Title>The Lost Pages</Title>"));
    assert!(info.contains(r#"<Page Image="2" Bookmark="Part: Two/Three" />"#));
}

#[test]
fn test_epub_round_trip() {
    let dir = TempDir::new().unwrap();
    let original = sample_cir(&dir.path().join("original"));
    let epub = dir.path().join("comic.epub");
    let back = dir.path().join("back");

    convert(&dir.path().join("original"), &epub).unwrap();
    convert(&epub, &back).unwrap();

    validate(&back).unwrap();
    let comic = read_comic(&back).unwrap();
    assert_eq!(comic, original);
    assert_eq!(page_counts(&back), vec![2, 1]);
    let pages = chapter_pages(&back, "Part; TwoThree").unwrap();
    assert_eq!(fs::read(&pages[0]).unwrap(), png(120));
}

/// A CIR whose chapter titles carry characters with a meaning in hrefs
fn awkward_cir(root: &Path) -> Comic {
    let comic = Comic::new(
        Metadata::new("Specials"),
        vec![
            Chapter::new("Issue #1"),
            Chapter::new("Issue #2"),
            Chapter::new("100% Done"),
        ],
    )
    .unwrap();

    let writer = CirWriter::create(root).unwrap();
    writer.write_page("Issue #1", 1, "png", &png(10)).unwrap();
    writer.write_page("Issue #1", 2, "png", &png(20)).unwrap();
    writer.write_page("Issue #2", 1, "png", &png(30)).unwrap();
    writer.write_page("100% Done", 1, "png", &png(40)).unwrap();
    writer.finish(&comic).unwrap();
    comic
}

#[test]
fn test_round_trips_keep_hash_and_percent_chapters() {
    for ext in ["epub", "cbz", "pdf"] {
        let dir = TempDir::new().unwrap();
        let original = awkward_cir(&dir.path().join("original"));
        let file = dir.path().join(format!("specials.{ext}"));
        let back = dir.path().join("back");

        convert(&dir.path().join("original"), &file).unwrap();
        convert(&file, &back).unwrap();

        validate(&back).unwrap();
        assert_eq!(read_comic(&back).unwrap(), original, "through {ext}");
        assert_eq!(page_counts(&back), vec![2, 1, 1], "through {ext}");
    }
}

#[test]
fn test_epub_folders_are_href_safe() {
    let dir = TempDir::new().unwrap();
    awkward_cir(&dir.path().join("original"));
    let epub = dir.path().join("specials.epub");
    convert(&dir.path().join("original"), &epub).unwrap();

    let archive = zip::ZipArchive::new(File::open(&epub).unwrap()).unwrap();
    let names: Vec<&str> = archive.file_names().collect();
    assert!(names.contains(&"OEBPS/img/00001-Issue__1/00002.png"));
    assert!(names.contains(&"OEBPS/img/00003-100__Done/00001.png"));
    assert!(names
        .iter()
        .filter(|name| name.starts_with("OEBPS/img/") || name.starts_with("OEBPS/pages/"))
        .all(|name| !name.contains('#') && !name.contains('%')));
}

#[test]
fn test_pdf_round_trip() {
    let dir = TempDir::new().unwrap();
    let original = sample_cir(&dir.path().join("original"));
    let pdf = dir.path().join("comic.pdf");
    let back = dir.path().join("back");

    convert(&dir.path().join("original"), &pdf).unwrap();
    convert(&pdf, &back).unwrap();

    validate(&back).unwrap();
    let comic = read_comic(&back).unwrap();
    assert_eq!(comic, original);
    assert_eq!(page_counts(&back), vec![2, 1]);

    // PNG pages are re-encoded, so compare pixels rather than bytes
    let pages = chapter_pages(&back, "Prologue").unwrap();
    let page = image::open(&pages[0]).unwrap().to_rgb8();
    let expected = image::load_from_memory(&png(40)).unwrap().to_rgb8();
    assert_eq!(page, expected);
}

#[test]
fn test_pdf_keeps_jpeg_data() {
    let dir = TempDir::new().unwrap();
    let cir = dir.path().join("original");
    let jpeg = image_bytes(16, 16, 200, ImageFormat::Jpeg);
    let writer = CirWriter::create(&cir).unwrap();
    writer.write_page("Only", 1, "jpg", &jpeg).unwrap();
    writer.write_page("Only", 2, "jpg", &jpeg).unwrap();
    writer
        .finish(&Comic::new(Metadata::new("Photos"), vec![Chapter::new("Only")]).unwrap())
        .unwrap();

    let pdf = dir.path().join("photos.pdf");
    let back = dir.path().join("back");
    convert(&cir, &pdf).unwrap();
    convert(&pdf, &back).unwrap();

    let pages = chapter_pages(&back, "Only").unwrap();
    assert_eq!(pages.len(), 2);
    assert!(pages[0].ends_with("00001.jpg"));
    assert_eq!(fs::read(&pages[0]).unwrap(), jpeg);
}

#[test]
fn test_pdf_document_info() {
    let dir = TempDir::new().unwrap();
    sample_cir(&dir.path().join("original"));
    let pdf = dir.path().join("comic.pdf");
    convert(&dir.path().join("original"), &pdf).unwrap();

    let doc = Document::load(&pdf).unwrap();
    assert_eq!(doc.get_pages().len(), 4);
    let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
    let info = doc.get_object(info_id).unwrap().as_dict().unwrap();
    assert_eq!(info.get(b"Producer").unwrap().as_str().unwrap(), b"comicon");
    assert_eq!(
        info.get(b"Author").unwrap().as_str().unwrap(),
        b"Ada Ink, Ben Brush"
    );
    let creator = info.get(b"Creator").unwrap().as_str().unwrap();
    let embedded = Comic::from_slice(creator).unwrap();
    assert_eq!(
        embedded.metadata.extra_metadata.get("pdf_pages"),
        Some(&serde_json::json!([2, 1]))
    );
}

#[test]
fn test_self_conversion_is_a_noop() {
    let dir = TempDir::new().unwrap();
    let cir = dir.path().join("comic");
    sample_cir(&cir);
    let before = fs::read(cir.join("comicon.json")).unwrap();

    convert(&cir, &cir).unwrap();
    convert(&cir, &dir.path().join("comic").join(".")).unwrap();

    assert_eq!(fs::read(cir.join("comicon.json")).unwrap(), before);
    assert_eq!(fs::read_dir(&cir).unwrap().count(), 4);
}

#[test]
fn test_progress_totals_per_stage() {
    let dir = TempDir::new().unwrap();
    sample_cir(&dir.path().join("original"));
    let cbz = dir.path().join("comic.cbz");

    let mut events = Vec::new();
    convert_with_progress(&dir.path().join("original"), &cbz, &mut |stage, event| {
        events.push((stage, event))
    })
    .unwrap();

    // CIR import counts files, CBZ export counts pages
    assert_eq!(events[0], (Stage::Import, ProgressEvent::Total(5)));
    let export_start = events
        .iter()
        .position(|(stage, _)| *stage == Stage::Export)
        .unwrap();
    assert_eq!(events[export_start], (Stage::Export, ProgressEvent::Total(3)));
    assert_eq!(events.len(), 1 + 5 + 1 + 3);
}

// =============================================================================
// Foreign Sources
// =============================================================================

#[test]
fn test_foreign_cbz_with_bookmarks() {
    let dir = TempDir::new().unwrap();
    let cbz = dir.path().join("Loose Leaves.cbz");
    let info = r#"<?xml version="1.0"?>
<ComicInfo>
  <Title>Loose Leaves</Title>
  <Writer>Cam Quill, Dee Pen</Writer>
  <Pages>
    <Page Image="0" Type="FrontCover" />
    <Page Image="1" Bookmark="Start" />
    <Page Image="2" />
    <Page Image="3" Bookmark="Later" />
  </Pages>
</ComicInfo>"#;
    write_zip(
        &cbz,
        &[
            ("ComicInfo.xml", info.as_bytes()),
            ("000_cover.png", &png(0)),
            ("001.png", &png(10)),
            ("002.png", &png(20)),
            ("003.png", &png(30)),
            ("notes.txt", b"not a page"),
        ],
    );

    let back = dir.path().join("back");
    convert(&cbz, &back).unwrap();

    validate(&back).unwrap();
    let comic = read_comic(&back).unwrap();
    assert_eq!(comic.title(), "Loose Leaves");
    assert_eq!(comic.metadata.authors, vec!["Cam Quill", "Dee Pen"]);
    assert_eq!(comic.metadata.cover_path_rel.as_deref(), Some("cover.png"));
    assert_eq!(chapter_titles(&comic), vec!["Start", "Later"]);
    assert_eq!(page_counts(&back), vec![2, 1]);
    assert_eq!(fs::read(back.join("cover.png")).unwrap(), png(0));
}

#[test]
fn test_foreign_cbz_without_metadata() {
    let dir = TempDir::new().unwrap();
    let cbz = dir.path().join("bare.cbz");
    write_zip(&cbz, &[("b/02.png", &png(2)), ("a/01.png", &png(1))]);

    let back = dir.path().join("back");
    convert(&cbz, &back).unwrap();

    let comic = read_comic(&back).unwrap();
    assert_eq!(comic.title(), "bare");
    assert_eq!(chapter_titles(&comic), vec!["Chapter 1"]);
    assert!(comic.metadata.cover_path_rel.is_none());
    let pages = chapter_pages(&back, "Chapter 1").unwrap();
    assert_eq!(fs::read(&pages[0]).unwrap(), png(1));
}

#[test]
fn test_cbz_without_images() {
    let dir = TempDir::new().unwrap();
    let cbz = dir.path().join("empty.cbz");
    write_zip(&cbz, &[("readme.txt", b"nothing here")]);

    let err = convert(&cbz, &dir.path().join("back")).unwrap_err();
    assert!(matches!(err, ComiconError::Format(FormatError::NoPages(_))));
    assert!(!dir.path().join("back").join("comicon.json").exists());
}

#[test]
fn test_foreign_epub_with_ncx() {
    let dir = TempDir::new().unwrap();
    let epub = dir.path().join("foreign.epub");

    let container = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;
    let opf = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Harbour Lights</dc:title>
    <dc:creator>Eve Etch</dc:creator>
    <dc:subject>Drama</dc:subject>
    <meta name="cover" content="cover-img"/>
  </metadata>
  <manifest>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="cover-img" href="images/cover.png" media-type="image/png"/>
    <item id="p1" href="text/p1.xhtml" media-type="application/xhtml+xml"/>
    <item id="p2" href="text/p2.xhtml" media-type="application/xhtml+xml"/>
    <item id="p3" href="text/p3.xhtml" media-type="application/xhtml+xml"/>
    <item id="i1" href="images/one.png" media-type="image/png"/>
    <item id="i2" href="images/two.png" media-type="image/png"/>
    <item id="i3" href="images/three.png" media-type="image/png"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="p1"/>
    <itemref idref="p2"/>
    <itemref idref="p3"/>
  </spine>
</package>"#;
    let ncx = r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <navMap>
    <navPoint id="n1" playOrder="1">
      <navLabel><text>Arrival</text></navLabel>
      <content src="text/p1.xhtml"/>
    </navPoint>
    <navPoint id="n2" playOrder="2">
      <navLabel><text>Departure</text></navLabel>
      <content src="text/p3.xhtml#top"/>
    </navPoint>
  </navMap>
</ncx>"#;
    let page = |image: &str| {
        format!(
            r#"<html xmlns="http://www.w3.org/1999/xhtml"><body><img src="../images/{}" alt=""/></body></html>"#,
            image
        )
    };
    let (p1, p2, p3) = (page("one.png"), page("two.png"), page("three.png"));

    write_zip(
        &epub,
        &[
            ("mimetype", b"application/epub+zip"),
            ("META-INF/container.xml", container.as_bytes()),
            ("OEBPS/content.opf", opf.as_bytes()),
            ("OEBPS/toc.ncx", ncx.as_bytes()),
            ("OEBPS/text/p1.xhtml", p1.as_bytes()),
            ("OEBPS/text/p2.xhtml", p2.as_bytes()),
            ("OEBPS/text/p3.xhtml", p3.as_bytes()),
            ("OEBPS/images/cover.png", &png(0)),
            ("OEBPS/images/one.png", &png(1)),
            ("OEBPS/images/two.png", &png(2)),
            ("OEBPS/images/three.png", &png(3)),
        ],
    );

    let back = dir.path().join("back");
    convert(&epub, &back).unwrap();

    validate(&back).unwrap();
    let comic = read_comic(&back).unwrap();
    assert_eq!(comic.title(), "Harbour Lights");
    assert_eq!(comic.metadata.authors, vec!["Eve Etch"]);
    assert_eq!(comic.metadata.genres, vec!["Drama"]);
    assert_eq!(comic.metadata.cover_path_rel.as_deref(), Some("cover.png"));
    assert_eq!(chapter_titles(&comic), vec!["Arrival", "Departure"]);
    assert_eq!(page_counts(&back), vec![2, 1]);
    let pages = chapter_pages(&back, "Departure").unwrap();
    assert_eq!(fs::read(&pages[0]).unwrap(), png(3));
}

#[test]
fn test_foreign_pdf_uses_outline() {
    let dir = TempDir::new().unwrap();
    sample_cir(&dir.path().join("original"));
    let pdf = dir.path().join("comic.pdf");
    convert(&dir.path().join("original"), &pdf).unwrap();

    // Drop the producer mark so the embedded comic is ignored
    let mut doc = Document::load(&pdf).unwrap();
    let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
    doc.get_object_mut(info_id)
        .unwrap()
        .as_dict_mut()
        .unwrap()
        .set("Producer", Object::string_literal("another tool"));
    doc.save(&pdf).unwrap();

    let back = dir.path().join("back");
    convert(&pdf, &back).unwrap();

    validate(&back).unwrap();
    let comic = read_comic(&back).unwrap();
    assert_eq!(comic.title(), "The Lost Pages");
    assert_eq!(comic.metadata.authors, vec!["Ada Ink", "Ben Brush"]);
    assert_eq!(comic.metadata.cover_path_rel.as_deref(), Some("cover.png"));
    assert!(comic.metadata.extra_metadata.is_empty());
    assert_eq!(chapter_titles(&comic), vec!["Prologue", "Part: Two/Three"]);
    assert_eq!(page_counts(&back), vec![2, 1]);
}

#[test]
fn test_unsupported_source_format() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("book.docx");
    fs::write(&source, b"not a comic").unwrap();

    let err = convert(&source, &dir.path().join("out.cbz")).unwrap_err();
    assert!(matches!(err, ComiconError::UnsupportedFormat(_)));
}

#[test]
fn test_mobi_cannot_be_imported() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("book.mobi");
    fs::write(&source, b"BOOKMOBI").unwrap();

    let err = convert(&source, &dir.path().join("out")).unwrap_err();
    assert!(matches!(err, ComiconError::UnsupportedFormat(_)));
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_validator_rejections() {
    let dir = TempDir::new().unwrap();

    // Declared chapter without a folder
    let missing = dir.path().join("missing");
    sample_cir(&missing);
    fs::remove_dir_all(missing.join("Prologue")).unwrap();
    assert!(matches!(
        validate(&missing),
        Err(InvalidCirError::UnusedChapter { slugs, .. }) if slugs == vec!["Prologue"]
    ));

    // Empty chapter folder
    let empty = dir.path().join("empty");
    sample_cir(&empty);
    for page in chapter_pages(&empty, "Prologue").unwrap() {
        fs::remove_file(page).unwrap();
    }
    assert!(matches!(validate(&empty), Err(InvalidCirError::EmptyChapter(_))));

    // Non-image file inside a chapter
    let stray = dir.path().join("stray");
    sample_cir(&stray);
    fs::write(stray.join("Prologue").join("notes.txt"), b"x").unwrap();
    assert!(matches!(validate(&stray), Err(InvalidCirError::BadImage(_))));

    // Declared cover that does not exist
    let coverless = dir.path().join("coverless");
    sample_cir(&coverless);
    fs::remove_file(coverless.join("cover.png")).unwrap();
    assert!(matches!(
        validate(&coverless),
        Err(InvalidCirError::FileNotFound(_))
    ));

    // Invalid folders are never exported
    let dest = dir.path().join("out.cbz");
    let err = convert(&coverless, &dest).unwrap_err();
    assert!(matches!(err, ComiconError::InvalidCir(_)));
    assert!(!dest.exists());
}
