//! Snapshot tests for comicon-core using insta
//!
//! These tests capture the canonical document and the ComicInfo.xml that
//! other tools read, to detect unintended changes in either format.

use comicon_core::chapters::{reconstruct, ChapterHint};
use comicon_core::comic_info::ComicInfo;
use comicon_core::{Chapter, Comic, Metadata};

/// Helper to create a sample comic for testing
fn sample_comic() -> Comic {
    let mut metadata = Metadata::new("The Lost Pages")
        .with_author("Ada Ink")
        .with_author("Ben Brush")
        .with_description("Two short stories.")
        .with_genre("Adventure")
        .with_cover("cover.png");
    metadata
        .extra_metadata
        .insert("source".to_string(), serde_json::json!("scan"));

    Comic::new(
        metadata,
        vec![Chapter::new("Prologue"), Chapter::new("Part: Two/Three")],
    )
    .unwrap()
}

#[test]
fn test_canonical_document() {
    let json = sample_comic().to_json().unwrap();
    insta::assert_snapshot!(json, @r###"
    {
      "metadata": {
        "title": "The Lost Pages",
        "authors": [
          "Ada Ink",
          "Ben Brush"
        ],
        "description": "Two short stories.",
        "genres": [
          "Adventure"
        ],
        "cover_path_rel": "cover.png",
        "extra_metadata": {
          "source": "scan"
        },
        "title_slug": "The Lost Pages"
      },
      "chapters": [
        {
          "title": "Prologue",
          "slug": "Prologue"
        },
        {
          "title": "Part: Two/Three",
          "slug": "Part; TwoThree"
        }
      ]
    }
    "###);
}

#[test]
fn test_minimal_canonical_document() {
    let comic = Comic::new(Metadata::new("Solo"), vec![Chapter::new("Chapter 1")]).unwrap();
    insta::assert_snapshot!(comic.to_json().unwrap(), @r###"
    {
      "metadata": {
        "title": "Solo",
        "authors": [],
        "description": null,
        "genres": [],
        "cover_path_rel": null,
        "extra_metadata": {},
        "title_slug": "Solo"
      },
      "chapters": [
        {
          "title": "Chapter 1",
          "slug": "Chapter 1"
        }
      ]
    }
    "###);
}

#[test]
fn test_comic_info_xml() {
    let comic = sample_comic();
    let spans = reconstruct(
        3,
        vec![
            ChapterHint::new("Prologue", 0),
            ChapterHint::new("Part: Two/Three", 2),
        ],
    );
    let xml = ComicInfo::from_comic(&comic, &spans).to_xml();
    insta::assert_snapshot!(xml, @r###"
    <?xml version="1.0" encoding="utf-8"?>
    <ComicInfo xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:xsd="http://www.w3.org/2001/XMLSchema">
      <Title>The Lost Pages</Title>
      <Summary>Two short stories.</Summary>
      <Writer>Ada Ink, Ben Brush</Writer>
      <Genre>Adventure</Genre>
      <PageCount>3</PageCount>
      <Pages>
        <Page Image="0" Bookmark="Prologue" />
        <Page Image="1" />
        <Page Image="2" Bookmark="Part: Two/Three" />
      </Pages>
    </ComicInfo>
    "###);
}
