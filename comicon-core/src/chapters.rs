//! Chapter boundary reconstruction
//!
//! Several formats only expose a flat, ordered list of pages plus sparse
//! "chapter starts here" hints (ComicInfo bookmarks, EPUB TOC entries, PDF
//! outlines). These helpers turn that into per-chapter page ranges.

use crate::types::{slugify, Chapter};
use std::collections::HashSet;
use std::ops::Range;

/// Title of the chapter synthesized when a source has no chapter hints
pub const DEFAULT_CHAPTER_TITLE: &str = "Chapter 1";

/// A chapter title and the global index of its first page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterHint {
    pub title: String,
    pub start: usize,
}

impl ChapterHint {
    pub fn new(title: impl Into<String>, start: usize) -> Self {
        Self {
            title: title.into(),
            start,
        }
    }
}

/// A chapter and the half-open range of global page indices it owns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterSpan {
    pub chapter: Chapter,
    pub pages: Range<usize>,
}

impl ChapterSpan {
    /// Number of pages in the chapter
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether the chapter owns no pages
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Group `page_count` pages into chapters using start hints.
///
/// Without hints a single [`DEFAULT_CHAPTER_TITLE`] chapter spans every
/// page. Otherwise hints are ordered by start index (ties keep their
/// discovery order) and each chapter runs until the next one starts, the
/// last one until the end. Pages before the first hint belong to the first
/// chapter. Hints past the end produce empty spans; see [`without_empty`].
pub fn reconstruct(page_count: usize, mut hints: Vec<ChapterHint>) -> Vec<ChapterSpan> {
    if hints.is_empty() {
        return vec![ChapterSpan {
            chapter: Chapter::new(DEFAULT_CHAPTER_TITLE),
            pages: 0..page_count,
        }];
    }

    hints.sort_by_key(|hint| hint.start);

    let mut bounds: Vec<usize> = hints
        .iter()
        .map(|hint| hint.start.min(page_count))
        .collect();
    bounds[0] = 0;
    bounds.push(page_count);

    unique_chapters(hints.iter().map(|hint| hint.title.as_str()))
        .into_iter()
        .enumerate()
        .map(|(i, chapter)| ChapterSpan {
            chapter,
            pages: bounds[i]..bounds[i + 1],
        })
        .collect()
}

/// Slice `page_count` pages into consecutive chapters of known sizes.
///
/// The last chapter absorbs any pages beyond the recorded counts; chapters
/// without a recorded count get no pages.
pub fn split_by_counts(
    chapters: &[Chapter],
    counts: &[usize],
    page_count: usize,
) -> Vec<ChapterSpan> {
    let mut start = 0;
    chapters
        .iter()
        .enumerate()
        .map(|(i, chapter)| {
            let end = if i + 1 == chapters.len() {
                page_count
            } else {
                (start + counts.get(i).copied().unwrap_or(0)).min(page_count)
            };
            let span = ChapterSpan {
                chapter: chapter.clone(),
                pages: start..end,
            };
            start = end;
            span
        })
        .collect()
}

/// Drop chapters that ended up with no pages
pub fn without_empty(spans: Vec<ChapterSpan>) -> Vec<ChapterSpan> {
    spans.into_iter().filter(|span| !span.is_empty()).collect()
}

/// Build chapters from titles, suffixing repeated slugs with `-2`, `-3`, ...
pub fn unique_chapters<'a>(titles: impl IntoIterator<Item = &'a str>) -> Vec<Chapter> {
    let mut used = HashSet::new();
    titles
        .into_iter()
        .map(|title| {
            let base = slugify(title);
            let mut slug = base.clone();
            let mut n = 2;
            while !used.insert(slug.clone()) {
                slug = format!("{base}-{n}");
                n += 1;
            }
            Chapter::with_slug(title, slug)
        })
        .collect()
}

/// File name of the `number`th page (1-based) of a chapter
pub fn page_file_name(number: usize, ext: &str) -> String {
    format!("{number:05}.{ext}")
}
