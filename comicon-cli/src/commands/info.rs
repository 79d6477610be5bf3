//! Info command implementation

use super::load;
use anyhow::{Context, Result};
use comicon_core::cir::chapter_pages;
use serde::Serialize;
use std::path::Path;

/// Chapter summary
#[derive(Serialize)]
struct ChapterInfo {
    title: String,
    slug: String,
    pages: usize,
}

/// Comic info output
#[derive(Serialize)]
struct ComicInfo {
    title: String,
    authors: Vec<String>,
    description: Option<String>,
    genres: Vec<String>,
    cover: Option<String>,
    pages: usize,
    chapters: Vec<ChapterInfo>,
}

/// Display information about a comic
pub fn info(input: &Path, json: bool) -> Result<()> {
    let loaded = load(input)?;
    let metadata = &loaded.comic.metadata;

    let chapters = loaded
        .comic
        .chapters()
        .iter()
        .map(|chapter| {
            let pages = chapter_pages(&loaded.cir, &chapter.slug)
                .with_context(|| format!("Failed to list pages of '{}'", chapter.title))?;
            Ok(ChapterInfo {
                title: chapter.title.clone(),
                slug: chapter.slug.clone(),
                pages: pages.len(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let info = ComicInfo {
        title: metadata.title().to_string(),
        authors: metadata.authors.clone(),
        description: metadata.description.clone(),
        genres: metadata.genres.clone(),
        cover: metadata.cover_path_rel.clone(),
        pages: chapters.iter().map(|c| c.pages).sum(),
        chapters,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("Title:       {}", info.title);
        if !info.authors.is_empty() {
            println!("Authors:     {}", info.authors.join(", "));
        }
        if let Some(desc) = &info.description {
            println!("Description: {}", desc);
        }
        if !info.genres.is_empty() {
            println!("Genres:      {}", info.genres.join(", "));
        }
        if let Some(cover) = &info.cover {
            println!("Cover:       {}", cover);
        }
        println!("Pages:       {}", info.pages);
        println!("Chapters:    {}", info.chapters.len());
        for (i, chapter) in info.chapters.iter().enumerate() {
            println!("  {:>3}. {} ({} pages)", i + 1, chapter.title, chapter.pages);
        }
    }

    Ok(())
}
