//! Comic metadata and the presence-gated merge

use super::slug::slugify;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Comic metadata as stored in the canonical document
///
/// The title slug is derived from the title and is only ever recomputed,
/// never set directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "MetadataRecord")]
pub struct Metadata {
    /// Comic title
    title: String,

    /// Authors, in credit order
    pub authors: Vec<String>,

    /// Summary
    pub description: Option<String>,

    /// Genre tags
    pub genres: Vec<String>,

    /// Cover image path relative to the CIR root
    pub cover_path_rel: Option<String>,

    /// Format-specific round-trip data
    pub extra_metadata: BTreeMap<String, Value>,

    /// Filesystem-safe form of the title (derived)
    title_slug: String,
}

/// On-disk shape of [`Metadata`]; `title_slug` is never read back
#[derive(Deserialize)]
struct MetadataRecord {
    title: String,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    cover_path_rel: Option<String>,
    #[serde(default)]
    extra_metadata: BTreeMap<String, Value>,
}

impl From<MetadataRecord> for Metadata {
    fn from(record: MetadataRecord) -> Self {
        let mut metadata = Metadata::new(record.title);
        metadata.authors = record.authors;
        metadata.description = non_empty(record.description);
        metadata.genres = record.genres;
        metadata.cover_path_rel = non_empty(record.cover_path_rel);
        metadata.extra_metadata = record.extra_metadata;
        metadata
    }
}

impl Metadata {
    /// Create metadata with only a title
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            title_slug: slugify(&title),
            title,
            authors: Vec::new(),
            description: None,
            genres: Vec::new(),
            cover_path_rel: None,
            extra_metadata: BTreeMap::new(),
        }
    }

    /// The comic title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Replace the title, recomputing the slug
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.title_slug = slugify(&self.title);
    }

    /// The filesystem-safe slug derived from the title
    pub fn title_slug(&self) -> &str {
        &self.title_slug
    }

    /// Add an author
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    /// Set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a genre
    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genres.push(genre.into());
        self
    }

    /// Set the cover path
    pub fn with_cover(mut self, cover_path_rel: impl Into<String>) -> Self {
        self.cover_path_rel = Some(cover_path_rel.into());
        self
    }

    /// Merge higher-trust metadata over this one, see [`merge`]
    pub fn merged_with(&self, incoming: &Metadata) -> Metadata {
        merge(self, incoming)
    }
}

/// Combine `base` with higher-trust `incoming` metadata.
///
/// Every field of `incoming` that is non-empty replaces the corresponding
/// field of `base`; empty or missing values never erase what `base` has.
/// Extra metadata is merged key by key with `incoming` winning collisions.
pub fn merge(base: &Metadata, incoming: &Metadata) -> Metadata {
    let mut merged = base.clone();

    if !incoming.title.trim().is_empty() {
        merged.set_title(incoming.title.clone());
    }
    if !incoming.authors.is_empty() {
        merged.authors = incoming.authors.clone();
    }
    if let Some(description) = non_empty(incoming.description.clone()) {
        merged.description = Some(description);
    }
    if !incoming.genres.is_empty() {
        merged.genres = incoming.genres.clone();
    }
    if let Some(cover) = non_empty(incoming.cover_path_rel.clone()) {
        merged.cover_path_rel = Some(cover);
    }
    for (key, value) in &incoming.extra_metadata {
        merged.extra_metadata.insert(key.clone(), value.clone());
    }

    merged
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Split a comma-separated credit list ("A, B,C") into trimmed names
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
