//! The Comic type - the root of the canonical document

use super::slug::is_valid_slug;
use super::{Chapter, Metadata};
use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The complete comic description stored in `comicon.json`
///
/// A comic always has at least one chapter and its chapter slugs are
/// pairwise distinct; both are checked on construction and on parse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "ComicRecord")]
pub struct Comic {
    /// Comic metadata (title, authors, etc.)
    pub metadata: Metadata,

    /// Chapters in reading order
    chapters: Vec<Chapter>,
}

#[derive(Deserialize)]
struct ComicRecord {
    metadata: Metadata,
    chapters: Vec<Chapter>,
}

impl TryFrom<ComicRecord> for Comic {
    type Error = ModelError;

    fn try_from(record: ComicRecord) -> Result<Self, Self::Error> {
        Comic::new(record.metadata, record.chapters)
    }
}

impl Comic {
    /// Create a comic, checking the chapter invariants
    pub fn new(metadata: Metadata, chapters: Vec<Chapter>) -> Result<Self, ModelError> {
        if chapters.is_empty() {
            return Err(ModelError::NoChapters);
        }

        let mut seen = HashSet::new();
        for chapter in &chapters {
            if !is_valid_slug(&chapter.slug) {
                return Err(ModelError::InvalidSlug(chapter.title.clone()));
            }
            if !seen.insert(chapter.slug.as_str()) {
                return Err(ModelError::DuplicateSlug(chapter.slug.clone()));
            }
        }

        Ok(Self { metadata, chapters })
    }

    /// Chapters in reading order
    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    /// Get the comic title
    pub fn title(&self) -> &str {
        self.metadata.title()
    }

    /// Parse a canonical document
    pub fn from_json(data: &str) -> serde_json::Result<Self> {
        serde_json::from_str(data)
    }

    /// Parse a canonical document from raw bytes
    pub fn from_slice(data: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(data)
    }

    /// Render the canonical document
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
