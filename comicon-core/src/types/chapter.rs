//! Chapter type: a display title and the folder it lives in

use super::slug::slugify;
use serde::{Deserialize, Serialize};

/// A single chapter of a comic
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chapter {
    /// Display title
    pub title: String,

    /// Directory name inside the CIR
    pub slug: String,
}

impl Chapter {
    /// Create a chapter whose slug is derived from its title
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            slug: slugify(&title),
            title,
        }
    }

    /// Create a chapter with an explicit slug
    pub fn with_slug(title: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            slug: slug.into(),
        }
    }
}
