//! Error types for Comicon Core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using ComiconError
pub type Result<T> = std::result::Result<T, ComiconError>;

/// Top-level error type for all Comicon operations
#[derive(Debug, Error)]
pub enum ComiconError {
    #[error("Invalid CIR: {0}")]
    InvalidCir(#[from] InvalidCirError),

    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("Invalid comic: {0}")]
    Model(#[from] ModelError),

    #[error("Path does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Is a directory: {}", .0.display())]
    IsADirectory(PathBuf),

    #[error("Destination already exists and is not empty: {}", .0.display())]
    DestinationNotEmpty(PathBuf),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised when a folder does not satisfy the CIR invariants
#[derive(Debug, Error)]
pub enum InvalidCirError {
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("Invalid CIR data in {}: {reason}", .path.display())]
    InvalidData { path: PathBuf, reason: String },

    #[error("No chapter folders found in {}", .0.display())]
    NoChapters(PathBuf),

    #[error("Chapters were declared in {} but were not found in the filesystem: {}", .path.display(), .slugs.join(", "))]
    UnusedChapter { path: PathBuf, slugs: Vec<String> },

    #[error("{} is empty", .0.display())]
    EmptyChapter(PathBuf),

    #[error("{} is not an accepted image", .0.display())]
    BadImage(PathBuf),

    #[error("{} does not exist but is declared in the CIR data file", .0.display())]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Violations of the Comic model invariants
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("a comic needs at least one chapter")]
    NoChapters,

    #[error("chapter '{0}' has an unusable slug")]
    InvalidSlug(String),

    #[error("chapter slug '{0}' is used more than once")]
    DuplicateSlug(String),
}

/// Errors that occur while decoding or encoding an external container format
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    #[error("Invalid EPUB: {0}")]
    InvalidPackage(String),

    #[error("Invalid PDF: {0}")]
    InvalidDocument(String),

    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    #[error("No pages found in {}", .0.display())]
    NoPages(PathBuf),

    #[error("{tool}: {message}")]
    ExternalTool { tool: String, message: String },
}

impl From<zip::result::ZipError> for FormatError {
    fn from(err: zip::result::ZipError) -> Self {
        FormatError::InvalidArchive(err.to_string())
    }
}

impl From<zip::result::ZipError> for ComiconError {
    fn from(err: zip::result::ZipError) -> Self {
        ComiconError::Format(err.into())
    }
}
