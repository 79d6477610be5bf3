//! Comicon Core Library
//!
//! This crate converts comics between CBZ, EPUB, PDF, MOBI and the Comicon
//! Intermediate Representation (CIR). Every conversion imports the source
//! into a CIR folder, validates it and exports it to the target format, so
//! chapter reconstruction and validation live in exactly one place.
//!
//! Files written by this crate carry the canonical document with them and
//! convert back without losing chapter or page structure.

pub mod chapters;
pub mod cir;
pub mod comic_info;
pub mod convert;
pub mod error;
pub mod exporter;
pub mod format;
pub mod importer;
pub mod media;
pub mod pdf;
pub mod progress;
pub mod types;

mod epub;
mod xml;

pub use convert::{convert, convert_with_progress, create_cir, create_comic, Stage};
pub use error::{ComiconError, FormatError, InvalidCirError, ModelError, Result};
pub use format::Format;
pub use progress::{Progress, ProgressEvent, Tracker};
pub use types::{merge, Chapter, Comic, Metadata};
