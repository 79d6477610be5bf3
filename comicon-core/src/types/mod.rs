//! Core types for the Comicon Intermediate Representation (CIR)

mod chapter;
mod comic;
mod metadata;
mod slug;

pub use chapter::Chapter;
pub use comic::Comic;
pub use metadata::{merge, split_list, Metadata};
pub use slug::{slugify, FALLBACK_SLUG};
