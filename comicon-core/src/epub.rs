//! Package layout shared by the EPUB importer and exporter

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Folder (relative to the package document) holding the canonical document
pub const STATIC_DIR: &str = "static";

/// Folder (relative to the package document) holding page images,
/// one subfolder per chapter
pub const IMAGE_DIR: &str = "img";

/// Folder (relative to the package document) holding one XHTML file per page
pub const PAGE_DIR: &str = "pages";

/// Characters escaped when a path is used as an href
const HREF: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Percent-encode the characters of a path that are not allowed in an href.
/// Non-ASCII characters are always encoded.
pub(crate) fn encode_href(path: &str) -> String {
    utf8_percent_encode(path, HREF).to_string()
}

/// Package folder name of the chapter at `index`: `{NNNNN}-{slug}`.
///
/// The builder uses one string as both zip entry name and manifest href,
/// so slug characters that would need escaping in an href become `_`.
pub(crate) fn chapter_folder(index: usize, slug: &str) -> String {
    let safe: String = slug
        .chars()
        .map(|c| match c {
            ' ' | '"' | '#' | '%' | '<' | '>' | '?' | '\\' | '^' | '`' | '{' | '|' | '}' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("{:05}-{}", index + 1, safe)
}
