//! Filesystem-safe slugs derived from titles

/// Slug used when a title has no usable characters left
pub const FALLBACK_SLUG: &str = "untitled";

/// Derive a filesystem-safe directory name from a title.
///
/// Characters from any script are kept as-is. Only characters that are
/// illegal on common filesystems are touched:
///
/// | input | output |
/// |-------|--------|
/// | `:` | `;` |
/// | `/ ? \| < > " \ !` | removed |
/// | `*` | `x` |
/// | `'` | `` ` `` |
///
/// Control characters are dropped, whitespace runs collapse to a single
/// space, and leading/trailing whitespace and trailing dots are trimmed.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_space = false;

    for ch in title.chars() {
        if ch.is_whitespace() {
            pending_space = !slug.is_empty();
            continue;
        }

        let mapped = match ch {
            ':' => ';',
            '/' | '?' | '|' | '<' | '>' | '"' | '\\' | '!' => continue,
            '*' => 'x',
            '\'' => '`',
            c if c.is_control() => continue,
            c => c,
        };

        if pending_space {
            slug.push(' ');
            pending_space = false;
        }
        slug.push(mapped);
    }

    let trimmed = slug.trim_end_matches(|c: char| c == '.' || c == ' ');
    if trimmed.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Whether a slug can be used as a single directory name
pub(crate) fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug != "."
        && slug != ".."
        && !slug.contains(|c: char| c == '/' || c == '\\')
        && !slug.chars().any(char::is_control)
}
