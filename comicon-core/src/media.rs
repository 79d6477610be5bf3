//! Accepted page image types and their MIME types

use std::path::Path;

/// Extensions accepted for pages and covers (lowercase, without the dot)
pub const ACCEPTED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "jp2", "png", "gif", "webp"];

/// MIME type for an accepted image extension
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "jp2" => Some("image/jp2"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Lowercase extension of a path, if it has one
pub fn extension_of(path: impl AsRef<Path>) -> Option<String> {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Whether the path has an accepted image extension
pub fn is_accepted_image(path: impl AsRef<Path>) -> bool {
    extension_of(path)
        .map(|ext| ACCEPTED_IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_images() {
        assert!(is_accepted_image("00001.jpg"));
        assert!(is_accepted_image("chapter/00002.PNG"));
        assert!(is_accepted_image("cover.webp"));
        assert!(!is_accepted_image("notes.txt"));
        assert!(!is_accepted_image("README"));
    }

    #[test]
    fn test_mime_mapping() {
        assert_eq!(mime_for_extension("JPEG"), Some("image/jpeg"));
        assert_eq!(mime_for_extension("jp2"), Some("image/jp2"));
        assert_eq!(mime_for_extension("bmp"), None);
    }
}
