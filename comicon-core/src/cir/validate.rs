//! CIR folder validation

use super::{read_comic, DATA_FILE};
use crate::error::InvalidCirError;
use crate::media::is_accepted_image;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Check that a folder is a well-formed CIR.
///
/// Checks run in a fixed order and the first failure is returned:
/// the folder exists, the canonical document parses, at least one chapter
/// folder exists, every declared chapter has a folder, every chapter folder
/// holds only accepted images (and at least one), and the declared cover
/// exists with an accepted extension. Nothing is written.
pub fn validate(path: &Path) -> Result<(), InvalidCirError> {
    if !path.is_dir() {
        return Err(InvalidCirError::NotADirectory(path.to_path_buf()));
    }

    let comic = read_comic(path)?;

    let mut chapter_folders: Vec<PathBuf> = fs::read_dir(path)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    chapter_folders.sort();

    if chapter_folders.is_empty() {
        return Err(InvalidCirError::NoChapters(path.to_path_buf()));
    }

    let folder_names: BTreeSet<String> = chapter_folders
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect();
    let missing: Vec<String> = comic
        .chapters()
        .iter()
        .map(|c| c.slug.clone())
        .filter(|slug| !folder_names.contains(slug))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if !missing.is_empty() {
        return Err(InvalidCirError::UnusedChapter {
            path: path.join(DATA_FILE),
            slugs: missing,
        });
    }

    for folder in &chapter_folders {
        let mut images: Vec<PathBuf> = fs::read_dir(folder)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        images.sort();

        if images.is_empty() {
            return Err(InvalidCirError::EmptyChapter(folder.clone()));
        }
        if let Some(bad) = images.iter().find(|image| !is_accepted_image(image)) {
            return Err(InvalidCirError::BadImage(bad.clone()));
        }
    }

    if let Some(cover) = &comic.metadata.cover_path_rel {
        let cover_path = path.join(cover);
        if !cover_path.is_file() {
            return Err(InvalidCirError::FileNotFound(cover_path));
        }
        if !is_accepted_image(&cover_path) {
            return Err(InvalidCirError::BadImage(cover_path));
        }
    }

    tracing::debug!(
        "Validated CIR {:?}: '{}' with {} chapters",
        path,
        comic.title(),
        comic.chapters().len()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cir::write_comic;
    use crate::types::{Chapter, Comic, Metadata};
    use tempfile::TempDir;

    fn sample_cir(chapters: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        let comic = Comic::new(
            Metadata::new("Sample"),
            chapters.iter().map(|c| Chapter::new(*c)).collect(),
        )
        .unwrap();
        write_comic(dir.path(), &comic).unwrap();
        for chapter in chapters {
            let folder = dir.path().join(chapter);
            fs::create_dir(&folder).unwrap();
            fs::write(folder.join("00001.png"), b"png").unwrap();
        }
        dir
    }

    #[test]
    fn test_valid_cir() {
        let dir = sample_cir(&["One", "Two"]);
        validate(dir.path()).unwrap();
    }

    #[test]
    fn test_missing_data_file() {
        let dir = sample_cir(&["One"]);
        fs::remove_file(dir.path().join(DATA_FILE)).unwrap();
        assert!(matches!(
            validate(dir.path()),
            Err(InvalidCirError::InvalidData { .. })
        ));
    }

    #[test]
    fn test_not_a_directory() {
        let dir = sample_cir(&["One"]);
        let file = dir.path().join(DATA_FILE);
        assert!(matches!(
            validate(&file),
            Err(InvalidCirError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_no_chapter_folders() {
        let dir = sample_cir(&["One"]);
        fs::remove_dir_all(dir.path().join("One")).unwrap();
        assert!(matches!(
            validate(dir.path()),
            Err(InvalidCirError::NoChapters(_))
        ));
    }

    #[test]
    fn test_declared_chapter_without_folder() {
        let dir = sample_cir(&["One", "Two"]);
        fs::remove_dir_all(dir.path().join("Two")).unwrap();
        match validate(dir.path()) {
            Err(InvalidCirError::UnusedChapter { slugs, .. }) => assert_eq!(slugs, vec!["Two"]),
            other => panic!("Expected UnusedChapter, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_chapter() {
        let dir = sample_cir(&["One"]);
        fs::remove_file(dir.path().join("One").join("00001.png")).unwrap();
        assert!(matches!(
            validate(dir.path()),
            Err(InvalidCirError::EmptyChapter(_))
        ));
    }

    #[test]
    fn test_non_image_in_chapter() {
        let dir = sample_cir(&["One"]);
        fs::write(dir.path().join("One").join("notes.txt"), b"hi").unwrap();
        assert!(matches!(
            validate(dir.path()),
            Err(InvalidCirError::BadImage(_))
        ));
    }

    #[test]
    fn test_declared_cover_missing() {
        let dir = TempDir::new().unwrap();
        let comic = Comic::new(
            Metadata::new("Covered").with_cover("cover.jpg"),
            vec![Chapter::new("One")],
        )
        .unwrap();
        write_comic(dir.path(), &comic).unwrap();
        fs::create_dir(dir.path().join("One")).unwrap();
        fs::write(dir.path().join("One").join("00001.jpg"), b"jpg").unwrap();

        assert!(matches!(
            validate(dir.path()),
            Err(InvalidCirError::FileNotFound(_))
        ));

        fs::write(dir.path().join("cover.jpg"), b"jpg").unwrap();
        validate(dir.path()).unwrap();
    }

    #[test]
    fn test_cover_with_bad_extension() {
        let dir = TempDir::new().unwrap();
        let comic = Comic::new(
            Metadata::new("Covered").with_cover("cover.txt"),
            vec![Chapter::new("One")],
        )
        .unwrap();
        write_comic(dir.path(), &comic).unwrap();
        fs::create_dir(dir.path().join("One")).unwrap();
        fs::write(dir.path().join("One").join("00001.jpg"), b"jpg").unwrap();
        fs::write(dir.path().join("cover.txt"), b"not an image").unwrap();

        assert!(matches!(
            validate(dir.path()),
            Err(InvalidCirError::BadImage(_))
        ));
    }
}
