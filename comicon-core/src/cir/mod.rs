//! Tools for working with the Comicon Intermediate Representation (CIR)
//!
//! A CIR is a folder containing:
//!
//! - `comicon.json`: the canonical document (see [`Comic`])
//! - `{chapter-slug}/`: one folder per declared chapter holding its pages
//!   as `00001.{ext}`, `00002.{ext}`, ... in reading order (at least one)
//! - an optional cover image at the declared `cover_path_rel`
//!
//! Any other file in the root is ignored.

mod validate;
mod writer;

pub use validate::validate;
pub use writer::CirWriter;

use crate::error::{ComiconError, InvalidCirError, Result};
use crate::progress::Progress;
use crate::types::Comic;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the canonical document inside a CIR folder
pub const DATA_FILE: &str = "comicon.json";

/// Read and parse the canonical document of a CIR folder
pub fn read_comic(cir: &Path) -> std::result::Result<Comic, InvalidCirError> {
    let data_file = cir.join(DATA_FILE);
    let data = fs::read(&data_file).map_err(|e| InvalidCirError::InvalidData {
        path: data_file.clone(),
        reason: e.to_string(),
    })?;
    Comic::from_slice(&data).map_err(|e| InvalidCirError::InvalidData {
        path: data_file,
        reason: e.to_string(),
    })
}

/// Write the canonical document into a CIR folder
pub fn write_comic(cir: &Path, comic: &Comic) -> Result<()> {
    fs::write(cir.join(DATA_FILE), comic.to_json()?)?;
    Ok(())
}

/// Files of a chapter folder in page order
pub fn chapter_pages(cir: &Path, slug: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut pages: Vec<PathBuf> = fs::read_dir(cir.join(slug))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    pages.sort();
    Ok(pages)
}

/// Whether two paths name the same existing folder
pub(crate) fn same_folder(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Copy a whole CIR folder into a missing or empty `dest`.
///
/// One progress unit per file; the canonical document is copied last.
pub(crate) fn copy_tree(source: &Path, dest: &Path, progress: Progress<'_>) -> Result<()> {
    if !source.is_dir() {
        return Err(ComiconError::NotADirectory(source.to_path_buf()));
    }
    let writer = CirWriter::create(dest)?;

    let mut files = Vec::new();
    collect_files(source, Path::new(""), &mut files)?;
    files.sort_by_key(|rel| rel.as_path() == Path::new(DATA_FILE));

    let mut tracker = progress.start(files.len());
    for rel in &files {
        let target = writer.root().join(rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source.join(rel), &target)?;
        tracker.item(rel.to_string_lossy());
    }

    tracing::debug!("Copied {} files from {:?} to {:?}", files.len(), source, dest);
    Ok(())
}

fn collect_files(root: &Path, rel: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    let mut entries: Vec<_> = fs::read_dir(root.join(rel))?
        .filter_map(|e| e.ok())
        .collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let child = rel.join(entry.file_name());
        if entry.path().is_dir() {
            collect_files(root, &child, files)?;
        } else {
            files.push(child);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressEvent;
    use crate::types::{Chapter, Metadata};
    use tempfile::TempDir;

    #[test]
    fn test_copy_tree_copies_data_file_last() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source");
        fs::create_dir_all(source.join("One")).unwrap();
        fs::write(source.join("One").join("00001.png"), b"png").unwrap();
        let comic = Comic::new(Metadata::new("Copy"), vec![Chapter::new("One")]).unwrap();
        write_comic(&source, &comic).unwrap();

        let mut events = Vec::new();
        let mut sink = |event: ProgressEvent| events.push(event);
        copy_tree(&source, &dir.path().join("dest"), Progress::new(&mut sink)).unwrap();

        validate(&dir.path().join("dest")).unwrap();
        assert_eq!(events.first(), Some(&ProgressEvent::Total(2)));
        assert_eq!(
            events.last(),
            Some(&ProgressEvent::Item(DATA_FILE.to_string()))
        );
    }

    #[test]
    fn test_same_folder() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a");
        fs::create_dir(&nested).unwrap();
        assert!(same_folder(&nested, &dir.path().join("a").join("..").join("a")));
        assert!(!same_folder(&nested, dir.path()));
        assert!(!same_folder(&nested, &dir.path().join("missing")));
    }

    #[test]
    fn test_chapter_pages_are_sorted() {
        let dir = TempDir::new().unwrap();
        let chapter = dir.path().join("One");
        fs::create_dir(&chapter).unwrap();
        fs::write(chapter.join("00002.png"), b"2").unwrap();
        fs::write(chapter.join("00001.png"), b"1").unwrap();
        let pages = chapter_pages(dir.path(), "One").unwrap();
        assert!(pages[0].ends_with("00001.png"));
        assert!(pages[1].ends_with("00002.png"));
    }
}
