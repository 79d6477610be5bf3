//! Writing CIR folders from importers

use super::write_comic;
use crate::chapters::page_file_name;
use crate::error::{ComiconError, Result};
use crate::types::Comic;
use std::fs;
use std::path::{Path, PathBuf};

/// Incrementally writes a CIR folder.
///
/// Pages and the cover are written first; the canonical document is only
/// written by [`CirWriter::finish`], so an import that fails midway leaves
/// a folder that does not validate.
#[derive(Debug)]
pub struct CirWriter {
    root: PathBuf,
}

impl CirWriter {
    /// Prepare `root` for writing; it must be missing or empty
    pub fn create(root: &Path) -> Result<Self> {
        if root.is_file() {
            return Err(ComiconError::NotADirectory(root.to_path_buf()));
        }
        fs::create_dir_all(root)?;
        if fs::read_dir(root)?.next().is_some() {
            return Err(ComiconError::DestinationNotEmpty(root.to_path_buf()));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// The CIR folder being written
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write page `number` (1-based) of a chapter
    pub fn write_page(&self, slug: &str, number: usize, ext: &str, data: &[u8]) -> Result<PathBuf> {
        let folder = self.root.join(slug);
        fs::create_dir_all(&folder)?;
        let path = folder.join(page_file_name(number, &ext.to_ascii_lowercase()));
        fs::write(&path, data)?;
        Ok(path)
    }

    /// Write the cover image at a path relative to the root
    pub fn write_cover(&self, cover_path_rel: &str, data: &[u8]) -> Result<PathBuf> {
        let path = self.root.join(cover_path_rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, data)?;
        Ok(path)
    }

    /// Write the canonical document, completing the CIR
    pub fn finish(self, comic: &Comic) -> Result<()> {
        write_comic(&self.root, comic)?;
        tracing::debug!("Wrote CIR data file for '{}' to {:?}", comic.title(), self.root);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cir::{validate, DATA_FILE};
    use crate::types::{Chapter, Metadata};
    use tempfile::TempDir;

    #[test]
    fn test_writer_produces_valid_cir() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("cir");
        let writer = CirWriter::create(&root).unwrap();

        let page = writer.write_page("Intro", 1, "PNG", b"png").unwrap();
        assert!(page.ends_with("Intro/00001.png"));
        writer.write_cover("cover.png", b"png").unwrap();
        assert!(!root.join(DATA_FILE).exists());

        let comic = Comic::new(
            Metadata::new("Written").with_cover("cover.png"),
            vec![Chapter::new("Intro")],
        )
        .unwrap();
        writer.finish(&comic).unwrap();
        validate(&root).unwrap();
    }

    #[test]
    fn test_refuses_non_empty_destination() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("stale.txt"), b"old").unwrap();
        assert!(matches!(
            CirWriter::create(dir.path()),
            Err(ComiconError::DestinationNotEmpty(_))
        ));
    }
}
