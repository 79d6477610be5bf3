//! The closed set of formats a comic can be converted between

use crate::error::{ComiconError, Result};
use crate::exporter::{
    CbzExporter, CirExporter, EpubExporter, Exporter, MobiExporter, PdfExporter,
};
use crate::importer::{CbzImporter, CirImporter, EpubImporter, Importer, PdfImporter};
use crate::media::extension_of;
use std::fmt;
use std::path::Path;

/// A supported container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Comicon Intermediate Representation folder
    Cir,
    /// Zip-based page archive
    Cbz,
    /// E-book package
    Epub,
    /// Page-image document
    Pdf,
    /// Kindle book, produced through kindlegen (export only)
    Mobi,
}

impl Format {
    /// Every format, in the order they are listed to users
    pub const ALL: [Format; 5] = [
        Format::Cir,
        Format::Cbz,
        Format::Epub,
        Format::Pdf,
        Format::Mobi,
    ];

    /// Detect the format of a path.
    ///
    /// Existing directories and paths without an extension are CIR folders;
    /// everything else is decided by the file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        if path.is_dir() {
            return Ok(Format::Cir);
        }
        match extension_of(path) {
            None => Ok(Format::Cir),
            Some(ext) => Self::from_extension(&ext)
                .ok_or_else(|| ComiconError::UnsupportedFormat(format!(".{}", ext))),
        }
    }

    /// Format for a file extension (without the dot, any case)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "cbz" | "zip" => Some(Format::Cbz),
            "epub" => Some(Format::Epub),
            "pdf" => Some(Format::Pdf),
            "mobi" => Some(Format::Mobi),
            _ => None,
        }
    }

    /// Human readable name
    pub fn name(&self) -> &'static str {
        match self {
            Format::Cir => "CIR",
            Format::Cbz => "CBZ",
            Format::Epub => "EPUB",
            Format::Pdf => "PDF",
            Format::Mobi => "MOBI",
        }
    }

    /// Whether comics can be read from this format
    pub fn can_import(&self) -> bool {
        !matches!(self, Format::Mobi)
    }

    /// Importer reading this format into a CIR folder
    pub fn importer(&self) -> Result<Box<dyn Importer>> {
        match self {
            Format::Cir => Ok(Box::new(CirImporter::new())),
            Format::Cbz => Ok(Box::new(CbzImporter::new())),
            Format::Epub => Ok(Box::new(EpubImporter::new())),
            Format::Pdf => Ok(Box::new(PdfImporter::new())),
            Format::Mobi => Err(ComiconError::UnsupportedFormat(
                "MOBI can only be written, not read".to_string(),
            )),
        }
    }

    /// Exporter writing a CIR folder to this format
    pub fn exporter(&self) -> Box<dyn Exporter> {
        match self {
            Format::Cir => Box::new(CirExporter::new()),
            Format::Cbz => Box::new(CbzExporter::new()),
            Format::Epub => Box::new(EpubExporter::new()),
            Format::Pdf => Box::new(PdfExporter::new()),
            Format::Mobi => Box::new(MobiExporter::new()),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_path_by_extension() {
        assert_eq!(Format::from_path(Path::new("a/b.CBZ")).unwrap(), Format::Cbz);
        assert_eq!(Format::from_path(Path::new("b.zip")).unwrap(), Format::Cbz);
        assert_eq!(Format::from_path(Path::new("b.epub")).unwrap(), Format::Epub);
        assert_eq!(Format::from_path(Path::new("b.pdf")).unwrap(), Format::Pdf);
        assert_eq!(Format::from_path(Path::new("b.mobi")).unwrap(), Format::Mobi);
        assert_eq!(Format::from_path(Path::new("out/comic")).unwrap(), Format::Cir);
    }

    #[test]
    fn test_existing_directory_is_cir() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("looks.pdf");
        std::fs::create_dir(&folder).unwrap();
        assert_eq!(Format::from_path(&folder).unwrap(), Format::Cir);
    }

    #[test]
    fn test_unknown_extension() {
        let err = Format::from_path(Path::new("book.docx")).unwrap_err();
        assert!(matches!(err, ComiconError::UnsupportedFormat(ext) if ext == ".docx"));
    }

    #[test]
    fn test_mobi_is_export_only() {
        assert!(!Format::Mobi.can_import());
        assert!(Format::Mobi.importer().is_err());
        assert_eq!(Format::Mobi.exporter().file_extension(), "mobi");
        for format in Format::ALL.iter().filter(|f| f.can_import()) {
            assert!(format.importer().is_ok(), "{} should import", format);
        }
    }
}
