//! MOBI exporter: an EPUB compiled by Amazon's kindlegen

use super::EpubExporter;
use crate::error::{ComiconError, FormatError, Result};
use crate::progress::Progress;
use std::fs::{self, File};
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

const KINDLEGEN: &str = "kindlegen";

/// Exporter for MOBI via the external `kindlegen` tool
///
/// The EPUB is written to a scratch directory and compiled there; only the
/// finished MOBI is copied to the destination.
pub struct MobiExporter {
    kindlegen: PathBuf,
    epub: EpubExporter,
}

impl MobiExporter {
    pub fn new() -> Self {
        Self {
            kindlegen: PathBuf::from(KINDLEGEN),
            epub: EpubExporter::new(),
        }
    }

    /// Use a specific kindlegen binary instead of the one on `PATH`
    pub fn with_kindlegen(mut self, kindlegen: impl Into<PathBuf>) -> Self {
        self.kindlegen = kindlegen.into();
        self
    }

    fn run(&self, args: &[&OsStr]) -> Result<(bool, String)> {
        let output = Command::new(&self.kindlegen)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                let message = if e.kind() == ErrorKind::NotFound {
                    "not found in PATH; it is required for MOBI conversion".to_string()
                } else {
                    e.to_string()
                };
                tool_error(message)
            })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok((output.status.success(), text))
    }

    /// Make sure kindlegen can be started before doing any work
    fn check_available(&self) -> Result<()> {
        let (success, _) = self.run(&[OsStr::new("-locale"), OsStr::new("en")])?;
        if !success {
            return Err(tool_error("failed to start; is it installed?".to_string()));
        }
        Ok(())
    }
}

impl Default for MobiExporter {
    fn default() -> Self {
        Self::new()
    }
}

fn tool_error(message: String) -> ComiconError {
    FormatError::ExternalTool {
        tool: KINDLEGEN.to_string(),
        message,
    }
    .into()
}

/// Interpret kindlegen's console output
fn check_output(output: &str) -> std::result::Result<(), FormatError> {
    for line in output.lines() {
        if line.contains("Error(") {
            return Err(FormatError::ExternalTool {
                tool: KINDLEGEN.to_string(),
                message: line.trim().to_string(),
            });
        }
        if line.contains(":E23026") {
            return Err(FormatError::ExternalTool {
                tool: KINDLEGEN.to_string(),
                message: format!("EPUB file too big: {}", line.trim()),
            });
        }
        if line.contains("I1036") {
            break;
        }
    }
    Ok(())
}

/// Copy kindlegen's output out of the scratch directory
fn copy_result(scratch: &TempDir, mobi_name: &Path, dest: &Path) -> Result<()> {
    let built = scratch.path().join(mobi_name);
    if !built.is_file() {
        return Err(tool_error(format!(
            "finished without writing {}",
            mobi_name.display()
        )));
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(&built, dest)?;
    Ok(())
}

impl super::Exporter for MobiExporter {
    fn export(&self, cir: &Path, dest: &Path, progress: Progress<'_>) -> Result<()> {
        if dest.is_dir() {
            return Err(ComiconError::IsADirectory(dest.to_path_buf()));
        }
        self.check_available()?;

        let stem = dest
            .file_stem()
            .map(|stem| stem.to_os_string())
            .unwrap_or_else(|| "comic".into());
        let mut epub_name = stem.clone();
        epub_name.push(".epub");
        let mut mobi_name = stem;
        mobi_name.push(".mobi");

        let scratch = tempfile::Builder::new().prefix("comicon-mobi-").tempdir()?;
        let epub_path = scratch.path().join(epub_name);
        self.epub
            .write_package(cir, File::create(&epub_path)?, progress)?;

        tracing::debug!("Running {:?} on {:?}", self.kindlegen, epub_path);
        let (_, output) = self.run(&[
            epub_path.as_os_str(),
            OsStr::new("-locale"),
            OsStr::new("en"),
            OsStr::new("-dont_append_source"),
            OsStr::new("-o"),
            mobi_name.as_os_str(),
        ])?;
        check_output(&output)?;

        copy_result(&scratch, Path::new(&mobi_name), dest)
    }

    fn format_name(&self) -> &str {
        "MOBI"
    }

    fn file_extension(&self) -> &str {
        "mobi"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exporter::Exporter;
    use crate::cir::CirWriter;
    use crate::progress::silently;
    use crate::types::{Chapter, Comic, Metadata};

    #[test]
    fn test_check_output_success() {
        let output = "Info(prcgen):I1036: Mobi file built successfully\nError(later): ignored";
        assert!(check_output(output).is_ok());
    }

    #[test]
    fn test_check_output_errors() {
        let err = check_output("Error(prcgen):E1000: something broke").unwrap_err();
        assert!(err.to_string().contains("E1000"));

        let err = check_output("Warning(prcgen):E23026: too big").unwrap_err();
        assert!(err.to_string().contains("too big"));
    }

    #[test]
    fn test_missing_kindlegen() {
        let dir = TempDir::new().unwrap();
        let exporter = MobiExporter::new().with_kindlegen(dir.path().join("no-such-kindlegen"));
        let result = silently(|progress| {
            exporter.export(dir.path(), &dir.path().join("out.mobi"), progress)
        });
        assert!(matches!(
            result,
            Err(ComiconError::Format(FormatError::ExternalTool { .. }))
        ));
        assert!(!dir.path().join("out.epub").exists());
    }

    /// Stand-in for kindlegen that writes the `-o` file next to its input
    #[cfg(unix)]
    fn fake_kindlegen(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("kindlegen");
        fs::write(
            &script,
            r#"#!/bin/sh
out=""
input=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    -locale) shift 2 ;;
    -*) shift ;;
    *) input="$1"; shift ;;
  esac
done
[ -z "$input" ] && exit 0
echo "Info(prcgen):I1036: Mobi file built successfully"
printf 'MOBI' > "$(dirname "$input")/$out"
"#,
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[test]
    fn test_export_leaves_neighbouring_epub_alone() {
        let dir = TempDir::new().unwrap();
        let cir = dir.path().join("cir");
        let comic = Comic::new(Metadata::new("Book"), vec![Chapter::new("One")]).unwrap();
        let writer = CirWriter::create(&cir).unwrap();
        writer.write_page("One", 1, "png", b"png").unwrap();
        writer.finish(&comic).unwrap();

        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        fs::write(out.join("book.epub"), b"my own book").unwrap();

        let exporter = MobiExporter::new().with_kindlegen(fake_kindlegen(dir.path()));
        silently(|progress| exporter.export(&cir, &out.join("book.mobi"), progress)).unwrap();

        assert_eq!(fs::read(out.join("book.mobi")).unwrap(), b"MOBI");
        assert_eq!(fs::read(out.join("book.epub")).unwrap(), b"my own book");
        assert_eq!(fs::read_dir(&out).unwrap().count(), 2);
    }
}
