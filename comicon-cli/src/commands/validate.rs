//! Validate command implementation

use super::load;
use anyhow::{bail, Result};
use comicon_core::cir::validate as validate_cir;
use std::path::Path;

/// Validate a CIR folder, or a comic file by importing it
pub fn validate(input: &Path) -> Result<()> {
    if input.is_dir() {
        if let Err(e) = validate_cir(input) {
            eprintln!("Invalid CIR folder: {}", e);
            bail!("Validation failed for {}", input.display());
        }
    }

    match load(input) {
        Ok(loaded) => {
            if let Err(e) = validate_cir(&loaded.cir) {
                eprintln!("Imported comic is not valid: {}", e);
                bail!("Validation failed for {}", input.display());
            }
            println!("Valid comic");
            println!("  Title: {}", loaded.comic.title());
            println!("  Chapters: {}", loaded.comic.chapters().len());
            Ok(())
        }
        Err(e) => {
            eprintln!("Invalid comic: {:#}", e);
            bail!("Validation failed for {}", input.display());
        }
    }
}
