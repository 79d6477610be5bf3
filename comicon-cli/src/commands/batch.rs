//! Batch conversion command implementation

use anyhow::{bail, Context, Result};
use comicon_core::cir::DATA_FILE;
use comicon_core::{convert, Format};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Whether a directory entry is something we can convert
fn is_convertible(path: &Path) -> bool {
    if path.is_dir() {
        return path.join(DATA_FILE).is_file();
    }
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(Format::from_extension)
        .map(|format| format.can_import())
        .unwrap_or(false)
}

/// Batch convert multiple comics
pub fn batch(input_dir: &Path, output_dir: &Path, target: Format, jobs: usize) -> Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    // Find all supported files
    let mut files: Vec<PathBuf> = fs::read_dir(input_dir)
        .with_context(|| format!("Failed to read {}", input_dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| is_convertible(p))
        .collect();
    files.sort();

    if files.is_empty() {
        println!("No supported files found in {}", input_dir.display());
        return Ok(());
    }

    println!("Found {} files to convert", files.len());

    // Set up progress tracking
    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
            .unwrap()
            .progress_chars("##-"),
    );

    let success_count = AtomicUsize::new(0);
    let error_count = AtomicUsize::new(0);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .context("Failed to start worker pool")?;

    // Process files in parallel
    pool.install(|| {
        files.par_iter().for_each(|file_path| {
            match process_file(file_path, output_dir, target) {
                Ok(_) => {
                    success_count.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    error_count.fetch_add(1, Ordering::Relaxed);
                    tracing::error!("Failed to convert {:?}: {:#}", file_path, e);
                }
            }

            overall_pb.inc(1);
        });
    });

    overall_pb.finish();

    let success = success_count.load(Ordering::Relaxed);
    let errors = error_count.load(Ordering::Relaxed);

    println!("\nBatch conversion complete:");
    println!("  Success: {}", success);
    println!("  Errors:  {}", errors);

    if errors > 0 {
        bail!("Batch conversion completed with {} errors", errors);
    }

    Ok(())
}

fn process_file(input_path: &Path, output_dir: &Path, target: Format) -> Result<()> {
    // Build output path
    let stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .context("Could not determine output filename from input")?;
    let extension = target.exporter().file_extension().to_string();
    let output_file = if extension.is_empty() {
        output_dir.join(stem)
    } else {
        output_dir.join(format!("{}.{}", stem, extension))
    };

    convert(input_path, &output_file)?;

    tracing::info!("Converted {:?} -> {:?}", input_path, output_file);

    Ok(())
}
