//! Convert command implementation

use anyhow::{Context, Result};
use comicon_core::{convert_with_progress, Format, ProgressEvent, Stage};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Convert a comic from one format to another
pub fn convert(input: &Path, output: &Path, quiet: bool) -> Result<()> {
    let source = Format::from_path(input)
        .with_context(|| format!("Cannot read {}", input.display()))?;
    let target = Format::from_path(output)
        .with_context(|| format!("Cannot write {}", output.display()))?;

    // Set up progress bar
    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(0)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{prefix:>8} [{bar:40.cyan/blue}] {pos:>5}/{len:5} {wide_msg}")
            .unwrap()
            .progress_chars("##-"),
    );

    convert_with_progress(input, output, &mut |stage, event| match event {
        ProgressEvent::Total(total) => {
            pb.reset();
            pb.set_length(total as u64);
            pb.set_prefix(match stage {
                Stage::Import => "Reading",
                Stage::Export => "Writing",
            });
        }
        ProgressEvent::Item(name) => {
            pb.set_message(name);
            pb.inc(1);
        }
    })
    .with_context(|| {
        format!(
            "Failed to convert {} to {}",
            input.display(),
            output.display()
        )
    })?;

    pb.finish_and_clear();
    tracing::info!("Converted {:?} ({}) -> {:?} ({})", input, source, output, target);
    if !quiet {
        println!("Converted {} -> {}", input.display(), output.display());
    }

    Ok(())
}
