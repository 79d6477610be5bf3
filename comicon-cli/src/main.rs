//! comicon - convert comics between CBZ, EPUB, PDF, MOBI and CIR folders

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use comicon_core::Format;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Worker count for `batch` (at least 1)
fn parse_jobs(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|_| format!("'{}' is not a valid number", s))?;
    if n < 1 {
        Err("jobs must be at least 1".to_string())
    } else {
        Ok(n)
    }
}

/// `--format` accepts `cir` or any output extension
fn parse_format(s: &str) -> Result<Format, String> {
    if s.eq_ignore_ascii_case("cir") {
        return Ok(Format::Cir);
    }
    Format::from_extension(s).ok_or_else(|| {
        let known: Vec<String> = Format::ALL.iter().map(|f| f.name().to_lowercase()).collect();
        format!("unknown format '{}' (expected one of: {})", s, known.join(", "))
    })
}

#[derive(Parser)]
#[command(name = "comicon")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log every import and export step
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a comic to another format
    ///
    /// Formats follow the file extensions: .cbz/.zip, .epub, .pdf and .mobi
    /// (output only). A folder, or a path without an extension, is a CIR
    /// folder.
    Convert {
        /// Comic file or CIR folder to read
        input: PathBuf,

        /// Where to write the converted comic
        #[arg(short, long)]
        output: PathBuf,

        /// Hide the progress bar and print nothing on success
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show title, credits and chapter layout of a comic
    Info {
        /// Comic file or CIR folder
        input: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a CIR folder, or check that a comic file imports cleanly
    Validate {
        /// Comic file or CIR folder
        input: PathBuf,
    },

    /// Convert every comic in a folder
    Batch {
        /// Folder to scan (comic files and CIR folders, not recursive)
        input_dir: PathBuf,

        /// Folder receiving one output per input
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Output format: cir, cbz, epub, pdf or mobi
        #[arg(short, long, default_value = "cbz", value_parser = parse_format)]
        format: Format,

        /// Conversions to run at once (at least 1)
        #[arg(short, long, default_value = "4", value_parser = parse_jobs)]
        jobs: usize,
    },
}

/// Log to stderr so stdout stays clean for `info --json`. `RUST_LOG`
/// overrides the default filter.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "comicon_cli=debug,comicon_core=debug"
    } else {
        "comicon_cli=info,comicon_core=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Convert {
            input,
            output,
            quiet,
        } => commands::convert(&input, &output, quiet),
        Commands::Info { input, json } => commands::info(&input, json),
        Commands::Validate { input } => commands::validate(&input),
        Commands::Batch {
            input_dir,
            output_dir,
            format,
            jobs,
        } => commands::batch(&input_dir, &output_dir, format, jobs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!(parse_format("CIR").unwrap(), Format::Cir);
        assert_eq!(parse_format("zip").unwrap(), Format::Cbz);
        assert_eq!(parse_format("pdf").unwrap(), Format::Pdf);
        assert!(parse_format("docx").unwrap_err().contains("expected one of"));
    }

    #[test]
    fn test_parse_jobs() {
        assert_eq!(parse_jobs("3").unwrap(), 3);
        assert!(parse_jobs("0").is_err());
        assert!(parse_jobs("many").is_err());
    }
}
