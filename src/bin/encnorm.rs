//! encnorm CLI
//!
//! Walk a directory tree and normalize the text encoding of each file to
//! UTF-8, in place.

use anyhow::{Context, Result};
use clap::Parser;
use encnorm::{normalize_file, FileOutcome, NormalizeConfig};
use encoding_rs::Encoding;
use std::fs::{self, OpenOptions};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(name = "encnorm")]
#[command(version)]
#[command(about = "Normalize the text encoding of files in a tree to UTF-8, in place")]
struct Cli {
    /// Root directory (or single file) to process
    root: PathBuf,

    /// Only process files with this extension (repeatable, e.g. -e cs -e txt)
    #[arg(short = 'e', long = "ext")]
    extensions: Vec<String>,

    /// Legacy encoding assumed for non-UTF-8 content
    #[arg(long, default_value = "windows-1252")]
    source_encoding: String,

    /// Write a UTF-8 byte order mark on files that lack one
    #[arg(long)]
    add_bom: bool,

    /// Do not re-encode wholly non-UTF-8 files
    #[arg(long)]
    no_convert: bool,

    /// Do not repair mixed UTF-8/legacy files
    #[arg(long)]
    no_fix_mixed: bool,

    /// Detect and report only; write nothing
    #[arg(long)]
    dry_run: bool,

    /// Report unchanged files too
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let source = Encoding::for_label(cli.source_encoding.as_bytes())
        .with_context(|| format!("Unknown encoding label: {}", cli.source_encoding))?;
    let config = NormalizeConfig {
        source,
        add_bom: cli.add_bom,
        convert_non_utf8: !cli.no_convert,
        fix_mixed: !cli.no_fix_mixed,
    };

    println!("Checking \"{}\"...", cli.root.display());
    let files = collect_files(&cli.root, &cli.extensions);
    let width = files.len().to_string().len();

    let mut failures = 0usize;
    let mut changed = 0usize;
    for (i, path) in files.iter().enumerate() {
        match process_file(path, &config, cli.dry_run) {
            Ok(outcome) => {
                let touched = !matches!(
                    outcome,
                    FileOutcome::AlreadyUtf8 | FileOutcome::Skipped
                );
                if touched {
                    changed += 1;
                }
                if cli.verbose || touched {
                    println!(
                        "File {:>width$} of {}: {}: {}",
                        i + 1,
                        files.len(),
                        path.display(),
                        outcome,
                    );
                }
            }
            Err(err) => {
                failures += 1;
                eprintln!(
                    "File {:>width$} of {}: {}: {:#}",
                    i + 1,
                    files.len(),
                    path.display(),
                    err,
                );
            }
        }
    }

    let action = if cli.dry_run { "would change" } else { "changed" };
    println!(
        "{} file(s) checked, {} {}, {} failed.",
        files.len(),
        changed,
        action,
        failures,
    );

    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}

/// Collect the files to process, in walk order.
fn collect_files(root: &Path, extensions: &[String]) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }

    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| matches_extension(path, extensions))
        .collect()
}

fn matches_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| {
            extensions.iter().any(|want| want.eq_ignore_ascii_case(ext))
        })
}

/// Normalize one file. In dry-run mode the work happens against an
/// in-memory copy and nothing is written back.
fn process_file(path: &Path, config: &NormalizeConfig, dry_run: bool) -> Result<FileOutcome> {
    if dry_run {
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read: {}", path.display()))?;
        let mut channel = Cursor::new(bytes);
        return normalize_file(&mut channel, config)
            .with_context(|| format!("Failed to normalize: {}", path.display()));
    }

    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .with_context(|| format!("Failed to open: {}", path.display()))?;
    normalize_file(&mut file, config)
        .with_context(|| format!("Failed to normalize: {}", path.display()))
}
