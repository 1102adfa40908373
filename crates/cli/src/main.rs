//! CLI tool for converting Balaram-font PowerPoint files to Unicode.

use anyhow::{Context, Result};
use balaram_core::{ConversionSummary, TextConverter};
use balaram_pptx::{Converter, UnlockStatus, Unlocker};
use clap::Parser;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Convert Balaram-font text in .pptx files to Unicode transliteration.
#[derive(Parser, Debug)]
#[command(name = "balaram-convert")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input PowerPoint file(s) (.pptx)
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// Output directory (default: same as input file)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Appended to the input file stem to name the output
    #[arg(long, default_value = "-unicode")]
    suffix: String,

    /// Keep the edit restriction
    #[arg(long)]
    no_unlock: bool,

    /// Only unlock, leave the text as is
    #[arg(long)]
    no_convert: bool,

    /// Compose text to NFC before mapping
    #[arg(long)]
    compose: bool,

    /// Print a JSON report for each file
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// What happened to one input file.
#[derive(Debug, Serialize)]
struct Report {
    input: PathBuf,
    output: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    unlock: Option<UnlockStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    conversion: Option<ConversionSummary>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let unlocker = Unlocker::new();
    let converter = Converter::new(TextConverter::new().with_compose(args.compose));

    let mut failures = 0;
    for input_path in &args.input {
        if args.verbose {
            eprintln!("Processing: {}", input_path.display());
        }

        match process_file(input_path, &args, &unlocker, &converter) {
            Ok(report) => {
                if args.json {
                    println!("{}", serde_json::to_string(&report)?);
                } else {
                    print_report(&report, args.verbose);
                }
            }
            Err(e) => {
                failures += 1;
                eprintln!("Error processing {}: {:#}", input_path.display(), e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} file(s) failed", failures, args.input.len());
    }
    Ok(())
}

/// Process a single PowerPoint file.
fn process_file(
    input_path: &Path,
    args: &Args,
    unlocker: &Unlocker,
    converter: &Converter,
) -> Result<Report> {
    let mut bytes = fs::read(input_path)
        .with_context(|| format!("Failed to read {}", input_path.display()))?;

    let unlock = if args.no_unlock {
        None
    } else {
        let outcome = unlocker.unlock(&bytes);
        log::debug!("Unlock: {:?}", outcome.status);
        bytes = outcome.bytes;
        Some(outcome.status)
    };

    let conversion = if args.no_convert {
        None
    } else {
        let (converted, summary) = converter.convert(&bytes);
        bytes = converted;
        Some(summary)
    };

    let output = get_output_path(input_path, args.output.as_ref(), &args.suffix)?;
    fs::write(&output, &bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    Ok(Report {
        input: input_path.to_path_buf(),
        output,
        unlock,
        conversion,
    })
}

fn print_report(report: &Report, verbose: bool) {
    let mut notes = Vec::new();
    match &report.unlock {
        Some(UnlockStatus::Unlocked { removed }) => notes.push(format!("unlocked ({})", removed)),
        Some(UnlockStatus::AlreadyUnlocked) | None => {}
        Some(other) => notes.push(format!("not unlocked: {:?}", other)),
    }
    if let Some(summary) = &report.conversion {
        match &summary.fallback {
            Some(reason) => notes.push(format!("not converted: {}", reason)),
            None => notes.push(format!(
                "{} run(s) converted on {} slide(s)",
                summary.conversion_count(),
                summary.slides
            )),
        }
        if verbose {
            for skipped in &summary.skipped {
                eprintln!("  Skipped {}: {}", skipped.location, skipped.reason);
            }
        }
    }

    println!(
        "{} -> {}: {}",
        report.input.display(),
        report.output.display(),
        notes.join(", ")
    );
}

/// Determine the output path for a processed file.
fn get_output_path(input_path: &Path, output_dir: Option<&PathBuf>, suffix: &str) -> Result<PathBuf> {
    let stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");

    let output_filename = format!("{}{}.pptx", stem, suffix);

    let output_path = match output_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
            dir.join(output_filename)
        }
        None => match input_path.parent() {
            Some(parent) => parent.join(output_filename),
            None => PathBuf::from(output_filename),
        },
    };

    Ok(output_path)
}
