use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use midi_convert_core::DEFAULT_QUANTIZE_DIVISOR;
use midi_converter::{describe_note, ConvertError, ConvertOptions, Converter, TieMode};

#[derive(Parser, Debug)]
#[command(name = "midi-converter")]
#[command(about = "Remap MIDI drum notes from one kit layout to another", long_about = None)]
struct Args {
    /// Mapping table column the input file is written for (e.g. studio_drummer_gm)
    source_format: String,

    /// Mapping table column to convert to (e.g. guitar_pro_8_drumkit)
    destination_format: String,

    /// Path to the MIDI file (default: uses first .mid file in current directory)
    midi: Option<PathBuf>,

    /// CSV mapping table with one column per format
    #[arg(short, long, default_value = "mapping.csv")]
    mapping: PathBuf,

    /// Directory the converted file is written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Keep only note-on/note-off events
    #[arg(short, long)]
    note_only: bool,

    /// Report runs of note events too spread out to be a single chord
    #[arg(long)]
    check_ties: bool,

    /// Collapse near-simultaneous runs of note events onto one tick
    #[arg(long, conflicts_with = "check_ties")]
    resolve_ties: bool,

    /// Runs closer than ticks-per-beat / divisor count as simultaneous.
    /// Smaller values are more forgiving.
    #[arg(long, default_value_t = DEFAULT_QUANTIZE_DIVISOR)]
    quantize_divisor: u32,

    /// Print the conversion report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Suppress informational messages (only errors)
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show per-track details and the loaded mapping table
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.quiet, args.verbose);

    // Find MIDI file
    let midi_path = if let Some(path) = args.midi {
        if !path.exists() {
            anyhow::bail!("MIDI file not found: {}", path.display());
        }
        path
    } else {
        find_first_midi_file()?
    };

    let ties = if args.resolve_ties {
        TieMode::Resolve
    } else if args.check_ties {
        TieMode::Check
    } else {
        TieMode::Ignore
    };
    let options = ConvertOptions {
        note_only: args.note_only,
        ties,
        quantize_divisor: args.quantize_divisor,
    };

    let converter = Converter::from_mapping_file(
        &args.mapping,
        &args.source_format,
        &args.destination_format,
        options,
    )
    .with_context(|| format!("Failed to load mapping table {}", args.mapping.display()))?;

    let report = match converter.convert_file(&midi_path, &args.output_dir) {
        Ok(report) => report,
        Err(err) => {
            if let ConvertError::Convert(core_err) = &err {
                if let Some(note) = core_err.missing_note() {
                    error!(
                        "note {} has no row in the '{}' column of {}",
                        describe_note(note),
                        args.source_format,
                        args.mapping.display()
                    );
                }
            }
            return Err(err).with_context(|| format!("Failed to convert {}", midi_path.display()));
        }
    };

    match report.is_tie_free() {
        Some(true) => info!("no ties found"),
        Some(false) => warn!("ties found, see per-track warnings"),
        None => {}
    }

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", json);
    }

    Ok(())
}

fn init_tracing(quiet: bool, verbose: bool) {
    let default_level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn find_first_midi_file() -> Result<PathBuf> {
    let entries = fs::read_dir(".").context("Failed to read current directory")?;

    for entry in entries {
        let entry = entry?;
        let path = entry.path();

        let is_midi = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("mid"));
        if is_midi {
            return Ok(path);
        }
    }

    anyhow::bail!("No MIDI files found in current directory")
}
