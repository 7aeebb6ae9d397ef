//! MIDI drum mapping converter
//!
//! File-level glue around `midi-convert-core`: reads Standard MIDI Files,
//! loads kit mapping tables from CSV, runs the conversion pipeline and
//! writes the result next to the input's base name.

pub mod converter;
pub mod drums;
pub mod mapping;
pub mod midi;

use std::path::PathBuf;

// Re-export main types for convenience
pub use converter::{ConversionReport, ConvertOptions, Converter, TieMode, TrackReport};
pub use drums::describe_note;
pub use mapping::{load_mapping, read_mapping, FormatRole};
pub use midi::{MidiDocument, MidiTrack};

/// Errors raised while reading, converting or writing a file
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("MIDI error: {0}")]
    Midi(#[from] midly::Error),

    #[error("Failed to write MIDI data: {0}")]
    Write(#[source] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("The {role} format '{name}' is not recognized (available: {available}). Check for typo.")]
    UnknownFormat {
        role: FormatRole,
        name: String,
        available: String,
    },

    #[error("Invalid note '{value}' in column '{column}' on line {line}")]
    InvalidCell {
        line: u64,
        column: String,
        value: String,
    },

    #[error("Track {track}: delta time {delta} at event {position} does not fit in a MIDI file")]
    DeltaOverflow {
        track: usize,
        position: usize,
        delta: u64,
    },

    #[error("Tie detection needs metrical timing, but the file uses SMPTE timecode")]
    UnsupportedTiming,

    #[error(transparent)]
    Convert(#[from] midi_convert_core::Error),
}

impl ConvertError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
