//! Note remapping and timing normalization for MIDI tracks
//!
//! This crate holds the pure transformation engine behind the converter:
//! it never touches the filesystem. Tracks come in as ordered event lists,
//! and every stage hands back a new track (or a verdict) without mutating
//! its input.
//!
//! # Examples
//!
//! ```
//! use midi_convert_core::{note_only, remap, Event, MappingTable};
//!
//! let track: Vec<Event<&str>> = vec![
//!     Event::note_on(0, 9, 38, 100),
//!     Event::other(5, "controller"),
//!     Event::note_off(10, 9, 38, 0),
//! ];
//!
//! let mut mapping = MappingTable::new();
//! mapping.insert(38, 40).unwrap();
//!
//! let converted = note_only(&remap(&track, &mapping).unwrap());
//! assert_eq!(converted, vec![Event::note_on(0, 9, 40, 100), Event::note_off(15, 9, 40, 0)]);
//! ```
//!
//! # Main Components
//!
//! - **Event / Track**: delta-timed note events with an opaque payload for everything else
//! - **MappingTable**: source note to destination note lookup
//! - **remap**: rewrites note identifiers through a mapping table
//! - **note_only**: drops non-note events while preserving absolute timing
//! - **Quantization**: run segmentation and the simultaneity (tie) check
//! - **resolve_ties**: collapses simultaneous runs onto a single tick

pub mod event;
pub mod mapping;
pub mod reduce;
pub mod remap;
pub mod simultaneity;
pub mod ties;

pub use event::{absolute_ticks, Event, EventKind, NoteDirection, Track};
pub use mapping::MappingTable;
pub use reduce::note_only;
pub use remap::{remap, remap_tracks};
pub use simultaneity::{is_tie_free, segment_runs, Quantization, Run, DEFAULT_QUANTIZE_DIVISOR};
pub use ties::resolve_ties;

/// Errors raised by the transformation stages
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("No mapping for note {note} (event {position})")]
    MappingLookup { note: u8, position: usize },

    #[error("Track {track}: no mapping for note {note} (event {position})")]
    TrackMappingLookup {
        track: usize,
        note: u8,
        position: usize,
    },

    #[error("Note identifier {0} is outside the MIDI range 0-127")]
    NoteOutOfRange(u8),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl Error {
    /// The unmapped note identifier, if this is a lookup failure
    pub fn missing_note(&self) -> Option<u8> {
        match self {
            Error::MappingLookup { note, .. } | Error::TrackMappingLookup { note, .. } => {
                Some(*note)
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
