use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

use midi_convert_core::MappingTable;

use crate::drums::describe_note;
use crate::{ConvertError, Result};

/// Which side of the conversion a format name was given for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatRole {
    Source,
    Destination,
}

impl fmt::Display for FormatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatRole::Source => write!(f, "source"),
            FormatRole::Destination => write!(f, "destination"),
        }
    }
}

/// Load the mapping between two named formats from a CSV file.
///
/// The header row names the formats (one column per drum kit layout),
/// every other row maps the same drum across layouts.
pub fn load_mapping(
    path: &Path,
    source_format: &str,
    destination_format: &str,
) -> Result<MappingTable> {
    let file = File::open(path).map_err(|e| ConvertError::io(path, e))?;
    debug!(path = %path.display(), "loading mapping table");
    read_mapping(file, source_format, destination_format)
}

/// Read a mapping table from CSV data. See [`load_mapping`].
///
/// Rows with an empty cell on either side are skipped, leaving that note
/// unmapped. When a source note appears twice, the later row wins.
pub fn read_mapping<R: Read>(
    reader: R,
    source_format: &str,
    destination_format: &str,
) -> Result<MappingTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let source_col = column_index(&headers, source_format, FormatRole::Source)?;
    let dest_col = column_index(&headers, destination_format, FormatRole::Destination)?;

    let mut table = MappingTable::new();

    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());

        let source = parse_note(&record, source_col, source_format, line)?;
        let destination = parse_note(&record, dest_col, destination_format, line)?;

        let (Some(source), Some(destination)) = (source, destination) else {
            debug!(line, "skipping row with an empty cell");
            continue;
        };

        if let Some(previous) = table.insert(source, destination)? {
            warn!(
                line,
                source,
                previous,
                destination,
                "note mapped twice, keeping the later row"
            );
        }
    }

    debug!(
        source = source_format,
        destination = destination_format,
        entries = table.len(),
        "mapping table loaded"
    );
    for (source, destination) in table.entries() {
        debug!("  {} -> {}", describe_note(source), describe_note(destination));
    }

    Ok(table)
}

fn column_index(headers: &csv::StringRecord, name: &str, role: FormatRole) -> Result<usize> {
    headers
        .iter()
        .position(|header| header == name)
        .ok_or_else(|| ConvertError::UnknownFormat {
            role,
            name: name.to_string(),
            available: headers.iter().collect::<Vec<_>>().join(", "),
        })
}

/// Parse one note cell. Empty or missing cells are `None`.
fn parse_note(
    record: &csv::StringRecord,
    column: usize,
    column_name: &str,
    line: u64,
) -> Result<Option<u8>> {
    let value = match record.get(column) {
        Some(value) if !value.is_empty() => value,
        _ => return Ok(None),
    };

    note_from_cell(value)
        .map(Some)
        .ok_or_else(|| ConvertError::InvalidCell {
            line,
            column: column_name.to_string(),
            value: value.to_string(),
        })
}

/// Spreadsheet exports sometimes write whole numbers as `36.0`
fn note_from_cell(value: &str) -> Option<u8> {
    if let Ok(note) = value.parse::<u8>() {
        return (note <= 127).then_some(note);
    }

    let number: f64 = value.parse().ok()?;
    if number.fract() == 0.0 && (0.0..=127.0).contains(&number) {
        Some(number as u8)
    } else {
        None
    }
}
