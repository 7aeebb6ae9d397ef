use crate::event::{Event, Track};
use crate::mapping::MappingTable;
use crate::{Error, Result};

/// Rewrite the note identifier of every note-on/note-off event through `mapping`.
///
/// Order and every delta are preserved; only note identifiers change.
/// The first unmapped note aborts the whole track, nothing partial is returned.
pub fn remap<P: Clone>(track: &[Event<P>], mapping: &MappingTable) -> Result<Track<P>> {
    track
        .iter()
        .enumerate()
        .map(|(position, event)| match event.note() {
            Some(note) => mapping
                .lookup(note, position)
                .map(|mapped| event.with_note(mapped)),
            None => Ok(event.clone()),
        })
        .collect()
}

/// Remap every track of a file. Any failing track fails the whole file,
/// and the error names the track it came from.
pub fn remap_tracks<P: Clone>(
    tracks: &[Track<P>],
    mapping: &MappingTable,
) -> Result<Vec<Track<P>>> {
    tracks
        .iter()
        .enumerate()
        .map(|(index, track)| {
            remap(track, mapping).map_err(|err| match err {
                Error::MappingLookup { note, position } => Error::TrackMappingLookup {
                    track: index,
                    note,
                    position,
                },
                other => other,
            })
        })
        .collect()
}
