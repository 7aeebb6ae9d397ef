use crate::event::{Event, Track};

/// Keep only note-on/note-off events.
///
/// The delta of every dropped event is folded into the next kept event, so
/// every kept event lands on the same absolute tick as before. Time after
/// the last note event is discarded.
pub fn note_only<P: Clone>(track: &[Event<P>]) -> Track<P> {
    let mut pending: u64 = 0;
    let mut reduced = Vec::with_capacity(track.len());

    for event in track {
        if event.is_note() {
            reduced.push(event.with_delta(pending + event.delta));
            pending = 0;
        } else {
            pending += event.delta;
        }
    }

    reduced
}
