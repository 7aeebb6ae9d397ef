/// Which way a note event moves: starting or ending a sound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteDirection {
    On,
    Off,
}

/// What an event does.
///
/// Only note-on/note-off are interpreted; every other kind of event is
/// carried as an opaque payload `P` and passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind<P> {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8, velocity: u8 },
    Other(P),
}

/// A single timed event. `delta` is measured in ticks since the previous
/// event of the same track. It is wider than a MIDI file can store, so
/// folding and re-timing never clamp; the file writer range-checks it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event<P> {
    pub delta: u64,
    pub kind: EventKind<P>,
}

/// An ordered sequence of events. Order defines playback and delta accumulation.
pub type Track<P> = Vec<Event<P>>;

impl<P> Event<P> {
    pub fn note_on(delta: u64, channel: u8, note: u8, velocity: u8) -> Self {
        Self {
            delta,
            kind: EventKind::NoteOn {
                channel,
                note,
                velocity,
            },
        }
    }

    pub fn note_off(delta: u64, channel: u8, note: u8, velocity: u8) -> Self {
        Self {
            delta,
            kind: EventKind::NoteOff {
                channel,
                note,
                velocity,
            },
        }
    }

    pub fn other(delta: u64, payload: P) -> Self {
        Self {
            delta,
            kind: EventKind::Other(payload),
        }
    }

    /// Note identifier of a note-on/note-off event
    pub fn note(&self) -> Option<u8> {
        match self.kind {
            EventKind::NoteOn { note, .. } | EventKind::NoteOff { note, .. } => Some(note),
            EventKind::Other(_) => None,
        }
    }

    pub fn direction(&self) -> Option<NoteDirection> {
        match self.kind {
            EventKind::NoteOn { .. } => Some(NoteDirection::On),
            EventKind::NoteOff { .. } => Some(NoteDirection::Off),
            EventKind::Other(_) => None,
        }
    }

    pub fn is_note(&self) -> bool {
        self.direction().is_some()
    }
}

impl<P: Clone> Event<P> {
    /// Copy of this event with a different note identifier.
    /// Non-note events are returned unchanged.
    pub fn with_note(&self, new_note: u8) -> Self {
        let kind = match self.kind {
            EventKind::NoteOn {
                channel, velocity, ..
            } => EventKind::NoteOn {
                channel,
                note: new_note,
                velocity,
            },
            EventKind::NoteOff {
                channel, velocity, ..
            } => EventKind::NoteOff {
                channel,
                note: new_note,
                velocity,
            },
            EventKind::Other(ref payload) => EventKind::Other(payload.clone()),
        };

        Self {
            delta: self.delta,
            kind,
        }
    }

    /// Copy of this event with a different delta time
    pub fn with_delta(&self, delta: u64) -> Self {
        Self {
            delta,
            kind: self.kind.clone(),
        }
    }
}

/// Absolute tick position of every event, measured from the start of the track.
pub fn absolute_ticks<P>(track: &[Event<P>]) -> Vec<u64> {
    track
        .iter()
        .scan(0u64, |tick, event| {
            *tick += event.delta;
            Some(*tick)
        })
        .collect()
}
