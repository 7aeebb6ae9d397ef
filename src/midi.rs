use midly::num::{u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use std::path::Path;

use midi_convert_core::{Event, EventKind, Track};

use crate::{ConvertError, Result};

/// Largest delta a Standard MIDI File can store (28-bit variable length quantity)
const MAX_DELTA: u32 = (1 << 28) - 1;

/// A track whose non-note events keep the parser's own event kind as payload
pub type MidiTrack<'a> = Track<TrackEventKind<'a>>;

/// A parsed Standard MIDI File, with every track lifted into core events.
///
/// Meta, SysEx and non-note channel messages borrow from the input bytes
/// and are written back exactly as they were read.
#[derive(Debug, Clone, PartialEq)]
pub struct MidiDocument<'a> {
    pub format: Format,
    pub timing: Timing,
    pub tracks: Vec<MidiTrack<'a>>,
}

impl<'a> MidiDocument<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let smf = Smf::parse(data)?;

        let tracks: Vec<MidiTrack<'a>> = smf
            .tracks
            .iter()
            .map(|track| track.iter().map(lift_event).collect())
            .collect();

        Ok(MidiDocument {
            format: smf.header.format,
            timing: smf.header.timing,
            tracks,
        })
    }

    /// Same file layout with different tracks
    pub fn with_tracks(&self, tracks: Vec<MidiTrack<'a>>) -> Self {
        MidiDocument {
            format: self.format,
            timing: self.timing,
            tracks,
        }
    }

    /// Ticks per beat, for metrical files only
    pub fn ticks_per_beat(&self) -> Option<u16> {
        match self.timing {
            Timing::Metrical(tpb) => Some(tpb.as_int()),
            Timing::Timecode(..) => None,
        }
    }

    pub fn event_count(&self) -> usize {
        self.tracks.iter().map(Vec::len).sum()
    }

    pub fn to_smf(&self) -> Result<Smf<'a>> {
        let mut smf = Smf::new(Header::new(self.format, self.timing));

        for (track_idx, track) in self.tracks.iter().enumerate() {
            let mut events = Vec::with_capacity(track.len() + 1);
            for (position, event) in track.iter().enumerate() {
                events.push(lower_event(event).ok_or(ConvertError::DeltaOverflow {
                    track: track_idx,
                    position,
                    delta: event.delta,
                })?);
            }
            ensure_end_of_track(&mut events);
            smf.tracks.push(events);
        }

        Ok(smf)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        self.to_smf()?
            .write_std(&mut data)
            .map_err(ConvertError::Write)?;
        Ok(data)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = self.to_bytes()?;
        std::fs::write(path, data).map_err(|e| ConvertError::io(path, e))
    }
}

fn lift_event<'a>(event: &TrackEvent<'a>) -> Event<TrackEventKind<'a>> {
    let delta = u64::from(event.delta.as_int());

    match event.kind {
        TrackEventKind::Midi {
            channel,
            message: MidiMessage::NoteOn { key, vel },
        } => Event::note_on(delta, channel.as_int(), key.as_int(), vel.as_int()),
        TrackEventKind::Midi {
            channel,
            message: MidiMessage::NoteOff { key, vel },
        } => Event::note_off(delta, channel.as_int(), key.as_int(), vel.as_int()),
        kind => Event::other(delta, kind),
    }
}

fn lower_event<'a>(event: &Event<TrackEventKind<'a>>) -> Option<TrackEvent<'a>> {
    let delta = u32::try_from(event.delta)
        .ok()
        .filter(|&delta| delta <= MAX_DELTA)?;

    let kind = match event.kind {
        EventKind::NoteOn {
            channel,
            note,
            velocity,
        } => TrackEventKind::Midi {
            channel: u4::new(channel & 0x0F),
            message: MidiMessage::NoteOn {
                key: u7::new(note & 0x7F),
                vel: u7::new(velocity & 0x7F),
            },
        },
        EventKind::NoteOff {
            channel,
            note,
            velocity,
        } => TrackEventKind::Midi {
            channel: u4::new(channel & 0x0F),
            message: MidiMessage::NoteOff {
                key: u7::new(note & 0x7F),
                vel: u7::new(velocity & 0x7F),
            },
        },
        EventKind::Other(kind) => kind,
    };

    Some(TrackEvent {
        delta: u28::new(delta),
        kind,
    })
}

/// Every track chunk must close with an end-of-track meta event
fn ensure_end_of_track(events: &mut Vec<TrackEvent<'_>>) {
    let closed = matches!(
        events.last(),
        Some(TrackEvent {
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
            ..
        })
    );

    if !closed {
        events.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });
    }
}
