use crate::event::{absolute_ticks, Event, NoteDirection};
use crate::{Error, Result};

/// Default divisor: a beat of 480 ticks tolerates 4 ticks of jitter
pub const DEFAULT_QUANTIZE_DIVISOR: u32 = 100;

/// A maximal run of consecutive note events sharing one direction.
///
/// Non-note events are skipped when forming runs, so `positions` may not be
/// contiguous in the source track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub direction: NoteDirection,
    /// Indices of the run's events in the source track
    pub positions: Vec<usize>,
    /// Absolute tick of the first event
    pub start_tick: u64,
    /// Absolute tick of the last event
    pub end_tick: u64,
}

impl Run {
    /// Ticks between the first and last event of the run
    pub fn spread(&self) -> u64 {
        self.end_tick - self.start_tick
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Split the note events of `track` into runs of the same direction.
pub fn segment_runs<P>(track: &[Event<P>]) -> Vec<Run> {
    let ticks = absolute_ticks(track);
    let mut runs: Vec<Run> = Vec::new();

    for (position, event) in track.iter().enumerate() {
        let Some(direction) = event.direction() else {
            continue;
        };
        let tick = ticks[position];

        if let Some(run) = runs.last_mut().filter(|run| run.direction == direction) {
            run.positions.push(position);
            run.end_tick = tick;
            continue;
        }

        runs.push(Run {
            direction,
            positions: vec![position],
            start_tick: tick,
            end_tick: tick,
        });
    }

    runs
}

/// Threshold settings for deciding whether a run is one simultaneous chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantization {
    ticks_per_beat: u32,
    divisor: u32,
}

impl Quantization {
    pub fn new(ticks_per_beat: u32, divisor: u32) -> Result<Self> {
        if ticks_per_beat == 0 {
            return Err(Error::InvalidConfiguration(
                "ticks per beat must be positive".to_string(),
            ));
        }
        if divisor == 0 {
            return Err(Error::InvalidConfiguration(
                "quantization divisor must be positive".to_string(),
            ));
        }
        Ok(Self {
            ticks_per_beat,
            divisor,
        })
    }

    /// Quantization with [`DEFAULT_QUANTIZE_DIVISOR`]
    pub fn with_default_divisor(ticks_per_beat: u32) -> Result<Self> {
        Self::new(ticks_per_beat, DEFAULT_QUANTIZE_DIVISOR)
    }

    pub fn ticks_per_beat(&self) -> u32 {
        self.ticks_per_beat
    }

    pub fn divisor(&self) -> u32 {
        self.divisor
    }

    /// Spread (in ticks) a run must stay strictly below to count as simultaneous
    pub fn threshold(&self) -> u64 {
        u64::from(self.ticks_per_beat / self.divisor)
    }

    pub fn is_simultaneous(&self, run: &Run) -> bool {
        run.spread() < self.threshold()
    }

    /// First run whose spread reaches the threshold, if any
    pub fn first_tie<P>(&self, track: &[Event<P>]) -> Option<Run> {
        segment_runs(track)
            .into_iter()
            .find(|run| !self.is_simultaneous(run))
    }

    /// True when every run of the track is simultaneous
    pub fn is_tie_free<P>(&self, track: &[Event<P>]) -> bool {
        self.first_tie(track).is_none()
    }
}

/// Check a track against the threshold `ticks_per_beat / divisor`.
pub fn is_tie_free<P>(track: &[Event<P>], ticks_per_beat: u32, divisor: u32) -> Result<bool> {
    Ok(Quantization::new(ticks_per_beat, divisor)?.is_tie_free(track))
}
