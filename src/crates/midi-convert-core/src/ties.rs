use crate::event::{absolute_ticks, Event, Track};
use crate::simultaneity::{segment_runs, Quantization};

/// Collapse every simultaneous run onto the tick of its first event.
///
/// The later members of such a run are moved directly behind its first
/// member. All other events keep their absolute positions, and deltas are
/// recomputed from those positions. Runs at or above the threshold are
/// left as they are.
pub fn resolve_ties<P: Clone>(track: &[Event<P>], quantization: &Quantization) -> Track<P> {
    let ticks = absolute_ticks(track);

    // followers[i]: events to emit right after position i, at its tick
    let mut followers: Vec<Vec<usize>> = vec![Vec::new(); track.len()];
    let mut moved = vec![false; track.len()];

    for run in segment_runs(track) {
        if run.len() < 2 || !quantization.is_simultaneous(&run) {
            continue;
        }
        let (&head, rest) = match run.positions.split_first() {
            Some(split) => split,
            None => continue,
        };
        for &position in rest {
            moved[position] = true;
        }
        followers[head] = rest.to_vec();
    }

    let mut resolved = Vec::with_capacity(track.len());
    let mut last_tick = 0u64;

    for (position, event) in track.iter().enumerate() {
        if moved[position] {
            continue;
        }
        let tick = ticks[position];
        resolved.push(event.with_delta(tick - last_tick));
        last_tick = tick;

        for &follower in &followers[position] {
            resolved.push(track[follower].with_delta(0));
        }
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn quantization() -> Quantization {
        Quantization::new(480, 100).unwrap()
    }

    #[test]
    fn test_collapses_jittered_chord() {
        let track: Vec<Event<()>> = vec![
            Event::note_on(100, 9, 36, 100),
            Event::note_on(1, 9, 42, 90),
            Event::note_on(2, 9, 49, 80),
            Event::note_off(120, 9, 36, 0),
        ];

        let resolved = resolve_ties(&track, &quantization());

        assert_eq!(
            resolved,
            vec![
                Event::note_on(100, 9, 36, 100),
                Event::note_on(0, 9, 42, 90),
                Event::note_on(0, 9, 49, 80),
                Event::note_off(123, 9, 36, 0),
            ]
        );
        assert!(segment_runs(&resolved).iter().all(|run| run.spread() == 0));
    }

    #[test]
    fn test_leaves_wide_runs_alone() {
        let track: Vec<Event<()>> = vec![
            Event::note_on(0, 9, 36, 100),
            Event::note_on(4, 9, 38, 100),
            Event::note_off(60, 9, 36, 0),
        ];

        assert_eq!(resolve_ties(&track, &quantization()), track);
    }

    #[test]
    fn test_other_events_keep_absolute_position() {
        let track = vec![
            Event::note_on(10, 9, 36, 100),
            Event::other(1, "cc"),
            Event::note_on(2, 9, 38, 100),
            Event::other(7, "pitch bend"),
            Event::note_off(0, 9, 36, 0),
        ];

        let resolved = resolve_ties(&track, &quantization());

        assert_eq!(
            resolved,
            vec![
                Event::note_on(10, 9, 36, 100),
                Event::note_on(0, 9, 38, 100),
                Event::other(1, "cc"),
                Event::other(9, "pitch bend"),
                Event::note_off(0, 9, 36, 0),
            ]
        );
        assert_eq!(absolute_ticks(&resolved), vec![10, 10, 11, 20, 20]);
    }

    #[test]
    fn test_long_gaps_survive_recomputed_deltas() {
        let long_gap = u64::from(u32::MAX) + 10;
        let track = vec![
            Event::note_on(0, 9, 36, 100),
            Event::note_on(2, 9, 38, 100),
            Event::other(long_gap, "marker"),
            Event::note_off(5, 9, 36, 0),
        ];

        let resolved = resolve_ties(&track, &quantization());

        assert_eq!(
            resolved,
            vec![
                Event::note_on(0, 9, 36, 100),
                Event::note_on(0, 9, 38, 100),
                Event::other(long_gap + 2, "marker"),
                Event::note_off(5, 9, 36, 0),
            ]
        );
        assert_eq!(absolute_ticks(&resolved)[2..], absolute_ticks(&track)[2..]);
    }

    #[test]
    fn test_empty_track() {
        let track: Vec<Event<()>> = Vec::new();
        assert!(resolve_ties(&track, &quantization()).is_empty());
    }
}
