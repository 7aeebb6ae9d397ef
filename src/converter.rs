use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use midi_convert_core::{
    note_only, remap_tracks, resolve_ties, MappingTable, Quantization, DEFAULT_QUANTIZE_DIVISOR,
};

use crate::mapping::load_mapping;
use crate::midi::{MidiDocument, MidiTrack};
use crate::{ConvertError, Result};

/// What to do about runs of note events that look like a jittered chord
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TieMode {
    /// Leave timing alone and skip detection
    #[default]
    Ignore,
    /// Report whether each track is tie-free
    Check,
    /// Report, then collapse simultaneous runs onto one tick
    Resolve,
}

/// Conversion settings
#[derive(Debug, Clone, Serialize)]
pub struct ConvertOptions {
    /// Drop every event that is not a note-on/note-off
    pub note_only: bool,
    pub ties: TieMode,
    /// Simultaneity threshold is `ticks_per_beat / quantize_divisor`
    pub quantize_divisor: u32,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            note_only: false,
            ties: TieMode::Ignore,
            quantize_divisor: DEFAULT_QUANTIZE_DIVISOR,
        }
    }
}

/// Per-track outcome of a conversion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackReport {
    pub index: usize,
    pub events_in: usize,
    pub events_out: usize,
    /// Tie verdict before any resolution; `None` when not checked
    pub tie_free: Option<bool>,
    /// Absolute tick where the first non-simultaneous run starts
    pub first_tie_tick: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub source_format: String,
    pub destination_format: String,
    pub ticks_per_beat: Option<u16>,
    pub tracks: Vec<TrackReport>,
}

impl ConversionReport {
    pub fn is_tie_free(&self) -> Option<bool> {
        self.tracks
            .iter()
            .map(|t| t.tie_free)
            .try_fold(true, |acc, verdict| verdict.map(|v| acc && v))
    }
}

/// Converts MIDI files from one drum mapping to another.
pub struct Converter {
    source_format: String,
    destination_format: String,
    mapping: MappingTable,
    options: ConvertOptions,
}

impl Converter {
    pub fn new(
        source_format: impl Into<String>,
        destination_format: impl Into<String>,
        mapping: MappingTable,
        options: ConvertOptions,
    ) -> Self {
        Self {
            source_format: source_format.into(),
            destination_format: destination_format.into(),
            mapping,
            options,
        }
    }

    /// Load the two format columns from a mapping CSV. Unknown formats fail
    /// here, before any file is touched.
    pub fn from_mapping_file(
        mapping_path: &Path,
        source_format: &str,
        destination_format: &str,
        options: ConvertOptions,
    ) -> Result<Self> {
        let mapping = load_mapping(mapping_path, source_format, destination_format)?;
        Ok(Self::new(source_format, destination_format, mapping, options))
    }

    pub fn mapping(&self) -> &MappingTable {
        &self.mapping
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// `<input stem>-<destination format>.mid` inside `output_dir`
    pub fn output_path(&self, input: &Path, output_dir: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        output_dir.join(format!("{}-{}.mid", stem, self.destination_format))
    }

    /// Run the conversion pipeline over an already parsed file.
    pub fn convert_document<'a>(
        &self,
        doc: &MidiDocument<'a>,
    ) -> Result<(MidiDocument<'a>, Vec<TrackReport>)> {
        let quantization = self.quantization(doc)?;
        let remapped = remap_tracks(&doc.tracks, &self.mapping)?;

        let mut tracks = Vec::with_capacity(remapped.len());
        let mut reports = Vec::with_capacity(remapped.len());

        for (index, (original, track)) in doc.tracks.iter().zip(remapped).enumerate() {
            let (track, report) = self.finish_track(index, original.len(), track, quantization);
            debug!(
                track = index,
                events_in = report.events_in,
                events_out = report.events_out,
                tie_free = ?report.tie_free,
                "track converted"
            );
            tracks.push(track);
            reports.push(report);
        }

        Ok((doc.with_tracks(tracks), reports))
    }

    /// Tie threshold for `doc`, or `None` when ties are ignored
    fn quantization(&self, doc: &MidiDocument<'_>) -> Result<Option<Quantization>> {
        if self.options.ties == TieMode::Ignore {
            return Ok(None);
        }

        let tpb = doc.ticks_per_beat().ok_or(ConvertError::UnsupportedTiming)?;
        let quantization = Quantization::new(u32::from(tpb), self.options.quantize_divisor)?;
        if quantization.threshold() == 0 {
            warn!(
                ticks_per_beat = tpb,
                divisor = self.options.quantize_divisor,
                "quantization threshold is 0 ticks, every track with notes will report a tie; \
                 use a --quantize-divisor no larger than the ticks per beat"
            );
        }

        Ok(Some(quantization))
    }

    fn finish_track<'a>(
        &self,
        index: usize,
        events_in: usize,
        track: MidiTrack<'a>,
        quantization: Option<Quantization>,
    ) -> (MidiTrack<'a>, TrackReport) {
        let mut track = if self.options.note_only {
            note_only(&track)
        } else {
            track
        };

        let mut tie_free = None;
        let mut first_tie_tick = None;

        if let Some(quantization) = quantization {
            let tie = quantization.first_tie(&track);
            if let Some(run) = &tie {
                warn!(
                    track = index,
                    tick = run.start_tick,
                    spread = run.spread(),
                    threshold = quantization.threshold(),
                    "tie found"
                );
            }
            tie_free = Some(tie.is_none());
            first_tie_tick = tie.map(|run| run.start_tick);

            if self.options.ties == TieMode::Resolve {
                track = resolve_ties(&track, &quantization);
            }
        }

        let report = TrackReport {
            index,
            events_in,
            events_out: track.len(),
            tie_free,
            first_tie_tick,
        };
        (track, report)
    }

    /// Read `input`, convert it and write the result into `output_dir`.
    pub fn convert_file(&self, input: &Path, output_dir: &Path) -> Result<ConversionReport> {
        info!(input = %input.display(), "converting");

        let data = fs::read(input).map_err(|e| ConvertError::io(input, e))?;
        let doc = MidiDocument::parse(&data)?;
        let (converted, tracks) = self.convert_document(&doc)?;

        let output = self.output_path(input, output_dir);
        converted.save(&output)?;
        info!(output = %output.display(), "saved");

        Ok(ConversionReport {
            input: input.to_path_buf(),
            output,
            source_format: self.source_format.clone(),
            destination_format: self.destination_format.clone(),
            ticks_per_beat: doc.ticks_per_beat(),
            tracks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::tests::snare_file;
    use midi_convert_core::{Error, Event};
    use pretty_assertions::assert_eq;

    fn snare_mapping() -> MappingTable {
        MappingTable::from_pairs([(38, 40)]).unwrap()
    }

    fn converter(options: ConvertOptions) -> Converter {
        Converter::new("studio_drummer_gm", "guitar_pro_8_drumkit", snare_mapping(), options)
    }

    #[test]
    fn test_output_path() {
        let c = converter(ConvertOptions::default());
        assert_eq!(
            c.output_path(Path::new("songs/Dazer.mid"), Path::new("out")),
            PathBuf::from("out/Dazer-guitar_pro_8_drumkit.mid")
        );
    }

    #[test]
    fn test_remap_keeps_other_events() {
        let data = snare_file();
        let doc = MidiDocument::parse(&data).unwrap();

        let (converted, reports) = converter(ConvertOptions::default())
            .convert_document(&doc)
            .unwrap();

        let track = &converted.tracks[0];
        assert_eq!(track.len(), 5);
        assert_eq!(track[1], Event::note_on(0, 9, 40, 100));
        assert_eq!(track[2], doc.tracks[0][2]);
        assert_eq!(track[3], Event::note_off(10, 9, 40, 0));
        assert_eq!(
            reports,
            vec![TrackReport {
                index: 0,
                events_in: 5,
                events_out: 5,
                tie_free: None,
                first_tie_tick: None,
            }]
        );
    }

    #[test]
    fn test_remap_then_note_only() {
        let data = snare_file();
        let doc = MidiDocument::parse(&data).unwrap();
        let options = ConvertOptions {
            note_only: true,
            ..ConvertOptions::default()
        };

        let (converted, _) = converter(options).convert_document(&doc).unwrap();

        assert_eq!(
            converted.tracks[0],
            vec![Event::note_on(0, 9, 40, 100), Event::note_off(15, 9, 40, 0)]
        );
    }

    #[test]
    fn test_unmapped_note_aborts() {
        let data = snare_file();
        let doc = MidiDocument::parse(&data).unwrap();
        let c = Converter::new("a", "b", MappingTable::new(), ConvertOptions::default());

        let err = c.convert_document(&doc).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::Convert(Error::TrackMappingLookup {
                track: 0,
                note: 38,
                position: 1
            })
        ));
    }

    #[test]
    fn test_tie_check_reports_verdict() {
        let data = snare_file();
        let doc = MidiDocument::parse(&data).unwrap();
        let options = ConvertOptions {
            ties: TieMode::Check,
            ..ConvertOptions::default()
        };

        let (_, reports) = converter(options).convert_document(&doc).unwrap();

        assert_eq!(reports[0].tie_free, Some(true));
        assert_eq!(reports[0].first_tie_tick, None);
    }

    #[test]
    fn test_invalid_divisor() {
        let data = snare_file();
        let doc = MidiDocument::parse(&data).unwrap();
        let options = ConvertOptions {
            ties: TieMode::Check,
            quantize_divisor: 0,
            ..ConvertOptions::default()
        };

        assert!(matches!(
            converter(options).convert_document(&doc),
            Err(ConvertError::Convert(Error::InvalidConfiguration(_)))
        ));
    }

    #[test]
    fn test_coarse_resolution_gives_zero_threshold() {
        let data = snare_file();
        let mut doc = MidiDocument::parse(&data).unwrap();
        doc.timing = midly::Timing::Metrical(midly::num::u15::new(96));
        let options = ConvertOptions {
            ties: TieMode::Check,
            ..ConvertOptions::default()
        };
        let c = converter(options);

        let threshold = c.quantization(&doc).unwrap().map(|q| q.threshold());
        assert_eq!(threshold, Some(0));

        // even a lone note fails a zero threshold
        let single = doc.with_tracks(vec![vec![Event::note_on(0, 9, 38, 100)]]);
        let (_, reports) = c.convert_document(&single).unwrap();
        assert_eq!(reports[0].tie_free, Some(false));
        assert_eq!(reports[0].first_tie_tick, Some(0));

        let ignored = converter(ConvertOptions::default());
        assert_eq!(ignored.quantization(&doc).unwrap(), None);
    }

    #[test]
    fn test_resolve_collapses_chord() {
        let data = snare_file();
        let doc = MidiDocument::parse(&data).unwrap();
        let jittered = doc.with_tracks(vec![vec![
            Event::note_on(0, 9, 38, 100),
            Event::note_on(2, 9, 38, 90),
            Event::note_off(100, 9, 38, 0),
            Event::note_off(50, 9, 38, 0),
        ]]);
        let options = ConvertOptions {
            ties: TieMode::Resolve,
            ..ConvertOptions::default()
        };

        let (converted, reports) = converter(options).convert_document(&jittered).unwrap();

        assert_eq!(reports[0].tie_free, Some(false));
        assert_eq!(reports[0].first_tie_tick, Some(102));
        assert_eq!(
            converted.tracks[0],
            vec![
                Event::note_on(0, 9, 40, 100),
                Event::note_on(0, 9, 40, 90),
                Event::note_off(102, 9, 40, 0),
                Event::note_off(50, 9, 40, 0),
            ]
        );
    }

    #[test]
    fn test_timecode_tie_check_unsupported() {
        let data = snare_file();
        let mut doc = MidiDocument::parse(&data).unwrap();
        doc.timing = midly::Timing::Timecode(midly::Fps::Fps25, 40);
        let options = ConvertOptions {
            ties: TieMode::Check,
            ..ConvertOptions::default()
        };

        assert!(matches!(
            converter(options).convert_document(&doc),
            Err(ConvertError::UnsupportedTiming)
        ));
    }

    #[test]
    fn test_convert_file_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("Dazer.mid");
        fs::write(&input, snare_file()).unwrap();

        let options = ConvertOptions {
            note_only: true,
            ties: TieMode::Check,
            ..ConvertOptions::default()
        };
        let report = converter(options)
            .convert_file(&input, dir.path())
            .unwrap();

        assert_eq!(
            report.output,
            dir.path().join("Dazer-guitar_pro_8_drumkit.mid")
        );
        assert_eq!(report.ticks_per_beat, Some(480));
        assert_eq!(report.is_tie_free(), Some(true));

        let written = fs::read(&report.output).unwrap();
        let reread = MidiDocument::parse(&written).unwrap();
        let track = &reread.tracks[0];
        assert_eq!(track.len(), 3);
        assert_eq!(track[0], Event::note_on(0, 9, 40, 100));
        assert_eq!(track[1], Event::note_off(15, 9, 40, 0));
    }

    #[test]
    fn test_report_tie_verdict_unchecked() {
        let report = ConversionReport {
            input: PathBuf::from("a.mid"),
            output: PathBuf::from("a-b.mid"),
            source_format: "a".into(),
            destination_format: "b".into(),
            ticks_per_beat: Some(480),
            tracks: vec![TrackReport {
                index: 0,
                events_in: 1,
                events_out: 1,
                tie_free: None,
                first_tie_tick: None,
            }],
        };

        assert_eq!(report.is_tie_free(), None);
    }
}
