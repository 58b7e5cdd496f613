//! Shared value types that flow between the pipeline stages.

use std::fmt;

use strum_macros::EnumIter;

/// A note identity modulo octave, 0..11 from C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PitchClass(u8);

impl PitchClass {
    pub const COUNT: u8 = 12;

    const NAMES: [&'static str; 12] = [
        "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
    ];

    /// Build a pitch class from a raw value, wrapping modulo 12.
    ///
    /// `value` may be negative (e.g. the result of a rotation); the
    /// Euclidean remainder is taken so the result is always in 0..11.
    pub fn from_i64(value: i64) -> Self {
        let wrapped = value.rem_euclid(i64::from(Self::COUNT));
        PitchClass(wrapped as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn name(self) -> &'static str {
        Self::NAMES[self.0 as usize]
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A 12-dimensional energy distribution over pitch classes, L2-normalized
/// after every stage it leaves.
pub type ChromaVector = [f64; 12];

/// Triad/tetrad quality. Declaration order is load-bearing: it is the
/// iteration order used to build [`crate::chord_classifier::ChordClassifier`]'s
/// template table and therefore the tie-break order on equal scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum ChordQuality {
    Major,
    Minor,
    Maj7,
    Min7,
    Dom7,
    Dim,
}

impl ChordQuality {
    /// Semitone intervals above the root that define this quality's template.
    pub fn intervals(self) -> &'static [i64] {
        match self {
            ChordQuality::Major => &[0, 4, 7],
            ChordQuality::Minor => &[0, 3, 7],
            ChordQuality::Maj7 => &[0, 4, 7, 11],
            ChordQuality::Min7 => &[0, 3, 7, 10],
            ChordQuality::Dom7 => &[0, 4, 7, 10],
            ChordQuality::Dim => &[0, 3, 6],
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            ChordQuality::Major => "",
            ChordQuality::Minor => "m",
            ChordQuality::Maj7 => "maj7",
            ChordQuality::Min7 => "m7",
            ChordQuality::Dom7 => "7",
            ChordQuality::Dim => "dim",
        }
    }
}

/// A chord estimate: root, quality, and an optional slash bass when the
/// detected bass pitch class differs from the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChordLabel {
    pub root: PitchClass,
    pub quality: ChordQuality,
    pub bass: Option<PitchClass>,
}

impl fmt::Display for ChordLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.root, self.quality.suffix())?;
        if let Some(bass) = self.bass {
            if bass != self.root {
                write!(f, "/{bass}")?;
            }
        }
        Ok(())
    }
}

/// Sentinel text for "no chord known", rendered when no chord has ever been
/// confirmed by [`crate::chord_hysteresis::ChordHysteresis`].
pub const NO_CHORD_TEXT: &str = "\u{2014}";

/// A confirmed chord change, appended to the engine's event log.
///
/// Append-only except for [`TimelineEvent::overridden`] and
/// [`TimelineEvent::user_text`], which [`crate::Engine::override_event`] may
/// set in place.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEvent {
    pub media_time_s: f64,
    pub chord_text: String,
    pub confidence: f64,
    pub overridden: bool,
    pub user_text: Option<String>,
}

/// One tick's worth of pre-computed analysis inputs.
///
/// `mag_main` and `mag_bass` are byte-quantized magnitude spectra (0..255);
/// `time_domain` holds raw samples roughly in `[-1, 1]`. `wall_ms` must be
/// monotonically non-decreasing across ticks; `media_time_s` reflects
/// position in the track and may stall during pause.
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    pub mag_main: &'a [u8],
    pub mag_bass: &'a [u8],
    pub time_domain: &'a [f32],
    pub sample_rate_hz: f64,
    pub wall_ms: f64,
    pub media_time_s: f64,
    pub is_playing: bool,
}

/// The engine's per-tick output.
#[derive(Debug, Clone, PartialEq)]
pub struct TickResult {
    pub chord: String,
    pub confidence: f64,
    pub bpm: Option<u32>,
    pub chroma: ChromaVector,
}

impl Default for TickResult {
    fn default() -> Self {
        TickResult {
            chord: NO_CHORD_TEXT.to_string(),
            confidence: 0.0,
            bpm: None,
            chroma: [0.0; 12],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn pitch_class_wraps_negative() {
        assert_eq!(PitchClass::from_i64(-1).get(), 11);
        assert_eq!(PitchClass::from_i64(-13).get(), 11);
        assert_eq!(PitchClass::from_i64(12).get(), 0);
    }

    #[test]
    fn pitch_class_names_are_byte_exact() {
        let names: Vec<&str> = (0..12)
            .map(|i| PitchClass::from_i64(i).name())
            .collect();
        assert_eq!(
            names,
            vec!["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"]
        );
    }

    #[test]
    fn chord_quality_iteration_order_is_fixed() {
        let order: Vec<ChordQuality> = ChordQuality::iter().collect();
        assert_eq!(
            order,
            vec![
                ChordQuality::Major,
                ChordQuality::Minor,
                ChordQuality::Maj7,
                ChordQuality::Min7,
                ChordQuality::Dom7,
                ChordQuality::Dim,
            ]
        );
    }

    #[test]
    fn chord_label_display_major_no_suffix() {
        let label = ChordLabel {
            root: PitchClass::from_i64(0),
            quality: ChordQuality::Major,
            bass: None,
        };
        assert_eq!(label.to_string(), "C");
    }

    #[test]
    fn chord_label_display_minor_seventh() {
        let label = ChordLabel {
            root: PitchClass::from_i64(9),
            quality: ChordQuality::Min7,
            bass: None,
        };
        assert_eq!(label.to_string(), "Am7");
    }

    #[test]
    fn chord_label_display_slash_bass() {
        let label = ChordLabel {
            root: PitchClass::from_i64(0),
            quality: ChordQuality::Major,
            bass: Some(PitchClass::from_i64(7)),
        };
        assert_eq!(label.to_string(), "C/G");
    }

    #[test]
    fn chord_label_display_slash_omitted_when_bass_equals_root() {
        let label = ChordLabel {
            root: PitchClass::from_i64(0),
            quality: ChordQuality::Major,
            bass: Some(PitchClass::from_i64(0)),
        };
        assert_eq!(label.to_string(), "C");
    }

    #[test]
    fn tick_result_default_is_no_chord_sentinel() {
        let result = TickResult::default();
        assert_eq!(result.chord, "\u{2014}");
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.bpm, None);
        assert_eq!(result.chroma, [0.0; 12]);
    }
}
