//! Chord hysteresis: debounces chord labels by a dwell time and appends
//! timeline events on confirmed changes.

use crate::error::{AnalysisError, AnalysisResult};
use crate::types::{ChordLabel, TimelineEvent, NO_CHORD_TEXT};

#[derive(Debug, Default)]
pub struct ChordHysteresis {
    last_chord: Option<ChordLabel>,
    candidate_chord: Option<ChordLabel>,
    candidate_since_ms: f64,
    events: Vec<TimelineEvent>,
}

impl ChordHysteresis {
    pub fn new() -> Self {
        ChordHysteresis::default()
    }

    /// Advance the dwell state machine with this tick's candidate label.
    ///
    /// Callers only invoke this when the classifier produced a candidate at
    /// all (a silent/zero-energy tick has none, and leaves the hysteresis
    /// state, including the dwell clock, untouched). Returns the stable
    /// (possibly still-sentinel) chord.
    pub fn update(&mut self, candidate: ChordLabel, now_ms: f64, media_time_s: f64, chord_stable_ms: f64) -> Option<ChordLabel> {
        if Some(candidate) == self.last_chord {
            self.candidate_since_ms = now_ms;
            return self.last_chord;
        }

        if Some(candidate) != self.candidate_chord {
            self.candidate_chord = Some(candidate);
            self.candidate_since_ms = now_ms;
            return self.last_chord;
        }

        if now_ms - self.candidate_since_ms >= chord_stable_ms {
            self.last_chord = Some(candidate);
            let text = candidate.to_string();
            let is_new = self
                .events
                .last()
                .map(|event| event.chord_text != text)
                .unwrap_or(true);
            if is_new {
                self.events.push(TimelineEvent {
                    media_time_s,
                    chord_text: text,
                    confidence: 1.0,
                    overridden: false,
                    user_text: None,
                });
            }
        }

        self.last_chord
    }

    pub fn stable_text(&self) -> String {
        self.last_chord
            .map(|c| c.to_string())
            .unwrap_or_else(|| NO_CHORD_TEXT.to_string())
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    /// Mark `events()[index]` as overridden with host-supplied `text`. No
    /// other mutation of the event log is permitted.
    pub fn override_event(&mut self, index: usize, text: String) -> AnalysisResult<()> {
        let event = self.events.get_mut(index).ok_or_else(|| {
            AnalysisError::InvalidFrame(format!(
                "event index {index} out of range (log has {} entries)",
                self.events.len()
            ))
        })?;
        event.overridden = true;
        event.user_text = Some(text);
        Ok(())
    }

    /// Clear dwell state and the event log; preserves no configuration (this
    /// stage is stateless w.r.t. config).
    pub fn reset(&mut self) {
        self.last_chord = None;
        self.candidate_chord = None;
        self.candidate_since_ms = 0.0;
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChordQuality, PitchClass};
    use pretty_assertions::assert_eq;

    fn chord(root: i64, quality: ChordQuality) -> ChordLabel {
        ChordLabel {
            root: PitchClass::from_i64(root),
            quality,
            bass: None,
        }
    }

    #[test]
    fn candidate_must_dwell_before_promotion() {
        let mut hysteresis = ChordHysteresis::new();
        let c = chord(0, ChordQuality::Major);

        assert_eq!(hysteresis.update(c, 0.0, 0.0, 320.0), None);
        assert_eq!(hysteresis.update(c, 100.0, 0.1, 320.0), None);
        assert_eq!(hysteresis.update(c, 200.0, 0.2, 320.0), None);
        assert_eq!(hysteresis.update(c, 320.0, 0.32, 320.0), Some(c));
        assert_eq!(hysteresis.events().len(), 1);
        assert_eq!(hysteresis.events()[0].chord_text, "C");
        assert_eq!(hysteresis.events()[0].media_time_s, 0.32);
    }

    #[test]
    fn switching_candidates_resets_the_dwell_clock() {
        let mut hysteresis = ChordHysteresis::new();
        let c_major = chord(0, ChordQuality::Major);
        let g_major = chord(7, ChordQuality::Major);

        hysteresis.update(c_major, 0.0, 0.0, 320.0);
        hysteresis.update(g_major, 100.0, 0.1, 320.0);
        // Switched candidate at t=100; 320ms dwell would only complete at 420.
        assert_eq!(hysteresis.update(g_major, 400.0, 0.4, 320.0), None);
        assert_eq!(hysteresis.update(g_major, 420.0, 0.42, 320.0), Some(g_major));
    }

    #[test]
    fn consecutive_events_never_repeat_the_same_chord() {
        let mut hysteresis = ChordHysteresis::new();
        let c_major = chord(0, ChordQuality::Major);

        for tick in 0..10 {
            hysteresis.update(c_major, tick as f64 * 320.0, tick as f64 * 0.32, 320.0);
        }
        assert_eq!(hysteresis.events().len(), 1);
    }

    #[test]
    fn override_sets_overridden_and_user_text_only() {
        let mut hysteresis = ChordHysteresis::new();
        let c_major = chord(0, ChordQuality::Major);
        hysteresis.update(c_major, 0.0, 0.0, 320.0);
        hysteresis.update(c_major, 320.0, 0.32, 320.0);

        hysteresis
            .override_event(0, "actually a C6".to_string())
            .unwrap();
        let event = &hysteresis.events()[0];
        assert!(event.overridden);
        assert_eq!(event.user_text.as_deref(), Some("actually a C6"));
        assert_eq!(event.chord_text, "C");
        assert_eq!(event.confidence, 1.0);
    }

    #[test]
    fn override_out_of_range_errors() {
        let mut hysteresis = ChordHysteresis::new();
        assert!(hysteresis.override_event(0, "x".to_string()).is_err());
    }

    #[test]
    fn reset_clears_state_and_event_log() {
        let mut hysteresis = ChordHysteresis::new();
        let c_major = chord(0, ChordQuality::Major);
        hysteresis.update(c_major, 0.0, 0.0, 320.0);
        hysteresis.update(c_major, 320.0, 0.32, 320.0);
        hysteresis.reset();
        assert_eq!(hysteresis.events().len(), 0);
        assert_eq!(hysteresis.stable_text(), "\u{2014}");
    }
}
