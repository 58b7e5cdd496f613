//! Bass pitch tracking via harmonic product spectrum.

use log::{debug, warn};

use crate::types::PitchClass;
use crate::utils::freq_to_pitch_class;

#[derive(Debug, Default)]
pub struct BassTracker {
    current_pc: Option<PitchClass>,
    candidate_pc: Option<PitchClass>,
    candidate_since_ms: f64,
    hps_scratch: Vec<f64>,
}

#[allow(clippy::too_many_arguments)]
impl BassTracker {
    pub fn new() -> Self {
        BassTracker::default()
    }

    /// Run one tick of HPS-based bass detection and stability tracking.
    ///
    /// `whitened_bass` is the whitened spectrum restricted to the bass
    /// provider's bins (`Nbass` long); `sample_rate_hz`/`fft_size` give the
    /// bin-to-frequency mapping. Returns the current stable pitch class,
    /// which may be `None`.
    pub fn update(
        &mut self,
        whitened_bass: &[f64],
        sample_rate_hz: f64,
        fft_size: usize,
        bass_min_hz: f64,
        bass_max_hz: f64,
        hps_harmonics: usize,
        min_gap_bins: usize,
        peak_gate: f64,
        bass_stable_ms: f64,
        bass_release_ms: f64,
        wall_ms: f64,
    ) -> Option<PitchClass> {
        let detected = self.detect(
            whitened_bass,
            sample_rate_hz,
            fft_size,
            bass_min_hz,
            bass_max_hz,
            hps_harmonics,
            min_gap_bins,
            peak_gate,
        );

        match detected {
            None => {
                if self.current_pc.is_some()
                    && wall_ms - self.candidate_since_ms > bass_release_ms
                {
                    debug!("bass tracker releasing pc after {bass_release_ms}ms with no detection");
                    self.current_pc = None;
                }
            }
            Some(pc) if Some(pc) == self.current_pc => {
                self.candidate_since_ms = wall_ms;
            }
            Some(pc) if Some(pc) != self.candidate_pc => {
                self.candidate_pc = Some(pc);
                self.candidate_since_ms = wall_ms;
            }
            Some(_) => {
                if wall_ms - self.candidate_since_ms >= bass_stable_ms {
                    self.current_pc = self.candidate_pc;
                }
            }
        }

        self.current_pc
    }

    fn detect(
        &mut self,
        spec: &[f64],
        sample_rate_hz: f64,
        fft_size: usize,
        bass_min_hz: f64,
        bass_max_hz: f64,
        hps_harmonics: usize,
        min_gap_bins: usize,
        peak_gate: f64,
    ) -> Option<PitchClass> {
        let len = spec.len();
        if len < 2 {
            return None;
        }

        let bin_min = ((bass_min_hz * fft_size as f64 / sample_rate_hz).floor() as usize).max(1);
        let bin_max =
            ((bass_max_hz * fft_size as f64 / sample_rate_hz).floor() as usize).min(len - 1);
        if bin_max <= bin_min + min_gap_bins {
            warn!(
                "bass band too narrow for detection: bin_min={bin_min}, bin_max={bin_max}, min_gap_bins={min_gap_bins}"
            );
            return None;
        }

        if self.hps_scratch.len() < len {
            self.hps_scratch.resize(len, 0.0);
        }
        let hps = &mut self.hps_scratch[..len];
        hps[bin_min..=bin_max].copy_from_slice(&spec[bin_min..=bin_max]);

        for h in 2..=hps_harmonics {
            for i in bin_min..=bin_max {
                if i * h <= bin_max {
                    hps[i] *= spec[i * h].max(1e-3);
                } else {
                    break;
                }
            }
        }

        let mut best_i = bin_min;
        let mut best_v = hps[bin_min];
        for i in (bin_min + 1)..=bin_max {
            if hps[i] > best_v {
                best_v = hps[i];
                best_i = i;
            }
        }

        if best_v < peak_gate {
            return None;
        }

        let freq = best_i as f64 * sample_rate_hz / fft_size as f64;
        Some(freq_to_pitch_class(freq))
    }

    /// Reset all stability-window state, preserving scratch allocation.
    pub fn reset(&mut self) {
        self.current_pc = None;
        self.candidate_pc = None;
        self.candidate_since_ms = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SR: f64 = 44100.0;
    const FFT: usize = 4096;

    fn spectrum_with_peak(freq_hz: f64, len: usize) -> Vec<f64> {
        let mut spec = vec![0.0; len];
        let bin = (freq_hz * FFT as f64 / SR).round() as usize;
        for h in 1..=4 {
            let b = bin * h;
            if b < len {
                spec[b] = 1.0 / h as f64;
            }
        }
        spec
    }

    #[test]
    fn no_peak_yields_no_detection() {
        let mut tracker = BassTracker::new();
        let spec = vec![0.0; 600];
        let pc = tracker.update(&spec, SR, FFT, 30.0, 280.0, 4, 8, 0.02, 280.0, 900.0, 0.0);
        assert_eq!(pc, None);
    }

    #[test]
    fn too_narrow_band_yields_no_detection() {
        let mut tracker = BassTracker::new();
        let spec = spectrum_with_peak(98.0, 600);
        // bass_min_hz/bass_max_hz chosen so bin_max <= bin_min + min_gap_bins.
        let pc = tracker.update(&spec, SR, FFT, 95.0, 100.0, 4, 8, 0.02, 280.0, 900.0, 0.0);
        assert_eq!(pc, None);
    }

    #[test]
    fn stable_g2_promotes_after_bass_stable_ms() {
        let mut tracker = BassTracker::new();
        let spec = spectrum_with_peak(98.0, 600); // G2
        let g_pc = PitchClass::from_i64(7);

        // First detection sets the candidate, not yet current.
        let pc0 = tracker.update(&spec, SR, FFT, 30.0, 280.0, 4, 8, 0.02, 280.0, 900.0, 0.0);
        assert_eq!(pc0, None);

        // Before the dwell has elapsed, still not promoted.
        let pc1 = tracker.update(&spec, SR, FFT, 30.0, 280.0, 4, 8, 0.02, 280.0, 900.0, 200.0);
        assert_eq!(pc1, None);

        // After bass_stable_ms has elapsed with the same candidate, promote.
        let pc2 = tracker.update(&spec, SR, FFT, 30.0, 280.0, 4, 8, 0.02, 280.0, 900.0, 280.0);
        assert_eq!(pc2, Some(g_pc));
    }

    #[test]
    fn releases_after_release_window_of_silence() {
        let mut tracker = BassTracker::new();
        let spec = spectrum_with_peak(98.0, 600);
        tracker.update(&spec, SR, FFT, 30.0, 280.0, 4, 8, 0.02, 280.0, 900.0, 0.0);
        tracker.update(&spec, SR, FFT, 30.0, 280.0, 4, 8, 0.02, 280.0, 900.0, 280.0);
        assert!(tracker.current_pc.is_some());

        let silence = vec![0.0; 600];
        let pc = tracker.update(&silence, SR, FFT, 30.0, 280.0, 4, 8, 0.02, 280.0, 900.0, 1300.0);
        assert_eq!(pc, None);
    }

    #[test]
    fn reset_clears_current_and_candidate() {
        let mut tracker = BassTracker::new();
        let spec = spectrum_with_peak(98.0, 600);
        tracker.update(&spec, SR, FFT, 30.0, 280.0, 4, 8, 0.02, 280.0, 900.0, 0.0);
        tracker.update(&spec, SR, FFT, 30.0, 280.0, 4, 8, 0.02, 280.0, 900.0, 280.0);
        tracker.reset();
        assert_eq!(tracker.current_pc, None);
        assert_eq!(tracker.candidate_pc, None);
    }
}
