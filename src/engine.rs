//! The top-level orchestrator: owns every pipeline stage and drives the
//! fixed-order dataflow one frame at a time.

use crate::bass_tracker::BassTracker;
use crate::bpm_estimator::BpmEstimator;
use crate::chord_classifier::ChordClassifier;
use crate::chord_hysteresis::ChordHysteresis;
use crate::chroma_mapper::ChromaMapper;
use crate::chroma_smoother::ChromaSmoother;
use crate::config::Config;
use crate::error::{AnalysisError, AnalysisResult};
use crate::harmonic_mask::HarmonicMask;
use crate::types::{Frame, TickResult, TimelineEvent};
use crate::whitener::Whitener;

/// The realtime chord/BPM/chroma analysis engine.
///
/// One `Engine` is built per playback session via [`Engine::new`] and fed one
/// [`Frame`] per `tick`. All pipeline state (EMAs, dwell clocks, the onset
/// history, the event log) lives here; nothing is global.
pub struct Engine {
    config: Config,

    main_whitener: Whitener,
    bass_whitener: Whitener,
    harmonic_mask: HarmonicMask,
    chroma_mapper: ChromaMapper,
    chroma_smoother: ChromaSmoother,
    bass_tracker: BassTracker,
    chord_classifier: ChordClassifier,
    chord_hysteresis: ChordHysteresis,
    bpm_estimator: BpmEstimator,

    whitened_main: Vec<f64>,
    mask_scratch: Vec<f64>,
    whitened_bass: Vec<f64>,

    expected_main_len: Option<usize>,
    expected_bass_len: Option<usize>,
}

impl Engine {
    /// Build a new engine, validating `config` up front.
    pub fn new(config: Config) -> AnalysisResult<Engine> {
        config.validate()?;
        Ok(Engine {
            config,
            main_whitener: Whitener::new(),
            bass_whitener: Whitener::new(),
            harmonic_mask: HarmonicMask::new(),
            chroma_mapper: ChromaMapper::new(),
            chroma_smoother: ChromaSmoother::new(),
            bass_tracker: BassTracker::new(),
            chord_classifier: ChordClassifier::new(),
            chord_hysteresis: ChordHysteresis::new(),
            bpm_estimator: BpmEstimator::new(),
            whitened_main: Vec::new(),
            mask_scratch: Vec::new(),
            whitened_bass: Vec::new(),
            expected_main_len: None,
            expected_bass_len: None,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one tick of the dataflow and return this frame's analysis.
    ///
    /// Order is fixed: whiten both spectra, derive the harmonic mask from
    /// the main spectrum, fold to raw chroma, smooth it, track the bass
    /// pitch class, classify a chord candidate (gated to the main chroma
    /// energy), debounce it through hysteresis, and separately update the
    /// BPM estimator from the time-domain samples.
    pub fn tick(&mut self, frame: Frame<'_>) -> AnalysisResult<TickResult> {
        self.validate_frame(&frame)?;

        let n = frame.mag_main.len();
        if self.whitened_main.len() != n {
            self.whitened_main.resize(n, 0.0);
            self.mask_scratch.resize(n, 0.0);
        }
        self.main_whitener.whiten(
            frame.mag_main,
            self.config.whiten_half_window,
            self.config.whiten_eps,
            &mut self.whitened_main,
        );

        if self.whitened_bass.len() != frame.mag_bass.len() {
            self.whitened_bass.resize(frame.mag_bass.len(), 0.0);
        }
        self.bass_whitener.whiten(
            frame.mag_bass,
            self.config.whiten_half_window,
            self.config.whiten_eps,
            &mut self.whitened_bass,
        );

        self.harmonic_mask.update(
            &self.whitened_main,
            frame.wall_ms,
            self.config.harmonic_tc_ms,
            self.config.hpss_gamma,
            &mut self.mask_scratch,
        );

        let raw_chroma = self.chroma_mapper.map(
            &self.whitened_main,
            &self.mask_scratch,
            frame.sample_rate_hz,
            self.config.fft_size,
            self.config.f_min,
            self.config.f_max,
            self.config.chroma_mag_gate,
        );
        let smooth_chroma = self
            .chroma_smoother
            .smooth(&raw_chroma, frame.wall_ms, self.config.chroma_tc_ms);

        let bass_pc = self.bass_tracker.update(
            &self.whitened_bass,
            frame.sample_rate_hz,
            self.config.fft_size,
            self.config.bass_min_hz,
            self.config.bass_max_hz,
            self.config.hps_harmonics,
            self.config.bass_min_gap_bins,
            self.config.bass_peak_gate,
            self.config.bass_stable_ms,
            self.config.bass_release_ms,
            frame.wall_ms,
        );

        let candidate = self.chord_classifier.classify(
            &smooth_chroma,
            bass_pc,
            self.config.conf_low,
            self.config.conf_span,
        );

        let (chord_text, confidence) = match candidate {
            Some((label, confidence)) => {
                self.chord_hysteresis.update(
                    label,
                    frame.wall_ms,
                    frame.media_time_s,
                    self.config.chord_stable_ms,
                );
                (self.chord_hysteresis.stable_text(), confidence)
            }
            None => (self.chord_hysteresis.stable_text(), 0.0),
        };

        let bpm = self.bpm_estimator.update(
            frame.time_domain,
            frame.media_time_s,
            self.config.energy_history_len,
            self.config.onset_std_k,
            self.config.onset_refractory_s,
            self.config.bpm_min,
            self.config.bpm_max,
        );

        Ok(TickResult {
            chord: chord_text,
            confidence,
            bpm,
            chroma: smooth_chroma,
        })
    }

    /// The confirmed chord timeline, oldest first.
    pub fn events(&self) -> &[TimelineEvent] {
        self.chord_hysteresis.events()
    }

    /// Mark a past timeline event as user-overridden.
    pub fn override_event(&mut self, index: usize, text: String) -> AnalysisResult<()> {
        self.chord_hysteresis.override_event(index, text)
    }

    /// Reset all playback-position-dependent state for a seek or track
    /// change: EMAs, bass stability state, chord hysteresis (including the
    /// event log), and BPM onset history. Configuration and scratch buffers
    /// are preserved.
    pub fn reset_playback_state(&mut self) {
        self.harmonic_mask.reset();
        self.chroma_smoother.reset();
        self.bass_tracker.reset();
        self.chord_hysteresis.reset();
        self.bpm_estimator.reset();
        self.expected_main_len = None;
        self.expected_bass_len = None;
    }

    fn validate_frame(&mut self, frame: &Frame<'_>) -> AnalysisResult<()> {
        if frame.sample_rate_hz <= 0.0 {
            return Err(AnalysisError::InvalidFrame(
                "sample_rate_hz must be positive".to_string(),
            ));
        }
        if frame.mag_main.is_empty() {
            return Err(AnalysisError::InvalidFrame(
                "mag_main must not be empty".to_string(),
            ));
        }

        let nyquist = frame.sample_rate_hz / 2.0;
        if self.config.bass_max_hz >= nyquist {
            return Err(AnalysisError::InvalidFrame(format!(
                "bass_max_hz ({}) must be below Nyquist ({nyquist})",
                self.config.bass_max_hz
            )));
        }

        match self.expected_main_len {
            Some(len) if len != frame.mag_main.len() => {
                return Err(AnalysisError::InvalidFrame(format!(
                    "mag_main length changed from {len} to {} without a reset",
                    frame.mag_main.len()
                )))
            }
            _ => self.expected_main_len = Some(frame.mag_main.len()),
        }

        match self.expected_bass_len {
            Some(len) if len != frame.mag_bass.len() => {
                return Err(AnalysisError::InvalidFrame(format!(
                    "mag_bass length changed from {len} to {} without a reset",
                    frame.mag_bass.len()
                )))
            }
            _ => self.expected_bass_len = Some(frame.mag_bass.len()),
        }

        Ok(())
    }
}
