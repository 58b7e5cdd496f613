//! Engine configuration.
//!
//! Immutable after construction: [`Config::validate`] is run once, inside
//! [`crate::Engine::new`], and the engine never mutates its own config
//! afterwards.

use crate::error::{AnalysisError, AnalysisResult};

/// All tunable parameters of the analysis pipeline.
///
/// Every field has the default used throughout the module docs of this
/// crate; construct with [`Config::default`] and override only the fields
/// that matter for a given host.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Power-of-two FFT size used only for frequency-of-bin math.
    pub fft_size: usize,
    /// Bin radius of the whitening envelope.
    pub whiten_half_window: usize,
    pub whiten_eps: f64,
    /// Chroma band, in Hz.
    pub f_min: f64,
    pub f_max: f64,
    /// Bass band, in Hz.
    pub bass_min_hz: f64,
    pub bass_max_hz: f64,
    /// Number of harmonics folded into the bass harmonic product spectrum.
    pub hps_harmonics: usize,
    pub chroma_tc_ms: f64,
    pub harmonic_tc_ms: f64,
    /// Exponent applied to the harmonic/percussive soft mask.
    pub hpss_gamma: f64,
    pub chord_stable_ms: f64,
    pub bass_stable_ms: f64,
    pub bass_release_ms: f64,
    /// Minimum gap, in bins, between bass band edges for a detection to be attempted.
    pub bass_min_gap_bins: usize,
    pub onset_refractory_s: f64,
    pub bpm_min: f64,
    pub bpm_max: f64,
    /// Length of the BPM estimator's energy history ring.
    pub energy_history_len: usize,
    /// Standard-deviation multiplier for the onset threshold.
    pub onset_std_k: f64,
    /// Minimum whitened*masked magnitude accumulated into a chroma bin.
    pub chroma_mag_gate: f64,
    /// Minimum HPS peak value for a bass detection to be considered.
    pub bass_peak_gate: f64,
    /// Confidence affine mapping: `conf = clamp(0,1,(score - conf_low)/conf_span)`.
    pub conf_low: f64,
    pub conf_span: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            fft_size: 4096,
            whiten_half_window: 25,
            whiten_eps: 1e-6,
            f_min: 55.0,
            f_max: 5500.0,
            bass_min_hz: 30.0,
            bass_max_hz: 280.0,
            hps_harmonics: 4,
            chroma_tc_ms: 220.0,
            harmonic_tc_ms: 110.0,
            hpss_gamma: 1.8,
            chord_stable_ms: 320.0,
            bass_stable_ms: 280.0,
            bass_release_ms: 900.0,
            bass_min_gap_bins: 8,
            onset_refractory_s: 0.12,
            bpm_min: 70.0,
            bpm_max: 180.0,
            energy_history_len: 90,
            onset_std_k: 2.0,
            chroma_mag_gate: 0.02,
            bass_peak_gate: 0.02,
            conf_low: 0.20,
            conf_span: 0.80,
        }
    }
}

macro_rules! require_finite {
    ($self:ident, $field:ident) => {
        if !$self.$field.is_finite() {
            return Err(AnalysisError::InvalidConfig {
                field: stringify!($field),
                reason: "must be finite".to_string(),
            });
        }
    };
}

macro_rules! require_nonneg {
    ($self:ident, $field:ident) => {
        if $self.$field < 0.0 {
            return Err(AnalysisError::InvalidConfig {
                field: stringify!($field),
                reason: "must be >= 0".to_string(),
            });
        }
    };
}

impl Config {
    /// Validate every numeric field. Called once by [`crate::Engine::new`].
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.fft_size < 512 || !self.fft_size.is_power_of_two() {
            return Err(AnalysisError::InvalidConfig {
                field: "fft_size",
                reason: "must be a power of two >= 512".to_string(),
            });
        }

        require_finite!(self, whiten_eps);
        require_finite!(self, f_min);
        require_finite!(self, f_max);
        require_finite!(self, bass_min_hz);
        require_finite!(self, bass_max_hz);
        require_finite!(self, chroma_tc_ms);
        require_finite!(self, harmonic_tc_ms);
        require_finite!(self, hpss_gamma);
        require_finite!(self, chord_stable_ms);
        require_finite!(self, bass_stable_ms);
        require_finite!(self, bass_release_ms);
        require_finite!(self, onset_refractory_s);
        require_finite!(self, bpm_min);
        require_finite!(self, bpm_max);
        require_finite!(self, onset_std_k);
        require_finite!(self, chroma_mag_gate);
        require_finite!(self, bass_peak_gate);
        require_finite!(self, conf_low);
        require_finite!(self, conf_span);

        require_nonneg!(self, chroma_tc_ms);
        require_nonneg!(self, harmonic_tc_ms);
        require_nonneg!(self, chord_stable_ms);
        require_nonneg!(self, bass_stable_ms);
        require_nonneg!(self, bass_release_ms);
        require_nonneg!(self, onset_refractory_s);

        if self.f_min <= 0.0 || self.f_max <= self.f_min {
            return Err(AnalysisError::InvalidConfig {
                field: "f_min/f_max",
                reason: "f_min must be positive and less than f_max".to_string(),
            });
        }

        if self.bass_min_hz <= 0.0 || self.bass_max_hz <= self.bass_min_hz {
            return Err(AnalysisError::InvalidConfig {
                field: "bass_min_hz/bass_max_hz",
                reason: "bass_min_hz must be positive and less than bass_max_hz".to_string(),
            });
        }

        if self.hps_harmonics < 2 {
            return Err(AnalysisError::InvalidConfig {
                field: "hps_harmonics",
                reason: "must be >= 2".to_string(),
            });
        }

        if self.bpm_min <= 0.0 || self.bpm_max <= self.bpm_min {
            return Err(AnalysisError::InvalidConfig {
                field: "bpm_min/bpm_max",
                reason: "bpm_min must be positive and less than bpm_max".to_string(),
            });
        }

        if self.energy_history_len < 20 {
            return Err(AnalysisError::InvalidConfig {
                field: "energy_history_len",
                reason: "must be >= 20 (the estimator needs at least 20 samples)".to_string(),
            });
        }

        if self.conf_span <= 0.0 {
            return Err(AnalysisError::InvalidConfig {
                field: "conf_span",
                reason: "must be > 0".to_string(),
            });
        }

        Ok(())
    }
}
