//! Chroma mapping: folds a whitened, mask-weighted spectrum into a
//! 12-dimensional pitch-class vector.

use crate::types::ChromaVector;
use crate::utils::{freq_to_pitch_class, l2_normalize};

#[derive(Debug, Default)]
pub struct ChromaMapper;

impl ChromaMapper {
    pub fn new() -> Self {
        ChromaMapper
    }

    /// Fold `whitened` (gated by `mask`) into a chroma vector.
    ///
    /// Bin 0 (DC) is never visited; the loop runs over `1..N-1`. If nothing
    /// survives the magnitude and frequency-band gates, the zero vector is
    /// returned.
    pub fn map(
        &self,
        whitened: &[f64],
        mask: &[f64],
        sample_rate_hz: f64,
        fft_size: usize,
        f_min: f64,
        f_max: f64,
        mag_gate: f64,
    ) -> ChromaVector {
        debug_assert_eq!(whitened.len(), mask.len());
        let mut chroma: ChromaVector = [0.0; 12];
        let n = whitened.len();
        if n < 2 {
            return chroma;
        }

        for i in 1..n - 1 {
            let mag = whitened[i] * mask[i];
            if mag < mag_gate {
                continue;
            }
            let freq = i as f64 * sample_rate_hz / fft_size as f64;
            if freq < f_min || freq > f_max {
                continue;
            }
            let pc = freq_to_pitch_class(freq);
            chroma[pc.get() as usize] += mag.powf(1.25);
        }

        l2_normalize(&mut chroma);
        chroma
    }
}
