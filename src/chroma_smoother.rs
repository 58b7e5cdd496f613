//! Chroma smoothing: circular neighbor smoothing, peak sharpening, and a
//! temporal EMA across successive chroma frames.

use crate::types::ChromaVector;
use crate::utils::l2_normalize;

/// Fixed, shift-invariant neighbor kernel centered on each pitch class.
const KERNEL: [f64; 5] = [0.10, 0.12, 0.56, 0.12, 0.10];

#[derive(Debug, Default)]
pub struct ChromaSmoother {
    ema: ChromaVector,
    last_ts_ms: Option<f64>,
}

impl ChromaSmoother {
    pub fn new() -> Self {
        ChromaSmoother::default()
    }

    /// Smooth `raw` into the final chroma output for this tick.
    pub fn smooth(&mut self, raw: &ChromaVector, wall_ms: f64, chroma_tc_ms: f64) -> ChromaVector {
        let neighbor_smoothed = circular_smooth(raw);
        let sharpened = sharpen(&neighbor_smoothed);

        let dt_ms = match self.last_ts_ms {
            Some(last) => (wall_ms - last).max(0.0),
            None => 0.0,
        };
        self.last_ts_ms = Some(wall_ms);

        let tau = chroma_tc_ms.max(10.0);
        let alpha = 1.0 - (-dt_ms / tau).exp();
        for k in 0..12 {
            self.ema[k] = (1.0 - alpha) * self.ema[k] + alpha * sharpened[k];
        }
        l2_normalize(&mut self.ema);
        self.ema
    }

    /// Reset the temporal EMA, preserving configuration.
    pub fn reset(&mut self) {
        self.ema = [0.0; 12];
        self.last_ts_ms = None;
    }
}

/// Circular neighbor smoothing with pitch-class arithmetic modulo 12. This
/// is shift-invariant: rotating the input rotates the output identically,
/// which is what makes chroma analysis key-invariant.
fn circular_smooth(v: &ChromaVector) -> ChromaVector {
    let mut out = [0.0; 12];
    for k in 0..12 {
        let mut acc = 0.0;
        for (offset, weight) in KERNEL.iter().enumerate() {
            let shift = offset as i64 - 2; // KERNEL is centered at index 2
            let idx = (k as i64 + shift).rem_euclid(12) as usize;
            acc += weight * v[idx];
        }
        out[k] = acc;
    }
    out
}

fn sharpen(v: &ChromaVector) -> ChromaVector {
    let mut out = [0.0; 12];
    for k in 0..12 {
        out[k] = v[k].max(0.0).powf(1.35);
    }
    l2_normalize(&mut out);
    out
}
