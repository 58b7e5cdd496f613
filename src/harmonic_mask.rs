//! Harmonic/percussive soft masking.
//!
//! Maintains a bin-wise EMA of the whitened main spectrum and derives a
//! per-bin soft mask that favors stationary (harmonic) bins over transient
//! spikes, loosely in the spirit of Wiener-style harmonic/percussive
//! separation, formulated here as a cheap streaming EMA.

#[derive(Debug, Default)]
pub struct HarmonicMask {
    h: Vec<f64>,
    last_ts_ms: Option<f64>,
}

impl HarmonicMask {
    pub fn new() -> Self {
        HarmonicMask::default()
    }

    /// Update the mask for the current frame `x` and return it into `mask`.
    ///
    /// `wall_ms` is the current wall-clock timestamp; `harmonic_tc_ms` and
    /// `gamma` come from [`crate::config::Config`]. On the very first call
    /// (or right after a reset), `H` starts at zero and the mask is small,
    /// rising over subsequent calls; this warmup is intentional.
    pub fn update(&mut self, x: &[f64], wall_ms: f64, harmonic_tc_ms: f64, gamma: f64, mask: &mut [f64]) {
        debug_assert_eq!(x.len(), mask.len());
        if self.h.len() != x.len() {
            self.h.resize(x.len(), 0.0);
        }

        let dt_ms = match self.last_ts_ms {
            Some(last) => (wall_ms - last).max(0.0),
            None => 0.0,
        };
        self.last_ts_ms = Some(wall_ms);

        let tau = harmonic_tc_ms.max(20.0);
        let alpha = 1.0 - (-dt_ms / tau).exp();

        const EPS: f64 = 1e-9;
        for i in 0..x.len() {
            self.h[i] = (1.0 - alpha) * self.h[i] + alpha * x[i];
            let p = (x[i] - self.h[i]).max(0.0);
            let ratio = self.h[i] / (self.h[i] + p + EPS);
            mask[i] = ratio.powf(gamma);
        }
    }

    /// Reset the EMA and warmup state, preserving buffer allocation.
    pub fn reset(&mut self) {
        self.h.iter_mut().for_each(|v| *v = 0.0);
        self.last_ts_ms = None;
    }
}
