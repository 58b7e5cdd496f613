//! Spectral whitening.
//!
//! Converts a byte-valued magnitude spectrum into a locally-normalized float
//! spectrum via a box-filter envelope. Stateless across ticks: the
//! only persistent state is a reusable scratch buffer for the prefix sum, so
//! steady-state operation allocates nothing.

#[derive(Debug, Default)]
pub struct Whitener {
    // Prefix sum has N+1 entries for an N-bin spectrum; reused and resized
    // (not shrunk) across ticks so steady-state operation allocates nothing.
    prefix_sum: Vec<f64>,
}

impl Whitener {
    pub fn new() -> Self {
        Whitener::default()
    }

    /// Whiten `bytes` into `out`, which must be the same length.
    ///
    /// Total over any non-empty input: never errors. Output lies in `[0, 1]`.
    pub fn whiten(&mut self, bytes: &[u8], half_window: usize, eps: f64, out: &mut [f64]) {
        let n = bytes.len();
        debug_assert_eq!(n, out.len());
        if n == 0 {
            return;
        }

        if self.prefix_sum.len() < n + 1 {
            self.prefix_sum.resize(n + 1, 0.0);
        }
        let prefix = &mut self.prefix_sum[..=n];

        // Step 1: squash to unit magnitude with mild gamma emphasis.
        prefix[0] = 0.0;
        for i in 0..n {
            let x = (f64::from(bytes[i]) / 255.0).powi(2);
            out[i] = x;
            prefix[i + 1] = prefix[i] + x;
        }

        // Step 2+3: O(1) box-filter envelope via the prefix sum, then
        // normalize by envelope + eps.
        let mut peak: f64 = 0.0;
        for i in 0..n {
            let lo = i.saturating_sub(half_window);
            let hi = (i + half_window).min(n - 1);
            let window_len = (hi - lo + 1) as f64;
            let env = (prefix[hi + 1] - prefix[lo]) / window_len;
            let y = out[i] / (env + eps);
            out[i] = y;
            if y > peak {
                peak = y;
            }
        }

        // Step 4: peak-normalize.
        if peak > 0.0 {
            for y in out.iter_mut() {
                *y /= peak;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn whiten_is_total_on_empty_input() {
        let mut whitener = Whitener::new();
        let mut out = [];
        whitener.whiten(&[], 25, 1e-6, &mut out);
    }

    #[test]
    fn whiten_output_is_bounded() {
        let mut whitener = Whitener::new();
        let bytes: Vec<u8> = (0..256).map(|i| (i % 256) as u8).collect();
        let mut out = vec![0.0; bytes.len()];
        whitener.whiten(&bytes, 25, 1e-6, &mut out);
        for &y in &out {
            assert!((0.0..=1.0 + 1e-9).contains(&y), "{y} out of [0,1]");
        }
    }

    #[test]
    fn constant_input_is_near_one_everywhere() {
        let mut whitener = Whitener::new();
        let bytes = vec![128u8; 64];
        let mut out = vec![0.0; bytes.len()];
        whitener.whiten(&bytes, 10, 1e-6, &mut out);
        for &y in &out {
            assert!((y - 1.0).abs() < 1e-5, "{y} not within 1e-5 of 1.0");
        }
    }

    #[test]
    fn localized_peak_survives_flat_background() {
        let mut whitener = Whitener::new();
        let mut bytes = vec![20u8; 200];
        bytes[100] = 255;
        let mut out = vec![0.0; bytes.len()];
        whitener.whiten(&bytes, 25, 1e-6, &mut out);
        // The peak bin should whiten to the global maximum (1.0 after
        // peak-normalization), clearly above the flattened background.
        assert!((out[100] - 1.0).abs() < 1e-9);
        assert!(out[0] < 0.5);
    }

    #[test]
    fn all_zero_input_stays_zero() {
        let mut whitener = Whitener::new();
        let bytes = vec![0u8; 64];
        let mut out = vec![0.0; bytes.len()];
        whitener.whiten(&bytes, 25, 1e-6, &mut out);
        assert_eq!(out, vec![0.0; 64]);
    }

    #[test]
    fn reused_buffer_handles_growing_sizes() {
        let mut whitener = Whitener::new();
        let small = vec![100u8; 16];
        let mut small_out = vec![0.0; small.len()];
        whitener.whiten(&small, 4, 1e-6, &mut small_out);

        let large = vec![100u8; 4096];
        let mut large_out = vec![0.0; large.len()];
        whitener.whiten(&large, 25, 1e-6, &mut large_out);
        for &y in &large_out {
            assert!((y - 1.0).abs() < 1e-5);
        }
    }
}
