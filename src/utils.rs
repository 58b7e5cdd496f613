//! Small math helpers shared by several pipeline stages.

use crate::types::{ChromaVector, PitchClass};

/// Map a frequency in Hz to the nearest pitch class via the MIDI formula
/// `midi = 69 + 12*log2(freq/440)`, rounding to the nearest semitone and
/// folding modulo 12. Used identically by `ChromaMapper` and `BassTracker`.
pub(crate) fn freq_to_pitch_class(freq_hz: f64) -> PitchClass {
    let midi = 69.0 + 12.0 * (freq_hz / 440.0).log2();
    PitchClass::from_i64(midi.round() as i64)
}

/// L2-normalize a chroma vector in place. If the pre-norm L2 sum is (near)
/// zero the vector is left as the zero vector.
pub(crate) fn l2_normalize(v: &mut ChromaVector) {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > f64::MIN_POSITIVE {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64], mean_value: f64) -> f64 {
    let variance = values
        .iter()
        .map(|x| (x - mean_value) * (x - mean_value))
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

/// Median of a slice of f64, via a sorted copy. Used by the BPM estimator
/// on its (small, bounded) set of inter-onset intervals.
pub(crate) fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("non-NaN interval"));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        0.5 * (sorted[mid - 1] + sorted[mid])
    } else {
        sorted[mid]
    }
}
