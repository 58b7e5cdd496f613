//! Chord classification: cosine-similarity scoring against a fixed set of
//! root×quality templates, combined with the tracked bass pitch class.

use log::warn;
use strum::IntoEnumIterator;

use crate::types::{ChordLabel, ChordQuality, ChromaVector, PitchClass};
use crate::utils::l2_normalize;

const NUM_ROOTS: usize = 12;
const NUM_QUALITIES: usize = 6;
const NUM_TEMPLATES: usize = NUM_ROOTS * NUM_QUALITIES;

/// Scores the smoothed chroma against the 72 constant chord templates.
///
/// Templates are built once, with `root` as the outer loop and `quality` as
/// the inner loop, stored contiguously so scoring is a tight loop of
/// 12-element dot products.
pub struct ChordClassifier {
    templates: [ChromaVector; NUM_TEMPLATES],
    roots: [PitchClass; NUM_TEMPLATES],
    qualities: [ChordQuality; NUM_TEMPLATES],
}

impl Default for ChordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChordClassifier {
    pub fn new() -> Self {
        let mut templates = [[0.0; 12]; NUM_TEMPLATES];
        let mut roots = [PitchClass::from_i64(0); NUM_TEMPLATES];
        let mut qualities = [ChordQuality::Major; NUM_TEMPLATES];

        let mut idx = 0;
        for root in 0..NUM_ROOTS as i64 {
            for quality in ChordQuality::iter() {
                let mut template: ChromaVector = [0.0; 12];
                for &interval in quality.intervals() {
                    let pc = PitchClass::from_i64(root + interval);
                    template[pc.get() as usize] = 1.0;
                }
                l2_normalize(&mut template);
                templates[idx] = template;
                roots[idx] = PitchClass::from_i64(root);
                qualities[idx] = quality;
                idx += 1;
            }
        }

        ChordClassifier {
            templates,
            roots,
            qualities,
        }
    }

    /// Score `chroma` against every template and combine the best match
    /// with `bass_pc` to produce a chord label and confidence.
    ///
    /// Returns `None` when `chroma` carries no energy (the zero vector a
    /// silent or fully-gated tick produces): there is nothing to classify,
    /// and scoring it anyway would hand the hysteresis stage a spurious
    /// `(C, Major)` candidate with confidence clamped to 0 that would still
    /// eventually win a stale dwell race. Ties among non-zero scores are
    /// broken by the first template encountered in `root × quality`
    /// iteration order (load-bearing for tests).
    pub fn classify(
        &self,
        chroma: &ChromaVector,
        bass_pc: Option<PitchClass>,
        conf_low: f64,
        conf_span: f64,
    ) -> Option<(ChordLabel, f64)> {
        if chroma.iter().map(|x| x * x).sum::<f64>() < 1e-18 {
            return None;
        }

        let mut best_idx = 0;
        let mut best_score = dot(chroma, &self.templates[0]);
        for i in 1..NUM_TEMPLATES {
            let score = dot(chroma, &self.templates[i]);
            if score > best_score {
                best_score = score;
                best_idx = i;
            }
        }

        if best_score <= conf_low {
            warn!("best template score {best_score} is below the confidence floor {conf_low}");
        }

        let confidence = ((best_score - conf_low) / conf_span).clamp(0.0, 1.0);
        let label = ChordLabel {
            root: self.roots[best_idx],
            quality: self.qualities[best_idx],
            bass: bass_pc,
        };
        Some((label, confidence))
    }
}

fn dot(a: &ChromaVector, b: &ChromaVector) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
