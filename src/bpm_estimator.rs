//! Energy-based onset detection and BPM estimation.

use std::collections::VecDeque;

use log::warn;

use crate::utils::{mean, median, std_dev};

const MIN_ENERGY_SAMPLES: usize = 20;
const MIN_ONSETS: usize = 4;
const MIN_INTERVALS: usize = 3;
const ONSET_HISTORY_S: f64 = 8.0;
const IOI_MIN_S: f64 = 0.20;
const IOI_MAX_S: f64 = 2.0;
const MAX_FOLD_ITERATIONS: u32 = 8;

#[derive(Debug, Default)]
pub struct BpmEstimator {
    energy_history: VecDeque<f64>,
    onset_times_s: VecDeque<f64>,
    last_onset_time_s: Option<f64>,
}

impl BpmEstimator {
    pub fn new() -> Self {
        BpmEstimator::default()
    }

    /// Run one tick of onset detection and return the current tempo
    /// estimate, if enough history has accumulated.
    pub fn update(
        &mut self,
        time_domain: &[f32],
        media_time_s: f64,
        energy_history_len: usize,
        onset_std_k: f64,
        onset_refractory_s: f64,
        bpm_min: f64,
        bpm_max: f64,
    ) -> Option<u32> {
        let energy = if time_domain.is_empty() {
            0.0
        } else {
            time_domain
                .iter()
                .map(|&s| f64::from(s) * f64::from(s))
                .sum::<f64>()
                / time_domain.len() as f64
        };

        self.energy_history.push_back(energy);
        while self.energy_history.len() > energy_history_len {
            self.energy_history.pop_front();
        }

        if self.energy_history.len() < MIN_ENERGY_SAMPLES {
            return None;
        }

        let samples: Vec<f64> = self.energy_history.iter().copied().collect();
        let mean_energy = mean(&samples);
        let threshold = mean_energy + onset_std_k * std_dev(&samples, mean_energy);

        let refractory_elapsed = self
            .last_onset_time_s
            .map(|last| media_time_s - last > onset_refractory_s)
            .unwrap_or(true);

        if energy > threshold && refractory_elapsed {
            self.last_onset_time_s = Some(media_time_s);
            self.onset_times_s.push_back(media_time_s);
            while let Some(&front) = self.onset_times_s.front() {
                if media_time_s - front > ONSET_HISTORY_S {
                    self.onset_times_s.pop_front();
                } else {
                    break;
                }
            }
        }

        if self.onset_times_s.len() < MIN_ONSETS {
            warn!(
                "bpm estimator has only {} onsets, need at least {MIN_ONSETS}",
                self.onset_times_s.len()
            );
            return None;
        }

        let intervals: Vec<f64> = self
            .onset_times_s
            .iter()
            .zip(self.onset_times_s.iter().skip(1))
            .map(|(a, b)| b - a)
            .filter(|&ioi| ioi > IOI_MIN_S && ioi < IOI_MAX_S)
            .collect();

        if intervals.len() < MIN_INTERVALS {
            return None;
        }

        let ioi_median = median(&intervals);
        if ioi_median <= 0.0 {
            return None;
        }

        let mut bpm = 60.0 / ioi_median;
        let mut iterations = 0;
        while bpm < bpm_min && iterations < MAX_FOLD_ITERATIONS {
            bpm *= 2.0;
            iterations += 1;
        }
        iterations = 0;
        while bpm > bpm_max && iterations < MAX_FOLD_ITERATIONS {
            bpm /= 2.0;
            iterations += 1;
        }

        Some(bpm.round() as u32)
    }

    /// Clear all history, preserving no allocation assumptions beyond what
    /// `VecDeque` already keeps.
    pub fn reset(&mut self) {
        self.energy_history.clear();
        self.onset_times_s.clear();
        self.last_onset_time_s = None;
    }
}
