//! Time-windowed energy history

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One energy reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergySample {
    pub timestamp_ms: u64,
    pub energy: f32,
}

/// Upper bound on the initial allocation; longer windows grow on demand
const MAX_PREALLOCATED_SAMPLES: usize = 256;

/// Ring of energy samples no older than `window_ms` behind the newest one.
#[derive(Debug, Clone)]
pub struct EnergyHistory {
    samples: VecDeque<EnergySample>,
    window_ms: u64,
}

impl EnergyHistory {
    pub fn new(window_ms: u64) -> Self {
        Self {
            // ~40 fps capture over the window
            samples: VecDeque::with_capacity(
                usize::try_from(window_ms / 25)
                    .unwrap_or(usize::MAX)
                    .min(MAX_PREALLOCATED_SAMPLES),
            ),
            window_ms,
        }
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Append a sample taken at `now_ms`, then evict everything older than
    /// `now_ms - window_ms`.
    pub fn add_sample(&mut self, energy: f32, now_ms: u64) {
        self.samples.push_back(EnergySample {
            timestamp_ms: now_ms,
            energy,
        });

        let cutoff = now_ms.saturating_sub(self.window_ms);
        while self
            .samples
            .front()
            .is_some_and(|s| s.timestamp_ms < cutoff)
        {
            self.samples.pop_front();
        }
    }

    /// Arithmetic mean, 0 when empty
    pub fn average(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().map(|s| s.energy).sum::<f32>() / self.samples.len() as f32
    }

    /// Population variance (no Bessel correction), 0 below two samples
    pub fn variance(&self) -> f32 {
        if self.samples.len() < 2 {
            return 0.0;
        }
        let mean = self.average();
        self.samples
            .iter()
            .map(|s| {
                let d = s.energy - mean;
                d * d
            })
            .sum::<f32>()
            / self.samples.len() as f32
    }

    pub fn std_dev(&self) -> f32 {
        self.variance().sqrt()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = &EnergySample> {
        self.samples.iter()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_approx(actual: f32, expected: f32, tolerance: f32) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected} +/- {tolerance}, got {actual}"
        );
    }

    #[test]
    fn empty_history_reports_zero() {
        let history = EnergyHistory::new(1500);
        assert!(history.is_empty());
        assert_eq!(history.average(), 0.0);
        assert_eq!(history.variance(), 0.0);
    }

    #[test]
    fn single_sample_has_no_variance() {
        let mut history = EnergyHistory::new(1500);
        history.add_sample(4.0, 0);
        assert_eq!(history.average(), 4.0);
        assert_eq!(history.variance(), 0.0);
    }

    #[test]
    fn evicts_samples_outside_window() {
        let mut history = EnergyHistory::new(1500);
        for (t, e) in [(0, 1.0), (500, 2.0), (1000, 3.0), (2000, 4.0), (2500, 5.0)] {
            history.add_sample(e, t);
        }

        let kept: Vec<u64> = history.samples().map(|s| s.timestamp_ms).collect();
        assert_eq!(kept, vec![1000, 2000, 2500]);
        assert_approx(history.average(), 4.0, 1e-6);
    }

    #[test]
    fn variance_is_population_variance() {
        let mut history = EnergyHistory::new(10_000);
        for (i, e) in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0].into_iter().enumerate() {
            history.add_sample(e, i as u64 * 10);
        }
        assert_approx(history.average(), 5.0, 1e-6);
        assert_approx(history.variance(), 4.0, 1e-5);
        assert_approx(history.std_dev(), 2.0, 1e-5);
    }

    #[test]
    fn clear_drops_everything() {
        let mut history = EnergyHistory::new(1500);
        history.add_sample(1.0, 0);
        history.add_sample(3.0, 100);
        history.clear();
        assert_eq!(history.len(), 0);
        assert_eq!(history.average(), 0.0);
    }

    #[test]
    fn unbounded_window_keeps_every_sample() {
        let mut history = EnergyHistory::new(u64::MAX);
        history.add_sample(2.0, 0);
        history.add_sample(4.0, u64::MAX / 2);
        assert_eq!(history.len(), 2);
        assert_approx(history.average(), 3.0, 1e-6);
    }
}
