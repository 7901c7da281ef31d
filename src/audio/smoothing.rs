//! Temporal and cross-band smoothing of the amplitude vector

use super::config::ConfigError;
use serde::{Deserialize, Serialize};

/// Symmetric weights applied across circularly-adjacent bands.
///
/// The kernel has odd length; the middle weight applies to the band itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborKernel {
    weights: Vec<f32>,
}

impl NeighborKernel {
    pub fn new(weights: Vec<f32>) -> Result<Self, ConfigError> {
        let kernel = Self { weights };
        kernel.validate()?;
        Ok(kernel)
    }

    /// 0.15 / 0.7 / 0.15
    pub fn three_tap() -> Self {
        Self {
            weights: vec![0.15, 0.7, 0.15],
        }
    }

    /// 0.1 / 0.2 / 0.4 / 0.2 / 0.1
    pub fn five_tap() -> Self {
        Self {
            weights: vec![0.1, 0.2, 0.4, 0.2, 0.1],
        }
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.weights.is_empty() || self.weights.len() % 2 == 0 {
            return Err(ConfigError::InvalidKernel(format!(
                "expected an odd number of weights, got {}",
                self.weights.len()
            )));
        }
        if let Some(w) = self.weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(ConfigError::InvalidKernel(format!("bad weight {w}")));
        }
        Ok(())
    }

    fn radius(&self) -> usize {
        self.weights.len() / 2
    }
}

/// Smoother tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothingConfig {
    /// Cross-frame falling-peak decay in (0, 1); `None` skips the pass
    pub decay: Option<f32>,

    /// Cross-band kernel; `None` skips the pass
    pub kernel: Option<NeighborKernel>,

    /// Number of neighbor passes per frame
    pub passes: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            decay: Some(0.93),
            kernel: Some(NeighborKernel::three_tap()),
            passes: 1,
        }
    }
}

impl SmoothingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(decay) = self.decay {
            if !(decay > 0.0 && decay < 1.0) {
                return Err(ConfigError::InvalidDecay(decay));
            }
        }
        if let Some(kernel) = &self.kernel {
            kernel.validate()?;
        }
        Ok(())
    }
}

/// Holds the falling-peak feedback state across frames.
///
/// Decay runs before neighbor smoothing. Only the decayed values are kept as
/// feedback; the neighbor pass is recomputed from them every frame.
#[derive(Debug, Clone)]
pub struct TemporalSmoother {
    config: SmoothingConfig,
    decayed: Vec<f32>,
    output: Vec<f32>,
    scratch: Vec<f32>,
}

impl TemporalSmoother {
    pub fn new(config: SmoothingConfig, band_count: usize) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            decayed: vec![0.0; band_count],
            output: vec![0.0; band_count],
            scratch: vec![0.0; band_count],
        })
    }

    pub fn config(&self) -> &SmoothingConfig {
        &self.config
    }

    /// Latest smoothed amplitudes
    pub fn current(&self) -> &[f32] {
        &self.output
    }

    /// Feed one frame of normalized amplitudes and return the smoothed vector.
    ///
    /// `incoming` must have the band count this smoother was built with;
    /// missing trailing values count as 0 and extra values are ignored.
    pub fn apply(&mut self, incoming: &[f32]) -> &[f32] {
        for (i, slot) in self.decayed.iter_mut().enumerate() {
            let value = incoming.get(i).copied().unwrap_or(0.0);
            *slot = match self.config.decay {
                Some(decay) => decay_step(*slot, value, decay),
                None => value,
            };
        }

        self.output.copy_from_slice(&self.decayed);
        if let Some(kernel) = &self.config.kernel {
            for _ in 0..self.config.passes {
                neighbor_pass(&self.output, &mut self.scratch, kernel);
                std::mem::swap(&mut self.output, &mut self.scratch);
            }
        }

        for v in self.output.iter_mut() {
            *v = v.clamp(0.0, 1.0);
        }
        &self.output
    }

    /// Zero all feedback state
    pub fn reset(&mut self) {
        self.decayed.fill(0.0);
        self.output.fill(0.0);
    }
}

/// Falling-peak step: snap up on a rise, decay multiplicatively on a fall.
pub fn decay_step(old: f32, incoming: f32, decay: f32) -> f32 {
    (old * decay).max(incoming)
}

/// One circular weighted pass of `kernel` over `input`, written to `out`.
pub fn neighbor_pass(input: &[f32], out: &mut [f32], kernel: &NeighborKernel) {
    let n = input.len();
    if n == 0 {
        return;
    }
    let radius = kernel.radius() as isize;
    for (i, slot) in out.iter_mut().enumerate().take(n) {
        *slot = kernel
            .weights()
            .iter()
            .enumerate()
            .map(|(k, w)| {
                let offset = k as isize - radius;
                let j = (i as isize + offset).rem_euclid(n as isize) as usize;
                w * input[j]
            })
            .sum();
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

    fn decay_only(decay: f32, bands: usize) -> TemporalSmoother {
        TemporalSmoother::new(
            SmoothingConfig {
                decay: Some(decay),
                kernel: None,
                passes: 0,
            },
            bands,
        )
        .unwrap()
    }

    #[test]
    fn rises_snap_and_falls_decay() {
        let mut smoother = decay_only(0.9, 1);
        assert_eq!(smoother.apply(&[0.8]), &[0.8]);
        assert_approx(smoother.apply(&[0.0])[0], 0.72, 1e-6);
        assert_approx(smoother.apply(&[0.1])[0], 0.648, 1e-6);
        assert_eq!(smoother.apply(&[0.9]), &[0.9]);
    }

    #[test]
    fn constant_input_is_a_fixed_point() {
        let mut smoother = decay_only(0.95, 4);
        let input = [0.3, 0.6, 0.0, 1.0];
        let first = smoother.apply(&input).to_vec();
        for _ in 0..10 {
            assert_eq!(smoother.apply(&input), first.as_slice());
        }
    }

    #[test]
    fn neighbor_pass_wraps_around() {
        let input = [1.0, 0.0, 0.0, 0.0, 0.0];
        let mut out = [0.0; 5];
        neighbor_pass(&input, &mut out, &NeighborKernel::three_tap());

        assert_approx(out[0], 0.7, 1e-6);
        assert_approx(out[1], 0.15, 1e-6);
        assert_approx(out[4], 0.15, 1e-6);
        assert_eq!(out[2], 0.0);
        assert_eq!(out[3], 0.0);
    }

    #[test]
    fn five_tap_spreads_two_bands_each_side() {
        let input = [0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
        let mut out = [0.0; 6];
        neighbor_pass(&input, &mut out, &NeighborKernel::five_tap());
        let expected = [0.1, 0.2, 0.4, 0.2, 0.1, 0.0];
        for (a, e) in out.iter().zip(expected) {
            assert_approx(*a, e, 1e-6);
        }
    }

    #[test]
    fn flat_vector_survives_normalized_kernel() {
        let mut smoother = TemporalSmoother::new(
            SmoothingConfig {
                decay: Some(0.9),
                kernel: Some(NeighborKernel::five_tap()),
                passes: 3,
            },
            8,
        )
        .unwrap();
        for v in smoother.apply(&[0.5; 8]) {
            assert_approx(*v, 0.5, 1e-5);
        }
    }

    #[test]
    fn multiple_passes_smooth_more() {
        let mut spike = vec![0.0; 16];
        spike[8] = 1.0;
        let build = |passes| {
            TemporalSmoother::new(
                SmoothingConfig {
                    decay: None,
                    kernel: Some(NeighborKernel::three_tap()),
                    passes,
                },
                16,
            )
            .unwrap()
        };
        let mut one = build(1);
        let mut three = build(3);
        let peak_one = one.apply(&spike)[8];
        let peak_three = three.apply(&spike)[8];
        assert!(peak_three < peak_one);
    }

    #[test]
    fn neighbor_output_does_not_feed_back() {
        let mut smoother = TemporalSmoother::new(SmoothingConfig::default(), 4).unwrap();
        let input = [1.0, 0.0, 0.0, 0.0];
        let first = smoother.apply(&input).to_vec();
        let second = smoother.apply(&input).to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn output_length_matches_band_count() {
        let mut smoother = TemporalSmoother::new(SmoothingConfig::default(), 6).unwrap();
        assert_eq!(smoother.apply(&[0.2, 0.4]).len(), 6);
        assert_eq!(smoother.apply(&[0.1; 10]).len(), 6);
    }

    #[test]
    fn reset_zeroes_state() {
        let mut smoother = decay_only(0.97, 3);
        smoother.apply(&[0.9, 0.9, 0.9]);
        smoother.reset();
        assert_eq!(smoother.current(), &[0.0; 3]);
        assert_eq!(smoother.apply(&[0.0; 3]), &[0.0; 3]);
    }

    #[test]
    fn rejects_bad_config() {
        let bad_decay = SmoothingConfig {
            decay: Some(1.0),
            ..Default::default()
        };
        assert_eq!(bad_decay.validate(), Err(ConfigError::InvalidDecay(1.0)));

        assert!(NeighborKernel::new(vec![0.5, 0.5]).is_err());
        assert!(NeighborKernel::new(vec![]).is_err());
        assert!(NeighborKernel::new(vec![0.2, -0.1, 0.2]).is_err());
        assert!(NeighborKernel::new(vec![0.25, 0.5, 0.25]).is_ok());
    }
}
