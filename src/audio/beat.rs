//! Adaptive statistical beat detection

use super::config::{check_factor, ConfigError};
use super::history::EnergyHistory;
use serde::{Deserialize, Serialize};

/// Intensity is capped at this many standard deviations above the mean
const MAX_SIGMA: f32 = 3.0;

/// Beat detector tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatDetectionConfig {
    /// Standard deviations above the mean an energy must exceed
    pub sensitivity: f32,

    /// Minimum interval between two beats (ms)
    pub refractory_ms: u64,

    /// Weight of the previous intensity when a new beat lands
    pub smoothing_factor: f32,

    /// Per-frame intensity decay between beats
    pub intensity_decay: f32,

    /// Length of the energy history (ms)
    pub history_window_ms: u64,
}

impl Default for BeatDetectionConfig {
    fn default() -> Self {
        Self {
            sensitivity: 1.5,
            refractory_ms: 200,
            smoothing_factor: 0.3,
            intensity_decay: 0.95,
            history_window_ms: 1500,
        }
    }
}

impl BeatDetectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sensitivity.is_finite() || self.sensitivity < 0.0 {
            return Err(ConfigError::InvalidSensitivity(self.sensitivity));
        }
        check_factor("smoothing_factor", self.smoothing_factor)?;
        check_factor("intensity_decay", self.intensity_decay)?;
        if self.history_window_ms == 0 {
            return Err(ConfigError::ZeroHistoryWindow);
        }
        Ok(())
    }
}

/// Logical detector state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeatPhase {
    Disabled,
    /// Enabled and free to fire
    Armed,
    /// Enabled, inside the cooldown after a beat
    Refractory,
}

/// Continuous telemetry, updated once per frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeatDetectionState {
    pub current_energy: f32,
    pub average_energy: f32,
    pub variance: f32,
    pub last_beat_ms: Option<u64>,
    pub intensity: f32,
}

/// A detected beat
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatEvent {
    pub timestamp_ms: u64,

    /// Smoothed intensity in [0, 1]
    pub intensity: f32,

    /// Centre frequency of the strongest bin, when known
    pub dominant_frequency_hz: Option<f32>,
}

/// Emits beats when energy rises `sensitivity` standard deviations above its
/// trailing average, at most once per refractory interval.
#[derive(Debug, Clone)]
pub struct BeatDetector {
    config: BeatDetectionConfig,
    history: EnergyHistory,
    state: BeatDetectionState,
    enabled: bool,
}

impl BeatDetector {
    pub fn new(config: BeatDetectionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            history: EnergyHistory::new(config.history_window_ms),
            config,
            state: BeatDetectionState::default(),
            enabled: true,
        })
    }

    pub fn config(&self) -> &BeatDetectionConfig {
        &self.config
    }

    pub fn state(&self) -> &BeatDetectionState {
        &self.state
    }

    pub fn history(&self) -> &EnergyHistory {
        &self.history
    }

    /// Current smoothed intensity
    pub fn intensity(&self) -> f32 {
        self.state.intensity
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn phase(&self, now_ms: u64) -> BeatPhase {
        if !self.enabled {
            BeatPhase::Disabled
        } else if self.in_refractory(now_ms) {
            BeatPhase::Refractory
        } else {
            BeatPhase::Armed
        }
    }

    /// Toggle detection. Turning it off clears the history and zeroes the
    /// intensity so a stale threshold cannot fire on re-enable. The last
    /// beat time is kept to honour the refractory interval across toggles.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        if !enabled {
            self.history.clear();
            self.state.intensity = 0.0;
            self.state.average_energy = 0.0;
            self.state.variance = 0.0;
        }
        log::debug!("Beat detection {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Feed one per-frame energy value taken at `now_ms`.
    pub fn process(&mut self, energy: f32, now_ms: u64) -> Option<BeatEvent> {
        self.state.current_energy = energy;
        if !self.enabled {
            return None;
        }

        self.history.add_sample(energy, now_ms);
        let avg = self.history.average();
        let variance = self.history.variance();
        let std_dev = variance.sqrt();
        self.state.average_energy = avg;
        self.state.variance = variance;

        let threshold = avg + self.config.sensitivity * std_dev;
        // Identical samples can leave float noise in the deviation
        let flat = std_dev <= f32::EPSILON * avg.abs().max(1.0);

        if !flat && energy > threshold && !self.in_refractory(now_ms) {
            let raw = if std_dev > 0.0 {
                ((energy - avg) / std_dev).clamp(0.0, MAX_SIGMA) / MAX_SIGMA
            } else {
                0.0
            };
            let smoothing = self.config.smoothing_factor;
            self.state.intensity =
                (self.state.intensity * smoothing + raw * (1.0 - smoothing)).clamp(0.0, 1.0);
            self.state.last_beat_ms = Some(now_ms);

            log::debug!(
                "Beat at {} ms: energy={:.2} avg={:.2} sd={:.2} intensity={:.2}",
                now_ms,
                energy,
                avg,
                std_dev,
                self.state.intensity
            );

            return Some(BeatEvent {
                timestamp_ms: now_ms,
                intensity: self.state.intensity,
                dominant_frequency_hz: None,
            });
        }

        self.state.intensity *= self.config.intensity_decay;
        None
    }

    fn in_refractory(&self, now_ms: u64) -> bool {
        self.state
            .last_beat_ms
            .is_some_and(|last| now_ms.saturating_sub(last) <= self.config.refractory_ms)
    }
}
