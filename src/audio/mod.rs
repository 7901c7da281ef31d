//! Audio analysis core: band amplitudes and beat detection

mod bands;
mod beat;
mod config;
mod history;
mod normalize;
mod pipeline;
mod presets;
mod session;
mod smoothing;
mod spectrum;
mod synth;

pub use bands::{
    BandConfig, BandMapper, DistributionMode, FrequencyRange, ReductionMode, DEFAULT_LOG_BASE,
};
pub use beat::{BeatDetectionConfig, BeatDetectionState, BeatDetector, BeatEvent, BeatPhase};
pub use config::ConfigError;
pub use history::{EnergyHistory, EnergySample};
pub use normalize::{Normalizer, DEFAULT_REFERENCE_DB};
pub use pipeline::{AnalysisPipeline, FrameOutput};
pub use presets::{get_preset, get_presets, StylePreset};
pub use session::{AnalysisHandle, FrameSender, SessionError};
pub use smoothing::{decay_step, neighbor_pass, NeighborKernel, SmoothingConfig, TemporalSmoother};
pub use spectrum::{Frame, MagnitudeSpectrum, SpectrumExtractor};
pub use synth::{silence, tone, FrameSynth};

use serde::{Deserialize, Serialize};

/// Analysis session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Band layout
    pub bands: BandConfig,

    /// Full-scale level for dB normalization
    pub reference_db: f32,

    /// Display smoothing
    pub smoothing: SmoothingConfig,

    /// Beat detection tuning
    pub beat: BeatDetectionConfig,

    /// Capacity of the frame queue feeding a session thread
    pub frame_queue: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            bands: BandConfig::default(),
            reference_db: DEFAULT_REFERENCE_DB,
            smoothing: SmoothingConfig::default(),
            beat: BeatDetectionConfig::default(),
            frame_queue: 8,
        }
    }
}

impl AnalysisConfig {
    /// Build a config from a style preset with default beat detection
    pub fn from_preset(preset: &StylePreset) -> Self {
        Self {
            bands: preset.bands.clone(),
            reference_db: preset.reference_db,
            smoothing: preset.smoothing.clone(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bands.validate()?;
        Normalizer::new(self.reference_db)?;
        self.smoothing.validate()?;
        self.beat.validate()?;
        if self.frame_queue == 0 {
            return Err(ConfigError::ZeroFrameQueue);
        }
        Ok(())
    }
}
