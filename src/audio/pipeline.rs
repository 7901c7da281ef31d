//! Per-session analysis pipeline

use super::bands::BandMapper;
use super::beat::{BeatDetector, BeatEvent};
use super::config::ConfigError;
use super::normalize::Normalizer;
use super::presets::StylePreset;
use super::smoothing::TemporalSmoother;
use super::spectrum::{Frame, SpectrumExtractor};
use super::AnalysisConfig;
use crate::state::AnalysisSnapshot;

/// Result of analysing one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutput {
    pub snapshot: AnalysisSnapshot,

    /// Beat detected on this frame, if any
    pub beat: Option<BeatEvent>,
}

/// Owns all mutable analysis state for one session.
///
/// Each frame runs spectrum extraction once, then feeds the band path
/// (mapper, normalizer, smoother) and the beat path (energy, detector)
/// independently.
pub struct AnalysisPipeline {
    extractor: SpectrumExtractor,
    mapper: BandMapper,
    normalizer: Normalizer,
    smoother: TemporalSmoother,
    detector: BeatDetector,

    // Reused per-frame band buffer
    raw_bands: Vec<f32>,

    last_beat: Option<BeatEvent>,
    seq: u64,
}

impl AnalysisPipeline {
    /// Create a pipeline; the whole config is validated up front
    pub fn new(config: &AnalysisConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let band_count = config.bands.band_count;
        Ok(Self {
            extractor: SpectrumExtractor,
            mapper: BandMapper::new(config.bands.clone())?,
            normalizer: Normalizer::new(config.reference_db)?,
            smoother: TemporalSmoother::new(config.smoothing.clone(), band_count)?,
            detector: BeatDetector::new(config.beat.clone())?,
            raw_bands: Vec::with_capacity(band_count),
            last_beat: None,
            seq: 0,
        })
    }

    pub fn band_count(&self) -> usize {
        self.mapper.band_count()
    }

    pub fn detector(&self) -> &BeatDetector {
        &self.detector
    }

    /// Latest smoothed amplitude vector
    pub fn amplitudes(&self) -> &[f32] {
        self.smoother.current()
    }

    /// Analyse one frame.
    ///
    /// Returns `None` when the frame carries no usable bins; all state is
    /// left untouched in that case.
    pub fn process(&mut self, frame: &Frame) -> Option<FrameOutput> {
        let spectrum = self.extractor.extract(frame);
        if spectrum.is_empty() {
            log::trace!("Skipping frame of {} bytes", frame.len());
            return None;
        }
        let now = frame.timestamp_ms();

        self.mapper.map_into(&spectrum, &mut self.raw_bands);
        self.normalizer.normalize_all(&mut self.raw_bands);
        self.smoother.apply(&self.raw_bands);

        let beat = self
            .detector
            .process(spectrum.energy(), now)
            .map(|event| BeatEvent {
                dominant_frequency_hz: spectrum.dominant_frequency(),
                ..event
            });
        if beat.is_some() {
            self.last_beat = beat;
        }

        self.seq += 1;
        Some(FrameOutput {
            snapshot: AnalysisSnapshot {
                seq: self.seq,
                timestamp_ms: now,
                amplitudes: self.smoother.current().to_vec(),
                detection: self.detector.state().clone(),
                phase: self.detector.phase(now),
                last_beat: self.last_beat,
            },
            beat,
        })
    }

    /// Toggle beat detection; disabling resets its statistics.
    pub fn set_beat_detection(&mut self, enabled: bool) {
        self.detector.set_enabled(enabled);
    }

    /// Switch visualization style. Band and smoothing state restart from
    /// zero; beat detection carries on untouched.
    pub fn apply_preset(&mut self, preset: &StylePreset) -> Result<(), ConfigError> {
        let mapper = BandMapper::new(preset.bands.clone())?;
        let normalizer = Normalizer::new(preset.reference_db)?;
        let smoother = TemporalSmoother::new(preset.smoothing.clone(), preset.bands.band_count)?;

        self.mapper = mapper;
        self.normalizer = normalizer;
        self.smoother = smoother;
        log::info!("Analysis style switched to '{}'", preset.name);
        Ok(())
    }
}
