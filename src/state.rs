//! Published analysis state

use crate::audio::{BeatDetectionState, BeatEvent, BeatPhase};
use serde::{Deserialize, Serialize};

/// Immutable per-frame view handed to display and telemetry readers.
///
/// A new snapshot is built for every analysed frame; readers never see a
/// partially updated amplitude vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSnapshot {
    /// Frame counter, starting at 1 for the first analysed frame
    pub seq: u64,

    /// Capture timestamp of the frame (ms)
    pub timestamp_ms: u64,

    /// Smoothed band amplitudes in [0, 1]
    pub amplitudes: Vec<f32>,

    /// Beat detector telemetry
    pub detection: BeatDetectionState,

    /// Detector state at this frame
    pub phase: BeatPhase,

    /// Most recent beat seen this session
    pub last_beat: Option<BeatEvent>,
}

impl AnalysisSnapshot {
    /// Snapshot published before any frame arrives
    pub fn empty(band_count: usize) -> Self {
        Self {
            seq: 0,
            timestamp_ms: 0,
            amplitudes: vec![0.0; band_count],
            detection: BeatDetectionState::default(),
            phase: BeatPhase::Armed,
            last_beat: None,
        }
    }

    /// Peak amplitude across all bands
    pub fn peak(&self) -> f32 {
        self.amplitudes.iter().copied().fold(0.0f32, f32::max)
    }
}

impl Default for AnalysisSnapshot {
    fn default() -> Self {
        Self::empty(0)
    }
}
