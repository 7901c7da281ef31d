//! AudioViz Analysis Core
//!
//! Turns frequency-domain capture frames into a smoothed per-band amplitude
//! vector for display and a stream of beat events with intensity.
//!
//! [`audio::AnalysisPipeline`] is the synchronous per-session state machine;
//! [`audio::AnalysisHandle`] runs one on a dedicated thread behind a bounded
//! frame queue and publishes [`state::AnalysisSnapshot`]s.

pub mod audio;
pub mod state;

pub use audio::{
    AnalysisConfig, AnalysisHandle, AnalysisPipeline, BeatEvent, ConfigError, Frame, FrameSender,
    SessionError,
};
pub use state::AnalysisSnapshot;
