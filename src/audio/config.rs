//! Configuration validation errors

use thiserror::Error;

/// Configuration errors, raised when a config is constructed or validated
/// and never mid-stream.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Band count must be at least 1")]
    ZeroBands,

    #[error("Invalid frequency range: {min_hz} Hz .. {max_hz} Hz")]
    InvalidFrequencyRange { min_hz: f32, max_hz: f32 },

    #[error("Logarithmic base must be greater than 1, got {0}")]
    InvalidLogBase(f32),

    #[error("Reference level must be a positive dB value, got {0}")]
    InvalidReferenceDb(f32),

    #[error("Decay rate must be in (0, 1), got {0}")]
    InvalidDecay(f32),

    #[error("Invalid neighbor kernel: {0}")]
    InvalidKernel(String),

    #[error("Sensitivity must be a non-negative number, got {0}")]
    InvalidSensitivity(f32),

    #[error("{name} must be in [0, 1), got {value}")]
    InvalidFactor { name: &'static str, value: f32 },

    #[error("History window must be longer than 0 ms")]
    ZeroHistoryWindow,

    #[error("Frame queue capacity must be at least 1")]
    ZeroFrameQueue,
}

/// Check a smoothing-style coefficient lies in [0, 1).
pub(crate) fn check_factor(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidFactor { name, value })
    }
}
