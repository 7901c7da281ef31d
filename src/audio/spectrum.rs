//! Capture frames and magnitude extraction

use serde::{Deserialize, Serialize};

/// One frequency-domain capture, as delivered by the capture layer.
///
/// `data` holds interleaved signed 8-bit (real, imaginary) pairs. Pair 0 is
/// the DC component. The frame is immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    data: Vec<i8>,
    sample_rate: u32,
    timestamp_ms: u64,
}

impl Frame {
    /// Build a frame. `sample_rate` is in Hz (0 when unknown).
    pub fn new(data: Vec<i8>, sample_rate: u32, timestamp_ms: u64) -> Self {
        Self {
            data,
            sample_rate,
            timestamp_ms,
        }
    }

    /// Build a frame from raw capture bytes (two's complement).
    pub fn from_bytes(bytes: &[u8], sample_rate: u32, timestamp_ms: u64) -> Self {
        Self::new(
            bytes.iter().map(|&b| b as i8).collect(),
            sample_rate,
            timestamp_ms,
        )
    }

    pub fn data(&self) -> &[i8] {
        &self.data
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Non-negative magnitudes, one per retained bin.
///
/// Index `k` corresponds to FFT bin `k + 1`, so its centre frequency is
/// `(k + 1) * bin_hz`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MagnitudeSpectrum {
    magnitudes: Vec<f32>,
    bin_hz: f32,
}

impl MagnitudeSpectrum {
    pub fn new(magnitudes: Vec<f32>, bin_hz: f32) -> Self {
        Self { magnitudes, bin_hz }
    }

    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    /// Frequency resolution in Hz, 0 when the sample rate is unknown.
    pub fn bin_hz(&self) -> f32 {
        self.bin_hz
    }

    pub fn len(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }

    /// Centre frequency of spectrum index `k`.
    pub fn frequency_of(&self, k: usize) -> f32 {
        (k + 1) as f32 * self.bin_hz
    }

    /// Mean magnitude over the lower half of the spectrum (at least one bin).
    ///
    /// This is the per-frame energy fed to beat detection.
    pub fn energy(&self) -> f32 {
        if self.magnitudes.is_empty() {
            return 0.0;
        }
        let usable = (self.magnitudes.len() / 2).max(1);
        self.magnitudes[..usable].iter().sum::<f32>() / usable as f32
    }

    /// Centre frequency of the strongest bin, if the sample rate is known
    /// and the spectrum holds any energy.
    pub fn dominant_frequency(&self) -> Option<f32> {
        if self.bin_hz <= 0.0 {
            return None;
        }
        let (idx, &peak) = self
            .magnitudes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))?;
        (peak > 0.0).then(|| self.frequency_of(idx))
    }
}

/// Converts raw frames to magnitude spectra.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpectrumExtractor;

impl SpectrumExtractor {
    /// Smallest frame that can carry a non-DC pair.
    pub const MIN_FRAME_LEN: usize = 4;

    /// Extract magnitudes from the first half of the frame's pairs, skipping
    /// DC. Output length is `(len / 2 - 1) / 2`; frames shorter than
    /// [`Self::MIN_FRAME_LEN`] give an empty spectrum.
    pub fn extract(&self, frame: &Frame) -> MagnitudeSpectrum {
        let data = frame.data();
        if data.len() < Self::MIN_FRAME_LEN {
            return MagnitudeSpectrum::default();
        }

        let half = data.len() / 2;
        let magnitudes: Vec<f32> = (2..half)
            .step_by(2)
            .map(|i| {
                let re = data[i] as f32;
                let im = data[i + 1] as f32;
                (re * re + im * im).sqrt()
            })
            .collect();

        let bin_hz = if frame.sample_rate() > 0 {
            frame.sample_rate() as f32 / data.len() as f32
        } else {
            0.0
        };

        MagnitudeSpectrum::new(magnitudes, bin_hz)
    }
}
