//! Frequency band mapping

use super::config::ConfigError;
use super::spectrum::MagnitudeSpectrum;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Default growth factor between adjacent logarithmic bands
pub const DEFAULT_LOG_BASE: f32 = 1.05;

/// How spectrum bins are distributed across bands
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionMode {
    /// Equal-width bands; the last band absorbs the remainder
    Linear,

    /// Narrow low bands, wide high bands. Band `i` spans
    /// `base^i - 1 .. base^(i+1) - 1`, scaled to the spectrum.
    Logarithmic { base: f32 },
}

impl DistributionMode {
    pub fn logarithmic() -> Self {
        Self::Logarithmic {
            base: DEFAULT_LOG_BASE,
        }
    }
}

/// How the bins of one band reduce to a single magnitude
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReductionMode {
    Mean,
    Max,
}

/// Sub-range of the spectrum to bin, in Hz
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyRange {
    pub min_hz: f32,
    pub max_hz: f32,
}

impl FrequencyRange {
    pub fn new(min_hz: f32, max_hz: f32) -> Result<Self, ConfigError> {
        let range = Self { min_hz, max_hz };
        range.validate()?;
        Ok(range)
    }

    /// Sub-bass and kick region
    pub fn bass() -> Self {
        Self {
            min_hz: 60.0,
            max_hz: 250.0,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_hz.is_finite()
            || !self.max_hz.is_finite()
            || self.min_hz < 0.0
            || self.min_hz >= self.max_hz
        {
            return Err(ConfigError::InvalidFrequencyRange {
                min_hz: self.min_hz,
                max_hz: self.max_hz,
            });
        }
        Ok(())
    }

    /// Spectrum indices whose centre frequency lies inside the range.
    fn index_range(&self, spectrum: &MagnitudeSpectrum) -> Range<usize> {
        let len = spectrum.len();
        let bin_hz = spectrum.bin_hz();
        // Index k sits at (k + 1) * bin_hz
        let start = ((self.min_hz / bin_hz).ceil() as usize).saturating_sub(1).min(len);
        let end = ((self.max_hz / bin_hz).floor() as usize).min(len);
        start..end.max(start)
    }
}

/// Band layout configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandConfig {
    /// Number of output bands
    pub band_count: usize,

    pub distribution: DistributionMode,

    pub reduction: ReductionMode,

    /// Optional restriction applied before partitioning
    pub frequency_range: Option<FrequencyRange>,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            band_count: 32,
            distribution: DistributionMode::logarithmic(),
            reduction: ReductionMode::Mean,
            frequency_range: None,
        }
    }
}

impl BandConfig {
    /// Build and validate a band layout
    pub fn new(
        band_count: usize,
        distribution: DistributionMode,
        reduction: ReductionMode,
        frequency_range: Option<FrequencyRange>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            band_count,
            distribution,
            reduction,
            frequency_range,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.band_count == 0 {
            return Err(ConfigError::ZeroBands);
        }
        if let DistributionMode::Logarithmic { base } = self.distribution {
            if !base.is_finite() || base <= 1.0 {
                return Err(ConfigError::InvalidLogBase(base));
            }
        }
        if let Some(range) = &self.frequency_range {
            range.validate()?;
        }
        Ok(())
    }
}

/// Aggregates a magnitude spectrum into a fixed number of bands
#[derive(Debug, Clone)]
pub struct BandMapper {
    config: BandConfig,
}

impl BandMapper {
    pub fn new(config: BandConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BandConfig {
        &self.config
    }

    pub fn band_count(&self) -> usize {
        self.config.band_count
    }

    /// Map a spectrum to exactly `band_count` raw magnitudes, written to `out`.
    pub fn map_into(&self, spectrum: &MagnitudeSpectrum, out: &mut Vec<f32>) {
        let window = self.restrict(spectrum);
        let bins = &spectrum.magnitudes()[window];

        out.clear();
        out.extend(self.band_ranges(bins.len()).into_iter().map(|range| {
            if range.is_empty() {
                return 0.0;
            }
            let slice = &bins[range];
            match self.config.reduction {
                ReductionMode::Mean => slice.iter().sum::<f32>() / slice.len() as f32,
                ReductionMode::Max => slice.iter().copied().fold(0.0, f32::max),
            }
        }));
    }

    /// Map a spectrum to a freshly allocated band vector
    pub fn map(&self, spectrum: &MagnitudeSpectrum) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.config.band_count);
        self.map_into(spectrum, &mut out);
        out
    }

    fn restrict(&self, spectrum: &MagnitudeSpectrum) -> Range<usize> {
        match &self.config.frequency_range {
            Some(range) if spectrum.bin_hz() > 0.0 => range.index_range(spectrum),
            Some(_) => {
                log::debug!("Frequency restriction skipped: frame has no sample rate");
                0..spectrum.len()
            }
            None => 0..spectrum.len(),
        }
    }

    /// Index ranges for each band over `len` bins
    pub fn band_ranges(&self, len: usize) -> Vec<Range<usize>> {
        match self.config.distribution {
            DistributionMode::Linear => linear_ranges(self.config.band_count, len),
            DistributionMode::Logarithmic { base } => {
                log_ranges(self.config.band_count, len, base)
            }
        }
    }
}

fn linear_ranges(bands: usize, len: usize) -> Vec<Range<usize>> {
    // With fewer bins than bands, one bin per band and trailing bands empty
    let size = (len / bands).max(1);
    (0..bands)
        .map(|i| {
            let start = (i * size).min(len);
            let end = if i == bands - 1 {
                len
            } else {
                ((i + 1) * size).min(len)
            };
            start..end.max(start)
        })
        .collect()
}

fn log_ranges(bands: usize, len: usize, base: f32) -> Vec<Range<usize>> {
    let base = base as f64;
    let total = base.powi(bands as i32) - 1.0;
    let edge = |i: usize| ((base.powi(i as i32) - 1.0) / total * len as f64) as usize;

    let mut ranges = Vec::with_capacity(bands);
    let mut cursor = 0;
    for i in 0..bands {
        let start = edge(i).max(cursor).min(len);
        let end = if i == bands - 1 {
            len
        } else {
            edge(i + 1).max(start + 1).min(len)
        };
        ranges.push(start..end.max(start));
        cursor = end.max(start);
    }
    ranges
}
