//! Perceptual (dB) normalization

use super::config::ConfigError;

/// Default full-scale level in dB
pub const DEFAULT_REFERENCE_DB: f32 = 60.0;

/// Maps raw band magnitudes to a clamped [0, 1] amplitude.
///
/// `amplitude = clamp(20 * log10(magnitude + 1) / reference_db, 0, 1)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalizer {
    reference_db: f32,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            reference_db: DEFAULT_REFERENCE_DB,
        }
    }
}

impl Normalizer {
    pub fn new(reference_db: f32) -> Result<Self, ConfigError> {
        if !reference_db.is_finite() || reference_db <= 0.0 {
            return Err(ConfigError::InvalidReferenceDb(reference_db));
        }
        Ok(Self { reference_db })
    }

    pub fn reference_db(&self) -> f32 {
        self.reference_db
    }

    pub fn normalize(&self, magnitude: f32) -> f32 {
        // NaN and negative input both land on 0
        let magnitude = magnitude.max(0.0);
        (20.0 * (magnitude + 1.0).log10() / self.reference_db).clamp(0.0, 1.0)
    }

    /// Normalize every value in place
    pub fn normalize_all(&self, values: &mut [f32]) {
        for v in values.iter_mut() {
            *v = self.normalize(*v);
        }
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
    fn silence_maps_to_zero() {
        let normalizer = Normalizer::default();
        assert_eq!(normalizer.normalize(0.0), 0.0);
        assert_eq!(normalizer.normalize(-3.0), 0.0);
        assert_eq!(normalizer.normalize(f32::NAN), 0.0);
    }

    #[test]
    fn loud_input_saturates() {
        let normalizer = Normalizer::new(45.0).unwrap();
        assert_eq!(normalizer.normalize(1.0e6), 1.0);
        assert_eq!(normalizer.normalize(f32::INFINITY), 1.0);
    }

    #[test]
    fn follows_db_curve() {
        let normalizer = Normalizer::new(60.0).unwrap();
        // 20 * log10(100) = 40 dB
        assert_approx(normalizer.normalize(99.0), 40.0 / 60.0, 1e-5);
    }

    #[test]
    fn monotonic_and_bounded() {
        let normalizer = Normalizer::new(80.0).unwrap();
        let mut previous = 0.0;
        for i in 0..2000 {
            let amplitude = normalizer.normalize(i as f32 * 7.5);
            assert!((0.0..=1.0).contains(&amplitude));
            assert!(amplitude >= previous);
            previous = amplitude;
        }
    }

    #[test]
    fn normalize_all_rewrites_in_place() {
        let normalizer = Normalizer::new(20.0).unwrap();
        let mut values = vec![0.0, 9.0, 1.0e9];
        normalizer.normalize_all(&mut values);
        assert_eq!(values[0], 0.0);
        assert_approx(values[1], 1.0, 1e-6);
        assert_eq!(values[2], 1.0);
    }

    #[test]
    fn rejects_non_positive_reference() {
        assert_eq!(Normalizer::new(0.0), Err(ConfigError::InvalidReferenceDb(0.0)));
        assert!(Normalizer::new(-10.0).is_err());
        assert!(Normalizer::new(f32::NAN).is_err());
    }
}
