//! Visualization style presets

use super::bands::{BandConfig, DistributionMode, FrequencyRange, ReductionMode};
use super::smoothing::{NeighborKernel, SmoothingConfig};
use serde::{Deserialize, Serialize};

/// Per-style tuning of the band layout and display smoothing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StylePreset {
    pub name: String,
    pub bands: BandConfig,
    pub reference_db: f32,
    pub smoothing: SmoothingConfig,
}

/// Return all built-in presets
pub fn get_presets() -> Vec<StylePreset> {
    vec![
        StylePreset {
            name: "bars".to_string(),
            bands: BandConfig {
                band_count: 32,
                distribution: DistributionMode::logarithmic(),
                reduction: ReductionMode::Mean,
                frequency_range: None,
            },
            reference_db: 60.0,
            smoothing: SmoothingConfig {
                decay: Some(0.93),
                kernel: None,
                passes: 0,
            },
        },
        StylePreset {
            name: "circle".to_string(),
            bands: BandConfig {
                band_count: 64,
                distribution: DistributionMode::logarithmic(),
                reduction: ReductionMode::Max,
                frequency_range: None,
            },
            reference_db: 70.0,
            smoothing: SmoothingConfig {
                decay: Some(0.95),
                kernel: Some(NeighborKernel::three_tap()),
                passes: 2,
            },
        },
        StylePreset {
            name: "wave".to_string(),
            bands: BandConfig {
                band_count: 48,
                distribution: DistributionMode::Linear,
                reduction: ReductionMode::Mean,
                frequency_range: None,
            },
            reference_db: 80.0,
            smoothing: SmoothingConfig {
                decay: Some(0.90),
                kernel: Some(NeighborKernel::five_tap()),
                passes: 1,
            },
        },
        StylePreset {
            name: "spectrum".to_string(),
            bands: BandConfig {
                band_count: 128,
                distribution: DistributionMode::Linear,
                reduction: ReductionMode::Max,
                frequency_range: None,
            },
            reference_db: 45.0,
            smoothing: SmoothingConfig {
                decay: None,
                kernel: None,
                passes: 0,
            },
        },
        StylePreset {
            name: "bass".to_string(),
            bands: BandConfig {
                band_count: 8,
                distribution: DistributionMode::Linear,
                reduction: ReductionMode::Max,
                frequency_range: Some(FrequencyRange::bass()),
            },
            reference_db: 50.0,
            smoothing: SmoothingConfig {
                decay: Some(0.97),
                kernel: None,
                passes: 0,
            },
        },
    ]
}

/// Look up a preset by name (case-insensitive), returning None if not found
pub fn get_preset(name: &str) -> Option<StylePreset> {
    let lower = name.to_lowercase();
    get_presets().into_iter().find(|p| p.name == lower)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Normalizer;

    #[test]
    fn get_presets_returns_five_styles() {
        let presets = get_presets();
        let names: Vec<&str> = presets.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["bars", "circle", "wave", "spectrum", "bass"]);
    }

    #[test]
    fn get_preset_by_name_is_case_insensitive() {
        assert!(get_preset("BARS").is_some());
        assert!(get_preset("Circle").is_some());
        assert!(get_preset("nonexistent").is_none());
    }

    #[test]
    fn every_preset_validates() {
        for preset in get_presets() {
            assert!(preset.bands.validate().is_ok(), "{}", preset.name);
            assert!(preset.smoothing.validate().is_ok(), "{}", preset.name);
            assert!(Normalizer::new(preset.reference_db).is_ok(), "{}", preset.name);
            assert!((45.0..=80.0).contains(&preset.reference_db));
        }
    }

    #[test]
    fn presets_serialize_to_json() {
        let preset = get_preset("bass").unwrap();
        let json = serde_json::to_string(&preset).unwrap();
        let back: StylePreset = serde_json::from_str(&json).unwrap();
        assert_eq!(back, preset);
        assert!(json.contains("\"min_hz\":60.0"));
    }
}
