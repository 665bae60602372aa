//! Tunable generation parameters and their safe bounds.

use std::ops::RangeInclusive;

use cubeworld_voxel::CHUNK_HEIGHT;
use serde::{Deserialize, Serialize};

/// Knobs for [`HeightmapPopulator`](crate::HeightmapPopulator).
///
/// Values read from untrusted sources (save files, config) should go through
/// [`GenerationParams::clamped`] before use.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationParams {
    /// Water fills air below this height.
    pub sea_level: i32,
    /// Mean surface height before noise is added.
    pub base_height: i32,
    /// Amplitude of the first noise octave, in blocks.
    pub amplitude: f64,
    /// Frequency of the first noise octave, in cycles per block.
    pub base_frequency: f64,
    pub octaves: u32,
    /// Chance that a grass column grows a tree.
    pub tree_chance: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            sea_level: 48,
            base_height: 56,
            amplitude: 14.0,
            base_frequency: 0.012,
            octaves: 4,
            tree_chance: 0.01,
        }
    }
}

const HEIGHT_RANGE: RangeInclusive<i32> = 1..=(CHUNK_HEIGHT as i32 - 16);
const AMPLITUDE_RANGE: RangeInclusive<f64> = 0.0..=48.0;
const FREQUENCY_RANGE: RangeInclusive<f64> = 0.0001..=0.5;
const OCTAVE_RANGE: RangeInclusive<u32> = 1..=8;
const TREE_CHANCE_RANGE: RangeInclusive<f64> = 0.0..=0.2;

fn clamp_i32(name: &str, value: i32, range: RangeInclusive<i32>) -> i32 {
    let clamped = value.clamp(*range.start(), *range.end());
    if clamped != value {
        tracing::warn!(param = name, value, clamped, "generation parameter out of range");
    }
    clamped
}

fn clamp_u32(name: &str, value: u32, range: RangeInclusive<u32>) -> u32 {
    let clamped = value.clamp(*range.start(), *range.end());
    if clamped != value {
        tracing::warn!(param = name, value, clamped, "generation parameter out of range");
    }
    clamped
}

fn clamp_f64(name: &str, value: f64, fallback: f64, range: RangeInclusive<f64>) -> f64 {
    let clamped = if value.is_finite() {
        value.clamp(*range.start(), *range.end())
    } else {
        fallback
    };
    if clamped != value {
        tracing::warn!(param = name, value, clamped, "generation parameter out of range");
    }
    clamped
}

impl GenerationParams {
    /// Returns a copy with every field forced into its safe range.
    ///
    /// Non-finite floats fall back to their defaults. Each adjusted field is
    /// logged at `warn`.
    pub fn clamped(&self) -> Self {
        let defaults = Self::default();
        Self {
            sea_level: clamp_i32("seaLevel", self.sea_level, HEIGHT_RANGE),
            base_height: clamp_i32("baseHeight", self.base_height, HEIGHT_RANGE),
            amplitude: clamp_f64("amplitude", self.amplitude, defaults.amplitude, AMPLITUDE_RANGE),
            base_frequency: clamp_f64(
                "baseFrequency",
                self.base_frequency,
                defaults.base_frequency,
                FREQUENCY_RANGE,
            ),
            octaves: clamp_u32("octaves", self.octaves, OCTAVE_RANGE),
            tree_chance: clamp_f64(
                "treeChance",
                self.tree_chance,
                defaults.tree_chance,
                TREE_CHANCE_RANGE,
            ),
        }
    }

    /// `true` when [`clamped`](Self::clamped) would change nothing.
    pub fn is_within_bounds(&self) -> bool {
        HEIGHT_RANGE.contains(&self.sea_level)
            && HEIGHT_RANGE.contains(&self.base_height)
            && AMPLITUDE_RANGE.contains(&self.amplitude)
            && FREQUENCY_RANGE.contains(&self.base_frequency)
            && OCTAVE_RANGE.contains(&self.octaves)
            && TREE_CHANCE_RANGE.contains(&self.tree_chance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_within_bounds() {
        let params = GenerationParams::default();
        assert!(params.is_within_bounds());
        assert_eq!(params.clamped(), params);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let params = GenerationParams {
            sea_level: -20,
            base_height: 10_000,
            amplitude: 1e9,
            base_frequency: 0.0,
            octaves: 40,
            tree_chance: -1.0,
        };
        assert!(!params.is_within_bounds());
        let clamped = params.clamped();
        assert!(clamped.is_within_bounds());
        assert_eq!(clamped.sea_level, 1);
        assert_eq!(clamped.base_height, CHUNK_HEIGHT as i32 - 16);
        assert_eq!(clamped.amplitude, 48.0);
        assert_eq!(clamped.base_frequency, 0.0001);
        assert_eq!(clamped.octaves, 8);
        assert_eq!(clamped.tree_chance, 0.0);
    }

    #[test]
    fn test_non_finite_falls_back_to_default() {
        let params = GenerationParams {
            amplitude: f64::NAN,
            base_frequency: f64::INFINITY,
            ..Default::default()
        };
        let clamped = params.clamped();
        assert_eq!(clamped.amplitude, GenerationParams::default().amplitude);
        assert_eq!(clamped.base_frequency, GenerationParams::default().base_frequency);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let params: GenerationParams = serde_json::from_str(r#"{"seaLevel": 30}"#).unwrap();
        assert_eq!(params.sea_level, 30);
        assert_eq!(params.octaves, GenerationParams::default().octaves);
    }
}
