//! Multi-octave fractal Brownian motion (fBm) height sampler.
//!
//! Composites octaves of simplex noise over the horizontal plane so that
//! column heights vary smoothly at several spatial frequencies.

use noise::{NoiseFn, Simplex};

/// Configuration for multi-octave fBm noise.
#[derive(Clone, Debug)]
pub struct HeightmapParams {
    /// World seed for deterministic generation.
    pub seed: u64,
    /// Number of noise octaves to composite.
    pub octaves: u32,
    /// Frequency multiplier between successive octaves. Default: 2.0.
    pub lacunarity: f64,
    /// Amplitude multiplier between successive octaves. Default: 0.5.
    pub persistence: f64,
    /// Frequency of the first octave, in cycles per block.
    pub base_frequency: f64,
    /// Amplitude of the first octave, in blocks.
    pub amplitude: f64,
}

impl Default for HeightmapParams {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            amplitude: 16.0,
            base_frequency: 0.01,
        }
    }
}

/// Folds a 64-bit world seed into the 32-bit seed `noise` expects.
fn noise_seed(seed: u64) -> u32 {
    (seed ^ (seed >> 32)) as u32
}

/// Samples terrain height offsets with fBm over simplex noise.
pub struct HeightmapSampler {
    noise: Simplex,
    params: HeightmapParams,
}

impl HeightmapSampler {
    pub fn new(params: HeightmapParams) -> Self {
        let noise = Simplex::new(noise_seed(params.seed));
        Self { noise, params }
    }

    /// Height offset at world column `(x, z)`, in blocks.
    ///
    /// Lies within `[-max_amplitude, +max_amplitude]`.
    pub fn sample(&self, x: f64, z: f64) -> f64 {
        let mut total = 0.0;
        let mut frequency = self.params.base_frequency;
        let mut amplitude = self.params.amplitude;

        for _ in 0..self.params.octaves {
            total += self.noise.get([x * frequency, z * frequency]) * amplitude;
            frequency *= self.params.lacunarity;
            amplitude *= self.params.persistence;
        }

        total
    }

    /// Geometric sum of all octave amplitudes.
    pub fn max_amplitude(&self) -> f64 {
        let mut sum = 0.0;
        let mut amp = self.params.amplitude;
        for _ in 0..self.params.octaves {
            sum += amp;
            amp *= self.params.persistence;
        }
        sum
    }

    pub fn params(&self) -> &HeightmapParams {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    #[test]
    fn test_determinism_same_seed_same_column() {
        let params = HeightmapParams {
            seed: 42,
            ..Default::default()
        };
        let a = HeightmapSampler::new(params.clone());
        let b = HeightmapSampler::new(params);
        let h1 = a.sample(100.0, -200.0);
        let h2 = b.sample(100.0, -200.0);
        assert!((h1 - h2).abs() < EPSILON, "{h1} vs {h2}");
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = HeightmapSampler::new(HeightmapParams {
            seed: 1,
            ..Default::default()
        });
        let b = HeightmapSampler::new(HeightmapParams {
            seed: 999,
            ..Default::default()
        });
        let differing = (0..32)
            .filter(|i| {
                let x = *i as f64 * 7.3;
                (a.sample(x, x) - b.sample(x, x)).abs() > EPSILON
            })
            .count();
        assert!(differing > 0);
    }

    #[test]
    fn test_high_seed_bits_matter() {
        assert_ne!(noise_seed(1), noise_seed(1 | (1 << 40)));
    }

    #[test]
    fn test_height_within_max_amplitude() {
        let sampler = HeightmapSampler::new(HeightmapParams::default());
        let max_amp = sampler.max_amplitude();
        for x in (-50..50).map(|i| i as f64 * 3.0) {
            for z in (-50..50).map(|i| i as f64 * 3.0) {
                let h = sampler.sample(x, z);
                assert!(h.abs() <= max_amp + EPSILON, "{h} exceeds {max_amp} at ({x}, {z})");
            }
        }
    }

    #[test]
    fn test_max_amplitude_calculation() {
        let sampler = HeightmapSampler::new(HeightmapParams {
            amplitude: 1000.0,
            persistence: 0.5,
            octaves: 4,
            ..Default::default()
        });
        assert!((sampler.max_amplitude() - 1875.0).abs() < EPSILON);
    }

    #[test]
    fn test_zero_amplitude_is_flat() {
        let sampler = HeightmapSampler::new(HeightmapParams {
            amplitude: 0.0,
            ..Default::default()
        });
        assert!(sampler.sample(123.0, 456.0).abs() < EPSILON);
    }
}
