//! Multi-octave fractal Brownian motion over 3D simplex noise.
//!
//! Sampling happens on points of the unit sphere so the six cube faces share
//! one continuous field and meet without seams.

use glam::DVec3;
use noise::{NoiseFn, Simplex};

/// One fBm layer of the height field.
#[derive(Clone, Debug, PartialEq)]
pub struct FbmLayer {
    /// Number of octaves to composite.
    pub octaves: u32,
    /// Frequency multiplier between successive octaves.
    pub lacunarity: f64,
    /// Amplitude multiplier between successive octaves.
    pub persistence: f64,
    /// Frequency of the first octave, in cycles over the unit sphere.
    pub frequency: f64,
    /// Amplitude of the first octave.
    pub amplitude: f64,
}

impl Default for FbmLayer {
    fn default() -> Self {
        Self {
            octaves: 6,
            lacunarity: 2.0,
            persistence: 0.5,
            frequency: 1.0,
            amplitude: 1.0,
        }
    }
}

/// Samples one [`FbmLayer`] with its own simplex permutation.
pub struct FbmSampler {
    noise: Simplex,
    layer: FbmLayer,
}

impl FbmSampler {
    /// Create a sampler. Layers built with different seeds are uncorrelated.
    pub fn new(seed: u32, layer: FbmLayer) -> Self {
        Self {
            noise: Simplex::new(seed),
            layer,
        }
    }

    /// Signed fBm in roughly `[-max_amplitude, +max_amplitude]`.
    pub fn sample(&self, point: DVec3) -> f64 {
        self.accumulate(point, |n| n)
    }

    /// Ridged fBm in `[0, max_amplitude]`: sharp crests where the noise crosses zero.
    pub fn sample_ridged(&self, point: DVec3) -> f64 {
        self.accumulate(point, |n| {
            let ridge = 1.0 - n.abs();
            ridge * ridge
        })
    }

    fn accumulate(&self, point: DVec3, shape: impl Fn(f64) -> f64) -> f64 {
        let mut total = 0.0;
        let mut frequency = self.layer.frequency;
        let mut amplitude = self.layer.amplitude;
        for _ in 0..self.layer.octaves {
            let p = point * frequency;
            total += shape(self.noise.get([p.x, p.y, p.z])) * amplitude;
            frequency *= self.layer.lacunarity;
            amplitude *= self.layer.persistence;
        }
        total
    }

    /// Geometric sum of the octave amplitudes.
    pub fn max_amplitude(&self) -> f64 {
        let mut sum = 0.0;
        let mut amp = self.layer.amplitude;
        for _ in 0..self.layer.octaves {
            sum += amp;
            amp *= self.layer.persistence;
        }
        sum
    }

    pub fn layer(&self) -> &FbmLayer {
        &self.layer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    fn sphere_points(count: usize) -> Vec<DVec3> {
        (0..count)
            .map(|i| {
                let t = i as f64 * 0.37;
                DVec3::new(t.cos(), (t * 1.3).sin(), (t * 0.7).cos() + 0.1).normalize()
            })
            .collect()
    }

    #[test]
    fn test_same_seed_same_point_same_value() {
        let a = FbmSampler::new(42, FbmLayer::default());
        let b = FbmSampler::new(42, FbmLayer::default());
        for p in sphere_points(50) {
            assert!((a.sample(p) - b.sample(p)).abs() < EPSILON);
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let a = FbmSampler::new(1, FbmLayer::default());
        let b = FbmSampler::new(999, FbmLayer::default());
        let differing = sphere_points(50)
            .into_iter()
            .filter(|&p| (a.sample(p) - b.sample(p)).abs() > EPSILON)
            .count();
        assert!(differing > 40, "only {differing} of 50 samples differ");
    }

    #[test]
    fn test_signed_fbm_is_bounded() {
        let sampler = FbmSampler::new(7, FbmLayer { amplitude: 1000.0, ..Default::default() });
        let max = sampler.max_amplitude();
        for p in sphere_points(500) {
            let h = sampler.sample(p);
            assert!(h.abs() <= max + EPSILON, "{h} exceeds {max}");
        }
    }

    #[test]
    fn test_ridged_fbm_is_non_negative_and_bounded() {
        let sampler = FbmSampler::new(3, FbmLayer { frequency: 8.0, ..Default::default() });
        let max = sampler.max_amplitude();
        for p in sphere_points(500) {
            let h = sampler.sample_ridged(p);
            assert!((-EPSILON..=max + EPSILON).contains(&h), "{h} outside [0, {max}]");
        }
    }

    #[test]
    fn test_max_amplitude_is_geometric_sum() {
        let sampler = FbmSampler::new(
            0,
            FbmLayer {
                amplitude: 1000.0,
                persistence: 0.5,
                octaves: 4,
                ..Default::default()
            },
        );
        assert!((sampler.max_amplitude() - 1875.0).abs() < EPSILON);
    }

    #[test]
    fn test_zero_octaves_is_flat() {
        let sampler = FbmSampler::new(5, FbmLayer { octaves: 0, ..Default::default() });
        assert_eq!(sampler.sample(DVec3::X), 0.0);
        assert_eq!(sampler.sample_ridged(DVec3::Y), 0.0);
    }
}
