use noise::{NoiseFn, Simplex};

/// Pure, reproducible 3D noise. Same seed and coordinates, same value.
pub trait NoiseSource: Send + Sync {
    fn noise(&self, x: f64, y: f64, z: f64) -> f64;
}

/// Fractal Brownian motion over simplex noise, normalized to roughly
/// `[-1, 1]`.
pub struct FbmNoise {
    simplex: Simplex,
    octaves: u32,
    frequency: f64,
    lacunarity: f64,
    persistence: f64,
    norm: f64,
}

impl FbmNoise {
    pub fn new(seed: u64, octaves: u32, frequency: f64) -> Self {
        let octaves = octaves.max(1);
        let persistence: f64 = 0.5;
        let norm: f64 = (0..octaves).map(|i| persistence.powi(i as i32)).sum();
        Self {
            simplex: Simplex::new(fold_seed(seed)),
            octaves,
            frequency,
            lacunarity: 2.0,
            persistence,
            norm,
        }
    }
}

impl NoiseSource for FbmNoise {
    fn noise(&self, x: f64, y: f64, z: f64) -> f64 {
        let mut total = 0.0;
        let mut frequency = self.frequency;
        let mut amplitude = 1.0;
        for _ in 0..self.octaves {
            total += self.simplex.get([x * frequency, y * frequency, z * frequency]) * amplitude;
            frequency *= self.lacunarity;
            amplitude *= self.persistence;
        }
        total / self.norm
    }
}

/// Fold a 64-bit world seed into the 32-bit seed `noise` takes.
fn fold_seed(seed: u64) -> u32 {
    (seed ^ (seed >> 32)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_field() {
        let a = FbmNoise::new(42, 4, 0.02);
        let b = FbmNoise::new(42, 4, 0.02);
        for i in 0..50 {
            let p = (i as f64 * 3.7, i as f64 * 0.5, -(i as f64) * 1.3);
            assert_eq!(a.noise(p.0, p.1, p.2), b.noise(p.0, p.1, p.2));
        }
    }

    #[test]
    fn output_is_bounded() {
        let n = FbmNoise::new(7, 4, 0.05);
        for i in 0..200 {
            let v = n.noise(i as f64 * 1.1, 40.0, i as f64 * 0.7);
            assert!((-1.5..=1.5).contains(&v), "{v}");
        }
    }
}
