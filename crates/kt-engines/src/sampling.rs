//! Random helpers shared by the engines.

use kt_types::{engine_error, Dimension, TuneResult};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use statrs::distribution::Normal;

/// Seeded generator, or one seeded from OS entropy.
pub fn rng_from_seed(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// Uniform sample of one dimension.
pub fn sample_dimension<R: Rng>(dimension: &Dimension, rng: &mut R) -> f64 {
    dimension.from_unit(rng.gen::<f64>())
}

/// Uniform sample of the whole space.
pub fn sample_point<R: Rng>(dimensions: &[Dimension], rng: &mut R) -> Vec<f64> {
    dimensions
        .iter()
        .map(|dim| sample_dimension(dim, rng))
        .collect()
}

/// N(0, 1), used for acquisition scores and kernel densities.
pub fn unit_normal() -> TuneResult<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| engine_error!("standard normal: {e}"))
}

/// `count` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => vec![],
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count).map(|i| start + i as f64 * step).collect()
        }
    }
}
