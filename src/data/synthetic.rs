//! Seeded synthetic classification data

use super::InMemoryDataset;
use crate::error::{Error, Result};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Class-separable point clouds around random per-class centers
///
/// Centers are fixed by `seed`; each call to [`SyntheticBlobs::dataset`]
/// draws fresh noise from its own seed, so train and evaluation splits share
/// the class layout but not the examples.
#[derive(Debug, Clone)]
pub struct SyntheticBlobs {
    centers: Array2<f32>,
    spread: f32,
}

impl SyntheticBlobs {
    /// Centers drawn uniformly from `[-3, 3]^features`
    pub fn new(features: usize, classes: usize, seed: u64) -> Result<Self> {
        if features == 0 || classes < 2 {
            return Err(Error::ConfigError(format!(
                "synthetic data needs features > 0 and classes >= 2 (got {features}, {classes})"
            )));
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let centers =
            Array2::<f32>::from_shape_fn((classes, features), |_| rng.gen_range(-3.0..3.0));
        Ok(Self {
            centers,
            spread: 1.0,
        })
    }

    /// Set the half-width of the uniform noise around each center
    pub fn with_spread(mut self, spread: f32) -> Self {
        self.spread = spread.abs();
        self
    }

    pub fn classes(&self) -> usize {
        self.centers.nrows()
    }

    pub fn features(&self) -> usize {
        self.centers.ncols()
    }

    /// Draw `examples` points, labels cycling through the classes in order
    pub fn dataset(
        &self,
        examples: usize,
        batch_size: usize,
        seed: u64,
    ) -> Result<InMemoryDataset> {
        let mut rng = StdRng::seed_from_u64(seed);
        let classes = self.classes();
        let labels: Vec<usize> = (0..examples).map(|i| i % classes).collect();
        let inputs = Array2::from_shape_fn((examples, self.features()), |(i, j)| {
            let noise = if self.spread > 0.0 {
                rng.gen_range(-self.spread..=self.spread)
            } else {
                0.0
            };
            self.centers[[labels[i], j]] + noise
        });
        InMemoryDataset::new(inputs, labels, batch_size)
    }
}
