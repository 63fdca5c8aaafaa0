//! Linear softmax classifier

use super::{Model, Param};
use crate::error::{Error, Result};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Single linear layer producing class logits: `logits = X·W + b`
///
/// `params()[0]` holds `W` flattened row-major as `(features, classes)`,
/// `params()[1]` holds `b`.
#[derive(Debug, Clone)]
pub struct SoftmaxClassifier {
    features: usize,
    classes: usize,
    params: Vec<Param>,
    cached_inputs: Option<Array2<f32>>,
}

impl SoftmaxClassifier {
    /// Create a classifier with uniform `±1/sqrt(features)` weights and zero bias
    pub fn new(features: usize, classes: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let bound = 1.0 / (features.max(1) as f32).sqrt();
        let weights: Array1<f32> = (0..features * classes)
            .map(|_| rng.gen_range(-bound..=bound))
            .collect();

        Self {
            features,
            classes,
            params: vec![Param::new(weights), Param::zeros(classes)],
            cached_inputs: None,
        }
    }

    pub fn features(&self) -> usize {
        self.features
    }

    pub fn classes(&self) -> usize {
        self.classes
    }

    fn weights(&self) -> Result<ArrayView2<'_, f32>> {
        self.params[0]
            .data()
            .view()
            .into_shape_with_order((self.features, self.classes))
            .map_err(|_| Error::ShapeMismatch {
                expected: vec![self.features * self.classes],
                got: vec![self.params[0].len()],
            })
    }

    fn check_inputs(&self, inputs: &Array2<f32>) -> Result<()> {
        if inputs.ncols() != self.features {
            return Err(Error::ShapeMismatch {
                expected: vec![inputs.nrows(), self.features],
                got: vec![inputs.nrows(), inputs.ncols()],
            });
        }
        Ok(())
    }
}

impl Model for SoftmaxClassifier {
    fn forward(&mut self, inputs: &Array2<f32>) -> Result<Array2<f32>> {
        let logits = self.infer(inputs)?;
        self.cached_inputs = Some(inputs.clone());
        Ok(logits)
    }

    fn backward(&mut self, logit_grad: &Array2<f32>) -> Result<()> {
        let inputs = self.cached_inputs.take().ok_or_else(|| {
            Error::InvalidGradient("backward called without a preceding forward".to_string())
        })?;

        if logit_grad.dim() != (inputs.nrows(), self.classes) {
            return Err(Error::ShapeMismatch {
                expected: vec![inputs.nrows(), self.classes],
                got: logit_grad.shape().to_vec(),
            });
        }

        // dW = Xᵀ·G, db = Σ_rows G
        let weight_grad: Array1<f32> = inputs.t().dot(logit_grad).iter().copied().collect();
        let bias_grad = logit_grad.sum_axis(Axis(0));

        self.params[0].accumulate_grad(&weight_grad)?;
        self.params[1].accumulate_grad(&bias_grad)?;
        Ok(())
    }

    fn infer(&self, inputs: &Array2<f32>) -> Result<Array2<f32>> {
        self.check_inputs(inputs)?;
        let logits = inputs.dot(&self.weights()?) + self.params[1].data();
        Ok(logits)
    }

    fn params(&self) -> &[Param] {
        &self.params
    }

    fn params_mut(&mut self) -> &mut [Param] {
        &mut self.params
    }
}
