//! Adam optimizer

use super::Optimizer;
use crate::model::Param;
use ndarray::Array1;

/// Adam optimizer (Adaptive Moment Estimation) with L2 weight decay
///
/// The momentum pushed in by a schedule drives `beta1`. Bias correction uses
/// the `beta1` current at each update.
pub struct Adam {
    lr: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    weight_decay: f32,
    t: i32,
    m: Vec<Option<Array1<f32>>>, // First moment
    v: Vec<Option<Array1<f32>>>, // Second moment
}

impl Adam {
    /// Create a new Adam optimizer
    pub fn new(lr: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            lr,
            beta1,
            beta2,
            epsilon,
            weight_decay: 0.0,
            t: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    /// Create Adam with default parameters
    pub fn default_params(lr: f32) -> Self {
        Self::new(lr, 0.9, 0.999, 1e-8)
    }

    pub fn with_weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    /// Initialize moments if needed
    fn ensure_moments(&mut self, params: &[Param]) {
        if self.m.len() != params.len() {
            self.m = params.iter().map(|_| None).collect();
            self.v = params.iter().map(|_| None).collect();
        }
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: &mut [Param]) {
        self.ensure_moments(params);
        self.t = self.t.saturating_add(1);

        let (beta1, beta2, epsilon) = (self.beta1, self.beta2, self.epsilon);
        let bias_correction1 = 1.0 - beta1.powi(self.t);
        let bias_correction2 = 1.0 - beta2.powi(self.t);
        let step_size = self.lr / bias_correction1;

        for (i, param) in params.iter_mut().enumerate() {
            let mut grad = param.grad().clone();
            if self.weight_decay != 0.0 {
                grad.scaled_add(self.weight_decay, param.data());
            }

            let m = self.m[i].get_or_insert_with(|| Array1::zeros(grad.len()));
            let v = self.v[i].get_or_insert_with(|| Array1::zeros(grad.len()));

            // m = β1·m + (1-β1)·g, v = β2·v + (1-β2)·g²
            m.zip_mut_with(&grad, |mi, &g| *mi = beta1 * *mi + (1.0 - beta1) * g);
            v.zip_mut_with(&grad, |vi, &g| *vi = beta2 * *vi + (1.0 - beta2) * g * g);

            let denom = v.mapv(|vi| (vi / bias_correction2).sqrt() + epsilon);
            let update = &*m / &denom;
            param.data_mut().scaled_add(-step_size, &update);
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }

    fn momentum(&self) -> f32 {
        self.beta1
    }

    fn set_momentum(&mut self, momentum: f32) {
        self.beta1 = momentum;
    }

    fn weight_decay(&self) -> f32 {
        self.weight_decay
    }

    fn name(&self) -> &str {
        "adam"
    }
}
