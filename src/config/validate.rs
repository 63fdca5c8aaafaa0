//! Configuration validation

use super::schema::RunSpec;

/// Validation error type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid batch size: {0} (must be > 0)")]
    InvalidBatchSize(usize),

    #[error("Invalid micro-batch size: {0} (must be > 0)")]
    InvalidMicroBatchSize(usize),

    #[error(
        "Invalid accumulation: batch size {batch_size} is smaller than micro-batch size {micro_batch_size}"
    )]
    InvalidAccumulation {
        batch_size: usize,
        micro_batch_size: usize,
    },

    #[error("Invalid eval batch size: {0} (must be > 0)")]
    InvalidEvalBatchSize(usize),

    #[error("Invalid dataset shape: {0}")]
    InvalidDataShape(String),

    #[error("Invalid epochs: {0} (must be > 0)")]
    InvalidEpochs(usize),

    #[error("Invalid learning rate: {0} (must be > 0.0)")]
    InvalidLearningRate(f32),

    #[error("Invalid div factor: {0} (must be >= 1.0)")]
    InvalidDivFactor(f32),

    #[error("Invalid final div factor: {0} (must be >= 1.0)")]
    InvalidFinalDivFactor(f32),

    #[error("Invalid pct_start: {0} (must be in [0, 1])")]
    InvalidPctStart(f32),

    #[error("Invalid momentum bounds: base {base}, max {max} (need 0 <= base <= max < 1)")]
    InvalidMomentum { base: f32, max: f32 },

    #[error("Invalid weight decay: {0} (must be >= 0.0)")]
    InvalidWeightDecay(f32),
}

fn positive(value: f32) -> bool {
    value > 0.0 && value.is_finite()
}

/// Validate a run specification
///
/// Checks:
/// - Batch sizes are positive and yield an accumulation factor of at least one
/// - Schedule anchors and momentum bounds are in range
/// - Dataset shape is usable
pub fn validate_config(spec: &RunSpec) -> Result<(), ValidationError> {
    let data = &spec.data;

    if data.batch_size == 0 {
        return Err(ValidationError::InvalidBatchSize(data.batch_size));
    }
    if data.micro_batch_size == 0 {
        return Err(ValidationError::InvalidMicroBatchSize(data.micro_batch_size));
    }
    if data.batch_size < data.micro_batch_size {
        return Err(ValidationError::InvalidAccumulation {
            batch_size: data.batch_size,
            micro_batch_size: data.micro_batch_size,
        });
    }
    if data.eval_batch_size == 0 {
        return Err(ValidationError::InvalidEvalBatchSize(data.eval_batch_size));
    }

    if data.train_examples == 0 || data.eval_examples == 0 {
        return Err(ValidationError::InvalidDataShape(format!(
            "train_examples ({}) and eval_examples ({}) must be > 0",
            data.train_examples, data.eval_examples
        )));
    }
    if data.features == 0 {
        return Err(ValidationError::InvalidDataShape(
            "features must be > 0".to_string(),
        ));
    }
    if data.classes < 2 {
        return Err(ValidationError::InvalidDataShape(format!(
            "classes must be >= 2 (got {})",
            data.classes
        )));
    }
    if !positive(data.spread) {
        return Err(ValidationError::InvalidDataShape(format!(
            "spread must be > 0 (got {})",
            data.spread
        )));
    }

    if spec.training.epochs == 0 {
        return Err(ValidationError::InvalidEpochs(spec.training.epochs));
    }

    let schedule = &spec.schedule;
    if !positive(schedule.max_lr) {
        return Err(ValidationError::InvalidLearningRate(schedule.max_lr));
    }
    if !positive(spec.optimizer.lr) {
        return Err(ValidationError::InvalidLearningRate(spec.optimizer.lr));
    }
    if !(schedule.div_factor >= 1.0 && schedule.div_factor.is_finite()) {
        return Err(ValidationError::InvalidDivFactor(schedule.div_factor));
    }
    if !(schedule.final_div_factor >= 1.0 && schedule.final_div_factor.is_finite()) {
        return Err(ValidationError::InvalidFinalDivFactor(
            schedule.final_div_factor,
        ));
    }
    if !(0.0..=1.0).contains(&schedule.pct_start) {
        return Err(ValidationError::InvalidPctStart(schedule.pct_start));
    }
    if !(0.0 <= schedule.base_momentum
        && schedule.base_momentum <= schedule.max_momentum
        && schedule.max_momentum < 1.0)
    {
        return Err(ValidationError::InvalidMomentum {
            base: schedule.base_momentum,
            max: schedule.max_momentum,
        });
    }

    if !(spec.optimizer.weight_decay >= 0.0 && spec.optimizer.weight_decay.is_finite()) {
        return Err(ValidationError::InvalidWeightDecay(
            spec.optimizer.weight_decay,
        ));
    }

    Ok(())
}
