//! Parameter validation for compiled pipelines
//!
//! The validator is side-effect free: it returns a clamped copy of the pipeline spec with
//! warnings appended, or rejects the whole spec.

pub mod prompt;
pub mod ranges;

pub use prompt::{PromptCheck, PromptGuard};

use crate::config::Limits;
use crate::error::{AugmentError, ErrorCode, Result};
use crate::transform::{TransformPipelineSpec, TransformSpec};
use ranges::{range_for, ParamKind};
use serde::Serialize;
use serde_json::{json, Value};
use std::ops::Deref;

/// A pipeline spec that passed validation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedSpec(TransformPipelineSpec);

impl ValidatedSpec {
    pub fn spec(&self) -> &TransformPipelineSpec {
        &self.0
    }

    pub fn into_inner(self) -> TransformPipelineSpec {
        self.0
    }
}

impl Deref for ValidatedSpec {
    type Target = TransformPipelineSpec;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TransformValidator {
    limits: Limits,
}

impl TransformValidator {
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    pub fn validate(&self, spec: &TransformPipelineSpec) -> Result<ValidatedSpec> {
        if spec.transforms.is_empty() {
            return Err(AugmentError::validation_with_code(
                ErrorCode::VALIDATION_EMPTY_PIPELINE,
                "Pipeline contains no transforms",
                None,
            ));
        }
        if spec.transforms.len() > self.limits.max_transforms {
            return Err(AugmentError::validation_with_code(
                ErrorCode::VALIDATION_TOO_MANY_TRANSFORMS,
                format!(
                    "Pipeline has {} transforms (max: {})",
                    spec.transforms.len(),
                    self.limits.max_transforms
                ),
                None,
            ));
        }

        let mut validated = spec.clone();
        for transform in &mut validated.transforms {
            self.validate_transform(transform, &mut validated.warnings)?;
        }

        tracing::debug!(
            transforms = validated.transforms.len(),
            warnings = validated.warnings.len(),
            "Validated pipeline"
        );
        Ok(ValidatedSpec(validated))
    }

    fn validate_transform(
        &self,
        transform: &mut TransformSpec,
        warnings: &mut Vec<String>,
    ) -> Result<()> {
        let id = transform.transform_id;

        let unknown: Vec<String> = transform
            .parameters
            .keys()
            .filter(|key| range_for(id, key).is_none())
            .cloned()
            .collect();
        for key in unknown {
            transform.parameters.remove(&key);
            warnings.push(format!("{}: dropped unknown parameter '{}'", id, key));
        }

        for (key, value) in transform.parameters.iter_mut() {
            let Some(range) = range_for(id, key) else {
                continue;
            };
            let field = format!("{}.{}", id, key);
            if let Some(adjusted) = self.check_value(&field, range.kind, value)? {
                warnings.push(format!(
                    "{}: {} adjusted from {} to {}",
                    id, key, value, adjusted
                ));
                *value = adjusted;
            }
        }

        if !transform.probability.is_finite() {
            return Err(invalid_type(
                &format!("{}.probability", id),
                "probability must be a finite number",
            ));
        }
        if !(0.0..=1.0).contains(&transform.probability) {
            let clamped = transform.probability.clamp(0.0, 1.0);
            warnings.push(format!(
                "{}: probability adjusted from {} to {}",
                id, transform.probability, clamped
            ));
            transform.probability = clamped;
        }

        Ok(())
    }

    /// Returns the replacement value when `value` had to be adjusted
    fn check_value(&self, field: &str, kind: ParamKind, value: &Value) -> Result<Option<Value>> {
        match kind {
            ParamKind::Int { min, max } => {
                let n = number(field, value)?.round() as i64;
                let clamped = n.clamp(min, max);
                Ok(changed(value, json!(clamped)))
            }
            ParamKind::OddInt { min, max } => {
                let mut n = number(field, value)?.round() as i64;
                n = n.clamp(min, max);
                if n % 2 == 0 {
                    n = if n < max { n + 1 } else { n - 1 };
                }
                Ok(changed(value, json!(n)))
            }
            ParamKind::Float { min, max } => {
                let n = number(field, value)?;
                Ok(changed(value, json!(n.clamp(min, max))))
            }
            ParamKind::FloatPair { min, max } => {
                let items = value.as_array().filter(|items| items.len() == 2).ok_or_else(|| {
                    invalid_type(field, "expected a [low, high] pair of numbers")
                })?;
                let low = number(field, &items[0])?;
                let high = number(field, &items[1])?;
                if low > high {
                    return Err(AugmentError::validation_with_code(
                        ErrorCode::VALIDATION_INVALID_RANGE,
                        format!("lower bound {} exceeds upper bound {}", low, high),
                        Some(field.to_string()),
                    ));
                }
                Ok(changed(
                    value,
                    json!([low.clamp(min, max), high.clamp(min, max)]),
                ))
            }
            ParamKind::Dimension => {
                let n = number(field, value)?.round() as i64;
                let max = i64::from(self.limits.max_image_dimension);
                if n > max {
                    return Err(AugmentError::validation_with_code(
                        ErrorCode::VALIDATION_CROP_TOO_LARGE,
                        format!("{} exceeds the maximum image dimension {}", n, max),
                        Some(field.to_string()),
                    ));
                }
                Ok(changed(value, json!(n.max(1))))
            }
        }
    }
}

impl Default for TransformValidator {
    fn default() -> Self {
        Self::new(Limits::default())
    }
}

fn number(field: &str, value: &Value) -> Result<f64> {
    value
        .as_f64()
        .filter(|n| n.is_finite())
        .ok_or_else(|| invalid_type(field, &format!("expected a number, got {}", value)))
}

fn invalid_type(field: &str, message: &str) -> AugmentError {
    AugmentError::validation_with_code(
        ErrorCode::VALIDATION_INVALID_TYPE,
        message,
        Some(field.to_string()),
    )
}

/// `Some(new)` if `new` differs numerically from `old`
fn changed(old: &Value, new: Value) -> Option<Value> {
    let same = match (old, &new) {
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.as_f64() == y.as_f64())
        }
        (a, b) => a.as_f64() == b.as_f64(),
    };
    if same {
        None
    } else {
        Some(new)
    }
}
