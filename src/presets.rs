//! Named, curated pipelines usable in place of a prompt

use crate::error::{AugmentError, ErrorCode, Result};
use crate::transform::{TransformId, TransformPipelineSpec, TransformSpec};
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    pub use_cases: Vec<&'static str>,
    pub transforms: Vec<TransformSpec>,
}

impl Preset {
    /// Pipeline spec for this preset, ready for validation
    pub fn to_spec(&self) -> TransformPipelineSpec {
        TransformPipelineSpec::new(format!("preset:{}", self.name), self.transforms.clone())
    }
}

fn ordered(transforms: Vec<TransformSpec>) -> Vec<TransformSpec> {
    transforms
        .into_iter()
        .enumerate()
        .map(|(i, mut t)| {
            t.order_index = i;
            t
        })
        .collect()
}

pub static PRESETS: Lazy<Vec<Preset>> = Lazy::new(|| {
    vec![
        Preset {
            name: "segmentation",
            description: "Geometry-safe augmentations for segmentation masks",
            use_cases: vec!["semantic segmentation", "instance segmentation"],
            transforms: ordered(vec![
                TransformSpec::new(TransformId::HorizontalFlip, 0).with_probability(0.5),
                TransformSpec::new(TransformId::Rotate, 0)
                    .with_param("angle", json!(15.0))
                    .with_probability(0.5),
                TransformSpec::new(TransformId::RandomBrightnessContrast, 0)
                    .with_param("brightness_limit", json!(0.1))
                    .with_param("contrast_limit", json!(0.1))
                    .with_probability(0.5),
                TransformSpec::new(TransformId::GaussNoise, 0)
                    .with_param("var_limit", json!([10.0, 30.0]))
                    .with_probability(0.3),
            ]),
        },
        Preset {
            name: "portrait",
            description: "Gentle color and lighting changes for people photos",
            use_cases: vec!["face recognition", "portrait photography"],
            transforms: ordered(vec![
                TransformSpec::new(TransformId::HorizontalFlip, 0).with_probability(0.5),
                TransformSpec::new(TransformId::RandomBrightnessContrast, 0)
                    .with_param("brightness_limit", json!(0.1))
                    .with_param("contrast_limit", json!(0.1)),
                TransformSpec::new(TransformId::HueSaturationValue, 0)
                    .with_param("hue_shift_limit", json!(10))
                    .with_param("sat_shift_limit", json!(15))
                    .with_param("val_shift_limit", json!(10))
                    .with_probability(0.5),
                TransformSpec::new(TransformId::GaussianBlur, 0)
                    .with_param("blur_limit", json!(3))
                    .with_probability(0.2),
            ]),
        },
        Preset {
            name: "lowlight",
            description: "Brightening and denoise-robust augmentations for dark scenes",
            use_cases: vec!["night photography", "low-light detection"],
            transforms: ordered(vec![
                TransformSpec::new(TransformId::RandomBrightnessContrast, 0)
                    .with_param("brightness_limit", json!(0.3))
                    .with_param("contrast_limit", json!(0.3)),
                TransformSpec::new(TransformId::Clahe, 0).with_param("clip_limit", json!(4.0)),
                TransformSpec::new(TransformId::GaussNoise, 0)
                    .with_param("var_limit", json!([10.0, 50.0]))
                    .with_probability(0.5),
            ]),
        },
    ]
});

/// Look up a preset by name (case-insensitive)
pub fn get_preset(name: &str) -> Result<&'static Preset> {
    PRESETS
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| {
            AugmentError::validation_with_code(
                ErrorCode::VALIDATION_UNKNOWN_PRESET,
                format!(
                    "Unknown preset '{}' (available: {})",
                    name,
                    preset_names().join(", ")
                ),
                Some("preset".to_string()),
            )
        })
}

pub fn preset_names() -> Vec<&'static str> {
    PRESETS.iter().map(|p| p.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::TransformValidator;

    #[test]
    fn test_all_presets_validate_cleanly() {
        let validator = TransformValidator::default();
        for preset in PRESETS.iter() {
            let validated = validator.validate(&preset.to_spec()).unwrap();
            assert!(validated.warnings.is_empty(), "{}", preset.name);
            assert_eq!(validated.transforms.len(), preset.transforms.len());
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(get_preset("Portrait").unwrap().name, "portrait");
        let err = get_preset("vintage").unwrap_err();
        assert_eq!(err.code(), ErrorCode::VALIDATION_UNKNOWN_PRESET);
        assert!(err.to_string().contains("segmentation"));
    }

    #[test]
    fn test_order_indices_are_sequential() {
        for preset in PRESETS.iter() {
            for (i, t) in preset.transforms.iter().enumerate() {
                assert_eq!(t.order_index, i);
            }
        }
    }
}
