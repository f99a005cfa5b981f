//! Transform identifiers and the pipeline spec produced by the prompt parser.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Parameter mapping for a single transform
pub type Parameters = BTreeMap<String, serde_json::Value>;

/// The closed set of transforms the parser can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransformId {
    Blur,
    GaussianBlur,
    MotionBlur,
    Rotate,
    HorizontalFlip,
    VerticalFlip,
    RandomBrightnessContrast,
    HueSaturationValue,
    GaussNoise,
    RandomCrop,
    #[serde(rename = "CLAHE")]
    Clahe,
    ToGray,
}

impl TransformId {
    pub const ALL: [TransformId; 12] = [
        TransformId::Blur,
        TransformId::GaussianBlur,
        TransformId::MotionBlur,
        TransformId::Rotate,
        TransformId::HorizontalFlip,
        TransformId::VerticalFlip,
        TransformId::RandomBrightnessContrast,
        TransformId::HueSaturationValue,
        TransformId::GaussNoise,
        TransformId::RandomCrop,
        TransformId::Clahe,
        TransformId::ToGray,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransformId::Blur => "Blur",
            TransformId::GaussianBlur => "GaussianBlur",
            TransformId::MotionBlur => "MotionBlur",
            TransformId::Rotate => "Rotate",
            TransformId::HorizontalFlip => "HorizontalFlip",
            TransformId::VerticalFlip => "VerticalFlip",
            TransformId::RandomBrightnessContrast => "RandomBrightnessContrast",
            TransformId::HueSaturationValue => "HueSaturationValue",
            TransformId::GaussNoise => "GaussNoise",
            TransformId::RandomCrop => "RandomCrop",
            TransformId::Clahe => "CLAHE",
            TransformId::ToGray => "ToGray",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TransformId::Blur => "Box blur with a random odd kernel up to blur_limit",
            TransformId::GaussianBlur => "Gaussian blur with a random odd kernel up to blur_limit",
            TransformId::MotionBlur => "Directional motion blur",
            TransformId::Rotate => "Rotate by a random angle within +/- limit degrees",
            TransformId::HorizontalFlip => "Mirror the image left to right",
            TransformId::VerticalFlip => "Flip the image top to bottom",
            TransformId::RandomBrightnessContrast => "Adjust brightness and contrast",
            TransformId::HueSaturationValue => "Shift hue, saturation and value",
            TransformId::GaussNoise => "Add Gaussian noise with variance in var_limit",
            TransformId::RandomCrop => "Crop a random window of height x width",
            TransformId::Clahe => "Contrast limited adaptive histogram equalization",
            TransformId::ToGray => "Convert to grayscale",
        }
    }
}

impl fmt::Display for TransformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransformId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransformId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown transform '{}'", s))
    }
}

/// One transform with its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformSpec {
    pub transform_id: TransformId,
    pub parameters: Parameters,
    pub probability: f64,
    pub order_index: usize,
}

impl TransformSpec {
    pub fn new(transform_id: TransformId, order_index: usize) -> Self {
        Self {
            transform_id,
            parameters: Parameters::new(),
            probability: 1.0,
            order_index,
        }
    }

    pub fn with_param(mut self, key: &str, value: serde_json::Value) -> Self {
        self.parameters.insert(key.to_string(), value);
        self
    }

    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = probability;
        self
    }

    pub fn param_f64(&self, key: &str) -> Option<f64> {
        self.parameters.get(key).and_then(|v| v.as_f64())
    }
}

/// Ordered transforms compiled from a prompt or preset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformPipelineSpec {
    pub source_prompt: String,
    pub transforms: Vec<TransformSpec>,
    pub confidence: f64,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
    pub seed: Option<u32>,
}

impl TransformPipelineSpec {
    pub fn new(source_prompt: impl Into<String>, transforms: Vec<TransformSpec>) -> Self {
        Self {
            source_prompt: source_prompt.into(),
            transforms,
            confidence: 1.0,
            warnings: Vec::new(),
            suggestions: Vec::new(),
            seed: None,
        }
    }

    pub fn transform_names(&self) -> Vec<&'static str> {
        self.transforms
            .iter()
            .map(|t| t.transform_id.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_id_round_trips_through_name() {
        for id in TransformId::ALL {
            assert_eq!(id.as_str().parse::<TransformId>().unwrap(), id);
        }
        assert_eq!("clahe".parse::<TransformId>().unwrap(), TransformId::Clahe);
        assert!("Sharpen".parse::<TransformId>().is_err());
    }

    #[test]
    fn test_serialized_name_matches_display() {
        let json = serde_json::to_string(&TransformId::Clahe).unwrap();
        assert_eq!(json, "\"CLAHE\"");
    }
}
