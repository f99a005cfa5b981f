//! Per-transform parameter safety ranges

use crate::transform::TransformId;

/// How a parameter value is interpreted and bounded
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    /// Whole number clamped to `[min, max]`
    Int { min: i64, max: i64 },
    /// Odd whole number clamped to `[min, max]`; even values are bumped
    OddInt { min: i64, max: i64 },
    Float { min: f64, max: f64 },
    /// `[low, high]` pair, each clamped to `[min, max]`; `low > high` is rejected
    FloatPair { min: f64, max: f64 },
    /// Pixel size; must fit within the maximum image dimension
    Dimension,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub key: &'static str,
    pub kind: ParamKind,
}

const fn range(key: &'static str, kind: ParamKind) -> ParamRange {
    ParamRange { key, kind }
}

const BLUR: &[ParamRange] = &[range("blur_limit", ParamKind::OddInt { min: 3, max: 99 })];
const ROTATE: &[ParamRange] = &[range(
    "angle",
    ParamKind::Float {
        min: -180.0,
        max: 180.0,
    },
)];
const BRIGHTNESS_CONTRAST: &[ParamRange] = &[
    range("brightness_limit", ParamKind::Float { min: 0.0, max: 1.0 }),
    range("contrast_limit", ParamKind::Float { min: 0.0, max: 1.0 }),
];
const HSV: &[ParamRange] = &[
    range("hue_shift_limit", ParamKind::Int { min: 0, max: 180 }),
    range("sat_shift_limit", ParamKind::Int { min: 0, max: 255 }),
    range("val_shift_limit", ParamKind::Int { min: 0, max: 255 }),
];
const NOISE: &[ParamRange] = &[range(
    "var_limit",
    ParamKind::FloatPair {
        min: 0.0,
        max: 255.0,
    },
)];
const CROP: &[ParamRange] = &[
    range("height", ParamKind::Dimension),
    range("width", ParamKind::Dimension),
];
const CLAHE: &[ParamRange] = &[range(
    "clip_limit",
    ParamKind::Float {
        min: 1.0,
        max: 40.0,
    },
)];

/// Known parameters for a transform; anything else is dropped by the validator
pub fn ranges_for(id: TransformId) -> &'static [ParamRange] {
    match id {
        TransformId::Blur | TransformId::GaussianBlur | TransformId::MotionBlur => BLUR,
        TransformId::Rotate => ROTATE,
        TransformId::RandomBrightnessContrast => BRIGHTNESS_CONTRAST,
        TransformId::HueSaturationValue => HSV,
        TransformId::GaussNoise => NOISE,
        TransformId::RandomCrop => CROP,
        TransformId::Clahe => CLAHE,
        TransformId::HorizontalFlip | TransformId::VerticalFlip | TransformId::ToGray => &[],
    }
}

pub fn range_for(id: TransformId, key: &str) -> Option<&'static ParamRange> {
    ranges_for(id).iter().find(|r| r.key == key)
}
