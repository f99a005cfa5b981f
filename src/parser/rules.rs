//! Static phrase table mapping prompt vocabulary to transforms

use super::extract::{self, Window};
use crate::transform::{Parameters, TransformId};
use once_cell::sync::Lazy;
use regex::Regex;

/// Builds the parameter mapping for one match from its local window
pub type ParamExtractor = fn(&Window) -> Parameters;

/// A recognized phrase and how to turn it into a transform
pub struct PhraseRule {
    /// Canonical phrase, used for suggestions and listings
    pub phrase: &'static str,
    pub pattern: Regex,
    pub transform_id: TransformId,
    pub specificity: u32,
    pub extractor: ParamExtractor,
}

impl std::fmt::Debug for PhraseRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhraseRule")
            .field("phrase", &self.phrase)
            .field("transform_id", &self.transform_id)
            .field("specificity", &self.specificity)
            .finish()
    }
}

fn rule(
    phrase: &'static str,
    pattern: &str,
    transform_id: TransformId,
    specificity: u32,
    extractor: ParamExtractor,
) -> PhraseRule {
    PhraseRule {
        phrase,
        pattern: Regex::new(pattern).expect("Invalid regex pattern"),
        transform_id,
        specificity,
        extractor,
    }
}

/// The phrase table, in table order. Patterns run against lower-cased text.
pub static PHRASE_RULES: Lazy<Vec<PhraseRule>> = Lazy::new(|| {
    vec![
        rule(
            "motion blur",
            r"\bmotion[\s-]+blur(?:red|ry|ring)?\b",
            TransformId::MotionBlur,
            20,
            extract::blur_params,
        ),
        rule(
            "gaussian blur",
            r"\bgaussian[\s-]+blur(?:red|ry|ring)?\b",
            TransformId::GaussianBlur,
            20,
            extract::blur_params,
        ),
        rule(
            "blur",
            r"\bblur(?:red|ry|ring)?\b",
            TransformId::Blur,
            10,
            extract::blur_params,
        ),
        rule(
            "rotate",
            r"\b(?:rotate[ds]?|rotating|rotation|turn(?:ed)?|tilt(?:ed)?)\b",
            TransformId::Rotate,
            10,
            extract::rotate_params,
        ),
        rule(
            "flip horizontally",
            r"\b(?:horizontal(?:ly)?[\s-]+flip(?:ped)?|flip(?:ped)?\s+horizontal(?:ly)?|mirror(?:ed)?)\b",
            TransformId::HorizontalFlip,
            20,
            extract::no_params,
        ),
        rule(
            "flip vertically",
            r"\b(?:(?:turn(?:ed)?|flip(?:ped)?)\s+(?:it\s+|the\s+(?:image|photo|picture)\s+)?upside[\s-]+down|vertical(?:ly)?[\s-]+flip(?:ped)?|flip(?:ped)?\s+vertical(?:ly)?|upside[\s-]+down)\b",
            TransformId::VerticalFlip,
            20,
            extract::no_params,
        ),
        rule(
            "flip",
            r"\bflip(?:ped)?\b",
            TransformId::HorizontalFlip,
            5,
            extract::no_params,
        ),
        rule(
            "brightness",
            r"\b(?:brightness|brighter|brighten|darker|darken)\b",
            TransformId::RandomBrightnessContrast,
            10,
            extract::brightness_params,
        ),
        rule(
            "contrast",
            r"\bcontrast\b",
            TransformId::RandomBrightnessContrast,
            10,
            extract::contrast_params,
        ),
        rule(
            "saturation",
            r"\b(?:hue|saturation|saturated|vibrant|colou?rful)\b",
            TransformId::HueSaturationValue,
            10,
            extract::hsv_params,
        ),
        rule(
            "noise",
            r"\b(?:gaussian[\s-]+noise|noise|noisy|grain|grainy)\b",
            TransformId::GaussNoise,
            10,
            extract::noise_params,
        ),
        rule(
            "crop",
            r"\b(?:crop(?:ped|ping)?)\b",
            TransformId::RandomCrop,
            10,
            extract::crop_params,
        ),
        rule(
            "equalize histogram",
            r"\b(?:clahe|equali[sz]ed?|histogram[\s-]+equali[sz]ation)\b",
            TransformId::Clahe,
            10,
            extract::clahe_params,
        ),
        rule(
            "grayscale",
            r"\b(?:gr[ae]yscale|black\s+and\s+white|monochrome)\b",
            TransformId::ToGray,
            30,
            extract::no_params,
        ),
    ]
});

/// Rules allowed by `available`, ordered by descending specificity, ties in table order
pub fn rules_by_specificity(available: Option<&[TransformId]>) -> Vec<&'static PhraseRule> {
    let mut rules: Vec<&'static PhraseRule> = PHRASE_RULES
        .iter()
        .filter(|r| available.map_or(true, |ids| ids.contains(&r.transform_id)))
        .collect();
    // sort_by is stable, so equal specificity keeps table order
    rules.sort_by(|a, b| b.specificity.cmp(&a.specificity));
    rules
}

/// Canonical phrases in table order, optionally restricted
pub fn catalog_phrases(available: Option<&[TransformId]>) -> Vec<&'static str> {
    PHRASE_RULES
        .iter()
        .filter(|r| available.map_or(true, |ids| ids.contains(&r.transform_id)))
        .map(|r| r.phrase)
        .collect()
}
