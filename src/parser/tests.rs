use super::*;
use serde_json::json;

#[test]
fn test_blur_and_rotate() {
    let spec = parse("add blur and rotate 15 degrees", None).unwrap();

    assert_eq!(spec.transforms.len(), 2);
    assert_eq!(spec.transforms[0].transform_id, TransformId::Blur);
    assert_eq!(spec.transforms[0].parameters["blur_limit"], json!(7));
    assert_eq!(spec.transforms[0].order_index, 0);
    assert_eq!(spec.transforms[1].transform_id, TransformId::Rotate);
    assert_eq!(spec.transforms[1].parameters["angle"], json!(15.0));
    assert_eq!(spec.transforms[1].order_index, 1);
    assert_eq!(spec.confidence, 1.0);
    assert!(spec.warnings.is_empty());
    assert_eq!(spec.seed, None);
}

#[test]
fn test_motion_blur_binds_before_blur() {
    let spec = parse("motion blur", None).unwrap();
    assert_eq!(spec.transforms.len(), 1);
    assert_eq!(spec.transforms[0].transform_id, TransformId::MotionBlur);
}

#[test]
fn test_empty_and_whitespace_prompts_fail() {
    for text in ["", "   ", "\n\t"] {
        let err = parse(text, None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PARSE_EMPTY_PROMPT);
        assert!(!err.suggestions().is_empty());
    }
}

#[test]
fn test_nonsense_fails_with_suggestions() {
    let err = parse("xyzabc nonsense", None).unwrap_err();
    assert_eq!(err.code(), ErrorCode::PARSE_NO_MATCH);
    let catalog = catalog_phrases(None);
    assert!(!err.suggestions().is_empty());
    assert!(err
        .suggestions()
        .iter()
        .all(|s| catalog.contains(&s.as_str())));
}

#[test]
fn test_parse_is_deterministic() {
    let text = "slightly blur, rotate 20 degrees counterclockwise then add heavy noise";
    assert_eq!(parse(text, None).unwrap(), parse(text, None).unwrap());
}

#[test]
fn test_order_follows_text_position() {
    let spec = parse("flip vertically then crop 128x128 and make it grayscale", None).unwrap();
    let ids: Vec<TransformId> = spec.transforms.iter().map(|t| t.transform_id).collect();
    assert_eq!(
        ids,
        vec![
            TransformId::VerticalFlip,
            TransformId::RandomCrop,
            TransformId::ToGray
        ]
    );
    assert_eq!(spec.transforms[1].parameters["width"], json!(128));
}

#[test]
fn test_black_and_white_is_one_phrase() {
    let spec = parse("black and white", None).unwrap();
    assert_eq!(spec.transforms.len(), 1);
    assert_eq!(spec.transforms[0].transform_id, TransformId::ToGray);
}

#[test]
fn test_modifiers_stay_in_their_clause() {
    let spec = parse("strong blur and rotate", None).unwrap();
    assert_eq!(spec.transforms[0].parameters["blur_limit"], json!(15));
    assert_eq!(spec.transforms[1].parameters["angle"], json!(30.0));
}

#[test]
fn test_brightness_and_contrast_merge() {
    let spec = parse("increase brightness by 30% and contrast", None).unwrap();
    assert_eq!(spec.transforms.len(), 1);
    let params = &spec.transforms[0].parameters;
    assert_eq!(params["brightness_limit"], json!(0.3));
    assert_eq!(params["contrast_limit"], json!(0.2));
}

#[test]
fn test_brightness_only_leaves_contrast_unchanged() {
    let spec = parse("make it brighter", None).unwrap();
    assert_eq!(spec.transforms[0].parameters["contrast_limit"], json!(0.0));
}

#[test]
fn test_seed_extracted() {
    let spec = parse("blur with seed 42", None).unwrap();
    assert_eq!(spec.seed, Some(42));
    assert_eq!(spec.transforms[0].parameters["blur_limit"], json!(7));
    assert!(spec.warnings.is_empty());

    let spec = parse("rotate seed=7", None).unwrap();
    assert_eq!(spec.seed, Some(7));
}

#[test]
fn test_out_of_range_seed_warns() {
    let spec = parse("blur seed 99999999999", None).unwrap();
    assert_eq!(spec.seed, None);
    assert!(spec.warnings.iter().any(|w| w.contains("out of range")));
}

#[test]
fn test_probability_phrases() {
    let spec = parse("blur with probability 0.3 and flip half the time", None).unwrap();
    assert_eq!(spec.transforms[0].probability, 0.3);
    assert_eq!(spec.transforms[1].probability, 0.5);
    assert_eq!(spec.transforms[0].parameters["blur_limit"], json!(7));
}

#[test]
fn test_unknown_terms_lower_confidence_and_warn() {
    let spec = parse("blur and sharpen", None).unwrap();
    assert_eq!(spec.transforms.len(), 1);
    assert_eq!(spec.confidence, 0.5);
    assert!(spec.warnings.iter().any(|w| w.contains("'sharpen'")));
}

#[test]
fn test_typo_gets_suggestion() {
    let spec = parse("rotate and blurr", None).unwrap();
    assert!(spec.suggestions.contains(&"blur".to_string()));
}

#[test]
fn test_available_transforms_restrict_rules() {
    let parser = PromptParser::with_available(vec![TransformId::Rotate]);
    let spec = parser.parse("blur and rotate").unwrap();
    assert_eq!(spec.transforms.len(), 1);
    assert_eq!(spec.transforms[0].transform_id, TransformId::Rotate);
    assert!(spec.confidence < 1.0);

    let err = parser.parse("blur").unwrap_err();
    assert_eq!(err.code(), ErrorCode::PARSE_NO_MATCH);
    assert_eq!(err.suggestions(), &["rotate".to_string()]);
}

#[test]
fn test_confidence_helper() {
    assert_eq!(confidence(0, 0), 0.0);
    assert_eq!(confidence(3, 1), 0.75);
    assert_eq!(confidence(2, 0), 1.0);
}

#[test]
fn test_modifier_belongs_to_one_transform() {
    let spec = parse("rotate 15 degrees blur", None).unwrap();
    assert_eq!(spec.transforms[0].transform_id, TransformId::Rotate);
    assert_eq!(spec.transforms[0].parameters["angle"], json!(15.0));
    assert_eq!(spec.transforms[1].transform_id, TransformId::Blur);
    assert_eq!(spec.transforms[1].parameters["blur_limit"], json!(7));

    let spec = parse("rotate strong blur", None).unwrap();
    assert_eq!(spec.transforms[0].parameters["angle"], json!(45.0));
    assert_eq!(spec.transforms[1].parameters["blur_limit"], json!(7));
}

#[test]
fn test_leading_modifier_of_a_clause() {
    let spec = parse("strong blur then slightly rotate", None).unwrap();
    assert_eq!(spec.transforms[0].parameters["blur_limit"], json!(15));
    assert_eq!(spec.transforms[1].parameters["angle"], json!(10.0));
}

#[test]
fn test_turn_upside_down_is_only_a_vertical_flip() {
    let spec = parse("turn it upside down", None).unwrap();
    assert_eq!(spec.transforms.len(), 1);
    assert_eq!(spec.transforms[0].transform_id, TransformId::VerticalFlip);
    assert_eq!(spec.confidence, 1.0);
}

#[test]
fn test_probability_above_one_is_clamped_with_warning() {
    let spec = parse("blur with probability 250", None).unwrap();
    assert_eq!(spec.transforms[0].probability, 1.0);
    assert!(spec
        .warnings
        .iter()
        .any(|w| w.contains("outside [0, 1]")));

    let spec = parse("flip with a 300% chance", None).unwrap();
    assert_eq!(spec.transforms[0].probability, 1.0);
}

#[test]
fn test_gaussian_noise_phrase() {
    let spec = parse("add gaussian noise", None).unwrap();
    assert_eq!(spec.transforms.len(), 1);
    assert_eq!(spec.transforms[0].transform_id, TransformId::GaussNoise);
    assert_eq!(spec.confidence, 1.0);
    assert!(spec.warnings.is_empty());
}
