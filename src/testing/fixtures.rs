//! Canned inputs for pipeline tests

use crate::config::PipelineSettings;
use crate::error::Result;
use crate::orchestrator::RunRequest;
use crate::parser;
use crate::seed::resolve_seed;
use crate::services::ImageRef;
use crate::session::SessionId;
use crate::validation::{TransformValidator, ValidatedSpec};
use std::time::Duration;

pub const SAMPLE_PROMPT: &str = "add blur and rotate 15 degrees";
pub const SAMPLE_SEED: u32 = 42;

pub fn sample_image() -> ImageRef {
    ImageRef::new("sample-001", 640, 480)
}

/// Parse and validate `prompt` with default limits
pub fn spec_from_prompt(prompt: &str) -> Result<ValidatedSpec> {
    let spec = parser::parse(prompt, None)?;
    TransformValidator::default().validate(&spec)
}

/// Validated blur + rotate pipeline
pub fn sample_spec() -> ValidatedSpec {
    spec_from_prompt(SAMPLE_PROMPT).expect("sample prompt parses")
}

pub fn run_request(spec: ValidatedSpec) -> RunRequest {
    RunRequest {
        session_id: SessionId::new(),
        spec,
        image: sample_image(),
        seed: resolve_seed(Some(SAMPLE_SEED), None, None),
    }
}

pub fn sample_request() -> RunRequest {
    run_request(sample_spec())
}

/// Short timeouts so timeout paths resolve quickly in tests
pub fn fast_settings() -> PipelineSettings {
    PipelineSettings {
        run_timeout: Duration::from_secs(5),
        engine_timeout: Duration::from_millis(500),
        hook_timeout: Duration::from_millis(200),
        optional_stage_timeout: Duration::from_millis(200),
    }
}
