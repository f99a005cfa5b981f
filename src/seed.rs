//! Seed resolution for reproducible runs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the effective seed of a run came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedSource {
    Request,
    Prompt,
    Default,
    Random,
}

impl fmt::Display for SeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SeedSource::Request => "request",
            SeedSource::Prompt => "prompt",
            SeedSource::Default => "default",
            SeedSource::Random => "random",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSeed {
    pub value: u32,
    pub source: SeedSource,
}

impl ResolvedSeed {
    /// Metadata entries recorded on the session context
    pub fn metadata(&self) -> [(String, serde_json::Value); 2] {
        [
            ("seed.effective".to_string(), serde_json::json!(self.value)),
            (
                "seed.source".to_string(),
                serde_json::json!(self.source.to_string()),
            ),
        ]
    }
}

/// Pick the seed for a run: request, then prompt, then configured default, then random.
///
/// A freshly drawn seed is still recorded so the run can be replayed.
pub fn resolve_seed(
    request: Option<u32>,
    prompt: Option<u32>,
    default: Option<u32>,
) -> ResolvedSeed {
    let (value, source) = match (request, prompt, default) {
        (Some(seed), _, _) => (seed, SeedSource::Request),
        (None, Some(seed), _) => (seed, SeedSource::Prompt),
        (None, None, Some(seed)) => (seed, SeedSource::Default),
        (None, None, None) => (rand::random::<u32>(), SeedSource::Random),
    };
    ResolvedSeed { value, source }
}
