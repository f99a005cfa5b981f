//! Pre-parse sanitation of raw prompt text

use crate::error::{AugmentError, ErrorCode, Result};
use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};
use serde::Serialize;
use unicode_normalization::UnicodeNormalization;

static SUSPICIOUS_PATTERNS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"(?is)<script[^>]*>",
        r"(?i)javascript:",
        r"(?i)data:text/html",
        r"(?i)vbscript:",
        r"(?i)file://",
        r"\\\\",
        r"\.\./",
        r"\.\.\\",
    ])
    .expect("Invalid regex pattern")
});

// Regex-shaped text such as `(a+)+` or `(.*)*`
static NESTED_QUANTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^()]*[+*]\)\s*[+*{]").expect("Invalid regex pattern"));

/// Word count above which parsing accuracy degrades
const LONG_PROMPT_WORDS: usize = 100;
const MAX_PUNCTUATION_RATIO: f64 = 0.3;
/// Longest run of one repeated character before the prompt is flagged
const MAX_CHAR_RUN: usize = 32;

/// Outcome of a successful prompt check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptCheck {
    pub sanitized: String,
    pub word_count: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct PromptGuard {
    max_length: usize,
}

impl PromptGuard {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    /// Reject oversized or suspicious prompts; flag odd-looking ones.
    ///
    /// Blank prompts pass through so the parser can report them.
    pub fn check(&self, prompt: &str) -> Result<PromptCheck> {
        let length = prompt.chars().count();
        if length > self.max_length {
            return Err(AugmentError::validation_with_code(
                ErrorCode::VALIDATION_PROMPT_TOO_LONG,
                format!(
                    "Prompt too long: {} characters (max: {})",
                    length, self.max_length
                ),
                Some("prompt".to_string()),
            ));
        }

        if prompt.contains('\0') {
            return Err(suspicious("Prompt contains null bytes"));
        }

        // Compatibility forms (fullwidth letters, ligatures) fold to plain text first
        let normalized: String = prompt.nfkc().collect();
        if SUSPICIOUS_PATTERNS.is_match(&normalized) {
            return Err(suspicious("Prompt contains a potentially unsafe pattern"));
        }

        let mut warnings = Vec::new();
        let non_printable = normalized
            .chars()
            .filter(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
            .count();
        if non_printable > 0 {
            warnings.push(format!(
                "Prompt contains {} non-printable characters",
                non_printable
            ));
        }

        let sanitized = normalized.trim().to_string();
        let word_count = sanitized.split_whitespace().count();
        if word_count > LONG_PROMPT_WORDS {
            warnings.push("Very long prompt may impact parsing accuracy".to_string());
        }

        if NESTED_QUANTIFIER.is_match(&sanitized) || longest_char_run(&sanitized) > MAX_CHAR_RUN {
            warnings.push("Prompt contains repetitive or regex-like patterns".to_string());
        }

        let visible = sanitized.chars().filter(|c| !c.is_whitespace()).count();
        if visible > 0 {
            let punctuation = sanitized
                .chars()
                .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
                .count();
            if punctuation as f64 / sanitized.chars().count() as f64 > MAX_PUNCTUATION_RATIO {
                warnings.push("High punctuation ratio may impact parsing".to_string());
            }
        }

        Ok(PromptCheck {
            sanitized,
            word_count,
            warnings,
        })
    }
}

impl Default for PromptGuard {
    fn default() -> Self {
        Self::new(crate::config::Limits::default().max_prompt_length)
    }
}

fn longest_char_run(text: &str) -> usize {
    let mut longest = 0;
    let mut run = 0;
    let mut previous = None;
    for c in text.chars() {
        run = if previous == Some(c) { run + 1 } else { 1 };
        longest = longest.max(run);
        previous = Some(c);
    }
    longest
}

fn suspicious(message: &str) -> AugmentError {
    AugmentError::validation_with_code(
        ErrorCode::VALIDATION_SUSPICIOUS_INPUT,
        message,
        Some("prompt".to_string()),
    )
}
