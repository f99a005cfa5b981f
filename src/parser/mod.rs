//! Prompt-to-transform compiler
//!
//! Turns free text such as `"add blur and rotate 15 degrees"` into an ordered
//! [`TransformPipelineSpec`]. Matching is closed and rule driven: phrases from
//! [`rules::PHRASE_RULES`] are matched most-specific-first without overlap, each
//! match reads its parameters from the part of its clause it owns, and leftover
//! keyword-like words lower the confidence and produce suggestions.

pub mod extract;
pub mod rules;
pub mod suggest;

#[cfg(test)]
mod tests;

use crate::error::{AugmentError, ErrorCode, Result};
use crate::transform::{TransformId, TransformPipelineSpec, TransformSpec};
use extract::{Window, SEED};
use once_cell::sync::Lazy;
use regex::Regex;
use rules::{catalog_phrases, rules_by_specificity, PhraseRule};
use std::collections::HashSet;
use std::ops::Range;

/// Suggestions offered per unrecognized term
const SUGGESTIONS_PER_TERM: usize = 3;

static TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{N}][\p{L}\p{N}.%'-]*").expect("Invalid regex pattern"));
static CLAUSE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,;!?]|\.(?:\s|$)|\band\b|\bthen\b").expect("Invalid regex pattern"));
static NUMERIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?\d+(?:\.\d+)?%?$|^\d+[x×]\d+$").expect("Invalid regex pattern")
});

/// Words that carry no transform meaning and never count against confidence
const STOPWORDS: &[&str] = &[
    "add", "adding", "and", "apply", "applied", "the", "with", "some", "please", "image",
    "images", "photo", "photos", "picture", "pictures", "make", "its", "bit", "then", "also",
    "degrees", "degree", "deg", "percent", "pixels", "pixel", "increase", "decrease", "reduce",
    "seed", "probability", "chance", "half", "time", "times", "more", "less", "slight",
    "slightly", "subtle", "subtly", "light", "lightly", "little", "mild", "mildly", "gentle",
    "small", "strong", "strongly", "heavy", "heavily", "intense", "very", "extreme",
    "extremely", "lots", "significant", "much", "clockwise", "counterclockwise",
    "counter-clockwise", "anticlockwise", "anti-clockwise", "ccw", "left", "right", "random",
    "randomly", "for", "from", "into", "this", "that", "effect", "filter", "amount", "level",
    "around", "about", "approximately", "between", "just", "only", "but", "size",
];

/// A phrase occurrence accepted by the matcher
#[derive(Debug, Clone)]
struct PhraseMatch {
    range: Range<usize>,
    rule: &'static PhraseRule,
}

/// Compiles prompts against the phrase table, optionally restricted to some transforms
#[derive(Debug, Clone, Default)]
pub struct PromptParser {
    available: Option<Vec<TransformId>>,
}

impl PromptParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only rules producing one of `available` participate
    pub fn with_available(available: Vec<TransformId>) -> Self {
        Self {
            available: Some(available),
        }
    }

    pub fn parse(&self, text: &str) -> Result<TransformPipelineSpec> {
        parse(text, self.available.as_deref())
    }
}

/// Parse `text` into a pipeline spec.
///
/// Fails with a parse error when the text is blank or no phrase matches; the
/// error always carries at least one suggestion.
pub fn parse(text: &str, available: Option<&[TransformId]>) -> Result<TransformPipelineSpec> {
    let catalog = catalog_phrases(available);

    if text.trim().is_empty() {
        return Err(AugmentError::parse_with_code(
            ErrorCode::PARSE_EMPTY_PROMPT,
            "Prompt is empty",
            fallback_suggestions(&catalog),
        ));
    }

    let lower = text.to_lowercase();
    let matches = find_matches(&lower, available);
    let mut warnings = Vec::new();
    let mut suggestions: Vec<String> = Vec::new();

    // Token accounting for confidence and unrecognized-term warnings
    let mut matched_weight = 0usize;
    let mut unmatched_weight = 0usize;
    let mut reported = HashSet::new();
    for token in tokens(&lower) {
        if matches.iter().any(|m| contains(&m.range, &token.range)) {
            matched_weight += 1;
            continue;
        }
        if !is_keyword_like(token.text) {
            continue;
        }
        unmatched_weight += 1;
        if !reported.insert(token.text) {
            continue;
        }
        let term_suggestions = suggest::suggest(token.text, &catalog, SUGGESTIONS_PER_TERM);
        if term_suggestions.is_empty() {
            warnings.push(format!("Unrecognized term '{}'", token.text));
        } else {
            warnings.push(format!(
                "Unrecognized term '{}' (did you mean: {}?)",
                token.text,
                term_suggestions.join(", ")
            ));
        }
        for s in term_suggestions {
            if !suggestions.contains(&s) {
                suggestions.push(s);
            }
        }
    }

    if matches.is_empty() {
        if suggestions.is_empty() {
            suggestions = fallback_suggestions(&catalog);
        }
        return Err(AugmentError::parse_with_code(
            ErrorCode::PARSE_NO_MATCH,
            format!("No recognizable transforms in '{}'", preview(text)),
            suggestions,
        ));
    }

    let seed = extract_seed(&lower, &mut warnings);
    let transforms = build_transforms(&lower, &matches, &mut warnings);
    let confidence = confidence(matched_weight, unmatched_weight);

    tracing::debug!(
        transforms = transforms.len(),
        confidence,
        warnings = warnings.len(),
        "Parsed prompt"
    );

    Ok(TransformPipelineSpec {
        source_prompt: text.to_string(),
        transforms,
        confidence,
        warnings,
        suggestions,
        seed,
    })
}

/// `matched / (matched + unmatched)`, 0.0 when nothing was counted
pub fn confidence(matched: usize, unmatched: usize) -> f64 {
    let total = matched + unmatched;
    if total == 0 {
        return 0.0;
    }
    (matched as f64 / total as f64).clamp(0.0, 1.0)
}

fn find_matches(lower: &str, available: Option<&[TransformId]>) -> Vec<PhraseMatch> {
    let mut accepted: Vec<PhraseMatch> = Vec::new();
    for rule in rules_by_specificity(available) {
        for m in rule.pattern.find_iter(lower) {
            let range = m.range();
            if accepted.iter().any(|a| overlaps(&a.range, &range)) {
                continue;
            }
            accepted.push(PhraseMatch { range, rule });
        }
    }
    accepted.sort_by_key(|m| m.range.start);
    accepted
}

fn build_transforms(
    lower: &str,
    matches: &[PhraseMatch],
    warnings: &mut Vec<String>,
) -> Vec<TransformSpec> {
    let breaks: Vec<Range<usize>> = CLAUSE_BREAK
        .find_iter(lower)
        .map(|m| m.range())
        .filter(|r| !matches.iter().any(|m| overlaps(&m.range, r)))
        .collect();

    let mut transforms: Vec<TransformSpec> = Vec::new();
    for (i, m) in matches.iter().enumerate() {
        let window = Window::new(&window_text(lower, matches, i, &breaks));
        let parameters = (m.rule.extractor)(&window);
        let probability = window.probability();
        if let Some(requested) = window.requested_probability() {
            warnings.push(format!(
                "Probability {} for {} is outside [0, 1] and was clamped to {}",
                requested,
                m.rule.phrase,
                probability.unwrap_or(1.0)
            ));
        }

        match transforms
            .iter_mut()
            .find(|t| t.transform_id == m.rule.transform_id)
        {
            Some(existing) => {
                for (key, value) in parameters {
                    existing.parameters.entry(key).or_insert(value);
                }
                // First explicit probability wins
                if let Some(p) = probability {
                    if existing.probability == 1.0 {
                        existing.probability = p;
                    }
                }
            }
            None => {
                let mut spec = TransformSpec::new(m.rule.transform_id, transforms.len());
                spec.parameters = parameters;
                spec.probability = probability.unwrap_or(1.0);
                transforms.push(spec);
            }
        }
    }

    for spec in &mut transforms {
        if spec.transform_id == TransformId::RandomBrightnessContrast {
            for key in ["brightness_limit", "contrast_limit"] {
                spec.parameters
                    .entry(key.to_string())
                    .or_insert(serde_json::json!(0.0));
            }
        }
    }
    transforms
}

/// Modifier text owned by match `i`.
///
/// Every gap of a clause belongs to exactly one match: the gap after a match is
/// its own, and the gap before the first match of a clause goes to that match.
/// So "rotate strong blur" gives `strong` to the rotation only. The matched
/// phrase itself is left out so it cannot feed its own extractor.
fn window_text(lower: &str, matches: &[PhraseMatch], i: usize, breaks: &[Range<usize>]) -> String {
    let current = &matches[i].range;
    let clause_start = breaks
        .iter()
        .filter(|b| b.end <= current.start)
        .map(|b| b.end)
        .max()
        .unwrap_or(0);
    let clause_end = breaks
        .iter()
        .filter(|b| b.start >= current.end)
        .map(|b| b.start)
        .min()
        .unwrap_or(lower.len());

    let first_in_clause = i == 0 || matches[i - 1].range.end <= clause_start;
    let leading = if first_in_clause {
        &lower[clause_start..current.start]
    } else {
        ""
    };
    let end = matches
        .get(i + 1)
        .map_or(clause_end, |next| next.range.start.min(clause_end));

    format!("{} {}", leading, &lower[current.end..end])
}

fn extract_seed(lower: &str, warnings: &mut Vec<String>) -> Option<u32> {
    let caps = SEED.captures(lower)?;
    let digits = &caps[1];
    match digits.parse::<u32>() {
        Ok(seed) => Some(seed),
        Err(_) => {
            warnings.push(format!(
                "Seed {} is out of range (0..={}) and was ignored",
                digits,
                u32::MAX
            ));
            None
        }
    }
}

struct Token<'a> {
    text: &'a str,
    range: Range<usize>,
}

fn tokens(lower: &str) -> impl Iterator<Item = Token<'_>> {
    TOKEN.find_iter(lower).map(|m| {
        let text = m.as_str().trim_end_matches(['.', '-', '\'']);
        Token {
            text,
            range: m.start()..m.start() + text.len(),
        }
    })
}

fn is_keyword_like(token: &str) -> bool {
    token.chars().count() >= 3 && !NUMERIC.is_match(token) && !STOPWORDS.contains(&token)
}

fn fallback_suggestions(catalog: &[&'static str]) -> Vec<String> {
    let source: Vec<&str> = if catalog.is_empty() {
        catalog_phrases(None)
    } else {
        catalog.to_vec()
    };
    source
        .into_iter()
        .take(SUGGESTIONS_PER_TERM)
        .map(String::from)
        .collect()
}

fn preview(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() > 60 {
        format!("{}...", trimmed.chars().take(60).collect::<String>())
    } else {
        trimmed.to_string()
    }
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

fn contains(outer: &Range<usize>, inner: &Range<usize>) -> bool {
    outer.start <= inner.start && inner.end <= outer.end
}
