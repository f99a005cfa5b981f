//! Nearest-phrase suggestions for unrecognized prompt terms

use strsim::normalized_levenshtein;

/// Minimum similarity for a phrase to be offered for an unrecognized term
pub const MIN_SIMILARITY: f64 = 0.3;

/// Similarity of `term` to `phrase`: best of the whole phrase and each of its words
pub fn phrase_similarity(term: &str, phrase: &str) -> f64 {
    phrase
        .split_whitespace()
        .map(|word| normalized_levenshtein(term, word))
        .fold(normalized_levenshtein(term, phrase), f64::max)
}

/// Up to `limit` phrases closest to `term`, most similar first, ties alphabetical
pub fn suggest(term: &str, phrases: &[&'static str], limit: usize) -> Vec<String> {
    let mut scored: Vec<(f64, &'static str)> = phrases
        .iter()
        .map(|phrase| (phrase_similarity(term, phrase), *phrase))
        .filter(|(score, _)| *score >= MIN_SIMILARITY)
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored.dedup_by(|a, b| a.1 == b.1);
    scored
        .into_iter()
        .take(limit)
        .map(|(_, phrase)| phrase.to_string())
        .collect()
}
