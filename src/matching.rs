// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rampline Labs

//! # Name Matching
//!
//! Fuzzy comparison of holder names reported by different KYC providers
//! (e.g. the Aadhaar name vs the PAN name). Names are normalized, compared
//! by Levenshtein distance, and scored as
//! `similarity = (max_len - distance) / max_len`.
//!
//! One threshold pair applies everywhere: ≥ 0.80 is a match, ≥ 0.90 is a
//! high-confidence match.

/// Minimum similarity to accept two names as the same person.
pub const MATCH_THRESHOLD: f64 = 0.80;

/// Similarity at or above which a match is reported as high confidence.
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.90;

/// Outcome of comparing two holder names.
#[derive(Debug, Clone, PartialEq)]
pub struct NameMatchResult {
    pub similarity: f64,
    pub matched: bool,
    pub high_confidence: bool,
}

/// Lowercase, drop everything but letters and spaces, collapse whitespace.
pub fn normalize_name(name: &str) -> String {
    let lowered: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphabetic() { c } else { ' ' })
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Levenshtein distance over chars, single-row dynamic programming.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut prev_diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev_diagonal + usize::from(ca != cb);
            prev_diagonal = row[j + 1];
            row[j + 1] = substitution.min(row[j] + 1).min(prev_diagonal + 1);
        }
    }
    row[b.len()]
}

/// Similarity of two names after normalization, in `[0.0, 1.0]`.
///
/// Two empty (or all-punctuation) names compare as identical.
pub fn similarity(left: &str, right: &str) -> f64 {
    let left = normalize_name(left);
    let right = normalize_name(right);
    let max_len = left.chars().count().max(right.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let distance = levenshtein(&left, &right);
    (max_len - distance) as f64 / max_len as f64
}

/// Compare two names against the documented thresholds.
pub fn match_names(left: &str, right: &str) -> NameMatchResult {
    let similarity = similarity(left, right);
    NameMatchResult {
        similarity,
        matched: similarity >= MATCH_THRESHOLD,
        high_confidence: similarity >= HIGH_CONFIDENCE_THRESHOLD,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_punctuation_and_collapses_spaces() {
        assert_eq!(normalize_name("  John   DOE "), "john doe");
        assert_eq!(normalize_name("John-Doe Jr."), "john doe jr");
        assert_eq!(normalize_name("O'Brien"), "o brien");
    }

    #[test]
    fn identical_after_normalization_scores_one() {
        assert_eq!(similarity("John Doe", "john   doe"), 1.0);
        assert_eq!(similarity("RAVI KUMAR", "ravi kumar"), 1.0);
    }

    #[test]
    fn unrelated_names_score_low() {
        assert!(similarity("John Doe", "Jane Smith") < 0.5);
    }

    #[test]
    fn minor_variation_still_matches() {
        let result = match_names("Ravi Kumar Sharma", "Ravi Kumar Sharm");
        assert!(result.matched);
        assert!(result.high_confidence);
    }

    #[test]
    fn threshold_boundaries() {
        // "abcde" vs "abcdx": distance 1 over len 5 → 0.8, exactly a match.
        let result = match_names("abcde", "abcdx");
        assert!((result.similarity - 0.8).abs() < f64::EPSILON);
        assert!(result.matched);
        assert!(!result.high_confidence);
    }

    #[test]
    fn empty_names_compare_equal() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("...", "---"), 1.0);
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", "abc"), 0);
    }
}
