//! Fuzzy similarity scoring between a business name and a domain label.
//!
//! The score is a partial, token-order-insensitive ratio in `[0, 100]`:
//! the shorter string is slid across the longer one and the best
//! normalized-Levenshtein alignment wins, taken over both the raw
//! normalized strings and their token-sorted forms. This tolerates
//! substrings (`example` vs `example ltd`), word-order differences, minor
//! misspellings, case, and stray whitespace.

use crate::normalize::normalize_string;

/// Confidence band derived from a fuzzy score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// Score at or above the high cutoff; accept once email is verified.
    High,
    /// Score between the cutoffs; admin review once email is verified.
    Medium,
    /// Score below the medium cutoff; reject outright.
    Low,
}

impl Confidence {
    /// Classifies a score against the configured band cutoffs.
    pub fn classify(score: u8, high_min: u8, medium_min: u8) -> Self {
        if score >= high_min {
            Confidence::High
        } else if score >= medium_min {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

/// Scores the similarity of two strings from 0 to 100.
///
/// Deterministic, and symmetric under the normalization applied to both
/// inputs. Two empty (post-normalization) inputs score 100; one empty input
/// scores 0.
pub fn fuzzy_match_score(a: &str, b: &str) -> u8 {
    let a = normalize_string(a);
    let b = normalize_string(b);

    match (a.is_empty(), b.is_empty()) {
        (true, true) => return 100,
        (true, false) | (false, true) => return 0,
        (false, false) => {}
    }

    let plain = partial_ratio(&a, &b);
    let token_sorted = partial_ratio(&token_sort(&a), &token_sort(&b));
    plain.max(token_sorted)
}

/// Best alignment of the shorter string against every same-length window of
/// the longer string, as a 0-100 ratio.
fn partial_ratio(a: &str, b: &str) -> u8 {
    let (shorter, longer) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let short_len = shorter.chars().count();
    let long_chars: Vec<char> = longer.chars().collect();

    let mut best = strsim::normalized_levenshtein(shorter, longer);
    for start in 0..=(long_chars.len() - short_len) {
        let window: String = long_chars[start..start + short_len].iter().collect();
        let ratio = strsim::normalized_levenshtein(shorter, &window);
        if ratio > best {
            best = ratio;
        }
        if best >= 1.0 {
            break;
        }
    }

    (best * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Sorts whitespace-separated tokens so word order cannot affect the score.
fn token_sort(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_scores_100() {
        assert_eq!(fuzzy_match_score("test", "test"), 100);
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        assert_eq!(fuzzy_match_score("Acme  Widgets", "acme widgets"), 100);
    }

    #[test]
    fn test_substring_scores_high() {
        // Domain label contained in the business name
        assert!(fuzzy_match_score("example", "example ltd") >= 90);
    }

    #[test]
    fn test_token_order_insensitive() {
        let forward = fuzzy_match_score("acme widgets", "widgets acme");
        assert!(forward >= 90, "got {forward}");
    }

    #[test]
    fn test_weak_substring_scores_low() {
        let score = fuzzy_match_score("microsoft", "Expert Solutions");
        assert!(score < 65, "got {score}");
    }

    #[test]
    fn test_symmetric() {
        let ab = fuzzy_match_score("acme widgets", "acmewidgets.co");
        let ba = fuzzy_match_score("acmewidgets.co", "acme widgets");
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(fuzzy_match_score("", ""), 100);
        assert_eq!(fuzzy_match_score("acme", ""), 0);
        assert_eq!(fuzzy_match_score("", "acme"), 0);
    }

    #[test]
    fn test_confidence_bands() {
        assert_eq!(Confidence::classify(90, 90, 65), Confidence::High);
        assert_eq!(Confidence::classify(89, 90, 65), Confidence::Medium);
        assert_eq!(Confidence::classify(65, 90, 65), Confidence::Medium);
        assert_eq!(Confidence::classify(64, 90, 65), Confidence::Low);
    }
}
