//! String normalization and light-weight input validation.
//!
//! Everything the pipeline compares (emails, websites, business names) goes
//! through [`normalize_string`] first so that case, stray whitespace, and
//! diacritics never affect a match outcome.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Punctuation trimmed from the ends of user-supplied values.
const EDGE_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '/', '\\', '@'];

/// Normalizes a string: trim, lowercase, collapse internal whitespace to
/// single spaces, trim edge punctuation, and strip diacritics (NFD, drop
/// combining marks, recompose NFC).
///
/// Idempotent: `normalize_string(&normalize_string(x)) == normalize_string(x)`.
pub fn normalize_string(value: &str) -> String {
    let lowered = value.trim().to_lowercase();

    // Collapse runs of whitespace
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");

    let trimmed = collapsed
        .trim()
        .trim_matches(|c: char| EDGE_PUNCTUATION.contains(&c))
        .trim();

    // Strip accents: decompose, drop combining marks, recompose
    trimmed
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .nfc()
        .collect()
}

/// Removes all whitespace, including internal whitespace.
pub fn remove_all_whitespace(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

/// True if every given value is present and non-blank.
pub fn all_populated(values: &[Option<&str>]) -> bool {
    values
        .iter()
        .all(|v| v.is_some_and(|s| !s.trim().is_empty()))
}

/// Structural email address check: one local part, one host, split on the
/// last `@`. Deliverability is not our concern; domain-level validation
/// happens later against the public suffix rules.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, host)) = email.rsplit_once('@') else {
        return false;
    };
    !local.is_empty()
        && !host.is_empty()
        && !local.chars().any(char::is_whitespace)
        && !host.chars().any(char::is_whitespace)
}
