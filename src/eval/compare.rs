//! Screenshot similarity comparison.
//!
//! Compares two data-URI-encoded screenshots for (near-)equality. This is
//! a deliberate placeholder: identical payloads score 100, otherwise a
//! position-wise character-match ratio over the encoded text decides
//! between 100 and 0. True perceptual diffing (pixel or structural
//! similarity) is a known improvement area; changing the algorithm means
//! re-specifying the threshold below, not silently swapping it out.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Match ratio above which two non-identical payloads still count as equal.
pub const SIMILARITY_THRESHOLD: f64 = 0.95;

/// Result of comparing two screenshots.
#[derive(Debug, Clone, Serialize)]
pub struct CompareOutcome {
    /// 100 for a match, 0 otherwise.
    pub score: u32,
    /// Whether the screenshots were judged equal.
    pub success: bool,
}

fn data_uri_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^data:image/[a-z]+;base64,").expect("valid regex"))
}

/// Strips the data-URI prefix, leaving the base64 payload.
fn strip_prefix(data_uri: &str) -> &str {
    match data_uri_prefix().find(data_uri) {
        Some(m) => &data_uri[m.end()..],
        None => data_uri,
    }
}

/// Position-wise character-match ratio between two strings, relative to
/// the longer one. Two empty strings are a perfect match.
pub fn char_match_ratio(a: &str, b: &str) -> f64 {
    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 1.0;
    }

    let matches = a
        .bytes()
        .zip(b.bytes())
        .filter(|(x, y)| x == y)
        .count();

    matches as f64 / max_len as f64
}

/// Compares two data-URI-encoded screenshots.
///
/// Byte-identical payloads score 100 immediately; otherwise the match
/// ratio must exceed [`SIMILARITY_THRESHOLD`] to score 100, and anything
/// below scores 0.
pub fn compare_data_uris(baseline: &str, candidate: &str) -> CompareOutcome {
    let a = strip_prefix(baseline);
    let b = strip_prefix(candidate);

    let score = if a == b {
        100
    } else if char_match_ratio(a, b) > SIMILARITY_THRESHOLD {
        100
    } else {
        0
    };

    CompareOutcome {
        score,
        success: score == 100,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_data_uris_match() {
        let uri = "data:image/png;base64,aGVsbG8gd29ybGQ=";
        let outcome = compare_data_uris(uri, uri);
        assert_eq!(outcome.score, 100);
        assert!(outcome.success);
    }

    #[test]
    fn test_prefix_is_ignored() {
        let a = "data:image/png;base64,aGVsbG8=";
        let b = "data:image/jpeg;base64,aGVsbG8=";
        assert_eq!(compare_data_uris(a, b).score, 100);
    }

    #[test]
    fn test_long_shared_prefix_below_threshold_scores_zero() {
        // 19 of 20 positions match: ratio 0.95 is not strictly above the
        // threshold, so the comparison fails.
        let base = "A".repeat(19);
        let a = format!("data:image/png;base64,{}B", base);
        let b = format!("data:image/png;base64,{}C", base);
        let outcome = compare_data_uris(&a, &b);
        assert_eq!(outcome.score, 0);
        assert!(!outcome.success);
    }

    #[test]
    fn test_ratio_above_threshold_scores_full() {
        // 99 of 100 positions match: 0.99 clears the threshold.
        let base = "A".repeat(99);
        let a = format!("data:image/png;base64,{}B", base);
        let b = format!("data:image/png;base64,{}C", base);
        assert_eq!(compare_data_uris(&a, &b).score, 100);
    }

    #[test]
    fn test_disjoint_payloads_score_zero() {
        let outcome = compare_data_uris(
            "data:image/png;base64,AAAA",
            "data:image/png;base64,BBBB",
        );
        assert_eq!(outcome.score, 0);
    }

    #[test]
    fn test_char_match_ratio_empty_inputs() {
        assert_eq!(char_match_ratio("", ""), 1.0);
        assert_eq!(char_match_ratio("abc", ""), 0.0);
    }

    #[test]
    fn test_char_match_ratio_length_mismatch_penalized() {
        // Shared prefix, but the extra tail counts against the ratio.
        assert!(char_match_ratio("aaaa", "aaaaaaaa") < 0.95);
    }
}
