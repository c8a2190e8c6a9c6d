//! Pairwise fuzzy similarity over normalized strings.

use serde::{Deserialize, Serialize};
use strsim::levenshtein;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityAlgorithm {
    /// Whole-string edit-distance similarity.
    Ratio,
    /// Best score of the shorter string aligned against any equal-length
    /// window of the longer one; tolerant of abbreviated input.
    PartialRatio,
}

/// Score two normalized strings on a 0-100 scale. An empty side means the
/// comparison has no signal and returns `None` rather than a numeric zero,
/// so absent optional fields never count as strong mismatches.
pub fn score(a: &str, b: &str, algorithm: SimilarityAlgorithm) -> Option<f64> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    Some(match algorithm {
        SimilarityAlgorithm::Ratio => ratio(a, b),
        SimilarityAlgorithm::PartialRatio => partial_ratio(a, b),
    })
}

fn ratio(a: &str, b: &str) -> f64 {
    let total = a.chars().count() + b.chars().count();
    if total == 0 {
        return 100.0;
    }
    let dist = levenshtein(a, b);
    100.0 * (1.0 - dist as f64 / total as f64)
}

fn partial_ratio(a: &str, b: &str) -> f64 {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let long_chars: Vec<char> = long.chars().collect();
    let short_len = short.chars().count();
    if short_len == long_chars.len() {
        return ratio(short, long);
    }
    let mut best = 0.0f64;
    for window in long_chars.windows(short_len) {
        let candidate: String = window.iter().collect();
        let r = ratio(short, &candidate);
        if r > best {
            best = r;
        }
        if best >= 100.0 {
            break;
        }
    }
    best
}

/// Name score between two records: the maximum over all cross-pairs of name
/// fields, so an alias/DBA on either side may match the other side's legal
/// name. Pairs without signal are excluded; `None` when no pair had any.
pub fn name_score(
    names_a: &[&str],
    names_b: &[&str],
    algorithm: SimilarityAlgorithm,
) -> Option<f64> {
    let mut best: Option<f64> = None;
    for a in names_a {
        for b in names_b {
            if let Some(s) = score(a, b, algorithm) {
                best = Some(match best {
                    Some(prev) if prev >= s => prev,
                    _ => s,
                });
            }
        }
    }
    best
}
