//! Matching policy: pairwise scores and the dual-threshold decision used by
//! both the build-time graph pass and query-time resolution.

use serde::{Deserialize, Serialize};

use crate::models::CanonicalEntity;

pub mod graph;
pub mod similarity;

pub use similarity::{name_score, score, SimilarityAlgorithm};

/// Thresholds plus the algorithm choice per role. The build default scores
/// with the strict whole-string ratio as primary; the query default swaps in
/// the substring-tolerant partial ratio to absorb abbreviated user input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MatchPolicy {
    pub threshold: f64,
    pub avg_threshold: f64,
    pub primary: SimilarityAlgorithm,
    pub secondary: SimilarityAlgorithm,
}

impl MatchPolicy {
    pub const DEFAULT_THRESHOLD: f64 = 95.0;
    pub const DEFAULT_AVG_THRESHOLD: f64 = 80.0;

    /// Policy for the index-build scoring pass.
    pub fn build_default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            avg_threshold: Self::DEFAULT_AVG_THRESHOLD,
            primary: SimilarityAlgorithm::Ratio,
            secondary: SimilarityAlgorithm::PartialRatio,
        }
    }

    /// Lenient policy for query-time lookup.
    pub fn query_default() -> Self {
        Self {
            primary: SimilarityAlgorithm::PartialRatio,
            ..Self::build_default()
        }
    }

    pub fn with_thresholds(mut self, threshold: f64, avg_threshold: f64) -> Self {
        self.threshold = threshold;
        self.avg_threshold = avg_threshold;
        self
    }

    /// The OR-of-two-rules test: either a confident primary name match with
    /// no contradicting address signal, or a moderately confident combined
    /// secondary match. NoSignal scores are excluded from the average, never
    /// coerced to zero.
    pub fn accepts(&self, scores: &PairScores) -> bool {
        let name_rule = scores.name_primary.is_some_and(|s| s >= self.threshold)
            && scores.addr_primary.map_or(true, |s| s >= self.threshold);
        if name_rule {
            return true;
        }
        let Some(avg) = scores.secondary_avg() else {
            return false;
        };
        avg >= self.avg_threshold
            && (scores.name_secondary.is_some_and(|s| s >= self.threshold)
                || scores.addr_secondary.is_some_and(|s| s >= self.threshold))
    }
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self::build_default()
    }
}

/// Name and address scores under both algorithms for one candidate pair.
/// `None` marks a comparison with no data on at least one side.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairScores {
    pub name_primary: Option<f64>,
    pub name_secondary: Option<f64>,
    pub addr_primary: Option<f64>,
    pub addr_secondary: Option<f64>,
}

impl PairScores {
    /// Mean of the secondary name/address scores over present values only.
    pub fn secondary_avg(&self) -> Option<f64> {
        let present: Vec<f64> = [self.name_secondary, self.addr_secondary]
            .into_iter()
            .flatten()
            .collect();
        if present.is_empty() {
            None
        } else {
            Some(present.iter().sum::<f64>() / present.len() as f64)
        }
    }
}

/// Score a (names, address) probe against one canonical entity under both of
/// the policy's algorithms. Shared by the graph builder and the resolver.
pub fn score_entity(
    names: &[&str],
    address: &str,
    entity: &CanonicalEntity,
    policy: &MatchPolicy,
) -> PairScores {
    let candidate_names = entity.name_fields();
    PairScores {
        name_primary: name_score(names, &candidate_names, policy.primary),
        name_secondary: name_score(names, &candidate_names, policy.secondary),
        addr_primary: score(address, &entity.address, policy.primary),
        addr_secondary: score(address, &entity.address, policy.secondary),
    }
}
