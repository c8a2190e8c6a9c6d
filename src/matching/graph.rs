//! Build-time match graph: for every canonical entity, the set of entities
//! judged to be the same business under the dual-threshold policy.

use rayon::prelude::*;

use crate::matching::{score_entity, MatchPolicy};
use crate::metrics::memory_stats_mb;
use crate::models::CanonicalEntity;

/// Adjacency rows indexed by `company_id`. Each row starts with the entity's
/// own id (the self-loop is mandatory even for entities whose fields carry no
/// signal) followed by matched ids in ascending order. Edges are neither
/// symmetrized nor transitively closed; a chain A-B-C implies no A-C edge.
pub fn build_match_graph(entities: &[CanonicalEntity], policy: &MatchPolicy) -> Vec<Vec<i64>> {
    let n = entities.len();
    log::info!(
        "match graph: scoring {} x {} entity pairs (threshold={}, avg_threshold={})",
        n,
        n,
        policy.threshold,
        policy.avg_threshold
    );

    // Each row depends only on read-only comparisons against the full table,
    // so rows are computed independently and merged by concatenation.
    let adjacency: Vec<Vec<i64>> = entities
        .par_iter()
        .map(|entity| {
            let names = entity.name_fields();
            let mut row = vec![entity.company_id];
            for candidate in entities {
                if candidate.company_id == entity.company_id {
                    continue;
                }
                let scores = score_entity(&names, &entity.address, candidate, policy);
                if policy.accepts(&scores) {
                    row.push(candidate.company_id);
                }
            }
            row
        })
        .collect();

    let edges: usize = adjacency.iter().map(Vec::len).sum();
    let mem = memory_stats_mb();
    log::info!(
        "match graph: {} edges over {} entities (mem used: {} MB, avail: {} MB)",
        edges,
        n,
        mem.used_mb,
        mem.avail_mb
    );
    adjacency
}
