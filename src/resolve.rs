//! Query-time lookup: expand a free-text name/address into every raw record,
//! across every dataset, believed to belong to the same business.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::matching::{score_entity, MatchPolicy};
use crate::models::FactRow;
use crate::normalize::normalize;
use crate::snapshot::Snapshot;

/// Rows projected out of one dataset's fact table for a query.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolvedRecords {
    pub columns: Vec<String>,
    pub rows: Vec<FactRow>,
}

/// Resolve a query against a snapshot. Names and address are raw user text;
/// they are normalized here with the same transform the index used.
///
/// A query whose names all normalize to empty is a caller error and yields
/// an empty mapping, as does a query matching nothing. Matches found by
/// scoring are expanded exactly one hop through the precomputed adjacency;
/// no transitive closure is applied.
pub fn resolve(
    snapshot: &Snapshot,
    names: &[String],
    address: &str,
    policy: &MatchPolicy,
) -> BTreeMap<String, ResolvedRecords> {
    let normalized_names: Vec<String> = names
        .iter()
        .map(|n| normalize(n))
        .filter(|n| !n.trim().is_empty())
        .collect();
    if normalized_names.is_empty() {
        log::debug!("resolve: blank name query, returning empty result");
        return BTreeMap::new();
    }
    let name_refs: Vec<&str> = normalized_names.iter().map(String::as_str).collect();
    let normalized_address = normalize(address);

    // Initial match set: every canonical entity the query scores into.
    let mut matched: BTreeSet<i64> = BTreeSet::new();
    for entity in &snapshot.entities {
        let scores = score_entity(&name_refs, &normalized_address, entity, policy);
        if policy.accepts(&scores) {
            matched.insert(entity.company_id);
        }
    }

    // One-hop expansion through the match graph.
    let mut expanded = matched.clone();
    for &id in &matched {
        expanded.extend(snapshot.neighbors(id).iter().copied());
    }
    log::debug!(
        "resolve: {} direct matches, {} after one-hop expansion",
        matched.len(),
        expanded.len()
    );

    // Union the back-references and group raw row indices per dataset.
    let mut row_sets: BTreeMap<&str, BTreeSet<usize>> = BTreeMap::new();
    for &id in &expanded {
        let Some(entity) = snapshot.entity(id) else {
            continue;
        };
        for source in &entity.sources {
            row_sets
                .entry(source.dataset.as_str())
                .or_default()
                .insert(source.row);
        }
    }

    // Project the grouped rows out of each dataset's fact table.
    let mut results = BTreeMap::new();
    for (tag, rows) in row_sets {
        let Some(fact) = snapshot.facts.get(tag) else {
            continue;
        };
        let records = ResolvedRecords {
            columns: fact.columns.clone(),
            rows: rows
                .into_iter()
                .filter_map(|i| fact.rows.get(i).cloned())
                .collect(),
        };
        if !records.rows.is_empty() {
            results.insert(tag.to_string(), records);
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NamedDataset, RawTable};
    use crate::snapshot::build;
    use serde_json::json;

    fn dataset(tag: &str, rows: Vec<(&str, &str)>) -> NamedDataset {
        NamedDataset {
            tag: tag.into(),
            table: RawTable {
                columns: vec!["NAME1".into(), "ADDRESS".into()],
                rows: rows
                    .into_iter()
                    .map(|(n, a)| vec![json!(n), json!(a)])
                    .collect(),
            },
            name_columns: vec!["NAME1".into()],
            address_column: "ADDRESS".into(),
        }
    }

    fn acme_snapshot() -> Snapshot {
        let a = dataset(
            "REGISTRY",
            vec![
                ("Acme Construction Inc", "10 Main St, Queens NY"),
                ("Borough Builders LLC", "99 Other Ave, Bronx NY"),
            ],
        );
        let b = dataset(
            "WAGE_THEFT",
            vec![("ACME CONSTRUCTION", "10 main st queens ny")],
        );
        build(&[a, b], &MatchPolicy::build_default()).unwrap()
    }

    #[test]
    fn test_exact_key_returns_full_backref_set() {
        let a = dataset("REGISTRY", vec![("Acme Construction", "10 Main St")]);
        let b = dataset("DEBARMENT", vec![("acme construction", "10 main st")]);
        let snap = build(&[a, b], &MatchPolicy::build_default()).unwrap();
        assert_eq!(snap.entities.len(), 1);

        let out = resolve(
            &snap,
            &["Acme Construction".to_string()],
            "10 Main St",
            &MatchPolicy::query_default(),
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out["REGISTRY"].rows.len(), 1);
        assert_eq!(out["DEBARMENT"].rows.len(), 1);
    }

    #[test]
    fn test_blank_name_is_empty_result() {
        let snap = acme_snapshot();
        let out = resolve(
            &snap,
            &["   ".to_string(), "".to_string()],
            "10 Main St",
            &MatchPolicy::query_default(),
        );
        assert!(out.is_empty());
        let out = resolve(&snap, &[], "", &MatchPolicy::query_default());
        assert!(out.is_empty());
    }

    #[test]
    fn test_no_signal_query_is_empty_result() {
        let snap = acme_snapshot();
        let out = resolve(
            &snap,
            &["zzzzqqqq plumbing".to_string()],
            "1 nowhere ln",
            &MatchPolicy::query_default(),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_end_to_end_acme_scenario() {
        // Two distinct entities (punctuation differs) linked by a match edge.
        let snap = acme_snapshot();
        assert_eq!(snap.entities.len(), 3);
        assert!(snap.neighbors(0).contains(&2) || snap.neighbors(2).contains(&0));

        let out = resolve(
            &snap,
            &["Acme Construction".to_string()],
            "10 Main St Queens NY",
            &MatchPolicy::query_default(),
        );
        assert!(out.contains_key("REGISTRY"), "missing registry rows: {out:?}");
        assert!(out.contains_key("WAGE_THEFT"), "missing wage theft rows: {out:?}");
        assert!(!out["REGISTRY"]
            .rows
            .iter()
            .any(|r| r.values[0] == json!("Borough Builders LLC")));
    }

    #[test]
    fn test_lower_thresholds_only_add_results() {
        let snap = acme_snapshot();
        let strict = resolve(
            &snap,
            &["Acme Construction".to_string()],
            "",
            &MatchPolicy::query_default(),
        );
        let loose = resolve(
            &snap,
            &["Acme Construction".to_string()],
            "",
            &MatchPolicy::query_default().with_thresholds(80.0, 60.0),
        );
        for (tag, records) in &strict {
            let loose_rows = &loose[tag];
            for row in &records.rows {
                assert!(loose_rows
                    .rows
                    .iter()
                    .any(|r| r.company_id == row.company_id && r.values == row.values));
            }
        }
    }

    #[test]
    fn test_expansion_is_one_hop_only() {
        // Chain A-B-C: A links to B under the name rule, B links to C under
        // the average rule, and no A-C edge exists.
        let a = dataset(
            "REGISTRY",
            vec![
                ("acme construction inc", ""),
                ("acme construction incc", ""),
                ("construction incc", ""),
            ],
        );
        let snap = build(&[a], &MatchPolicy::build_default()).unwrap();
        assert!(snap.neighbors(0).contains(&1));
        assert!(snap.neighbors(1).contains(&2));
        assert!(!snap.neighbors(0).contains(&2));

        // Exact-only scoring so the initial match set is just A; B arrives
        // via the one-hop expansion and C stays out.
        let exact = MatchPolicy {
            threshold: 100.0,
            avg_threshold: 100.0,
            primary: crate::matching::SimilarityAlgorithm::Ratio,
            secondary: crate::matching::SimilarityAlgorithm::Ratio,
        };
        let out = resolve(&snap, &["acme construction inc".to_string()], "", &exact);
        let rows = &out["REGISTRY"].rows;
        assert!(rows.iter().any(|r| r.company_id == 0));
        assert!(rows.iter().any(|r| r.company_id == 1));
        assert!(!rows.iter().any(|r| r.company_id == 2));
    }
}
