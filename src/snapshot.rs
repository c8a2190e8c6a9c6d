//! Immutable post-build snapshot and its atomically swappable handle.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::index::index_datasets;
use crate::matching::graph::build_match_graph;
use crate::matching::MatchPolicy;
use crate::models::{CanonicalEntity, FactTable, NamedDataset};

/// Everything the resolver and the persistence layer read: the canonical
/// entity table, the match adjacency, and one fact table per dataset.
/// Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub entities: Vec<CanonicalEntity>,
    pub adjacency: Vec<Vec<i64>>,
    pub facts: BTreeMap<String, FactTable>,
    pub policy: MatchPolicy,
    pub built_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn entity(&self, company_id: i64) -> Option<&CanonicalEntity> {
        self.entities.get(company_id as usize)
    }

    pub fn neighbors(&self, company_id: i64) -> &[i64] {
        self.adjacency
            .get(company_id as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Materialized match rows `(match_id, company_id, company_match)` in
    /// the shape the persisted `match` table uses.
    pub fn match_rows(&self) -> impl Iterator<Item = (i64, i64, i64)> + '_ {
        self.adjacency
            .iter()
            .enumerate()
            .flat_map(|(id, row)| row.iter().map(move |&m| (id as i64, m)))
            .enumerate()
            .map(|(match_id, (id, m))| (match_id as i64, id, m))
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum()
    }
}

/// One synchronous batch pass: index all datasets, then score the match
/// graph over the deduplicated entity table. Fails fast on a dataset whose
/// declared columns are absent; nothing partial is returned.
pub fn build(datasets: &[NamedDataset], policy: &MatchPolicy) -> Result<Snapshot, ConfigError> {
    let started = std::time::Instant::now();
    let index = index_datasets(datasets)?;
    let adjacency = build_match_graph(&index.entities, policy);
    log::info!(
        "snapshot built: {} entities, {} edges in {:.2}s",
        index.entities.len(),
        adjacency.iter().map(Vec::len).sum::<usize>(),
        started.elapsed().as_secs_f64()
    );
    Ok(Snapshot {
        entities: index.entities,
        adjacency,
        facts: index.facts,
        policy: *policy,
        built_at: Utc::now(),
    })
}

/// Handle shared between concurrent readers and the rebuild path. Readers
/// clone the current `Arc` and keep resolving against it; `swap` replaces
/// the pointer in one step so in-flight queries never observe a torn
/// snapshot.
#[derive(Debug, Clone)]
pub struct SharedSnapshot {
    inner: Arc<RwLock<Arc<Snapshot>>>,
}

impl SharedSnapshot {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    pub fn load(&self) -> Arc<Snapshot> {
        match self.inner.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn swap(&self, snapshot: Snapshot) {
        let next = Arc::new(snapshot);
        match self.inner.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}
