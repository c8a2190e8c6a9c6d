//! Entity indexer: collapses raw rows from every dataset into canonical
//! entities by exact normalized-tuple equality, and rekeys each dataset's
//! payload as a fact table on `company_id`.

use std::collections::BTreeMap;
use std::collections::HashMap;

use serde_json::Value;

use crate::error::ConfigError;
use crate::models::{
    CanonicalEntity, FactRow, FactTable, NamedDataset, NormalizedKey, SourceRef,
};
use crate::normalize::normalize_value;

#[derive(Debug, Clone, Default)]
pub struct IndexOutput {
    pub entities: Vec<CanonicalEntity>,
    pub facts: BTreeMap<String, FactTable>,
}

struct BoundColumns {
    names: Vec<usize>,
    address: usize,
}

/// Validate that every declared name/address column exists up front, so a
/// misconfigured dataset fails the build instead of being skipped.
fn bind_columns(dataset: &NamedDataset) -> Result<BoundColumns, ConfigError> {
    let mut names = Vec::with_capacity(dataset.name_columns.len());
    for col in &dataset.name_columns {
        let idx = dataset.table.column_index(col).ok_or_else(|| {
            ConfigError::MissingColumn {
                dataset: dataset.tag.clone(),
                column: col.clone(),
            }
        })?;
        names.push(idx);
    }
    let address = dataset
        .table
        .column_index(&dataset.address_column)
        .ok_or_else(|| ConfigError::MissingColumn {
            dataset: dataset.tag.clone(),
            column: dataset.address_column.clone(),
        })?;
    Ok(BoundColumns { names, address })
}

fn key_for_row(row: &[Value], cols: &BoundColumns) -> NormalizedKey {
    let name = normalize_value(&row[cols.names[0]]);
    let alt_name = cols
        .names
        .get(1)
        .map(|&i| normalize_value(&row[i]))
        .unwrap_or_default();
    NormalizedKey {
        name,
        alt_name,
        address: normalize_value(&row[cols.address]),
    }
}

fn display_for_row(row: &[Value], cols: &BoundColumns) -> (String, String, String) {
    let raw = |i: usize| match &row[i] {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    (
        raw(cols.names[0]),
        cols.names.get(1).map(|&i| raw(i)).unwrap_or_default(),
        raw(cols.address),
    )
}

/// Single indexing pass over every dataset, in the order given. `company_id`
/// values are assigned 0..N-1 in first-seen order of distinct keys.
pub fn index_datasets(datasets: &[NamedDataset]) -> Result<IndexOutput, ConfigError> {
    // Bind all columns first: a failure anywhere aborts before any output.
    let mut bound = Vec::with_capacity(datasets.len());
    for dataset in datasets {
        bound.push(bind_columns(dataset)?);
    }

    let mut entities: Vec<CanonicalEntity> = Vec::new();
    let mut by_key: HashMap<NormalizedKey, i64> = HashMap::new();
    let mut facts: BTreeMap<String, FactTable> = BTreeMap::new();

    for (dataset, cols) in datasets.iter().zip(&bound) {
        let mut fact = FactTable {
            columns: dataset.table.columns.clone(),
            rows: Vec::with_capacity(dataset.table.len()),
        };
        for (row_idx, row) in dataset.table.rows.iter().enumerate() {
            let key = key_for_row(row, cols);
            let company_id = match by_key.get(&key) {
                Some(&id) => id,
                None => {
                    let id = entities.len() as i64;
                    let (display_name, display_alt_name, display_address) =
                        display_for_row(row, cols);
                    entities.push(CanonicalEntity {
                        company_id: id,
                        name: key.name.clone(),
                        alt_name: key.alt_name.clone(),
                        address: key.address.clone(),
                        display_name,
                        display_alt_name,
                        display_address,
                        sources: Vec::new(),
                    });
                    by_key.insert(key, id);
                    id
                }
            };
            entities[company_id as usize].sources.push(SourceRef {
                dataset: dataset.tag.clone(),
                row: row_idx,
            });
            fact.rows.push(FactRow {
                company_id,
                values: row.clone(),
            });
        }
        log::info!(
            "indexed dataset '{}': {} rows, {} distinct entities so far",
            dataset.tag,
            dataset.table.len(),
            entities.len()
        );
        facts.insert(dataset.tag.clone(), fact);
    }

    Ok(IndexOutput { entities, facts })
}
