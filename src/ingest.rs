//! CSV ingestion: turn configured source files into `NamedDataset`s ready
//! for the indexer. Scrubbing and address assembly mirror the upstream
//! cleaning scripts so the keys stay comparable across rebuilds.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::config::{AppConfig, DatasetConfig};
use crate::models::{NamedDataset, RawTable};

/// Read a CSV file into a `RawTable`. All cells load as strings; typing is
/// left to downstream consumers of the payload.
pub fn read_csv_table(path: &Path) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening dataset file {}", path.display()))?;
    let columns: Vec<String> = reader
        .headers()
        .with_context(|| format!("reading headers of {}", path.display()))?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("reading row of {}", path.display()))?;
        let mut row: Vec<Value> = record
            .iter()
            .map(|cell| Value::String(cell.to_string()))
            .collect();
        // Short rows pad out so column binding stays in range.
        while row.len() < columns.len() {
            row.push(Value::Null);
        }
        row.truncate(columns.len());
        rows.push(row);
    }
    Ok(RawTable { columns, rows })
}

/// Apply a dataset's declared cleaning to a loaded table: blank out scrub
/// literals, and assemble a synthetic ADDRESS column from declared parts
/// when the source splits street/city/state/zip.
pub fn prepare_dataset(cfg: &DatasetConfig, mut table: RawTable) -> NamedDataset {
    if !cfg.scrub_values.is_empty() {
        for row in &mut table.rows {
            for cell in row.iter_mut() {
                if let Value::String(s) = cell {
                    if cfg.scrub_values.iter().any(|v| v == s) {
                        *s = String::new();
                    }
                }
            }
        }
    }

    let address_column = cfg.effective_address_column().to_string();
    if !cfg.address_parts.is_empty() {
        let part_indices: Vec<Option<usize>> = cfg
            .address_parts
            .iter()
            .map(|p| table.column_index(p))
            .collect();
        let addr_idx = match table.column_index(&address_column) {
            Some(i) => i,
            None => {
                table.columns.push(address_column.clone());
                for row in &mut table.rows {
                    row.push(Value::Null);
                }
                table.columns.len() - 1
            }
        };
        for row in &mut table.rows {
            let joined = part_indices
                .iter()
                .map(|idx| match idx.and_then(|i| row.get(i)) {
                    Some(Value::String(s)) => s.trim().to_string(),
                    _ => String::new(),
                })
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            row[addr_idx] = Value::String(joined);
        }
    }

    NamedDataset {
        tag: cfg.tag.clone(),
        table,
        name_columns: cfg.name_columns.clone(),
        address_column,
    }
}

/// Load every configured dataset from disk, in config order (the order
/// `company_id` assignment follows).
pub fn load_datasets(cfg: &AppConfig) -> Result<Vec<NamedDataset>> {
    let mut datasets = Vec::with_capacity(cfg.datasets.len());
    for ds in &cfg.datasets {
        let table = read_csv_table(Path::new(&ds.path))?;
        log::info!("loaded dataset '{}': {} rows from {}", ds.tag, table.len(), ds.path);
        datasets.push(prepare_dataset(ds, table));
    }
    Ok(datasets)
}
