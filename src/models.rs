use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One source dataset loaded into tabular form. Cells stay as raw JSON
/// values; the engine never assumes a column is well-typed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RawTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A dataset plus the columns the indexer should key on. `name_columns`
/// holds the primary name column and an optional alias/DBA column.
#[derive(Debug, Clone)]
pub struct NamedDataset {
    pub tag: String,
    pub table: RawTable,
    pub name_columns: Vec<String>,
    pub address_column: String,
}

/// Normalized (name1, name2, address) tuple; exact equality on this tuple is
/// the dedup criterion. Datasets with a single name column key with an empty
/// `alt_name` so the same business dedups across schemas.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedKey {
    pub name: String,
    pub alt_name: String,
    pub address: String,
}

/// Back-reference from a canonical entity to the raw row that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub dataset: String,
    pub row: usize,
}

/// One deduplicated name/address observation, merged across all datasets.
/// `company_id` is assigned in first-seen order and is stable for the life
/// of the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalEntity {
    pub company_id: i64,
    pub name: String,
    pub alt_name: String,
    pub address: String,
    pub display_name: String,
    pub display_alt_name: String,
    pub display_address: String,
    pub sources: Vec<SourceRef>,
}

impl CanonicalEntity {
    /// Name fields that actually carry signal, for cross-pair scoring.
    pub fn name_fields(&self) -> Vec<&str> {
        let mut fields = Vec::with_capacity(2);
        if !self.name.is_empty() {
            fields.push(self.name.as_str());
        }
        if !self.alt_name.is_empty() {
            fields.push(self.alt_name.as_str());
        }
        fields
    }

}

/// One row of a per-dataset fact table: the foreign key plus the dataset's
/// original payload, in declared column order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactRow {
    pub company_id: i64,
    pub values: Vec<Value>,
}

/// Per-dataset fact table keyed by `company_id`. Row order mirrors the raw
/// table, so a back-reference row index projects directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactTable {
    pub columns: Vec<String>,
    pub rows: Vec<FactRow>,
}
