use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::matching::MatchPolicy;

/// Where the persisted snapshot lands (SQLite file).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "contractors.db".into(),
        }
    }
}

/// One source dataset: a CSV file plus the columns the indexer keys on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Tag used as the fact-table name and result grouping key.
    pub tag: String,
    pub path: String,
    /// Primary name column plus an optional alias/DBA column.
    pub name_columns: Vec<String>,
    /// Single address column; assembled from `address_parts` when given.
    #[serde(default)]
    pub address_column: Option<String>,
    /// Raw columns concatenated (space-joined) into a synthetic ADDRESS
    /// column at ingest, for sources that split street/city/state/zip.
    #[serde(default)]
    pub address_parts: Vec<String>,
    /// Literal cell values treated as absent, e.g. "NOT APPLICABLE", "NO DBA".
    #[serde(default)]
    pub scrub_values: Vec<String>,
}

impl DatasetConfig {
    /// Name of the address column the indexer will see.
    pub fn effective_address_column(&self) -> &str {
        self.address_column.as_deref().unwrap_or("ADDRESS")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub threshold: f64,
    pub avg_threshold: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: MatchPolicy::DEFAULT_THRESHOLD,
            avg_threshold: MatchPolicy::DEFAULT_AVG_THRESHOLD,
        }
    }
}

impl MatchingConfig {
    pub fn build_policy(&self) -> MatchPolicy {
        MatchPolicy::build_default().with_thresholds(self.threshold, self.avg_threshold)
    }

    pub fn query_policy(&self) -> MatchPolicy {
        MatchPolicy::query_default().with_thresholds(self.threshold, self.avg_threshold)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExportConfig {
    /// Directory for CSV exports of the entity/match tables and summary.
    pub out_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    pub datasets: Vec<DatasetConfig>,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.datasets.is_empty() {
            return Err(ConfigError::MissingField { field: "datasets" });
        }
        for ds in &self.datasets {
            if ds.tag.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: "datasets.tag",
                });
            }
            if ds.path.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: "datasets.path",
                });
            }
            if ds.name_columns.is_empty() || ds.name_columns.len() > 2 {
                return Err(ConfigError::InvalidValue {
                    field: "datasets.name_columns",
                    reason: format!(
                        "dataset '{}' declares {} name columns; expected 1 or 2",
                        ds.tag,
                        ds.name_columns.len()
                    ),
                });
            }
            if ds.address_column.is_none() && ds.address_parts.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "datasets.address_column",
                    reason: format!(
                        "dataset '{}' declares neither address_column nor address_parts",
                        ds.tag
                    ),
                });
            }
        }
        let mut tags: Vec<&str> = self.datasets.iter().map(|d| d.tag.as_str()).collect();
        tags.sort_unstable();
        tags.dedup();
        if tags.len() != self.datasets.len() {
            return Err(ConfigError::InvalidValue {
                field: "datasets.tag",
                reason: "dataset tags must be unique".into(),
            });
        }
        for (field, value) in [
            ("matching.threshold", self.matching.threshold),
            ("matching.avg_threshold", self.matching.avg_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("{value} not in 0..=100"),
                });
            }
        }
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "database.path",
            });
        }
        Ok(())
    }
}

/// Load and validate an `AppConfig` from a JSON file.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let cfg: AppConfig = serde_json::from_str(&raw)
        .with_context(|| format!("parsing config file {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AppConfig {
        AppConfig {
            datasets: vec![DatasetConfig {
                tag: "REGISTRY".into(),
                path: "registry.csv".into(),
                name_columns: vec!["Business Name".into(), "DBA Name".into()],
                address_column: Some("ADDRESS".into()),
                address_parts: vec![],
                scrub_values: vec!["NOT APPLICABLE".into()],
            }],
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_no_datasets_rejected() {
        let cfg = AppConfig::default();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::MissingField { field: "datasets" })
        ));
    }

    #[test]
    fn test_too_many_name_columns_rejected() {
        let mut cfg = valid();
        cfg.datasets[0].name_columns =
            vec!["A".into(), "B".into(), "C".into()];
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_missing_address_declaration_rejected() {
        let mut cfg = valid();
        cfg.datasets[0].address_column = None;
        cfg.datasets[0].address_parts.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_duplicate_tags_rejected() {
        let mut cfg = valid();
        cfg.datasets.push(cfg.datasets[0].clone());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_threshold_range_checked() {
        let mut cfg = valid();
        cfg.matching.threshold = 120.0;
        assert!(cfg.validate().is_err());
    }
}
