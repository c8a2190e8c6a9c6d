use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use log::info;
use serde_json::Value;

mod cli;
mod config;
mod db;
mod error;
mod export;
mod index;
mod ingest;
mod logging;
mod matching;
mod metrics;
mod models;
mod normalize;
mod resolve;
mod snapshot;

use crate::cli::{Cli, Command};
use crate::config::{load_config, AppConfig};
use crate::export::csv_export::{
    export_entities_csv, export_matches_csv, export_summary_csv, BuildSummary,
};
use crate::matching::MatchPolicy;
use crate::models::NamedDataset;
use crate::snapshot::Snapshot;

#[tokio::main]
async fn main() {
    crate::logging::init_tracing_from_env();
    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Build {
            config,
            db,
            no_db,
            export_dir,
            threshold,
            avg_threshold,
        } => run_build(&config, db, no_db, export_dir, threshold, avg_threshold).await,
        Command::Query {
            config,
            names,
            address,
            threshold,
            avg_threshold,
        } => run_query(&config, names, &address, threshold, avg_threshold),
    };
    if let Err(e) = outcome {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}

fn policy_overrides(
    policy: MatchPolicy,
    threshold: Option<f64>,
    avg_threshold: Option<f64>,
) -> MatchPolicy {
    MatchPolicy {
        threshold: threshold.unwrap_or(policy.threshold),
        avg_threshold: avg_threshold.unwrap_or(policy.avg_threshold),
        ..policy
    }
}

fn load_and_build(
    cfg: &AppConfig,
    policy: &MatchPolicy,
) -> Result<(Vec<(String, usize)>, Snapshot)> {
    let datasets: Vec<NamedDataset> = ingest::load_datasets(cfg)?;
    let dataset_rows = datasets
        .iter()
        .map(|d| (d.tag.clone(), d.table.len()))
        .collect();
    let snapshot = snapshot::build(&datasets, policy).context("building snapshot")?;
    Ok((dataset_rows, snapshot))
}

async fn run_build(
    config_path: &Path,
    db_override: Option<String>,
    no_db: bool,
    export_dir: Option<PathBuf>,
    threshold: Option<f64>,
    avg_threshold: Option<f64>,
) -> Result<()> {
    let cfg = load_config(config_path)?;
    let policy = policy_overrides(cfg.matching.build_policy(), threshold, avg_threshold);
    let started = Utc::now();
    let (dataset_rows, snapshot) = load_and_build(&cfg, &policy)?;
    let ended = Utc::now();

    if !no_db {
        let db_path = db_override.unwrap_or_else(|| cfg.database.path.clone());
        let pool = db::make_pool(&db_path).await?;
        db::save_snapshot(&pool, &snapshot).await?;
        info!("snapshot written to {db_path}");
    }

    let out_dir = export_dir.or_else(|| cfg.export.out_dir.as_ref().map(PathBuf::from));
    if let Some(dir) = out_dir {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating export directory {}", dir.display()))?;
        export_entities_csv(&dir.join("name.csv"), &snapshot)?;
        export_matches_csv(&dir.join("match.csv"), &snapshot)?;
        export_summary_csv(
            &dir.join("summary.csv"),
            &BuildSummary {
                dataset_rows,
                entity_count: snapshot.entities.len(),
                edge_count: snapshot.edge_count(),
                threshold: policy.threshold,
                avg_threshold: policy.avg_threshold,
                started_utc: started,
                ended_utc: ended,
            },
        )?;
        info!("csv exports written to {}", dir.display());
    }
    Ok(())
}

fn run_query(
    config_path: &Path,
    names: Vec<String>,
    address: &str,
    threshold: Option<f64>,
    avg_threshold: Option<f64>,
) -> Result<()> {
    let cfg = load_config(config_path)?;
    let build_policy = cfg.matching.build_policy();
    let query_policy = policy_overrides(cfg.matching.query_policy(), threshold, avg_threshold);
    let (_, snapshot) = load_and_build(&cfg, &build_policy)?;

    let results = resolve::resolve(&snapshot, &names, address, &query_policy);
    if results.is_empty() {
        println!("No records found for {names:?}");
        return Ok(());
    }
    for (tag, records) in &results {
        println!("=== {tag} ({} records) ===", records.rows.len());
        for row in &records.rows {
            let rendered: Vec<String> = records
                .columns
                .iter()
                .zip(&row.values)
                .filter_map(|(col, value)| match value {
                    Value::Null => None,
                    Value::String(s) if s.trim().is_empty() => None,
                    Value::String(s) => Some(format!("{col}: {s}")),
                    other => Some(format!("{col}: {other}")),
                })
                .collect();
            println!("  [company {}] {}", row.company_id, rendered.join(" | "));
        }
    }
    Ok(())
}
