//! CSV exports of the built snapshot: the canonical entity table, the
//! materialized match table, and a Key/Value build summary.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use chrono::{DateTime, Utc};
use csv::WriterBuilder;

use crate::error::ExportError;
use crate::snapshot::Snapshot;

pub fn export_entities_csv(path: &Path, snapshot: &Snapshot) -> Result<(), ExportError> {
    let file = File::create(path)?;
    let buf_writer = BufWriter::with_capacity(512 * 1024, file);
    let mut w = WriterBuilder::new().from_writer(buf_writer);
    w.write_record([
        "company_id",
        "NAME1",
        "NAME2",
        "ADDRESS",
        "DISPLAY_NAME1",
        "DISPLAY_NAME2",
        "DISPLAY_ADDRESS",
        "source_count",
    ])?;
    for entity in &snapshot.entities {
        let id = entity.company_id.to_string();
        let sources = entity.sources.len().to_string();
        w.write_record([
            id.as_str(),
            entity.name.as_str(),
            entity.alt_name.as_str(),
            entity.address.as_str(),
            entity.display_name.as_str(),
            entity.display_alt_name.as_str(),
            entity.display_address.as_str(),
            sources.as_str(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

pub fn export_matches_csv(path: &Path, snapshot: &Snapshot) -> Result<(), ExportError> {
    let file = File::create(path)?;
    let buf_writer = BufWriter::with_capacity(512 * 1024, file);
    let mut w = WriterBuilder::new().from_writer(buf_writer);
    w.write_record(["match_id", "company_id", "company_match"])?;
    for (match_id, company_id, company_match) in snapshot.match_rows() {
        w.write_record(&[
            match_id.to_string(),
            company_id.to_string(),
            company_match.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Context for the Key/Value build-summary file.
#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub dataset_rows: Vec<(String, usize)>,
    pub entity_count: usize,
    pub edge_count: usize,
    pub threshold: f64,
    pub avg_threshold: f64,
    pub started_utc: DateTime<Utc>,
    pub ended_utc: DateTime<Utc>,
}

pub fn export_summary_csv(path: &Path, ctx: &BuildSummary) -> Result<(), ExportError> {
    let file = File::create(path)?;
    let buf_writer = BufWriter::with_capacity(512 * 1024, file);
    let mut w = WriterBuilder::new().from_writer(buf_writer);
    w.write_record(["Key", "Value"])?;

    let mut write_kv = |k: &str, v: String| -> Result<(), ExportError> {
        w.write_record([k, v.as_str()])?;
        Ok(())
    };

    let total_rows: usize = ctx.dataset_rows.iter().map(|(_, n)| n).sum();
    for (tag, rows) in &ctx.dataset_rows {
        write_kv(&format!("Rows ({tag})"), rows.to_string())?;
    }
    write_kv("Total raw rows", total_rows.to_string())?;
    write_kv("Canonical entities", ctx.entity_count.to_string())?;
    write_kv("Match edges", ctx.edge_count.to_string())?;
    write_kv("Threshold", ctx.threshold.to_string())?;
    write_kv("Avg threshold", ctx.avg_threshold.to_string())?;

    let fmt_time =
        |dt: &DateTime<Utc>| -> String { format!("{} UTC", dt.format("%Y-%m-%d %H:%M:%S")) };
    let secs = (ctx.ended_utc - ctx.started_utc).num_milliseconds() as f64 / 1000.0;
    write_kv("Started (UTC)", fmt_time(&ctx.started_utc))?;
    write_kv("Ended (UTC)", fmt_time(&ctx.ended_utc))?;
    write_kv("Duration (s)", format!("{secs:.2}"))?;

    w.flush()?;
    Ok(())
}
