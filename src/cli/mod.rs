use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "contractor_matcher",
    version,
    about = "Link contractor records across registry, debarment, apprenticeship, award and wage-theft datasets",
    disable_help_subcommand = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ingest the configured datasets, build the entity index and match
    /// graph, and persist the snapshot.
    Build {
        /// Path to the JSON config (env: CONTRACTOR_MATCHER_CONFIG)
        #[arg(long, env = "CONTRACTOR_MATCHER_CONFIG")]
        config: PathBuf,
        /// Override the sqlite output path from the config
        #[arg(long)]
        db: Option<String>,
        /// Skip sqlite persistence
        #[arg(long)]
        no_db: bool,
        /// Directory for CSV exports (overrides config export.out_dir)
        #[arg(long, value_name = "DIR")]
        export_dir: Option<PathBuf>,
        /// Primary similarity cutoff override
        #[arg(long)]
        threshold: Option<f64>,
        /// Secondary combined cutoff override
        #[arg(long)]
        avg_threshold: Option<f64>,
    },
    /// Build in memory, then resolve a free-text name/address query and
    /// print the matching raw records grouped per dataset.
    Query {
        /// Path to the JSON config (env: CONTRACTOR_MATCHER_CONFIG)
        #[arg(long, env = "CONTRACTOR_MATCHER_CONFIG")]
        config: PathBuf,
        /// Business name (repeat for an alias/DBA)
        #[arg(long = "name", required = true)]
        names: Vec<String>,
        /// Business address
        #[arg(long, default_value = "")]
        address: String,
        /// Primary similarity cutoff override
        #[arg(long)]
        threshold: Option<f64>,
        /// Secondary combined cutoff override
        #[arg(long)]
        avg_threshold: Option<f64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build() {
        let cli = Cli::try_parse_from([
            "contractor_matcher",
            "build",
            "--config",
            "cfg.json",
            "--threshold",
            "92.5",
        ])
        .unwrap();
        match cli.command {
            Command::Build {
                config, threshold, no_db, ..
            } => {
                assert_eq!(config, PathBuf::from("cfg.json"));
                assert_eq!(threshold, Some(92.5));
                assert!(!no_db);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_query_repeated_names() {
        let cli = Cli::try_parse_from([
            "contractor_matcher",
            "query",
            "--config",
            "cfg.json",
            "--name",
            "Acme Construction",
            "--name",
            "Acme NY",
            "--address",
            "10 Main St",
        ])
        .unwrap();
        match cli.command {
            Command::Query { names, address, .. } => {
                assert_eq!(names.len(), 2);
                assert_eq!(address, "10 Main St");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_query_requires_name() {
        assert!(Cli::try_parse_from(["contractor_matcher", "query", "--config", "c.json"]).is_err());
    }
}
