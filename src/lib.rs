pub mod config;
pub mod db;
pub mod export;
pub mod index;
pub mod ingest;
pub mod matching;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod resolve;
pub mod snapshot;

pub mod error;
pub mod logging;

pub use matching::{score, MatchPolicy, SimilarityAlgorithm};
pub use normalize::normalize;
pub use resolve::resolve;
pub use snapshot::{build, SharedSnapshot, Snapshot};
