//! Runs the tile processor over every tile found in a directory.

use std::path::PathBuf;

pub mod run_log;
pub mod runner;

pub use run_log::RunLog;
pub use runner::{BatchRunner, BatchSummary, TileOutcome, discover_tiles};

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write run log {path}: {source}")]
    Log {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid tile pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}
