use super::{BatchError, RunLog};
use crate::config::Config;
use crate::readers::locate::file_type;
use crate::readers::tile_id_from_file_name;
use crate::sat_bands::Band;
use crate::tile::{TileError, TileProcessor, TileReport};
use glob::{Pattern, glob};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum TileOutcome {
    Processed(TileReport),
    Failed { tile_id: String, error: TileError },
}

impl TileOutcome {
    pub fn tile_id(&self) -> &str {
        match self {
            TileOutcome::Processed(report) => &report.tile_id,
            TileOutcome::Failed { tile_id, .. } => tile_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TileOutcome::Processed(_))
    }
}

#[derive(Debug)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub outcomes: Vec<TileOutcome>,
    pub log_path: PathBuf,
}

impl BatchSummary {
    pub fn message(&self) -> String {
        format!(
            "Batch processing complete. Success: {}, Failed: {}. Log: {}",
            self.succeeded,
            self.failed,
            self.log_path.display()
        )
    }
}

#[derive(Debug)]
pub struct BatchRunner {
    config: Config,
}

impl BatchRunner {
    pub fn new(config: Config) -> Self {
        BatchRunner { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Processes every tile of the data directory, one after the other.
    ///
    /// A failing tile is logged and counted; only problems with the output
    /// directory, the run log or the discovery pattern abort the batch.
    pub fn run(&self) -> Result<BatchSummary, BatchError> {
        let output_dir = self.config.output_dir();
        std::fs::create_dir_all(output_dir).map_err(|source| BatchError::OutputDir {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let mut run_log = RunLog::create(self.config.log_file())?;
        let tiles = discover_tiles(self.config.data_dir(), self.config.bands().code(Band::Red))?;
        log::info!(
            "Found {} tiles in {}",
            tiles.len(),
            self.config.data_dir().display()
        );

        let processor = TileProcessor::new(&self.config);
        let mut outcomes = Vec::with_capacity(tiles.len());

        for (i, tile_id) in tiles.iter().enumerate() {
            println!("[{}/{}] Processing {}...", i + 1, tiles.len(), tile_id);

            let outcome = match processor.process(tile_id) {
                Ok(report) => {
                    run_log.info(&report.to_string())?;
                    log::debug!(
                        "{}: {} of {} pixels vegetated, {} clear, cloud mask from {}",
                        tile_id,
                        report.vegetation_pixels,
                        report.total_pixels,
                        report.clear_pixels,
                        report.cloud_method
                    );
                    TileOutcome::Processed(report)
                }
                Err(error) => {
                    if error.is_missing_bands() {
                        run_log.failure(&format!("Missing bands for {}, skipping.", tile_id))?;
                        log::debug!("{}: {}", tile_id, error);
                    } else {
                        run_log.failure(&format!("Error processing {}: {}", tile_id, error))?;
                        log::debug!("{}: failed after stage '{}'", tile_id, error.stage());
                    }
                    TileOutcome::Failed {
                        tile_id: tile_id.clone(),
                        error,
                    }
                }
            };
            outcomes.push(outcome);
        }

        let succeeded = outcomes.iter().filter(|outcome| outcome.is_success()).count();
        let summary = BatchSummary {
            succeeded,
            failed: outcomes.len() - succeeded,
            outcomes,
            log_path: run_log.path().to_path_buf(),
        };
        run_log.summary(&summary.message())?;

        Ok(summary)
    }
}

/// Tile identifiers of `data_dir`, one per red band file, sorted.
///
/// A tile whose red band exists in several formats is listed once per file.
pub fn discover_tiles(data_dir: &Path, red_code: &str) -> Result<Vec<String>, BatchError> {
    let pattern = format!(
        "{}/*_{}.*",
        Pattern::escape(&data_dir.to_string_lossy()),
        Pattern::escape(red_code)
    );

    let mut tiles = Vec::new();
    for entry in glob(&pattern)? {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if file_type(&path).is_none() {
            log::debug!("Skipping {}: not a supported raster", path.display());
            continue;
        }
        if let Some(tile_id) = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| tile_id_from_file_name(name, red_code))
        {
            tiles.push(tile_id);
        }
    }
    tiles.sort();

    Ok(tiles)
}
