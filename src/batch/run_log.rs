use super::BatchError;
use chrono::Local;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Plain-text status log of one batch run.
///
/// The file is truncated when opened and every line is flushed as soon as it
/// is written, so a crashed run still leaves the tiles it got through.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl RunLog {
    pub fn create(path: &Path) -> Result<Self, BatchError> {
        let file = File::create(path).map_err(|source| BatchError::Log {
            path: path.to_path_buf(),
            source,
        })?;

        let mut log = RunLog {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        };
        log.write_line(&format!("Batch run started at {}", Local::now().to_rfc3339()))?;

        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Prints `message` and appends it to the log.
    pub fn info(&mut self, message: &str) -> Result<(), BatchError> {
        println!("✓ {}", message);
        self.write_line(message)
    }

    /// Same as [`RunLog::info`] for a failed tile, printed to stderr.
    pub fn failure(&mut self, message: &str) -> Result<(), BatchError> {
        eprintln!("✗ {}", message);
        self.write_line(message)
    }

    /// Closing line of a run, set apart from the tile lines on the console.
    pub fn summary(&mut self, message: &str) -> Result<(), BatchError> {
        println!("\n{}", message);
        self.write_line(message)
    }

    fn write_line(&mut self, line: &str) -> Result<(), BatchError> {
        writeln!(self.writer, "{}", line)
            .and_then(|_| self.writer.flush())
            .map_err(|source| BatchError::Log {
                path: self.path.clone(),
                source,
            })
    }
}
