pub mod processor;

pub use processor::{TileBands, TilePaths, TileProcessor, TileReport, Vegetation};

use crate::export::ExportError;
use crate::preprocessing::PreprocessError;
use crate::readers::ReadError;
use crate::sat_bands::Band;
use std::fmt;

/// Steps a tile goes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileStage {
    Start,
    BandsLocated,
    BandsLoaded,
    CloudMasked,
    IndexComputed,
    Thresholded,
    Exported,
    Done,
}

impl fmt::Display for TileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TileStage::Start => "start",
            TileStage::BandsLocated => "bands located",
            TileStage::BandsLoaded => "bands loaded",
            TileStage::CloudMasked => "cloud masked",
            TileStage::IndexComputed => "index computed",
            TileStage::Thresholded => "thresholded",
            TileStage::Exported => "exported",
            TileStage::Done => "done",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TileError {
    #[error("missing bands: {}", band_list(.0))]
    MissingBands(Vec<Band>),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error("{band} band is not on the red band grid: {reason}")]
    GeometryMismatch { band: Band, reason: String },

    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

impl TileError {
    /// Last stage the tile completed before failing.
    pub fn stage(&self) -> TileStage {
        match self {
            TileError::MissingBands(_) => TileStage::Start,
            TileError::Read(_) | TileError::GeometryMismatch { .. } => TileStage::BandsLocated,
            TileError::Preprocess(_) => TileStage::BandsLoaded,
            TileError::Export(_) => TileStage::Thresholded,
        }
    }

    pub fn is_missing_bands(&self) -> bool {
        matches!(self, TileError::MissingBands(_))
    }
}

fn band_list(bands: &[Band]) -> String {
    bands
        .iter()
        .map(|band| band.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_bands_message() {
        let error = TileError::MissingBands(vec![Band::Blue, Band::Nir]);
        assert_eq!(error.to_string(), "missing bands: blue, near-infrared");
        assert_eq!(error.stage(), TileStage::Start);
        assert!(error.is_missing_bands());
    }

    #[test]
    fn test_degenerate_input_fails_after_loading() {
        let error = TileError::from(PreprocessError::DegenerateMaximum(0.0));
        assert_eq!(error.stage(), TileStage::BandsLoaded);
        assert!(!error.is_missing_bands());
    }
}
