//! Persisting vegetation masks as GeoTIFF, GeoJSON and ESRI Shapefile.

use gdal::errors::GdalError;
use std::path::{Path, PathBuf};

pub mod polygonize;
pub mod raster;
pub mod vector;

pub use raster::{export_mask_as_geotiff, write_u8_geotiff};
pub use vector::{VectorExport, VectorFormat, export_mask_as_vector};

pub const MASK_SUFFIX: &str = "vegetation_mask";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] GdalError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("grid shape {grid:?} does not match the output profile {profile:?}")]
    ShapeMismatch {
        grid: (usize, usize),
        profile: (usize, usize),
    },

    #[error("cannot reproject {0} to WGS84: the source raster has no CRS")]
    MissingCrs(PathBuf),
}

/// Output locations for one tile, `<output_dir>/<tile>_vegetation_mask.<ext>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskOutputs {
    pub raster: PathBuf,
    pub geojson: PathBuf,
    pub shapefile: PathBuf,
}

impl MaskOutputs {
    pub fn new(output_dir: &Path, tile_id: &str) -> Self {
        Self::with_suffix(output_dir, tile_id, MASK_SUFFIX)
    }

    pub fn with_suffix(output_dir: &Path, tile_id: &str, suffix: &str) -> Self {
        let stem = format!("{}_{}", tile_id, suffix);
        Self {
            raster: output_dir.join(format!("{}.tif", stem)),
            geojson: output_dir.join(format!("{}.{}", stem, VectorFormat::GeoJson.extension())),
            shapefile: output_dir.join(format!(
                "{}.{}",
                stem,
                VectorFormat::Shapefile.extension()
            )),
        }
    }

    pub fn vector(&self, format: VectorFormat) -> &Path {
        match format {
            VectorFormat::GeoJson => &self.geojson,
            VectorFormat::Shapefile => &self.shapefile,
        }
    }
}
