use gdal::errors::GdalError;
use gdal::raster::GdalDataType;
use gdal::spatial_ref::SpatialRef;
use geo::AffineTransform;
use ndarray::Array2;
use std::fmt;
use std::path::PathBuf;

pub type GeoTransform = [f64; 6];

pub const IDENTITY_TRANSFORM: GeoTransform = [0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("failed to open {path}: {source}")]
    Open { path: PathBuf, source: GdalError },

    #[error("failed to read {path}: {source}")]
    Band { path: PathBuf, source: GdalError },

    #[error("unexpected buffer size for {path}: {source}")]
    Shape {
        path: PathBuf,
        source: ndarray::ShapeError,
    },
}

/// Spatial metadata of a raster: everything needed to write a co-registered
/// output next to it.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoProfile {
    pub width: usize,
    pub height: usize,
    // GDAL order: [top_left_x, pixel_width, row_rotation, top_left_y, col_rotation, pixel_height]
    pub transform: GeoTransform,
    // Empty when the source carries no CRS
    pub crs_wkt: String,
    pub nodata: Option<f64>,
    pub data_type: GdalDataType,
    pub count: usize,
}

impl GeoProfile {
    /// Profile for a single band 8-bit mask sharing this raster's grid.
    pub fn for_mask(&self) -> GeoProfile {
        GeoProfile {
            data_type: GdalDataType::UInt8,
            count: 1,
            ..self.clone()
        }
    }

    /// `(rows, cols)`, the shape of the grids read with this profile.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn has_crs(&self) -> bool {
        !self.crs_wkt.trim().is_empty()
    }

    pub fn spatial_ref(&self) -> Result<Option<SpatialRef>, GdalError> {
        if !self.has_crs() {
            return Ok(None);
        }
        SpatialRef::from_wkt(&self.crs_wkt).map(Some)
    }

    /// Affine map from pixel corners `(col, row)` to georeferenced
    /// coordinates.
    pub fn pixel_to_map(&self) -> AffineTransform<f64> {
        let [x0, pixel_width, row_rotation, y0, col_rotation, pixel_height] = self.transform;
        AffineTransform::new(pixel_width, row_rotation, x0, col_rotation, pixel_height, y0)
    }

    pub fn same_transform(&self, other: &GeoProfile) -> bool {
        self.transform
            .iter()
            .zip(other.transform.iter())
            .all(|(a, b)| (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0))
    }

    pub fn same_crs(&self, other: &GeoProfile) -> bool {
        if self.crs_wkt == other.crs_wkt {
            return true;
        }
        match (self.spatial_ref(), other.spatial_ref()) {
            (Ok(Some(a)), Ok(Some(b))) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for GeoProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} {:?}, bands: {}, transform: {:?}, crs: {}",
            self.width,
            self.height,
            self.data_type,
            self.count,
            self.transform,
            if self.has_crs() { "set" } else { "none" }
        )
    }
}

/// One spectral band of a tile.
#[derive(Debug, Clone)]
pub struct BandRaster<T> {
    pub data: Array2<T>,
    pub profile: GeoProfile,
}
