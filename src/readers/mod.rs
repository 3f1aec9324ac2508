pub mod gdal_reader;
pub mod locate;
pub mod types;

pub use gdal_reader::read_band;
pub use locate::{SUPPORTED_EXTENSIONS, find_band, tile_id_from_file_name};
pub use types::{BandRaster, GeoProfile, GeoTransform, ReadError};
