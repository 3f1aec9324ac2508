use std::path::{Path, PathBuf};

use crate::sat_bands::{Band, BandCodes};

/// Extensions tried for each band file, in order of precedence.
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["tif", "jp2"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    GeoTiff,
    Jpeg2000,
}

pub fn file_type(path: &Path) -> Option<FileType> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("tif") => Some(FileType::GeoTiff),
        Some("jp2") => Some(FileType::Jpeg2000),
        _ => None,
    }
}

/// File name of a band without extension, e.g. `S2A_20200601_T32TQM_B04`.
pub fn band_stem(tile_id: &str, code: &str) -> String {
    format!("{}_{}", tile_id, code)
}

/// Finds `<dir>/<tile_id>_<code>.<ext>` for the first existing extension.
///
/// A missing band is a normal outcome and yields `None`.
pub fn find_band(tile_id: &str, band: Band, codes: &BandCodes, dir: &Path) -> Option<PathBuf> {
    let stem = band_stem(tile_id, codes.code(band));

    SUPPORTED_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", stem, ext)))
        .find(|path| path.is_file())
}

/// Recovers the tile identifier from a band file name by cutting at the
/// first `_<code>` occurrence.
pub fn tile_id_from_file_name(file_name: &str, code: &str) -> Option<String> {
    let marker = format!("_{}", code);
    file_name
        .find(&marker)
        .map(|pos| file_name[..pos].to_string())
        .filter(|id| !id.is_empty())
}
