use super::ExportError;
use crate::readers::GeoProfile;
use gdal::DriverManager;
use gdal::raster::Buffer;
use ndarray::Array2;
use std::path::Path;

/// Writes a boolean mask as a single band 0/1 GeoTIFF co-registered with
/// `profile`.
pub fn export_mask_as_geotiff(
    mask: &Array2<bool>,
    profile: &GeoProfile,
    path: &Path,
) -> Result<(), ExportError> {
    write_u8_geotiff(&mask.mapv(u8::from), profile, path)
}

pub fn write_u8_geotiff(
    data: &Array2<u8>,
    profile: &GeoProfile,
    path: &Path,
) -> Result<(), ExportError> {
    if data.dim() != profile.shape() {
        return Err(ExportError::ShapeMismatch {
            grid: data.dim(),
            profile: profile.shape(),
        });
    }

    let (rows, cols) = data.dim();
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let mut dataset = driver.create_with_band_type::<u8, _>(path, cols, rows, 1)?;

    dataset.set_geo_transform(&profile.transform)?;
    if profile.has_crs() {
        dataset.set_projection(&profile.crs_wkt)?;
    }

    let mut band = dataset.rasterband(1)?;
    match profile.nodata {
        Some(nodata) if (0.0..=255.0).contains(&nodata) && nodata.fract() == 0.0 => {
            band.set_no_data_value(Some(nodata))?;
        }
        Some(nodata) => {
            log::warn!(
                "nodata value {} does not fit in 8 bits, {} is written without one",
                nodata,
                path.display()
            );
        }
        None => {}
    }

    let mut buffer = Buffer::new((cols, rows), data.iter().copied().collect());
    band.write((0, 0), (cols, rows), &mut buffer)?;

    log::debug!("Wrote {}x{} mask to {}", cols, rows, path.display());

    Ok(())
}
