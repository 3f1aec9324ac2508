use super::types::{BandRaster, GeoProfile, IDENTITY_TRANSFORM, ReadError};
use gdal::Dataset;
use gdal::raster::GdalType;
use ndarray::Array2;
use std::path::Path;

/// Reads the first band of `path` as a `T` grid together with its profile.
pub fn read_band<T>(path: &Path) -> Result<BandRaster<T>, ReadError>
where
    T: GdalType + Copy,
{
    let dataset = Dataset::open(path).map_err(|source| ReadError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let profile = read_profile(&dataset, path)?;
    let (width, height) = (profile.width, profile.height);

    let band = dataset.rasterband(1).map_err(|source| ReadError::Band {
        path: path.to_path_buf(),
        source,
    })?;
    let buffer = band
        .read_as::<T>((0, 0), (width, height), (width, height), None)
        .map_err(|source| ReadError::Band {
            path: path.to_path_buf(),
            source,
        })?;

    let data = Array2::from_shape_vec((height, width), buffer.data().to_vec()).map_err(
        |source| ReadError::Shape {
            path: path.to_path_buf(),
            source,
        },
    )?;

    log::debug!("Read {} ({})", path.display(), profile);

    Ok(BandRaster { data, profile })
}

fn read_profile(dataset: &Dataset, path: &Path) -> Result<GeoProfile, ReadError> {
    let (width, height) = dataset.raster_size();
    let band = dataset.rasterband(1).map_err(|source| ReadError::Band {
        path: path.to_path_buf(),
        source,
    })?;

    let transform = match dataset.geo_transform() {
        Ok(gt) => gt,
        Err(_) => {
            log::warn!(
                "{} has no geotransform, using the identity transform",
                path.display()
            );
            IDENTITY_TRANSFORM
        }
    };

    Ok(GeoProfile {
        width,
        height,
        transform,
        crs_wkt: dataset.projection(),
        nodata: band.no_data_value(),
        data_type: band.band_type(),
        count: dataset.raster_count(),
    })
}
