use super::ExportError;
use super::polygonize::polygonize;
use crate::readers::GeoProfile;
use gdal::DriverManager;
use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use gdal::vector::{LayerAccess, LayerOptions, OGRwkbGeometryType, ToGdal};
use ndarray::Array2;
use std::fmt;
use std::path::{Path, PathBuf};

pub const WGS84_EPSG: u32 = 4326;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorFormat {
    GeoJson,
    Shapefile,
}

impl VectorFormat {
    fn driver_name(&self) -> &'static str {
        match self {
            VectorFormat::GeoJson => "GeoJSON",
            VectorFormat::Shapefile => "ESRI Shapefile",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            VectorFormat::GeoJson => "geojson",
            VectorFormat::Shapefile => "shp",
        }
    }

    // Files the driver writes next to the main one
    fn sidecars(&self) -> &'static [&'static str] {
        match self {
            VectorFormat::GeoJson => &[],
            VectorFormat::Shapefile => &["shx", "dbf", "prj", "cpg", "qix"],
        }
    }
}

impl fmt::Display for VectorFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.driver_name())
    }
}

/// Outcome of a vector export. An empty mask is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorExport {
    Written { path: PathBuf, features: usize },
    Empty,
}

impl VectorExport {
    pub fn path(&self) -> Option<&Path> {
        match self {
            VectorExport::Written { path, .. } => Some(path),
            VectorExport::Empty => None,
        }
    }
}

/// Polygonizes the `true` regions of `mask` and writes them in WGS84
/// longitude/latitude.
///
/// Any previous output at `path` is removed first, so an empty mask leaves
/// no file behind.
pub fn export_mask_as_vector(
    mask: &Array2<bool>,
    profile: &GeoProfile,
    path: &Path,
    format: VectorFormat,
) -> Result<VectorExport, ExportError> {
    if mask.dim() != profile.shape() {
        return Err(ExportError::ShapeMismatch {
            grid: mask.dim(),
            profile: profile.shape(),
        });
    }

    remove_existing(path, format)?;

    let polygons = polygonize(mask, profile);
    if polygons.is_empty() {
        println!("No features to export for {}", path.display());
        return Ok(VectorExport::Empty);
    }

    let mut source_srs = profile
        .spatial_ref()?
        .ok_or_else(|| ExportError::MissingCrs(path.to_path_buf()))?;
    source_srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    let mut wgs84 = SpatialRef::from_epsg(WGS84_EPSG)?;
    wgs84.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    let to_wgs84 = CoordTransform::new(&source_srs, &wgs84)?;

    let driver = DriverManager::get_driver_by_name(format.driver_name())?;
    let mut dataset = driver.create_vector_only(path)?;
    let layer_name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("vegetation_mask");
    let mut layer = dataset.create_layer(LayerOptions {
        name: layer_name,
        srs: Some(&wgs84),
        ty: OGRwkbGeometryType::wkbPolygon,
        ..Default::default()
    })?;

    for polygon in &polygons {
        let mut geometry = polygon.to_gdal()?;
        geometry.transform_inplace(&to_wgs84)?;
        layer.create_feature(geometry)?;
    }

    println!("Exported {}: {}", format, path.display());

    Ok(VectorExport::Written {
        path: path.to_path_buf(),
        features: polygons.len(),
    })
}

// GeoJSON refuses to overwrite and a Shapefile leaves stale sidecars behind
fn remove_existing(path: &Path, format: VectorFormat) -> Result<(), ExportError> {
    let targets = std::iter::once(path.to_path_buf())
        .chain(format.sidecars().iter().map(|ext| path.with_extension(ext)));

    for target in targets {
        if target.is_file() {
            std::fs::remove_file(&target)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::utm_profile;
    use gdal::Dataset;
    use ndarray::array;
    use tempfile::tempdir;

    fn first_polygon_bounds(path: &Path) -> (usize, (f64, f64, f64, f64)) {
        let dataset = Dataset::open(path).unwrap();
        let mut layer = dataset.layer(0).unwrap();
        let count = layer.feature_count() as usize;
        let feature = layer.features().next().unwrap();
        let envelope = feature.geometry().unwrap().envelope();
        (
            count,
            (envelope.MinX, envelope.MaxX, envelope.MinY, envelope.MaxY),
        )
    }

    #[test]
    fn test_empty_mask_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mask.geojson");
        let profile = utm_profile(2, 2).for_mask();

        let outcome = export_mask_as_vector(
            &Array2::from_elem((2, 2), false),
            &profile,
            &path,
            VectorFormat::GeoJson,
        )
        .unwrap();

        assert_eq!(outcome, VectorExport::Empty);
        assert!(!path.exists());
    }

    #[test]
    fn test_geojson_is_reprojected_to_wgs84() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mask.geojson");
        let profile = utm_profile(3, 3).for_mask();
        let mask = array![
            [true, true, false],
            [true, true, false],
            [false, false, true]
        ];

        let outcome = export_mask_as_vector(&mask, &profile, &path, VectorFormat::GeoJson).unwrap();

        assert_eq!(
            outcome,
            VectorExport::Written {
                path: path.clone(),
                features: 2
            }
        );

        // UTM 33N around 500 km easting sits on the 15°E central meridian
        let (count, (min_x, max_x, min_y, max_y)) = first_polygon_bounds(&path);
        assert_eq!(count, 2);
        assert!((14.9..15.1).contains(&min_x), "{min_x}");
        assert!((14.9..15.1).contains(&max_x), "{max_x}");
        assert!((40.0..42.0).contains(&min_y), "{min_y}");
        assert!((40.0..42.0).contains(&max_y), "{max_y}");
    }

    #[test]
    fn test_shapefile_overwrites_previous_output() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mask.shp");
        let profile = utm_profile(2, 2).for_mask();

        export_mask_as_vector(
            &Array2::from_elem((2, 2), true),
            &profile,
            &path,
            VectorFormat::Shapefile,
        )
        .unwrap();
        let outcome = export_mask_as_vector(
            &array![[true, false], [false, true]],
            &profile,
            &path,
            VectorFormat::Shapefile,
        )
        .unwrap();

        assert_eq!(outcome.path(), Some(path.as_path()));
        assert!(path.with_extension("dbf").exists());
        assert!(path.with_extension("shx").exists());
        let (count, _) = first_polygon_bounds(&path);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_empty_mask_removes_previous_output() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mask.shp");
        let profile = utm_profile(2, 2).for_mask();

        export_mask_as_vector(
            &Array2::from_elem((2, 2), true),
            &profile,
            &path,
            VectorFormat::Shapefile,
        )
        .unwrap();
        assert!(path.exists());

        let outcome = export_mask_as_vector(
            &Array2::from_elem((2, 2), false),
            &profile,
            &path,
            VectorFormat::Shapefile,
        )
        .unwrap();

        assert_eq!(outcome, VectorExport::Empty);
        assert!(!path.exists());
        assert!(!path.with_extension("shx").exists());
        assert!(!path.with_extension("dbf").exists());
    }

    #[test]
    fn test_missing_crs_is_an_error() {
        let dir = tempdir().unwrap();
        let mut profile = utm_profile(1, 1).for_mask();
        profile.crs_wkt.clear();

        let result = export_mask_as_vector(
            &array![[true]],
            &profile,
            &dir.path().join("mask.geojson"),
            VectorFormat::GeoJson,
        );

        assert!(matches!(result, Err(ExportError::MissingCrs(_))));
    }
}
