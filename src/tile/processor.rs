use super::{TileError, TileStage};
use crate::config::Config;
use crate::export::{
    MaskOutputs, VectorExport, VectorFormat, export_mask_as_geotiff, export_mask_as_vector,
};
use crate::preprocessing::{
    CloudMaskMethod, all_clear_mask, bitmask_cloud_mask, calculate_index, mask_invalid,
    reflectance_cloud_mask, threshold_mask,
};
use crate::readers::{GeoProfile, find_band, read_band};
use crate::sat_bands::Band;
use ndarray::Array2;
use std::fmt::Display;
use std::path::PathBuf;

/// Band files found for one tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilePaths {
    pub red: PathBuf,
    pub nir: PathBuf,
    pub blue: PathBuf,
    pub quality: Option<PathBuf>,
}

/// Bands of one tile, all on the red band's grid.
#[derive(Debug, Clone)]
pub struct TileBands {
    pub red: Array2<f64>,
    pub nir: Array2<f64>,
    pub blue: Array2<f64>,
    pub quality: Option<Array2<u32>>,
    pub profile: GeoProfile,
}

/// Intermediate grids of the vegetation computation.
#[derive(Debug, Clone)]
pub struct Vegetation {
    pub cloud_method: CloudMaskMethod,
    pub clear: Array2<bool>,
    pub index: Array2<f64>,
    pub mask: Array2<bool>,
}

impl Vegetation {
    pub fn vegetation_pixels(&self) -> usize {
        self.mask.iter().filter(|&&v| v).count()
    }

    pub fn clear_pixels(&self) -> usize {
        self.clear.iter().filter(|&&c| c).count()
    }
}

#[derive(Debug, Clone)]
pub struct TileReport {
    pub tile_id: String,
    pub cloud_method: CloudMaskMethod,
    pub outputs: Vec<PathBuf>,
    pub vegetation_pixels: usize,
    pub clear_pixels: usize,
    pub total_pixels: usize,
}

impl Display for TileReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let outputs = self
            .outputs
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "Processed {}, outputs: {}", self.tile_id, outputs)
    }
}

#[derive(Debug)]
pub struct TileProcessor<'a> {
    config: &'a Config,
}

impl<'a> TileProcessor<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    fn advance(&self, tile_id: &str, stage: TileStage) {
        log::debug!("{}: {}", tile_id, stage);
    }

    /// Runs every step for `tile_id` and writes its masks to the output
    /// directory.
    pub fn process(&self, tile_id: &str) -> Result<TileReport, TileError> {
        self.advance(tile_id, TileStage::Start);

        let paths = self.locate(tile_id)?;
        self.advance(tile_id, TileStage::BandsLocated);

        let bands = self.load(&paths)?;
        self.advance(tile_id, TileStage::BandsLoaded);

        let vegetation = self.vegetation(tile_id, &bands)?;
        self.advance(tile_id, TileStage::Thresholded);

        let outputs = self.export(tile_id, &vegetation.mask, &bands.profile.for_mask())?;
        self.advance(tile_id, TileStage::Exported);

        let (rows, cols) = bands.profile.shape();
        let report = TileReport {
            tile_id: tile_id.to_string(),
            cloud_method: vegetation.cloud_method,
            outputs,
            vegetation_pixels: vegetation.vegetation_pixels(),
            clear_pixels: vegetation.clear_pixels(),
            total_pixels: rows * cols,
        };
        self.advance(tile_id, TileStage::Done);

        Ok(report)
    }

    pub fn locate(&self, tile_id: &str) -> Result<TilePaths, TileError> {
        let dir = self.config.data_dir();
        let codes = self.config.bands();
        let find = |band| find_band(tile_id, band, codes, dir);

        let (red, nir, blue) = (find(Band::Red), find(Band::Nir), find(Band::Blue));
        let quality = find(Band::Qa60);

        match (red, nir, blue) {
            (Some(red), Some(nir), Some(blue)) => Ok(TilePaths {
                red,
                nir,
                blue,
                quality,
            }),
            (red, nir, blue) => {
                let missing = [(Band::Red, red), (Band::Nir, nir), (Band::Blue, blue)]
                    .into_iter()
                    .filter(|(_, path)| path.is_none())
                    .map(|(band, _)| band)
                    .collect();
                Err(TileError::MissingBands(missing))
            }
        }
    }

    /// Loads the bands and checks they share the red band's grid.
    pub fn load(&self, paths: &TilePaths) -> Result<TileBands, TileError> {
        let red = read_band::<f64>(&paths.red)?;
        let nir = read_band::<f64>(&paths.nir)?;
        check_alignment(Band::Nir, &red.profile, &nir.profile)?;
        let blue = read_band::<f64>(&paths.blue)?;
        check_alignment(Band::Blue, &red.profile, &blue.profile)?;

        let quality = match &paths.quality {
            Some(path) => {
                let qa = read_band::<u32>(path)?;
                check_alignment(Band::Qa60, &red.profile, &qa.profile)?;
                Some(qa.data)
            }
            None => None,
        };

        Ok(TileBands {
            red: red.data,
            nir: nir.data,
            blue: blue.data,
            quality,
            profile: red.profile,
        })
    }

    /// Cloud mask, index and thresholded vegetation mask for loaded bands.
    pub fn vegetation(&self, tile_id: &str, bands: &TileBands) -> Result<Vegetation, TileError> {
        let cloud_method = CloudMaskMethod::select(
            bands.quality.is_some(),
            self.config.cloud_masking(),
            self.config.reflectance_threshold(),
        );
        let clear = match (cloud_method, &bands.quality) {
            (CloudMaskMethod::Bitmask, Some(qa)) => bitmask_cloud_mask(qa),
            (CloudMaskMethod::Reflectance { threshold }, _) => {
                reflectance_cloud_mask(&bands.blue, threshold)?
            }
            _ => all_clear_mask(bands.red.dim()),
        };
        log::debug!("{}: cloud mask from {}", tile_id, cloud_method);
        self.advance(tile_id, TileStage::CloudMasked);

        let index = calculate_index(&bands.nir, &bands.red, self.config.epsilon())?;
        self.advance(tile_id, TileStage::IndexComputed);

        let masked = mask_invalid(&index, &clear)?;
        let mask = threshold_mask(&masked, self.config.index_threshold());

        Ok(Vegetation {
            cloud_method,
            clear,
            index,
            mask,
        })
    }

    /// Writes the GeoTIFF mask and the enabled vector formats.
    pub fn export(
        &self,
        tile_id: &str,
        mask: &Array2<bool>,
        profile: &GeoProfile,
    ) -> Result<Vec<PathBuf>, TileError> {
        let outputs = MaskOutputs::new(self.config.output_dir(), tile_id);
        export_mask_as_geotiff(mask, profile, &outputs.raster)?;

        let mut written = vec![outputs.raster.clone()];
        let export = self.config.export();
        let formats = [
            (VectorFormat::GeoJson, export.geojson),
            (VectorFormat::Shapefile, export.shapefile),
        ];

        for (format, enabled) in formats {
            if !enabled {
                continue;
            }
            if let VectorExport::Written { path, .. } =
                export_mask_as_vector(mask, profile, outputs.vector(format), format)?
            {
                written.push(path);
            }
        }

        Ok(written)
    }
}

fn check_alignment(band: Band, reference: &GeoProfile, other: &GeoProfile) -> Result<(), TileError> {
    let reason = if reference.shape() != other.shape() {
        Some(format!(
            "size {}x{} vs {}x{}",
            other.width, other.height, reference.width, reference.height
        ))
    } else if !reference.same_transform(other) {
        Some(format!(
            "transform {:?} vs {:?}",
            other.transform, reference.transform
        ))
    } else if !reference.same_crs(other) {
        Some("different coordinate reference system".to_string())
    } else {
        None
    };

    match reason {
        Some(reason) => Err(TileError::GeometryMismatch { band, reason }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExportFormats;
    use crate::test_support::write_tile_band;
    use ndarray::array;
    use std::path::Path;
    use tempfile::tempdir;

    fn config_for(root: &Path) -> Config {
        let output = root.join("output");
        std::fs::create_dir_all(&output).unwrap();
        Config::new(root.join("data"), output, root.join("batch.log"))
    }

    fn write_tile(config: &Config, tile_id: &str, with_qa: bool) {
        let dir = config.data_dir();
        std::fs::create_dir_all(dir).unwrap();
        write_tile_band(dir, tile_id, Band::Red, &array![[100u16, 100], [100, 100]]);
        write_tile_band(dir, tile_id, Band::Nir, &array![[500u16, 100], [400, 120]]);
        write_tile_band(dir, tile_id, Band::Blue, &array![[100u16, 100], [100, 1000]]);
        if with_qa {
            write_tile_band(dir, tile_id, Band::Qa60, &array![[0u16, 1024], [0, 2048]]);
        }
    }

    #[test]
    fn test_process_writes_all_outputs() {
        let dir = tempdir().unwrap();
        let config = config_for(dir.path());
        write_tile(&config, "T1", true);

        let report = TileProcessor::new(&config).process("T1").unwrap();

        assert_eq!(report.cloud_method, CloudMaskMethod::Bitmask);
        assert_eq!(report.vegetation_pixels, 2);
        assert_eq!(report.clear_pixels, 2);
        assert_eq!(report.total_pixels, 4);
        assert_eq!(report.outputs.len(), 3);
        assert!(report.outputs.iter().all(|path| path.exists()));

        let written = read_band::<u8>(&report.outputs[0]).unwrap();
        assert_eq!(written.data, array![[1, 0], [1, 0]]);
    }

    #[test]
    fn test_reflectance_mask_without_quality_band() {
        let dir = tempdir().unwrap();
        let config = config_for(dir.path());
        write_tile(&config, "T1", false);
        let processor = TileProcessor::new(&config);

        let paths = processor.locate("T1").unwrap();
        assert!(paths.quality.is_none());
        let bands = processor.load(&paths).unwrap();
        let vegetation = processor.vegetation("T1", &bands).unwrap();

        assert_eq!(
            vegetation.cloud_method,
            CloudMaskMethod::Reflectance { threshold: 0.2 }
        );
        assert_eq!(vegetation.clear, array![[true, true], [true, false]]);
        assert_eq!(vegetation.mask, array![[true, false], [true, false]]);
        assert!(vegetation.index[[1, 1]].is_finite());
    }

    #[test]
    fn test_disabled_cloud_masking_keeps_every_pixel() {
        let dir = tempdir().unwrap();
        let mut config = config_for(dir.path());
        config.set_cloud_masking(false);
        config.set_export(ExportFormats::raster_only());
        write_tile(&config, "T1", true);

        let report = TileProcessor::new(&config).process("T1").unwrap();

        assert_eq!(report.cloud_method, CloudMaskMethod::Disabled);
        assert_eq!(report.clear_pixels, 4);
        assert_eq!(report.vegetation_pixels, 2);
        assert_eq!(report.outputs.len(), 1);
        assert!(!config.output_dir().join("T1_vegetation_mask.geojson").exists());
    }

    #[test]
    fn test_missing_band_writes_nothing() {
        let dir = tempdir().unwrap();
        let config = config_for(dir.path());
        let data = config.data_dir();
        std::fs::create_dir_all(data).unwrap();
        write_tile_band(data, "T2", Band::Red, &array![[1u16]]);
        write_tile_band(data, "T2", Band::Nir, &array![[2u16]]);

        let error = TileProcessor::new(&config).process("T2").unwrap_err();

        assert!(matches!(&error, TileError::MissingBands(bands) if bands == &vec![Band::Blue]));
        let outputs = std::fs::read_dir(config.output_dir()).unwrap().count();
        assert_eq!(outputs, 0);
    }

    #[test]
    fn test_misaligned_band_is_rejected() {
        let dir = tempdir().unwrap();
        let config = config_for(dir.path());
        let data = config.data_dir();
        std::fs::create_dir_all(data).unwrap();
        write_tile_band(data, "T3", Band::Red, &array![[1u16, 2], [3, 4]]);
        write_tile_band(data, "T3", Band::Nir, &Array2::<u16>::zeros((3, 3)));
        write_tile_band(data, "T3", Band::Blue, &array![[1u16, 2], [3, 4]]);

        let error = TileProcessor::new(&config).process("T3").unwrap_err();

        assert!(matches!(
            error,
            TileError::GeometryMismatch {
                band: Band::Nir,
                ..
            }
        ));
    }

    #[test]
    fn test_report_lists_outputs() {
        let report = TileReport {
            tile_id: "T1".to_string(),
            cloud_method: CloudMaskMethod::Disabled,
            outputs: vec![PathBuf::from("out/a.tif"), PathBuf::from("out/a.geojson")],
            vegetation_pixels: 0,
            clear_pixels: 0,
            total_pixels: 0,
        };

        assert_eq!(
            report.to_string(),
            "Processed T1, outputs: out/a.tif, out/a.geojson"
        );
    }
}
