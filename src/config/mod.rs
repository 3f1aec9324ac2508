use serde::Deserialize;
use serde::Deserializer;
use serde::de::Error;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::sat_bands::BandCodes;

pub mod error;
pub use error::ConfigError;

pub const DEFAULT_INDEX_THRESHOLD: f64 = 0.3;
pub const DEFAULT_REFLECTANCE_THRESHOLD: f64 = 0.2;
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// Which vector outputs are written next to the GeoTIFF mask.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ExportFormats {
    pub geojson: bool,
    pub shapefile: bool,
}

impl Default for ExportFormats {
    fn default() -> Self {
        Self {
            geojson: true,
            shapefile: true,
        }
    }
}

impl ExportFormats {
    pub fn raster_only() -> Self {
        Self {
            geojson: false,
            shapefile: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    data_dir: PathBuf,
    output_dir: PathBuf,
    log_file: PathBuf,
    index_threshold: f64,
    reflectance_threshold: f64,
    epsilon: f64,
    cloud_masking: bool,
    export: ExportFormats,
    bands: BandCodes,
}

// Every field is optional in the file; values are checked the same way the
// setters check CLI overrides.
impl<'de> Deserialize<'de> for Config {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct ConfigHelper {
            data_dir: Option<PathBuf>,
            output_dir: Option<PathBuf>,
            log_file: Option<PathBuf>,
            index_threshold: Option<f64>,
            reflectance_threshold: Option<f64>,
            epsilon: Option<f64>,
            cloud_masking: Option<bool>,
            export: Option<ExportFormats>,
            bands: Option<BandCodes>,
        }

        let helper = ConfigHelper::deserialize(deserializer)?;
        let mut config = Config::default();

        if let Some(data_dir) = helper.data_dir {
            config.data_dir = data_dir;
        }
        if let Some(output_dir) = helper.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(log_file) = helper.log_file {
            config.log_file = log_file;
        }
        if let Some(threshold) = helper.index_threshold {
            config.set_index_threshold(threshold).map_err(D::Error::custom)?;
        }
        if let Some(threshold) = helper.reflectance_threshold {
            config
                .set_reflectance_threshold(threshold)
                .map_err(D::Error::custom)?;
        }
        if let Some(epsilon) = helper.epsilon {
            config.set_epsilon(epsilon).map_err(D::Error::custom)?;
        }
        if let Some(cloud_masking) = helper.cloud_masking {
            config.cloud_masking = cloud_masking;
        }
        if let Some(export) = helper.export {
            config.export = export;
        }
        if let Some(bands) = helper.bands {
            if !bands.is_valid() {
                return Err(D::Error::custom(ConfigError::BandCodes));
            }
            config.bands = bands;
        }

        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            log_file: PathBuf::from("batch_process.log"),
            index_threshold: DEFAULT_INDEX_THRESHOLD,
            reflectance_threshold: DEFAULT_REFLECTANCE_THRESHOLD,
            epsilon: DEFAULT_EPSILON,
            cloud_masking: true,
            export: ExportFormats::default(),
            bands: BandCodes::default(),
        }
    }
}

impl Config {
    pub fn new<P: Into<PathBuf>>(data_dir: P, output_dir: P, log_file: P) -> Self {
        Self {
            data_dir: data_dir.into(),
            output_dir: output_dir.into(),
            log_file: log_file.into(),
            ..Self::default()
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let config: Config = serde_json::from_reader(reader).map_err(ConfigError::from)?;

        Ok(config)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    pub fn index_threshold(&self) -> f64 {
        self.index_threshold
    }

    pub fn reflectance_threshold(&self) -> f64 {
        self.reflectance_threshold
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn cloud_masking(&self) -> bool {
        self.cloud_masking
    }

    pub fn export(&self) -> ExportFormats {
        self.export
    }

    pub fn bands(&self) -> &BandCodes {
        &self.bands
    }

    pub fn set_data_dir<P: Into<PathBuf>>(&mut self, data_dir: P) {
        self.data_dir = data_dir.into();
    }

    pub fn set_output_dir<P: Into<PathBuf>>(&mut self, output_dir: P) {
        self.output_dir = output_dir.into();
    }

    pub fn set_log_file<P: Into<PathBuf>>(&mut self, log_file: P) {
        self.log_file = log_file.into();
    }

    pub fn set_index_threshold(&mut self, threshold: f64) -> Result<(), ConfigError> {
        if !threshold.is_finite() {
            return Err(ConfigError::Threshold {
                name: "index_threshold",
                value: threshold,
            });
        }
        self.index_threshold = threshold;
        Ok(())
    }

    pub fn set_reflectance_threshold(&mut self, threshold: f64) -> Result<(), ConfigError> {
        if !threshold.is_finite() {
            return Err(ConfigError::Threshold {
                name: "reflectance_threshold",
                value: threshold,
            });
        }
        self.reflectance_threshold = threshold;
        Ok(())
    }

    pub fn set_epsilon(&mut self, epsilon: f64) -> Result<(), ConfigError> {
        if !epsilon.is_finite() || epsilon <= 0.0 {
            return Err(ConfigError::Epsilon(epsilon));
        }
        self.epsilon = epsilon;
        Ok(())
    }

    pub fn set_cloud_masking(&mut self, enabled: bool) {
        self.cloud_masking = enabled;
    }

    pub fn set_export(&mut self, export: ExportFormats) {
        self.export = export;
    }
}
