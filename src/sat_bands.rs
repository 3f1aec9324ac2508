use serde::Deserialize;
use std::fmt::Display;

/// Sentinel-2 bands used by the vegetation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Band {
    Blue,
    Green,
    Red,
    Nir,
    Qa60,
}

impl Band {
    pub const ALL: [Band; 5] = [Band::Blue, Band::Green, Band::Red, Band::Nir, Band::Qa60];

    /// Code used in file names by the data producers, e.g. `T32TQM_B04.jp2`.
    pub fn default_code(&self) -> &'static str {
        match self {
            Band::Blue => "B02",
            Band::Green => "B03",
            Band::Red => "B04",
            Band::Nir => "B08",
            Band::Qa60 => "QA60",
        }
    }
}

impl Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Band::Blue => write!(f, "blue"),
            Band::Green => write!(f, "green"),
            Band::Red => write!(f, "red"),
            Band::Nir => write!(f, "near-infrared"),
            Band::Qa60 => write!(f, "QA60"),
        }
    }
}

/// File name codes per band. Defaults follow the Sentinel-2 naming, but a
/// batch can override them from the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BandCodes {
    pub blue: String,
    pub green: String,
    pub red: String,
    pub nir: String,
    pub qa: String,
}

impl Default for BandCodes {
    fn default() -> Self {
        Self {
            blue: Band::Blue.default_code().to_string(),
            green: Band::Green.default_code().to_string(),
            red: Band::Red.default_code().to_string(),
            nir: Band::Nir.default_code().to_string(),
            qa: Band::Qa60.default_code().to_string(),
        }
    }
}

impl BandCodes {
    pub fn code(&self, band: Band) -> &str {
        match band {
            Band::Blue => &self.blue,
            Band::Green => &self.green,
            Band::Red => &self.red,
            Band::Nir => &self.nir,
            Band::Qa60 => &self.qa,
        }
    }

    pub fn is_valid(&self) -> bool {
        Band::ALL.iter().all(|band| {
            let code = self.code(*band);
            !code.is_empty() && !code.contains(['/', '\\', '*', '?', '['])
        })
    }
}

impl Display for BandCodes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "blue={}, green={}, red={}, nir={}, qa={}",
            self.blue, self.green, self.red, self.nir, self.qa
        )
    }
}
