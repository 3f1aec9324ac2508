use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    Threshold { name: &'static str, value: f64 },
    Epsilon(f64),
    BandCodes,
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Threshold { name, value } => {
                write!(f, "{} must be a finite number, got {}", name, value)
            }
            ConfigError::Epsilon(value) => {
                write!(f, "epsilon must be finite and greater than 0, got {}", value)
            }
            ConfigError::BandCodes => write!(
                f,
                "band codes must be non-empty and free of path or glob characters"
            ),
            ConfigError::Io(e) => write!(f, "I/O error: {}", e),
            ConfigError::Json(e) => write!(f, "Failed to parse JSON: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> ConfigError {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> ConfigError {
        ConfigError::Json(err)
    }
}
