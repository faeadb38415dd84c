use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(serde_json::Error),
    EmptyLayers,
    DuplicateLayer(String),
    MissingScale(String),
    UnknownVariable(String),
    CompositeTooFew(String),
    FigureDimensions,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "I/O error: {}", e),
            ConfigError::Json(e) => write!(f, "Failed to parse JSON: {}", e),
            ConfigError::EmptyLayers => write!(f, "raster_layers must list at least one layer"),
            ConfigError::DuplicateLayer(name) => {
                write!(f, "Duplicate raster layer name '{}'", name)
            }
            ConfigError::MissingScale(category) => {
                write!(f, "No color scale configured for category '{}'", category)
            }
            ConfigError::UnknownVariable(name) => {
                write!(f, "Composite references unknown variable '{}'", name)
            }
            ConfigError::CompositeTooFew(output) => {
                write!(f, "Composite '{}' needs at least two variables", output)
            }
            ConfigError::FigureDimensions => {
                write!(f, "figure width and height must be positive")
            }
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
