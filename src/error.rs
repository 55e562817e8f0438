use thiserror::Error;

/// Rejected simulation, sensor or controller parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("{name} must lie in [{min}, {max}], got {value}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("radar needs at least one ray")]
    NoRays,

    #[error("descent profile breakpoints must strictly decrease, entry {index} does not")]
    UnsortedProfile { index: usize },
}

/// Problems building a terrain heightfield.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TerrainError {
    #[error("terrain needs at least 2 columns, got {0}")]
    TooNarrow(usize),

    #[error("terrain height at column {column} is not finite")]
    NonFinite { column: usize },

    #[error("world height must be positive, got {0}")]
    BadWorldHeight(f64),
}

/// Crate-level error for construction and telemetry export.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Terrain(#[from] TerrainError),

    #[error("telemetry export failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn positive(name: &'static str, value: f64) -> std::result::Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { name, value })
    }
}

pub(crate) fn non_negative(name: &'static str, value: f64) -> std::result::Result<(), ConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Negative { name, value })
    }
}

pub(crate) fn in_range(
    name: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> std::result::Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { name, value, min, max })
    }
}
