//! Error types for lidem

use thiserror::Error;

/// Main error type for lidem operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Negative raster coordinate on the {axis} axis ({value}): location lies outside the grid")]
    NegativeRasterCoordinate { axis: &'static str, value: i64 },

    #[error("Cannot subtract a halo region of width {halo} from an area of dimensions {width} x {height}")]
    InvalidHalo { halo: f64, width: f64, height: f64 },

    #[error("Grid mismatch: {0}")]
    GridMismatch(String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Unknown point filter: {0}")]
    UnknownFilter(String),

    #[error("No data value not set for raster '{0}'")]
    NoDataNotSet(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Insufficient data for interpolation: {0}")]
    InsufficientData(String),

    #[error("Point source error in '{path}': {reason}")]
    PointSource { path: String, reason: String },

    #[error("Failed to load the block ({x}, {y}): {reason}")]
    Block { x: u32, y: u32, reason: String },

    #[error("Raster codec error: {0}")]
    Codec(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for [`Error::InvalidParameter`]
    pub fn invalid_parameter(
        name: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error only means a single location could not be
    /// interpolated. Every other kind aborts a conversion.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, Error::InsufficientData(_))
    }
}

/// Result type alias for lidem operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data_is_local() {
        assert!(Error::InsufficientData("outside hull".into()).is_insufficient_data());
        assert!(!Error::Codec("bad strip".into()).is_insufficient_data());
    }

    #[test]
    fn test_invalid_parameter_message() {
        let e = Error::invalid_parameter("resolution", -1.0, "must be positive");
        assert_eq!(
            e.to_string(),
            "Invalid parameter: resolution = -1 (must be positive)"
        );
    }
}
