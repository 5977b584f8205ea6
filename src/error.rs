use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while resolving inputs, reading rasters or writing artifacts.
///
/// Configuration-class errors (`DuplicateRaster`, `MissingRaster`, `NoInput`,
/// `Config`) abort the run before any comparison executes. Everything else is
/// caught per stage by the pipeline and turned into a `Skipped` status.
#[derive(Debug, Error)]
pub enum QcError {
    #[error("duplicate '{token}' raster found: {first} and {second}")]
    DuplicateRaster {
        token: &'static str,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("required '{0}' raster is missing")]
    MissingRaster(&'static str),

    #[error("input raster name is invalid: {0}")]
    InvalidRasterName(String),

    #[error("no raster input configured: set a rasters folder or explicit raster paths")]
    NoInput,

    #[error("raster grid is malformed: {0}")]
    InvalidGrid(String),

    #[error("rotated rasters are not supported: {}", .0.display())]
    RotatedRaster(PathBuf),

    #[error("rasters are not grid-aligned: {detail}")]
    MisalignedGrids { detail: String },

    #[error("required GDAL driver '{0}' is not available")]
    DriverUnavailable(&'static str),

    #[error("failed to parse config {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Gdal(#[from] gdal::errors::GdalError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, QcError>;
