use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Crop or year has not been chosen yet.
    #[error("missing selection: {0}")]
    MissingSelection(&'static str),

    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// The raster for a crop/scenario/year combination does not exist.
    #[error("raster file does not exist: {}", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("format error: {0}")]
    Format(String),

    #[error("reprojection error: {0}")]
    Reprojection(String),

    /// A class value would land on (or past) the reserved transparency slot.
    #[error("class value {value} collides with transparency index {transparent_index}")]
    PaletteCollision { value: f64, transparent_index: u8 },

    #[error(transparent)]
    Gdal(#[from] gdal::errors::GdalError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
