pub mod boundary;
pub mod config;
pub mod error;
pub mod map;
pub mod palette;
pub mod pipeline;
pub mod raster;
pub mod selection;

pub use boundary::{BoundaryFeature, BoundaryLayer};
pub use config::DashboardConfig;
pub use error::{Error, Result};
pub use map::{compose, Legend, MapOptions, MapView};
pub use palette::{encode, PaletteImage, SuitabilityClass, TRANSPARENT_INDEX};
pub use pipeline::{render, RenderedMap};
pub use raster::{reproject, Bounds, RasterDataset, ReprojectedGrid};
pub use selection::{resolve_year, Crop, Scenario, Selection};
