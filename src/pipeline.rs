//! One display request: selection → raster → palette PNG → map.

use std::path::PathBuf;
use std::time::Instant;

use gdal::spatial_ref::SpatialRef;
use tracing::info;

use crate::boundary::BoundaryLayer;
use crate::config::DashboardConfig;
use crate::error::Result;
use crate::map::{compose, Legend, MapView};
use crate::palette::{encode, SuitabilityClass};
use crate::raster::reproject;
use crate::selection::{locate_raster, Selection};

#[derive(Debug, Clone)]
pub struct RenderedMap {
    pub view: MapView,
    /// The encoded overlay, also embedded in `view`.
    pub png: Vec<u8>,
    pub raster_path: PathBuf,
}

impl RenderedMap {
    pub fn to_html(&self, config: &DashboardConfig) -> String {
        self.view.to_html(&config.width, config.height)
    }
}

pub fn render(
    config: &DashboardConfig,
    boundary: &BoundaryLayer,
    selection: &Selection,
) -> Result<RenderedMap> {
    let start_time = Instant::now();

    let valid = selection.validate()?;
    let raster_path = locate_raster(&config.raster_dir, selection)?;
    info!("Rendering {} from {:?}", valid.layer_name(), raster_path);

    let target = SpatialRef::from_epsg(config.target_epsg)?;
    let grid = reproject(&raster_path, &target)?;

    let png = encode(&grid, &SuitabilityClass::colors(), config.transparent_index)?;

    let view = compose(
        boundary,
        &png,
        grid.bounds,
        valid.opacity,
        Legend::suitability(),
        config.map_options(valid.layer_name()),
    )?;

    info!("Rendered {} in {:?}", valid.layer_name(), start_time.elapsed());

    Ok(RenderedMap {
        view,
        png,
        raster_path,
    })
}
