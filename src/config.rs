use std::path::PathBuf;

use crate::map::{MapOptions, BOUNDARY_LAYER_NAME};
use crate::palette::TRANSPARENT_INDEX;
use crate::raster::GEOGRAPHIC_EPSG;

/// Settings shared by every request of one dashboard session.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Root of the `<crop>/<scenario>/<file>.tif` tree.
    pub raster_dir: PathBuf,
    pub boundary_path: PathBuf,
    pub target_epsg: u32,
    pub transparent_index: u8,
    /// `(latitude, longitude)`
    pub center: (f64, f64),
    pub zoom: u8,
    /// CSS width of the embedded map.
    pub width: String,
    /// Map height in pixels.
    pub height: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            raster_dir: PathBuf::from("full_tif"),
            boundary_path: PathBuf::from("jb_sgg.geojson"),
            target_epsg: GEOGRAPHIC_EPSG,
            transparent_index: TRANSPARENT_INDEX,
            center: (36.0, 127.0),
            zoom: 8,
            width: "100%".to_string(),
            height: 700,
        }
    }
}

impl DashboardConfig {
    pub fn map_options(&self, overlay_name: String) -> MapOptions {
        MapOptions {
            center: self.center,
            zoom: self.zoom,
            boundary_name: BOUNDARY_LAYER_NAME.to_string(),
            overlay_name,
        }
    }
}
