//! Composes the boundary layer, raster overlay and legend into a Leaflet map.

use serde_json::{json, Value};

use crate::boundary::BoundaryLayer;
use crate::error::Result;
use crate::palette::{to_data_uri, Rgb, SuitabilityClass};
use crate::raster::Bounds;
use crate::selection::validate_opacity;

/// Layer name of the district boundaries in the layer control.
pub const BOUNDARY_LAYER_NAME: &str = "전북 시군구 경계";

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
const BASEMAP_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
const BASEMAP_ATTRIBUTION: &str = "&copy; OpenStreetMap contributors";

const BOUNDARY_STROKE: &str = "#333333";

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub title: String,
    pub entries: Vec<LegendEntry>,
}

impl Legend {
    pub fn suitability() -> Self {
        Self {
            title: "Suitability".to_string(),
            entries: SuitabilityClass::ALL
                .iter()
                .map(|class| LegendEntry {
                    label: class.label(),
                    color: class.color(),
                })
                .collect(),
        }
    }

    fn to_html(&self) -> String {
        let mut html = format!(
            "<div class=\"legend-title\">{}</div>",
            escape_html(&self.title)
        );
        for entry in &self.entries {
            html.push_str(&format!(
                "<div class=\"legend-row\"><span class=\"legend-swatch\" style=\"background:{}\"></span>{}</div>",
                entry.color,
                escape_html(&entry.label)
            ));
        }
        html
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageOverlay {
    pub name: String,
    pub data_uri: String,
    pub bounds: Bounds,
    pub opacity: f64,
}

/// Initial viewport and names that are not part of a request.
#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    /// `(latitude, longitude)`
    pub center: (f64, f64),
    pub zoom: u8,
    pub boundary_name: String,
    pub overlay_name: String,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            center: (36.0, 127.0),
            zoom: 8,
            boundary_name: BOUNDARY_LAYER_NAME.to_string(),
            overlay_name: "suitability".to_string(),
        }
    }
}

/// A fully composed map, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub center: (f64, f64),
    pub zoom: u8,
    pub boundary_name: String,
    pub boundary: Value,
    pub overlay: ImageOverlay,
    pub legend: Legend,
}

pub fn compose(
    boundary: &BoundaryLayer,
    overlay_png: &[u8],
    bounds: Bounds,
    opacity: f64,
    legend: Legend,
    options: MapOptions,
) -> Result<MapView> {
    validate_opacity(opacity)?;

    Ok(MapView {
        center: options.center,
        zoom: options.zoom,
        boundary_name: options.boundary_name,
        boundary: boundary.to_labelled_geojson(),
        overlay: ImageOverlay {
            name: options.overlay_name,
            data_uri: to_data_uri(overlay_png),
            bounds,
            opacity,
        },
        legend,
    })
}

impl MapView {
    /// Render a standalone HTML page. `width` is a CSS length, `height` is
    /// in pixels.
    pub fn to_html(&self, width: &str, height: u32) -> String {
        let setup = json!({
            "center": [self.center.0, self.center.1],
            "zoom": self.zoom,
            "boundaryName": self.boundary_name,
            "boundary": self.boundary,
            "overlay": {
                "name": self.overlay.name,
                "url": self.overlay.data_uri,
                "bounds": self.overlay.bounds.to_leaflet(),
                "opacity": self.overlay.opacity,
            },
            "legend": self.legend.to_html(),
            "stroke": BOUNDARY_STROKE,
            "basemap": { "url": BASEMAP_URL, "attribution": BASEMAP_ATTRIBUTION },
        });

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<link rel="stylesheet" href="{css}">
<script src="{js}"></script>
<style>
  #map {{ width: {width}; height: {height}px; }}
  .legend {{ background: rgba(255, 255, 255, 0.9); padding: 8px 10px; border-radius: 4px; font: 13px sans-serif; }}
  .legend-title {{ font-weight: bold; margin-bottom: 4px; }}
  .legend-row {{ display: flex; align-items: center; gap: 6px; }}
  .legend-swatch {{ display: inline-block; width: 14px; height: 14px; border: 1px solid #999; }}
</style>
</head>
<body>
<div id="map"></div>
<script>
const setup = {setup};
const map = L.map("map").setView(setup.center, setup.zoom);
L.tileLayer(setup.basemap.url, {{ attribution: setup.basemap.attribution }}).addTo(map);

const boundary = L.geoJSON(setup.boundary, {{
  style: {{ color: setup.stroke, weight: 2, fillOpacity: 0 }},
  onEachFeature: (feature, layer) => layer.bindPopup(feature.properties[""]),
}}).addTo(map);

const overlay = L.imageOverlay(setup.overlay.url, setup.overlay.bounds, {{
  opacity: setup.overlay.opacity,
}}).addTo(map);

const legend = L.control({{ position: "bottomright" }});
legend.onAdd = () => {{
  const div = L.DomUtil.create("div", "legend");
  div.innerHTML = setup.legend;
  return div;
}};
legend.addTo(map);

L.control.layers(null, {{
  [setup.boundaryName]: boundary,
  [setup.overlay.name]: overlay,
}}, {{ collapsed: false }}).addTo(map);
</script>
</body>
</html>
"#,
            css = LEAFLET_CSS,
            js = LEAFLET_JS,
            width = escape_html(width),
            height = height,
            setup = script_json(&setup),
        )
    }
}

/// JSON safe to inline inside a `<script>` element.
fn script_json(value: &Value) -> String {
    value.to_string().replace("</", "<\\/")
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
