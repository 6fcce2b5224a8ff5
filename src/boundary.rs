//! District (시군구) boundary polygons shown on top of the raster.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::error::{Error, Result};

pub const KOREAN_NAME_KEY: &str = "SIG_KOR_NM";
pub const ENGLISH_NAME_KEY: &str = "SIG_ENG_NM";

#[derive(Debug, Deserialize)]
struct RawCollection {
    features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    geometry: Value,
    #[serde(default)]
    properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryFeature {
    pub korean_name: String,
    pub english_name: String,
    pub geometry: Value,
}

impl BoundaryFeature {
    /// `전주시 완산구 (Jeonju-si Wansan-gu)`
    pub fn label(&self) -> String {
        format!("{} ({})", self.korean_name, self.english_name)
    }
}

/// Immutable once loaded; share it by reference between requests.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryLayer {
    features: Vec<BoundaryFeature>,
}

impl BoundaryLayer {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let text = fs::read_to_string(path)?;
        let layer = Self::from_geojson_str(&text)?;

        info!(
            "Loaded {} boundary features from {}",
            layer.features.len(),
            path.display()
        );
        Ok(layer)
    }

    pub fn from_geojson_str(text: &str) -> Result<Self> {
        let raw: RawCollection = serde_json::from_str(text)?;

        let features = raw
            .features
            .into_iter()
            .enumerate()
            .map(|(i, feature)| {
                Ok(BoundaryFeature {
                    korean_name: string_property(&feature.properties, KOREAN_NAME_KEY, i)?,
                    english_name: string_property(&feature.properties, ENGLISH_NAME_KEY, i)?,
                    geometry: feature.geometry,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { features })
    }

    pub fn features(&self) -> &[BoundaryFeature] {
        &self.features
    }

    /// GeoJSON whose only property per feature is `"": label`, so a popup
    /// shows the label without any key.
    pub fn to_labelled_geojson(&self) -> Value {
        let features: Vec<Value> = self
            .features
            .iter()
            .map(|feature| {
                json!({
                    "type": "Feature",
                    "geometry": feature.geometry,
                    "properties": { "": feature.label() },
                })
            })
            .collect();

        json!({
            "type": "FeatureCollection",
            "features": features,
        })
    }
}

fn string_property(properties: &Map<String, Value>, key: &str, index: usize) -> Result<String> {
    properties
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| Error::Format(format!("boundary feature {index} has no {key} property")))
}
