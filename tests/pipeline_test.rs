use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use fruit_suitability::raster::{geographic_crs, reproject};
use fruit_suitability::{
    render, BoundaryLayer, Crop, DashboardConfig, Error, RasterDataset, Scenario, Selection,
};
use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::DriverManager;
use tempfile::TempDir;

const BOUNDARY: &str = r#"{
    "type": "FeatureCollection",
    "features": [{
        "type": "Feature",
        "properties": {"SIG_KOR_NM": "전주시 완산구", "SIG_ENG_NM": "Jeonju-si Wansan-gu"},
        "geometry": {"type": "Polygon", "coordinates": [[[127.0, 35.7], [127.2, 35.7], [127.2, 35.9], [127.0, 35.7]]]}
    }]
}"#;

const NODATA: f64 = 255.0;

fn gtiff_available() -> bool {
    DriverManager::get_driver_by_name("GTiff").is_ok()
}

/// Write a single-band class raster. `epsg = None` leaves the CRS unset.
fn write_class_raster(
    path: &Path,
    cols: usize,
    rows: usize,
    geo_transform: [f64; 6],
    epsg: Option<u32>,
    values: Vec<u8>,
) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();

    let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
    let mut dataset = driver
        .create_with_band_type::<u8, _>(path, cols, rows, 1)
        .unwrap();
    dataset.set_geo_transform(&geo_transform).unwrap();

    if let Some(epsg) = epsg {
        let wkt = SpatialRef::from_epsg(epsg).unwrap().to_wkt().unwrap();
        dataset.set_projection(&wkt).unwrap();
    }

    let mut band = dataset.rasterband(1).unwrap();
    band.set_no_data_value(Some(NODATA)).unwrap();
    let mut buffer = Buffer::new((cols, rows), values);
    band.write((0, 0), (cols, rows), &mut buffer).unwrap();
}

fn class_values(cols: usize, rows: usize) -> Vec<u8> {
    (0..cols * rows)
        .map(|i| {
            if i % 17 == 0 {
                NODATA as u8
            } else {
                ((i / cols + i % cols) % 3) as u8
            }
        })
        .collect()
}

fn apple_2041(raster_dir: &Path) -> PathBuf {
    raster_dir
        .join("apple")
        .join("SSP245")
        .join("apple_SSP245_2041_FULL.tif")
}

fn config(raster_dir: &Path) -> DashboardConfig {
    DashboardConfig {
        raster_dir: raster_dir.to_path_buf(),
        ..DashboardConfig::default()
    }
}

fn selection() -> Selection {
    Selection {
        crop: Some(Crop::Apple),
        scenario: Scenario::Ssp245,
        year: Some(2041),
        opacity: 0.7,
    }
}

#[test]
fn test_render_projected_raster() {
    if !gtiff_available() {
        eprintln!("Skipping test: GTiff driver not available");
        return;
    }
    let temp_dir = TempDir::new().unwrap();
    let (cols, rows) = (40, 30);
    // EPSG:5186 (Korea 2000 / Central Belt 2010)
    write_class_raster(
        &apple_2041(temp_dir.path()),
        cols,
        rows,
        [180_000.0, 1_000.0, 0.0, 400_000.0, 0.0, -1_000.0],
        Some(5186),
        class_values(cols, rows),
    );

    let boundary = BoundaryLayer::from_geojson_str(BOUNDARY).unwrap();
    let rendered = render(&config(temp_dir.path()), &boundary, &selection()).unwrap();

    let bounds = rendered.view.overlay.bounds;
    assert!(bounds.west > 126.0 && bounds.east < 128.0, "{:?}", bounds);
    assert!(bounds.south > 35.0 && bounds.north < 37.0, "{:?}", bounds);
    assert!(bounds.west < bounds.east && bounds.south < bounds.north);

    assert_eq!(rendered.view.overlay.name, "apple_SSP245_2041");
    assert_eq!(rendered.view.overlay.opacity, 0.7);
    assert_eq!(rendered.raster_path, apple_2041(temp_dir.path()));

    let decoded = image::load_from_memory(&rendered.png).unwrap().to_rgba8();
    let allowed: BTreeSet<[u8; 4]> = [
        [0xFF, 0xF8, 0xDC, 255],
        [0xEE, 0xC9, 0x00, 255],
        [0x2E, 0x8B, 0x57, 255],
    ]
    .into_iter()
    .collect();
    for pixel in decoded.pixels() {
        assert!(
            pixel.0[3] == 0 || allowed.contains(&pixel.0),
            "unexpected colour {:?}",
            pixel.0
        );
    }
    assert!(decoded.pixels().any(|p| p.0[3] == 0));

    let html = rendered.to_html(&config(temp_dir.path()));
    assert!(html.contains("data:image/png;base64,"));
    assert!(html.contains("전주시 완산구 (Jeonju-si Wansan-gu)"));
}

#[test]
fn test_missing_raster_reports_attempted_path() {
    let temp_dir = TempDir::new().unwrap();
    let boundary = BoundaryLayer::from_geojson_str(BOUNDARY).unwrap();

    let err = render(&config(temp_dir.path()), &boundary, &selection()).unwrap_err();
    let expected = apple_2041(temp_dir.path());
    match &err {
        Error::FileNotFound { path } => assert_eq!(path, &expected),
        other => panic!("expected FileNotFound, got {:?}", other),
    }
    assert!(err.to_string().contains(&expected.display().to_string()));
}

#[test]
fn test_missing_selection_stops_before_disk_access() {
    let boundary = BoundaryLayer::from_geojson_str(BOUNDARY).unwrap();
    let mut sel = selection();
    sel.crop = None;

    let err = render(&DashboardConfig::default(), &boundary, &sel).unwrap_err();
    assert!(matches!(err, Error::MissingSelection(_)));
}

#[test]
fn test_raster_without_crs_fails() {
    if !gtiff_available() {
        eprintln!("Skipping test: GTiff driver not available");
        return;
    }
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("no_crs.tif");
    write_class_raster(
        &path,
        4,
        4,
        [0.0, 1.0, 0.0, 4.0, 0.0, -1.0],
        None,
        vec![1; 16],
    );

    let err = reproject(&path, &geographic_crs().unwrap()).unwrap_err();
    assert!(matches!(err, Error::Reprojection(_)), "{:?}", err);
}

#[test]
fn test_geographic_reprojection_is_idempotent() {
    if !gtiff_available() {
        eprintln!("Skipping test: GTiff driver not available");
        return;
    }
    let temp_dir = TempDir::new().unwrap();
    let first_path = temp_dir.path().join("first.tif");
    let (cols, rows) = (24, 16);
    write_class_raster(
        &first_path,
        cols,
        rows,
        [126.5, 0.01, 0.0, 36.2, 0.0, -0.01],
        Some(4326),
        class_values(cols, rows),
    );

    let target = geographic_crs().unwrap();
    let first = reproject(&first_path, &target).unwrap();

    let second_path = temp_dir.path().join("second.tif");
    let values = first
        .values
        .iter()
        .map(|v| if v.is_nan() { NODATA as u8 } else { *v as u8 })
        .collect();
    write_class_raster(
        &second_path,
        first.width,
        first.height,
        first.geo_transform,
        Some(4326),
        values,
    );
    let second = reproject(&second_path, &target).unwrap();

    assert_eq!((first.width, first.height), (second.width, second.height));
    for (a, b) in [
        (first.bounds.west, second.bounds.west),
        (first.bounds.east, second.bounds.east),
        (first.bounds.south, second.bounds.south),
        (first.bounds.north, second.bounds.north),
    ] {
        assert!((a - b).abs() < 1e-7, "{} vs {}", a, b);
    }
}

#[test]
fn test_open_reads_nodata_and_transform() {
    if !gtiff_available() {
        eprintln!("Skipping test: GTiff driver not available");
        return;
    }
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("read.tif");
    write_class_raster(
        &path,
        3,
        2,
        [127.0, 0.5, 0.0, 36.0, 0.0, -0.5],
        Some(4326),
        vec![0, 1, 2, 255, 1, 0],
    );

    let dataset = RasterDataset::open(&path).unwrap();
    assert_eq!((dataset.width, dataset.height), (3, 2));
    assert_eq!(dataset.nodata, Some(NODATA));
    assert_eq!(dataset.values, vec![0.0, 1.0, 2.0, 255.0, 1.0, 0.0]);
    assert_eq!(dataset.geo_transform[0], 127.0);
    assert!(dataset.crs_wkt.is_some());
}
