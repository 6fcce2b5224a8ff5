//! Loading single-band suitability rasters and resampling them into
//! geographic coordinates.
//!
//! Class values are categorical, so resampling is strictly nearest-neighbour:
//! every output cell copies exactly one source cell or becomes `NaN`.

use std::path::Path;

use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use gdal::Dataset;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// GDAL-ordered affine transform: `[x0, dx/dcol, dx/drow, y0, dy/dcol, dy/drow]`.
pub type GeoTransform = [f64; 6];

/// EPSG code of WGS 84 longitude/latitude.
pub const GEOGRAPHIC_EPSG: u32 = 4326;

/// Points sampled along each edge of the source footprint.
const EDGE_SAMPLES: usize = 21;

/// Moves points from one coordinate reference system into another, in place.
pub trait CoordinateTransform {
    fn transform(&self, xs: &mut [f64], ys: &mut [f64]) -> Result<()>;
}

/// For sources that already live in the target system.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl CoordinateTransform for IdentityTransform {
    fn transform(&self, _xs: &mut [f64], _ys: &mut [f64]) -> Result<()> {
        Ok(())
    }
}

pub struct GdalTransform(CoordTransform);

impl GdalTransform {
    /// Build the forward (source → target) and inverse transforms.
    ///
    /// Both systems use x = longitude/easting, y = latitude/northing.
    pub fn pair(source: &SpatialRef, target: &SpatialRef) -> Result<(Self, Self)> {
        let mut source = source.clone();
        let mut target = target.clone();
        source.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
        target.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);

        let forward = CoordTransform::new(&source, &target)
            .map_err(|e| Error::Reprojection(format!("no transform to target CRS: {e}")))?;
        let inverse = CoordTransform::new(&target, &source)
            .map_err(|e| Error::Reprojection(format!("no transform from target CRS: {e}")))?;

        Ok((Self(forward), Self(inverse)))
    }
}

impl CoordinateTransform for GdalTransform {
    fn transform(&self, xs: &mut [f64], ys: &mut [f64]) -> Result<()> {
        self.0.transform_coords(xs, ys, &mut [])?;
        Ok(())
    }
}

/// Geographic bounding rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    pub fn from_geo_transform(gt: &GeoTransform, width: usize, height: usize) -> Self {
        let corners = [
            apply(gt, 0.0, 0.0),
            apply(gt, width as f64, 0.0),
            apply(gt, 0.0, height as f64),
            apply(gt, width as f64, height as f64),
        ];

        let mut bounds = Bounds {
            south: f64::INFINITY,
            west: f64::INFINITY,
            north: f64::NEG_INFINITY,
            east: f64::NEG_INFINITY,
        };
        for (x, y) in corners {
            bounds.west = bounds.west.min(x);
            bounds.east = bounds.east.max(x);
            bounds.south = bounds.south.min(y);
            bounds.north = bounds.north.max(y);
        }
        bounds
    }

    /// `[[south, west], [north, east]]`, the corner order Leaflet expects.
    pub fn to_leaflet(&self) -> [[f64; 2]; 2] {
        [[self.south, self.west], [self.north, self.east]]
    }
}

/// A single-band grid in its native coordinate reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterDataset {
    pub width: usize,
    pub height: usize,
    /// Row-major, top row first.
    pub values: Vec<f64>,
    pub geo_transform: GeoTransform,
    pub crs_wkt: Option<String>,
    pub nodata: Option<f64>,
}

impl RasterDataset {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let dataset = Dataset::open(path)
            .map_err(|e| Error::Format(format!("cannot open {}: {e}", path.display())))?;

        let band_count = dataset.raster_count();
        if band_count != 1 {
            return Err(Error::Format(format!(
                "{} has {} bands, expected a single band",
                path.display(),
                band_count
            )));
        }

        let (width, height) = dataset.raster_size();
        let geo_transform = dataset.geo_transform().map_err(|e| {
            Error::Format(format!("{} has no geo transform: {e}", path.display()))
        })?;

        let projection = dataset.projection();
        let crs_wkt = (!projection.trim().is_empty()).then_some(projection);

        let band = dataset.rasterband(1)?;
        let nodata = band.no_data_value();
        let buffer = band.read_band_as::<f64>()?;

        debug!(
            "Loaded {}: {}x{} pixels, nodata={:?}",
            path.display(),
            width,
            height,
            nodata
        );

        Ok(Self {
            width,
            height,
            values: buffer.data().to_vec(),
            geo_transform,
            crs_wkt,
            nodata,
        })
    }

    fn is_nodata(&self, value: f64) -> bool {
        !value.is_finite() || self.nodata.is_some_and(|nodata| value == nodata)
    }

    /// Value of the cell containing the world point, if it holds data.
    fn sample_nearest(&self, inverse: &GeoTransform, x: f64, y: f64) -> Option<f64> {
        if !(x.is_finite() && y.is_finite()) {
            return None;
        }
        let (px, py) = apply(inverse, x, y);
        if px < 0.0 || py < 0.0 {
            return None;
        }

        let (col, row) = (px.floor() as usize, py.floor() as usize);
        if col >= self.width || row >= self.height {
            return None;
        }

        let value = self.values[row * self.width + col];
        (!self.is_nodata(value)).then_some(value)
    }
}

/// A grid resampled onto geographic coordinates. No-data cells are `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReprojectedGrid {
    pub width: usize,
    pub height: usize,
    pub values: Vec<f64>,
    pub geo_transform: GeoTransform,
    pub bounds: Bounds,
    /// The source no-data value, kept for reference only.
    pub nodata: Option<f64>,
}

/// Compute the output transform and size for reprojecting `dataset`.
///
/// The target extent is the bounding box of the transformed footprint edges.
/// Pixels are square and sized so that the output keeps the same number of
/// pixels along its diagonal as the source.
pub fn default_transform<T>(
    dataset: &RasterDataset,
    forward: &T,
) -> Result<(GeoTransform, usize, usize)>
where
    T: CoordinateTransform + ?Sized,
{
    if dataset.width == 0 || dataset.height == 0 {
        return Err(Error::Reprojection(format!(
            "source raster is empty ({}x{})",
            dataset.width, dataset.height
        )));
    }

    let (mut xs, mut ys) = edge_samples(dataset);
    transform_lenient(forward, &mut xs, &mut ys);

    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for (&x, &y) in xs.iter().zip(&ys) {
        if x.is_finite() && y.is_finite() {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }
    if !(min_x.is_finite() && max_x.is_finite()) {
        return Err(Error::Reprojection(
            "source footprint could not be transformed".to_string(),
        ));
    }

    let (extent_x, extent_y) = (max_x - min_x, max_y - min_y);
    let pixel_diagonal = (dataset.width as f64).hypot(dataset.height as f64);
    let resolution = extent_x.hypot(extent_y) / pixel_diagonal;
    if !(resolution.is_finite() && resolution > 0.0) {
        return Err(Error::Reprojection(format!(
            "degenerate target resolution {resolution}"
        )));
    }

    let width = (extent_x / resolution + 0.5).floor();
    let height = (extent_y / resolution + 0.5).floor();
    if width < 1.0 || height < 1.0 {
        return Err(Error::Reprojection(format!(
            "degenerate target size {width}x{height}"
        )));
    }

    let geo_transform = [min_x, resolution, 0.0, max_y, 0.0, -resolution];
    Ok((geo_transform, width as usize, height as usize))
}

/// Resample `dataset` with nearest-neighbour lookup.
///
/// `forward` maps source coordinates to target coordinates and `inverse` the
/// reverse. Output cell centres are pulled back through `inverse` one row at a
/// time.
pub fn reproject_with<F, I>(dataset: &RasterDataset, forward: &F, inverse: &I) -> Result<ReprojectedGrid>
where
    F: CoordinateTransform + ?Sized,
    I: CoordinateTransform + ?Sized,
{
    let source_inverse = invert(&dataset.geo_transform)?;
    let (geo_transform, width, height) = default_transform(dataset, forward)?;

    debug!(
        "Target grid {}x{}, resolution {}",
        width, height, geo_transform[1]
    );

    let mut values = vec![f64::NAN; width * height];
    let mut xs = vec![0.0; width];
    let mut ys = vec![0.0; width];

    for (row, out_row) in values.chunks_exact_mut(width).enumerate() {
        for col in 0..width {
            let (x, y) = apply(&geo_transform, col as f64 + 0.5, row as f64 + 0.5);
            xs[col] = x;
            ys[col] = y;
        }
        transform_lenient(inverse, &mut xs, &mut ys);

        for (col, cell) in out_row.iter_mut().enumerate() {
            if let Some(value) = dataset.sample_nearest(&source_inverse, xs[col], ys[col]) {
                *cell = value;
            }
        }
    }

    Ok(ReprojectedGrid {
        width,
        height,
        values,
        geo_transform,
        bounds: Bounds::from_geo_transform(&geo_transform, width, height),
        nodata: dataset.nodata,
    })
}

/// Load the raster at `path` and reproject it into `target`.
pub fn reproject(path: &Path, target: &SpatialRef) -> Result<ReprojectedGrid> {
    let dataset = RasterDataset::open(path)?;

    let wkt = dataset.crs_wkt.as_deref().ok_or_else(|| {
        Error::Reprojection(format!(
            "{} has no coordinate reference system",
            path.display()
        ))
    })?;
    let source = SpatialRef::from_wkt(wkt)
        .map_err(|e| Error::Reprojection(format!("unreadable source CRS: {e}")))?;

    let (forward, inverse) = GdalTransform::pair(&source, target)?;
    let grid = reproject_with(&dataset, &forward, &inverse)?;

    info!(
        "Reprojected {} to {}x{} cells",
        path.display(),
        grid.width,
        grid.height
    );
    Ok(grid)
}

/// WGS 84 in longitude/latitude order.
pub fn geographic_crs() -> Result<SpatialRef> {
    Ok(SpatialRef::from_epsg(GEOGRAPHIC_EPSG)?)
}

fn apply(gt: &GeoTransform, col: f64, row: f64) -> (f64, f64) {
    (
        gt[0] + col * gt[1] + row * gt[2],
        gt[3] + col * gt[4] + row * gt[5],
    )
}

fn invert(gt: &GeoTransform) -> Result<GeoTransform> {
    let det = gt[1] * gt[5] - gt[2] * gt[4];
    if det == 0.0 || !det.is_finite() {
        return Err(Error::Reprojection(
            "source geo transform is not invertible".to_string(),
        ));
    }

    let a = gt[5] / det;
    let b = -gt[2] / det;
    let d = -gt[4] / det;
    let e = gt[1] / det;
    Ok([
        -(a * gt[0] + b * gt[3]),
        a,
        b,
        -(d * gt[0] + e * gt[3]),
        d,
        e,
    ])
}

fn edge_samples(dataset: &RasterDataset) -> (Vec<f64>, Vec<f64>) {
    let (w, h) = (dataset.width as f64, dataset.height as f64);
    let mut xs = Vec::with_capacity(EDGE_SAMPLES * 4);
    let mut ys = Vec::with_capacity(EDGE_SAMPLES * 4);

    for i in 0..EDGE_SAMPLES {
        let t = i as f64 / (EDGE_SAMPLES - 1) as f64;
        for (col, row) in [(t * w, 0.0), (t * w, h), (0.0, t * h), (w, t * h)] {
            let (x, y) = apply(&dataset.geo_transform, col, row);
            xs.push(x);
            ys.push(y);
        }
    }
    (xs, ys)
}

/// Transform a batch, falling back to point-by-point so that one failing
/// point only turns itself into `NaN`.
fn transform_lenient<T>(transform: &T, xs: &mut [f64], ys: &mut [f64])
where
    T: CoordinateTransform + ?Sized,
{
    let (orig_x, orig_y) = (xs.to_vec(), ys.to_vec());
    if transform.transform(xs, ys).is_ok() {
        return;
    }

    for i in 0..xs.len() {
        let mut x = [orig_x[i]];
        let mut y = [orig_y[i]];
        match transform.transform(&mut x, &mut y) {
            Ok(()) => {
                xs[i] = x[0];
                ys[i] = y[0];
            }
            Err(_) => {
                xs[i] = f64::NAN;
                ys[i] = f64::NAN;
            }
        }
    }
}
