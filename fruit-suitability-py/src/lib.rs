use ::fruit_suitability::selection;
use ::fruit_suitability::{
    render, BoundaryLayer, Crop, DashboardConfig, Error, Scenario, Selection,
};
use pyo3::exceptions::{PyFileNotFoundError, PyIOError, PyValueError};
use pyo3::prelude::*;
use std::path::PathBuf;

#[pymodule]
#[pyo3(name = "fruit_suitability")]
fn fruit_suitability_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyDashboard>()?;
    m.add_function(wrap_pyfunction!(resolve_year, m)?)?;
    m.add_function(wrap_pyfunction!(raster_path, m)?)?;
    Ok(())
}

fn to_py_err(err: Error) -> PyErr {
    match err {
        Error::FileNotFound { path } => PyFileNotFoundError::new_err(format!(
            "TIFF file does not exist: {}",
            path.display()
        )),
        Error::MissingSelection(_) | Error::InvalidSelection(_) | Error::PaletteCollision { .. } => {
            PyValueError::new_err(err.to_string())
        }
        other => PyIOError::new_err(other.to_string()),
    }
}

fn parse_selection(
    crop: Option<&str>,
    scenario: &str,
    year: Option<u16>,
    opacity: f64,
) -> Result<Selection, Error> {
    Ok(Selection {
        crop: crop.map(str::parse::<Crop>).transpose()?,
        scenario: scenario.parse::<Scenario>()?,
        year,
        opacity,
    })
}

/// Holds the boundary layer for the lifetime of a UI session.
#[pyclass(name = "Dashboard", frozen)]
pub struct PyDashboard {
    config: DashboardConfig,
    boundary: BoundaryLayer,
}

#[pymethods]
impl PyDashboard {
    #[new]
    #[pyo3(signature = (raster_dir, boundary_path, height=700, zoom=8))]
    fn new(raster_dir: PathBuf, boundary_path: PathBuf, height: u32, zoom: u8) -> PyResult<Self> {
        let config = DashboardConfig {
            raster_dir,
            boundary_path,
            height,
            zoom,
            ..DashboardConfig::default()
        };
        let boundary = BoundaryLayer::open(&config.boundary_path).map_err(to_py_err)?;
        Ok(Self { config, boundary })
    }

    /// Render the selected raster as a standalone HTML map.
    #[pyo3(signature = (crop, scenario, year, opacity=0.7))]
    fn render_html(
        &self,
        crop: Option<String>,
        scenario: String,
        year: Option<u16>,
        opacity: f64,
    ) -> PyResult<String> {
        let selection = parse_selection(crop.as_deref(), &scenario, year, opacity).map_err(to_py_err)?;
        let rendered = render(&self.config, &self.boundary, &selection).map_err(to_py_err)?;
        Ok(rendered.to_html(&self.config))
    }

    #[getter]
    fn boundary_count(&self) -> usize {
        self.boundary.features().len()
    }

    fn __repr__(&self) -> String {
        format!(
            "Dashboard(raster_dir='{}', boundary_features={})",
            self.config.raster_dir.display(),
            self.boundary.features().len()
        )
    }
}

#[pyfunction]
#[pyo3(signature = (scenario, single_year_checked, slider))]
pub fn resolve_year(scenario: String, single_year_checked: bool, slider: u16) -> PyResult<Option<u16>> {
    let scenario: Scenario = scenario.parse().map_err(to_py_err)?;
    Ok(selection::resolve_year(scenario, single_year_checked, slider))
}

#[pyfunction]
pub fn raster_path(base: PathBuf, crop: String, scenario: String, year: u16) -> PyResult<String> {
    let selection = parse_selection(Some(&crop), &scenario, Some(year), 1.0).map_err(to_py_err)?;
    let valid = selection.validate().map_err(to_py_err)?;
    Ok(valid.raster_path(&base).display().to_string())
}
