//! Request values supplied by the UI and the on-disk raster naming convention.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Years offered by the multi-year scenario slider.
pub const MULTI_YEARS: [u16; 4] = [2021, 2041, 2061, 2081];

/// The only year available for the single-year scenario.
pub const SINGLE_YEAR: u16 = 2021;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Crop {
    Apple,
    Grape,
    Peach,
    Pear,
    Tangerine,
}

impl Crop {
    pub const ALL: [Crop; 5] = [
        Crop::Apple,
        Crop::Grape,
        Crop::Peach,
        Crop::Pear,
        Crop::Tangerine,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Crop::Apple => "apple",
            Crop::Grape => "grape",
            Crop::Peach => "peach",
            Crop::Pear => "pear",
            Crop::Tangerine => "tangerine",
        }
    }
}

impl fmt::Display for Crop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Crop {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Crop::ALL
            .into_iter()
            .find(|crop| crop.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidSelection(format!("unknown crop: {s}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    /// SSP2-4.5, published for every year in [`MULTI_YEARS`].
    Ssp245,
    /// SSP5-8.5, published for [`SINGLE_YEAR`] only.
    Ssp585,
}

impl Scenario {
    pub const ALL: [Scenario; 2] = [Scenario::Ssp245, Scenario::Ssp585];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Ssp245 => "SSP245",
            Scenario::Ssp585 => "SSP585",
        }
    }

    pub fn is_single_year(&self) -> bool {
        matches!(self, Scenario::Ssp585)
    }

    pub fn years(&self) -> &'static [u16] {
        if self.is_single_year() {
            std::slice::from_ref(&SINGLE_YEAR)
        } else {
            &MULTI_YEARS
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidSelection(format!("unknown scenario: {s}")))
    }
}

/// Resolve the year the UI widgets currently point at.
///
/// The single-year scenario ignores the slider: the checkbox either pins the
/// year to [`SINGLE_YEAR`] or leaves it unselected.
pub fn resolve_year(scenario: Scenario, single_year_checked: bool, slider: u16) -> Option<u16> {
    if scenario.is_single_year() {
        single_year_checked.then_some(SINGLE_YEAR)
    } else {
        Some(slider)
    }
}

/// One display request as produced by the selection widgets.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub crop: Option<Crop>,
    pub scenario: Scenario,
    pub year: Option<u16>,
    pub opacity: f64,
}

impl Selection {
    pub fn validate(&self) -> Result<ValidSelection> {
        let crop = self
            .crop
            .ok_or(Error::MissingSelection("choose a crop first"))?;
        let year = self
            .year
            .ok_or(Error::MissingSelection("choose a year first"))?;

        if !self.scenario.years().contains(&year) {
            return Err(Error::InvalidSelection(format!(
                "year {year} is not available for {}",
                self.scenario
            )));
        }
        validate_opacity(self.opacity)?;

        Ok(ValidSelection {
            crop,
            scenario: self.scenario,
            year,
            opacity: self.opacity,
        })
    }
}

/// A selection whose crop and year are known to be present and consistent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidSelection {
    pub crop: Crop,
    pub scenario: Scenario,
    pub year: u16,
    pub opacity: f64,
}

impl ValidSelection {
    /// `<base>/<crop>/<scenario>/<crop>_<scenario>_<year>_FULL.tif`
    pub fn raster_path(&self, base: &Path) -> PathBuf {
        base.join(self.crop.as_str())
            .join(self.scenario.as_str())
            .join(format!(
                "{}_{}_{}_FULL.tif",
                self.crop, self.scenario, self.year
            ))
    }

    pub fn layer_name(&self) -> String {
        format!("{}_{}_{}", self.crop, self.scenario, self.year)
    }
}

/// Validate `selection` and return the path of its raster, which must exist.
pub fn locate_raster(base: &Path, selection: &Selection) -> Result<PathBuf> {
    let path = selection.validate()?.raster_path(base);
    if !path.is_file() {
        return Err(Error::FileNotFound { path });
    }
    Ok(path)
}

pub(crate) fn validate_opacity(opacity: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&opacity) {
        return Err(Error::InvalidSelection(format!(
            "opacity must be within [0, 1], got {opacity}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn selection(crop: Option<Crop>, scenario: Scenario, year: Option<u16>) -> Selection {
        Selection {
            crop,
            scenario,
            year,
            opacity: 0.7,
        }
    }

    #[test]
    fn test_single_year_scenario_ignores_slider() {
        for slider in MULTI_YEARS {
            assert_eq!(resolve_year(Scenario::Ssp585, true, slider), Some(2021));
            assert_eq!(resolve_year(Scenario::Ssp585, false, slider), None);
        }
    }

    #[test]
    fn test_multi_year_scenario_uses_slider() {
        assert_eq!(resolve_year(Scenario::Ssp245, true, 2061), Some(2061));
        assert_eq!(resolve_year(Scenario::Ssp245, false, 2081), Some(2081));
    }

    #[test]
    fn test_raster_path_convention() {
        let valid = selection(Some(Crop::Apple), Scenario::Ssp245, Some(2041))
            .validate()
            .unwrap();
        let path = valid.raster_path(Path::new("full_tif"));

        assert_eq!(
            path,
            PathBuf::from("full_tif/apple/SSP245/apple_SSP245_2041_FULL.tif")
        );
        assert_eq!(valid.layer_name(), "apple_SSP245_2041");
    }

    #[test]
    fn test_missing_crop_or_year() {
        let err = selection(None, Scenario::Ssp245, Some(2021))
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::MissingSelection(_)));

        let err = selection(Some(Crop::Pear), Scenario::Ssp585, None)
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::MissingSelection(_)));
    }

    #[test]
    fn test_year_must_belong_to_scenario() {
        let err = selection(Some(Crop::Peach), Scenario::Ssp585, Some(2041))
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSelection(_)));

        let err = selection(Some(Crop::Peach), Scenario::Ssp245, Some(2030))
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSelection(_)));
    }

    #[test]
    fn test_opacity_range() {
        let mut sel = selection(Some(Crop::Grape), Scenario::Ssp245, Some(2021));
        sel.opacity = 1.5;
        assert!(sel.validate().is_err());
        sel.opacity = f64::NAN;
        assert!(sel.validate().is_err());
        sel.opacity = 0.0;
        assert!(sel.validate().is_ok());
    }

    #[test]
    fn test_locate_missing_raster_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let sel = selection(Some(Crop::Apple), Scenario::Ssp245, Some(2041));

        let expected = temp_dir
            .path()
            .join("apple")
            .join("SSP245")
            .join("apple_SSP245_2041_FULL.tif");

        match locate_raster(temp_dir.path(), &sel) {
            Err(Error::FileNotFound { path }) => assert_eq!(path, expected),
            other => panic!("expected FileNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_identifiers() {
        assert_eq!("Tangerine".parse::<Crop>().unwrap(), Crop::Tangerine);
        assert_eq!("ssp585".parse::<Scenario>().unwrap(), Scenario::Ssp585);
        assert!("banana".parse::<Crop>().is_err());
    }
}
