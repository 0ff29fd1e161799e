//! Solver preferences: tolerances, discretization choice, Newton and damping controls.
//! Defaults are usable as is; values can be overridden with builder setters or read from a TOML
//! document, either at top level or inside a `[solver]` table:
//! ```toml
//! [solver]
//! error_tolerance = 1e-10
//! damped = true
//! discretization = "collocation"
//! max_iterations = 25
//! ```
use crate::numerical::errors::{SolveError, SolveResult};
use std::path::Path;
use std::str::FromStr;
use strum_macros::{Display, EnumIter, EnumString};

/// spectral discretization technology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum Discretization {
    #[strum(to_string = "collocation", serialize = "chebcolloc2")]
    Collocation,
    #[strum(to_string = "ultraspherical", serialize = "ultraS")]
    Ultraspherical,
}

impl Discretization {
    /// parse technology name, unknown names are fatal
    pub fn from_name(name: &str) -> SolveResult<Self> {
        Discretization::from_str(name.trim())
            .map_err(|_| SolveError::UnsupportedTechnology(name.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    /// Newton convergence threshold (error estimate or residual norm)
    pub error_tolerance: f64,
    /// damped Newton on/off
    pub damped: bool,
    pub discretization: Discretization,
    /// Newton step cap
    pub max_iterations: usize,
    /// pause of the logging display after every Newton step, ms
    pub display_pause_ms: Option<u64>,
    /// 1-D discretization sizes
    pub min_dimension: usize,
    pub max_dimension: usize,
    /// 2-D discretization sizes (per axis)
    pub min_dimension_2d: usize,
    pub max_dimension_2d: usize,
    /// relative size of trailing coefficients accepted as resolved
    pub discretization_tol: f64,
    /// base tolerance of low rank decompositions and boundary data checks
    pub chebfun_eps: f64,
    /// threshold of the corner continuity diagnostic; None means 100*sqrt(chebfun_eps)
    pub corner_tolerance: Option<f64>,
    pub max_damp_iter: usize,
    pub damp_factor: f64,
    pub log_level: Option<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            error_tolerance: 1e-10,
            damped: true,
            discretization: Discretization::Ultraspherical,
            max_iterations: 25,
            display_pause_ms: None,
            min_dimension: 17,
            max_dimension: 513,
            min_dimension_2d: 9,
            max_dimension_2d: 65,
            discretization_tol: 1e-13,
            chebfun_eps: f64::EPSILON,
            corner_tolerance: None,
            max_damp_iter: 6,
            damp_factor: 0.5,
            log_level: None,
        }
    }
}

impl Preferences {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_error_tolerance(mut self, tol: f64) -> Self {
        self.error_tolerance = tol;
        self
    }
    pub fn with_damping(mut self, damped: bool) -> Self {
        self.damped = damped;
        self
    }
    pub fn with_discretization(mut self, discretization: Discretization) -> Self {
        self.discretization = discretization;
        self
    }
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
    pub fn with_display_pause(mut self, ms: u64) -> Self {
        self.display_pause_ms = Some(ms);
        self
    }
    pub fn with_dimensions(mut self, min: usize, max: usize) -> Self {
        self.min_dimension = min;
        self.max_dimension = max;
        self
    }
    pub fn with_dimensions_2d(mut self, min: usize, max: usize) -> Self {
        self.min_dimension_2d = min;
        self.max_dimension_2d = max;
        self
    }
    pub fn with_corner_tolerance(mut self, tol: f64) -> Self {
        self.corner_tolerance = Some(tol);
        self
    }

    /// effective threshold of the corner continuity diagnostic
    pub fn corner_threshold(&self) -> f64 {
        self.corner_tolerance
            .unwrap_or(100.0 * self.chebfun_eps.sqrt())
    }

    pub fn check(&self) -> SolveResult<()> {
        if !(self.error_tolerance > 0.0) {
            return Err(SolveError::Config("error_tolerance must be positive".into()));
        }
        if self.max_iterations == 0 {
            return Err(SolveError::Config("max_iterations must be at least 1".into()));
        }
        if self.min_dimension < 2 || self.min_dimension > self.max_dimension {
            return Err(SolveError::Config(format!(
                "invalid dimension range {}..{}",
                self.min_dimension, self.max_dimension
            )));
        }
        if self.min_dimension_2d < 2 || self.min_dimension_2d > self.max_dimension_2d {
            return Err(SolveError::Config(format!(
                "invalid 2d dimension range {}..{}",
                self.min_dimension_2d, self.max_dimension_2d
            )));
        }
        if !(self.damp_factor >= 0.0) {
            return Err(SolveError::Config("damp_factor must be non-negative".into()));
        }
        Ok(())
    }

    /// read preferences from a TOML document; keys missing in the document keep their defaults
    pub fn from_toml_str(document: &str) -> SolveResult<Self> {
        let table: toml::Table = document
            .parse()
            .map_err(|e: toml::de::Error| SolveError::Config(e.to_string()))?;
        let table = match table.get("solver").and_then(|v| v.as_table()) {
            Some(section) => section.clone(),
            None => table,
        };
        let mut prefs = Preferences::default();
        for (key, value) in table.iter() {
            let bad = || SolveError::Config(format!("wrong type of value for key {}", key));
            match key.as_str() {
                "error_tolerance" => prefs.error_tolerance = as_f64(value).ok_or_else(bad)?,
                "damped" => prefs.damped = value.as_bool().ok_or_else(bad)?,
                "discretization" => {
                    prefs.discretization =
                        Discretization::from_name(value.as_str().ok_or_else(bad)?)?
                }
                "max_iterations" => prefs.max_iterations = as_usize(value).ok_or_else(bad)?,
                "display_pause_ms" => {
                    prefs.display_pause_ms = Some(as_usize(value).ok_or_else(bad)? as u64)
                }
                "min_dimension" => prefs.min_dimension = as_usize(value).ok_or_else(bad)?,
                "max_dimension" => prefs.max_dimension = as_usize(value).ok_or_else(bad)?,
                "min_dimension_2d" => prefs.min_dimension_2d = as_usize(value).ok_or_else(bad)?,
                "max_dimension_2d" => prefs.max_dimension_2d = as_usize(value).ok_or_else(bad)?,
                "discretization_tol" => {
                    prefs.discretization_tol = as_f64(value).ok_or_else(bad)?
                }
                "chebfun_eps" => prefs.chebfun_eps = as_f64(value).ok_or_else(bad)?,
                "corner_tolerance" => prefs.corner_tolerance = Some(as_f64(value).ok_or_else(bad)?),
                "max_damp_iter" => prefs.max_damp_iter = as_usize(value).ok_or_else(bad)?,
                "damp_factor" => prefs.damp_factor = as_f64(value).ok_or_else(bad)?,
                "log_level" => prefs.log_level = Some(value.as_str().ok_or_else(bad)?.to_string()),
                other => log::warn!("unknown preference key {} ignored", other),
            }
        }
        prefs.check()?;
        Ok(prefs)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> SolveResult<Self> {
        let document = std::fs::read_to_string(path)?;
        Self::from_toml_str(&document)
    }
}

fn as_f64(value: &toml::Value) -> Option<f64> {
    value
        .as_float()
        .or_else(|| value.as_integer().map(|i| i as f64))
}

fn as_usize(value: &toml::Value) -> Option<usize> {
    value
        .as_integer()
        .and_then(|i| if i >= 0 { Some(i as usize) } else { None })
}
