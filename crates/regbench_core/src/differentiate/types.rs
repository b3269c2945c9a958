//! Settings and result types shared by the differentiation methods.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::cg::CgStatus;
use crate::error::{ConfigurationError, ConvergenceWarning};

/// Discretisation used by TVRegDiff.
///
/// `Small` works on n+1 derivative points and has better boundary behaviour;
/// `Large` works on n points with simpler numerics for long signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    #[default]
    Small,
    Large,
}

impl Scale {
    /// Length of the derivative estimate `u` for `n` data samples.
    pub fn estimate_len(self, n: usize) -> usize {
        match self {
            Scale::Small => n + 1,
            Scale::Large => n,
        }
    }
}

impl FromStr for Scale {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "small" => Ok(Scale::Small),
            "large" => Ok(Scale::Large),
            other => Err(ConfigurationError::Invalid(format!(
                "scale must be \"small\" or \"large\", got \"{}\"",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TvRegDiffSettings {
    pub iterations: usize,
    /// Regularisation strength. Larger values give smoother derivatives.
    pub alpha: f64,
    /// Starting point for `u`; defaults to the naive difference of the data.
    pub initial_estimate: Option<Vec<f64>>,
    pub scale: Scale,
    /// Added to |D u|^2 before the reciprocal square root.
    pub epsilon: f64,
    /// Overrides the grid spacing. Defaults to 1/n standalone and to
    /// `t[1] - t[0]` through the façade.
    pub grid_spacing: Option<f64>,
    pub verbose: bool,
}

impl Default for TvRegDiffSettings {
    fn default() -> Self {
        Self {
            iterations: 25,
            alpha: 0.05,
            initial_estimate: None,
            scale: Scale::Small,
            epsilon: 1e-6,
            grid_spacing: None,
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FiniteDiffSettings {
    /// Highest derivative order returned.
    pub order: usize,
    /// Grid points taken on each side of an evaluation point.
    pub n_points: usize,
    /// Oversampling factor of the fit grid.
    pub fit_ratio: usize,
}

impl Default for FiniteDiffSettings {
    fn default() -> Self {
        Self {
            order: 1,
            n_points: 2,
            fit_ratio: 10,
        }
    }
}

/// Per-method options used when a method is selected by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffOptions {
    pub finitediff: FiniteDiffSettings,
    pub tvregdiff: TvRegDiffSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodKind {
    Simple,
    FiniteDiff,
    TvRegDiff,
}

impl FromStr for MethodKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" | "simple_finite_diff" => Ok(MethodKind::Simple),
            "finitediff" => Ok(MethodKind::FiniteDiff),
            "tvregdiff" => Ok(MethodKind::TvRegDiff),
            other => Err(ConfigurationError::UnknownMethod(other.to_string())),
        }
    }
}

/// A differentiation method together with its settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Method {
    Simple,
    FiniteDiff(FiniteDiffSettings),
    TvRegDiff(TvRegDiffSettings),
}

impl Method {
    pub fn from_kind(kind: MethodKind, options: DiffOptions) -> Self {
        match kind {
            MethodKind::Simple => Method::Simple,
            MethodKind::FiniteDiff => Method::FiniteDiff(options.finitediff),
            MethodKind::TvRegDiff => Method::TvRegDiff(options.tvregdiff),
        }
    }

    /// Resolves a method name (`"simple"`, `"finitediff"`, `"tvregdiff"`).
    pub fn from_name(name: &str, options: DiffOptions) -> Result<Self, ConfigurationError> {
        Ok(Self::from_kind(name.parse()?, options))
    }

    pub fn kind(&self) -> MethodKind {
        match self {
            Method::Simple => MethodKind::Simple,
            Method::FiniteDiff(_) => MethodKind::FiniteDiff,
            Method::TvRegDiff(_) => MethodKind::TvRegDiff,
        }
    }
}

/// What one outer TVRegDiff iteration did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationDiagnostics {
    pub iteration: usize,
    /// ‖s‖ / ‖u‖ for the update `s` applied in this iteration.
    pub relative_change: f64,
    pub gradient_norm: f64,
    pub cg_status: CgStatus,
    pub cg_iterations: usize,
    #[serde(skip)]
    pub warning: Option<ConvergenceWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TvRegDiffOutput {
    /// Derivative estimate, `scale.estimate_len(n)` points.
    pub derivative: Vec<f64>,
    pub diagnostics: Vec<IterationDiagnostics>,
}

impl TvRegDiffOutput {
    pub fn warnings(&self) -> impl Iterator<Item = &ConvergenceWarning> {
        self.diagnostics.iter().filter_map(|d| d.warning.as_ref())
    }
}
