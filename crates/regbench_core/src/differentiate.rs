//! Numerical differentiation of sampled signals.
//!
//! [`differentiate`] validates the time grid and signal, then dispatches to
//! one of three methods:
//! - `simple`: central differences with one-sided ends,
//! - `finitediff`: Fornberg interpolation on an oversampled grid,
//! - `tvregdiff`: total-variation regularised differentiation, applied to
//!   every column independently.

pub mod cg;
pub mod finitediff;
pub mod linear_system;
pub mod operators;
pub mod simple;
pub mod tvregdiff;
pub mod types;

pub use types::{
    DiffOptions, FiniteDiffSettings, IterationDiagnostics, Method, MethodKind, Scale,
    TvRegDiffOutput, TvRegDiffSettings,
};

use log::debug;
use nalgebra::DMatrix;

use crate::error::{ConfigurationError, DiffResult};

/// Relative deviation from `t[1] - t[0]` tolerated before a grid counts as non-uniform.
const UNIFORM_GRID_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Vector,
    Matrix,
}

/// Sampled signal: one row per time sample, one column per feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    values: DMatrix<f64>,
    layout: Layout,
}

impl Signal {
    pub fn from_vector(values: &[f64]) -> Self {
        Self {
            values: DMatrix::from_column_slice(values.len(), 1, values),
            layout: Layout::Vector,
        }
    }

    pub fn from_matrix(values: DMatrix<f64>) -> Self {
        Self {
            values,
            layout: Layout::Matrix,
        }
    }

    /// Builds a matrix signal from row-major data (`rows` samples × `columns` features).
    pub fn from_row_slice(rows: usize, columns: usize, data: &[f64]) -> DiffResult<Self> {
        if rows * columns != data.len() {
            return Err(ConfigurationError::Shape(format!(
                "expected {} x {} = {} values, got {}",
                rows,
                columns,
                rows * columns,
                data.len()
            )));
        }
        Ok(Self::from_matrix(DMatrix::from_row_slice(rows, columns, data)))
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn samples(&self) -> usize {
        self.values.nrows()
    }

    pub fn columns(&self) -> usize {
        self.values.ncols()
    }

    pub fn is_vector(&self) -> bool {
        self.layout == Layout::Vector
    }
}

/// Estimated derivatives, one matrix per order starting at order 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Derivative {
    /// Abscissae the rows were evaluated at.
    pub times: Vec<f64>,
    orders: Vec<DMatrix<f64>>,
    layout: Layout,
}

impl Derivative {
    /// The first derivative.
    pub fn first(&self) -> &DMatrix<f64> {
        &self.orders[0]
    }

    /// Derivative of the given order (1-based), if it was computed.
    pub fn order(&self, order: usize) -> Option<&DMatrix<f64>> {
        order.checked_sub(1).and_then(|idx| self.orders.get(idx))
    }

    pub fn max_order(&self) -> usize {
        self.orders.len()
    }

    /// The first derivative as a flat vector when the input was 1-D.
    pub fn to_vector(&self) -> Option<Vec<f64>> {
        match self.layout {
            Layout::Vector => Some(self.orders[0].column(0).iter().copied().collect()),
            Layout::Matrix => None,
        }
    }

    pub fn into_orders(self) -> Vec<DMatrix<f64>> {
        self.orders
    }
}

/// Differentiates `signal` sampled at `times` along its rows.
pub fn differentiate(times: &[f64], signal: &Signal, method: &Method) -> DiffResult<Derivative> {
    validate_inputs(times, signal)?;
    let values = signal.values();
    let dt = times[1] - times[0];

    let (eval_times, orders) = match method {
        Method::Simple => {
            validate_uniform(times)?;
            (times.to_vec(), vec![simple::simple_finite_diff(values, dt)])
        }
        Method::FiniteDiff(settings) => finitediff::finitediff(times, values, settings)?,
        Method::TvRegDiff(settings) => {
            let derivative = tvregdiff_columns(values, dt, settings)?;
            (times.to_vec(), vec![derivative])
        }
    };

    debug!(
        "differentiated {} samples x {} columns with {:?}",
        signal.samples(),
        signal.columns(),
        method.kind()
    );

    Ok(Derivative {
        times: eval_times,
        orders,
        layout: signal.layout,
    })
}

/// Resolves `method` by name and differentiates. Unknown names fail before
/// any input is inspected.
pub fn differentiate_by_name(
    times: &[f64],
    signal: &Signal,
    method: &str,
    options: DiffOptions,
) -> DiffResult<Derivative> {
    let method = Method::from_name(method, options)?;
    differentiate(times, signal, &method)
}

/// Runs TVRegDiff on each column and aligns the result with the input rows.
///
/// Small scale yields n + 1 points per column; the leading boundary point is
/// dropped so row `i` estimates the derivative at `t[i]`.
fn tvregdiff_columns(
    values: &DMatrix<f64>,
    dt: f64,
    settings: &TvRegDiffSettings,
) -> DiffResult<DMatrix<f64>> {
    let n = values.nrows();
    let mut column_settings = settings.clone();
    column_settings.grid_spacing = Some(settings.grid_spacing.unwrap_or(dt));

    let mut out = DMatrix::zeros(n, values.ncols());
    for (j, column) in values.column_iter().enumerate() {
        let data: Vec<f64> = column.iter().copied().collect();
        let result = tvregdiff::tvregdiff(&data, &column_settings)?;
        let skip = result.derivative.len() - n;
        for (i, value) in result.derivative.iter().skip(skip).enumerate() {
            out[(i, j)] = *value;
        }
    }
    Ok(out)
}

fn validate_inputs(times: &[f64], signal: &Signal) -> DiffResult<()> {
    if times.len() < 2 {
        return Err(ConfigurationError::Shape(format!(
            "need at least 2 time samples, got {}",
            times.len()
        )));
    }
    if signal.samples() != times.len() {
        return Err(ConfigurationError::Shape(format!(
            "signal has {} samples but the time grid has {}",
            signal.samples(),
            times.len()
        )));
    }
    if signal.columns() == 0 {
        return Err(ConfigurationError::Shape(
            "signal has no columns".to_string(),
        ));
    }
    if times.iter().any(|t| !t.is_finite()) {
        return Err(ConfigurationError::Invalid(
            "time grid contains non-finite values".to_string(),
        ));
    }
    if times.windows(2).any(|w| !(w[1] > w[0])) {
        return Err(ConfigurationError::Invalid(
            "time grid must be strictly increasing".to_string(),
        ));
    }
    Ok(())
}

fn validate_uniform(times: &[f64]) -> DiffResult<()> {
    let dt = times[1] - times[0];
    let tolerance = UNIFORM_GRID_TOLERANCE * dt;
    for (i, w) in times.windows(2).enumerate() {
        if ((w[1] - w[0]) - dt).abs() > tolerance {
            return Err(ConfigurationError::Invalid(format!(
                "time grid is not uniform: step {} is {}, expected {}",
                i,
                w[1] - w[0],
                dt
            )));
        }
    }
    Ok(())
}
