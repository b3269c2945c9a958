mod system;

pub use system::{list_systems, WasmBenchmarkSystem};

use nalgebra::DMatrix;
use regbench_core::differentiate::{differentiate_by_name, DiffOptions, Signal};
use regbench_core::error::DiffResult;
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

/// Derivative estimates as plain arrays for the JS side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivativeOutput {
    pub times: Vec<f64>,
    pub columns: usize,
    /// One row-major `times.len() × columns` block per derivative order, starting at order 1.
    pub orders: Vec<Vec<f64>>,
}

pub(crate) fn row_major(matrix: &DMatrix<f64>) -> Vec<f64> {
    let mut flat = Vec::with_capacity(matrix.len());
    for row in matrix.row_iter() {
        flat.extend(row.iter().copied());
    }
    flat
}

pub(crate) fn differentiate_flat(
    times: &[f64],
    values: &[f64],
    columns: usize,
    method: &str,
    options: DiffOptions,
) -> DiffResult<DerivativeOutput> {
    let rows = if columns == 0 { 0 } else { values.len() / columns };
    let signal = if columns == 1 {
        Signal::from_vector(values)
    } else {
        Signal::from_row_slice(rows, columns, values)?
    };
    let derivative = differentiate_by_name(times, &signal, method, options)?;
    let eval_times = derivative.times.clone();
    let orders = derivative
        .into_orders()
        .into_iter()
        .map(|matrix| row_major(&matrix))
        .collect();
    Ok(DerivativeOutput {
        times: eval_times,
        columns,
        orders,
    })
}

/// Differentiates row-major `values` (`times.len()` rows of `columns` features).
///
/// `options` may be `undefined` or a partial `{ finitediff, tvregdiff }` object.
#[wasm_bindgen]
pub fn differentiate(
    times: Vec<f64>,
    values: Vec<f64>,
    columns: usize,
    method: &str,
    options: JsValue,
) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let options: DiffOptions = if options.is_undefined() || options.is_null() {
        DiffOptions::default()
    } else {
        from_value(options).map_err(|e| JsValue::from_str(&format!("Invalid options: {}", e)))?
    };
    let output = differentiate_flat(&times, &values, columns, method, options)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    to_value(&output)
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize derivative: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use regbench_core::error::ConfigurationError;

    fn linspace(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64 / (n - 1) as f64).collect()
    }

    #[test]
    fn flat_output_is_row_major() {
        let times = linspace(11);
        let values: Vec<f64> = times.iter().flat_map(|t| [*t, -2.0 * t]).collect();
        let output = differentiate_flat(&times, &values, 2, "simple", DiffOptions::default())
            .expect("simple");
        assert_eq!(output.columns, 2);
        assert_eq!(output.orders.len(), 1);
        assert_eq!(output.orders[0].len(), 22);
        for row in output.orders[0].chunks(2) {
            assert!((row[0] - 1.0).abs() < 1e-9);
            assert!((row[1] + 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn flat_signal_length_must_match_columns() {
        let err = differentiate_flat(&linspace(3), &[1.0; 5], 2, "simple", DiffOptions::default())
            .expect_err("ragged input");
        assert!(matches!(err, ConfigurationError::Shape(_)));
    }

    #[test]
    fn unknown_method_is_reported() {
        let err = differentiate_flat(&linspace(4), &[0.0; 4], 1, "bogus", DiffOptions::default())
            .expect_err("unknown method");
        assert!(err.to_string().contains("bogus"));
    }
}
