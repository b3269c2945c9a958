//! Derivatives by finite-difference interpolation on arbitrary stencils.
//!
//! Weights come from Fornberg's recursion, so the stencil points do not have
//! to be uniformly spaced or centred on the evaluation point.

use nalgebra::DMatrix;

use super::types::FiniteDiffSettings;
use crate::error::{ConfigurationError, DiffResult};

/// Fornberg weights for evaluating derivatives 0..=max_order at `z` from
/// samples at `x`. Entry `(i, k)` weights sample `i` for order `k`.
pub fn fornberg_weights(z: f64, x: &[f64], max_order: usize) -> DMatrix<f64> {
    let n = x.len();
    let mut c = DMatrix::zeros(n, max_order + 1);
    if n == 0 {
        return c;
    }
    let mut c1 = 1.0;
    let mut c4 = x[0] - z;
    c[(0, 0)] = 1.0;
    for i in 1..n {
        let mn = i.min(max_order);
        let mut c2 = 1.0;
        let c5 = c4;
        c4 = x[i] - z;
        for j in 0..i {
            let c3 = x[i] - x[j];
            c2 *= c3;
            if j == i - 1 {
                for k in (1..=mn).rev() {
                    c[(i, k)] = c1 * (k as f64 * c[(i - 1, k - 1)] - c5 * c[(i - 1, k)]) / c2;
                }
                c[(i, 0)] = -c1 * c5 * c[(i - 1, 0)] / c2;
            }
            for k in (1..=mn).rev() {
                c[(j, k)] = (c4 * c[(j, k)] - k as f64 * c[(j, k - 1)]) / c3;
            }
            c[(j, 0)] = c4 * c[(j, 0)] / c3;
        }
        c1 = c2;
    }
    c
}

/// Interpolates `values` (rows sampled on `grid`) and its derivatives at `fit_grid`.
///
/// Each evaluation point uses the `ntail` grid points at or below it and the
/// `nhead` points above it, shifted inwards near the ends of the grid. The
/// result holds one `fit_grid.len() × columns` matrix per order 0..=max_order.
pub fn interpolate_by_finite_diff(
    grid: &[f64],
    values: &DMatrix<f64>,
    fit_grid: &[f64],
    max_order: usize,
    ntail: usize,
    nhead: usize,
) -> DiffResult<Vec<DMatrix<f64>>> {
    let n = grid.len();
    let width = ntail + nhead;
    if values.nrows() != n {
        return Err(ConfigurationError::Shape(format!(
            "values have {} rows but the grid has {} points",
            values.nrows(),
            n
        )));
    }
    if width < max_order + 1 {
        return Err(ConfigurationError::Invalid(format!(
            "a stencil of {} points cannot resolve derivative order {}",
            width, max_order
        )));
    }
    if width > n {
        return Err(ConfigurationError::Invalid(format!(
            "stencil of {} points exceeds the {} available samples",
            width, n
        )));
    }

    let mut out = vec![DMatrix::zeros(fit_grid.len(), values.ncols()); max_order + 1];
    for (row, &z) in fit_grid.iter().enumerate() {
        let below = grid.partition_point(|&g| g <= z);
        let start = below.saturating_sub(ntail).min(n - width);
        let stencil = &grid[start..start + width];
        let weights = fornberg_weights(z, stencil, max_order);
        for (order, target) in out.iter_mut().enumerate() {
            for col in 0..values.ncols() {
                let mut acc = 0.0;
                for (i, idx) in (start..start + width).enumerate() {
                    acc += weights[(i, order)] * values[(idx, col)];
                }
                target[(row, col)] = acc;
            }
        }
    }
    Ok(out)
}

/// Oversampled fit grid: `n · fit_ratio` points spanning the samples, with
/// both end points pulled half a fit step inwards.
pub fn fit_grid(times: &[f64], fit_ratio: usize) -> Vec<f64> {
    let n = times.len();
    let count = n * fit_ratio;
    let (first, last) = (times[0], times[n - 1]);
    let step = (last - first) / (count - 1) as f64;
    let mut fit: Vec<f64> = (0..count).map(|i| first + i as f64 * step).collect();
    fit[count - 1] = last;
    fit[0] += (fit[1] - fit[0]) / 2.0;
    fit[count - 1] = fit[count - 2] + (fit[count - 1] - fit[count - 2]) / 2.0;
    fit
}

/// Derivatives of orders 1..=settings.order, evaluated at every
/// `fit_ratio`-th point of the oversampled grid.
///
/// Returns the evaluation abscissae and one matrix per order.
pub fn finitediff(
    times: &[f64],
    values: &DMatrix<f64>,
    settings: &FiniteDiffSettings,
) -> DiffResult<(Vec<f64>, Vec<DMatrix<f64>>)> {
    if settings.order == 0 {
        return Err(ConfigurationError::Invalid(
            "finitediff order must be at least 1".to_string(),
        ));
    }
    if settings.n_points == 0 {
        return Err(ConfigurationError::Invalid(
            "n_points must be at least 1".to_string(),
        ));
    }
    if settings.fit_ratio == 0 {
        return Err(ConfigurationError::Invalid(
            "fit_ratio must be at least 1".to_string(),
        ));
    }

    let fit = fit_grid(times, settings.fit_ratio);
    let sampled: Vec<f64> = fit.iter().step_by(settings.fit_ratio).copied().collect();
    let orders = interpolate_by_finite_diff(
        times,
        values,
        &sampled,
        settings.order,
        settings.n_points,
        settings.n_points,
    )?;
    Ok((sampled, orders.into_iter().skip(1).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fornberg_reproduces_central_stencils() {
        let w = fornberg_weights(0.0, &[-1.0, 0.0, 1.0], 2);
        let first = [w[(0, 1)], w[(1, 1)], w[(2, 1)]];
        let second = [w[(0, 2)], w[(1, 2)], w[(2, 2)]];
        let value = [w[(0, 0)], w[(1, 0)], w[(2, 0)]];
        for (a, b) in first.iter().zip([-0.5, 0.0, 0.5]) {
            assert!((a - b).abs() < 1e-14);
        }
        for (a, b) in second.iter().zip([1.0, -2.0, 1.0]) {
            assert!((a - b).abs() < 1e-14);
        }
        for (a, b) in value.iter().zip([0.0, 1.0, 0.0]) {
            assert!((a - b).abs() < 1e-14);
        }
    }

    #[test]
    fn fornberg_weights_are_exact_for_cubics_off_grid() {
        let x = [0.0, 0.3, 0.7, 1.2];
        let z = 0.5;
        let w = fornberg_weights(z, &x, 3);
        let f = |t: f64| 2.0 * t.powi(3) - t + 1.0;
        let derivatives = [f(z), 6.0 * z * z - 1.0, 12.0 * z, 12.0];
        for (order, expected) in derivatives.iter().enumerate() {
            let estimate: f64 = x.iter().enumerate().map(|(i, t)| w[(i, order)] * f(*t)).sum();
            assert!((estimate - expected).abs() < 1e-10, "order {order}");
        }
    }

    #[test]
    fn interpolation_rejects_undersized_stencil() {
        let grid = [0.0, 1.0, 2.0];
        let values = DMatrix::from_element(3, 1, 1.0);
        let err = interpolate_by_finite_diff(&grid, &values, &[0.5], 2, 1, 1)
            .expect_err("two points cannot give a second derivative");
        assert!(matches!(err, ConfigurationError::Invalid(_)));
        let err = interpolate_by_finite_diff(&grid, &values, &[0.5], 1, 2, 2)
            .expect_err("stencil wider than grid");
        assert!(matches!(err, ConfigurationError::Invalid(_)));
    }

    #[test]
    fn fit_grid_nudges_end_points_inwards() {
        let times: Vec<f64> = (0..5).map(|i| i as f64).collect();
        let fit = fit_grid(&times, 2);
        assert_eq!(fit.len(), 10);
        let step = 4.0 / 9.0;
        assert!((fit[0] - step / 2.0).abs() < 1e-12);
        assert!((fit[9] - (4.0 - step / 2.0)).abs() < 1e-12);
        assert!((fit[3] - 3.0 * step).abs() < 1e-12);
    }

    #[test]
    fn finitediff_returns_requested_orders_without_order_zero() {
        let times: Vec<f64> = (0..40).map(|i| i as f64 * 0.05).collect();
        let values = DMatrix::from_fn(40, 1, |i, _| (times[i]).exp());
        let settings = FiniteDiffSettings {
            order: 2,
            n_points: 3,
            fit_ratio: 5,
        };
        let (at, orders) = finitediff(&times, &values, &settings).expect("finitediff");
        assert_eq!(at.len(), 40);
        assert_eq!(orders.len(), 2);
        for (i, t) in at.iter().enumerate() {
            assert!((orders[0][(i, 0)] - t.exp()).abs() < 1e-5);
            assert!((orders[1][(i, 0)] - t.exp()).abs() < 1e-3);
        }
    }
}
