use nalgebra::DMatrix;

/// Second-order central differences in the interior, first-order one-sided
/// differences at both ends. Each column is differentiated along the rows.
pub fn simple_finite_diff(values: &DMatrix<f64>, dt: f64) -> DMatrix<f64> {
    let n = values.nrows();
    let mut out = DMatrix::zeros(n, values.ncols());
    if n < 2 {
        return out;
    }
    for (j, column) in values.column_iter().enumerate() {
        out[(0, j)] = (column[1] - column[0]) / dt;
        out[(n - 1, j)] = (column[n - 1] - column[n - 2]) / dt;
        for i in 1..n - 1 {
            out[(i, j)] = (column[i + 1] - column[i - 1]) / (2.0 * dt);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_has_unit_slope() {
        let x = DMatrix::from_fn(11, 1, |i, _| i as f64 * 0.1);
        let dx = simple_finite_diff(&x, 0.1);
        assert!(dx.iter().all(|v| (v - 1.0).abs() < 1e-12));
    }

    #[test]
    fn quadratic_is_exact_in_interior() {
        let dt = 0.5;
        let x = DMatrix::from_fn(6, 2, |i, j| {
            let t = i as f64 * dt;
            if j == 0 {
                t * t
            } else {
                -3.0 * t
            }
        });
        let dx = simple_finite_diff(&x, dt);
        for i in 1..5 {
            assert!((dx[(i, 0)] - 2.0 * i as f64 * dt).abs() < 1e-12);
            assert!((dx[(i, 1)] + 3.0).abs() < 1e-12);
        }
        // one-sided ends
        assert!((dx[(0, 0)] - 0.5).abs() < 1e-12);
        assert!((dx[(5, 0)] - 4.5).abs() < 1e-12);
    }
}
