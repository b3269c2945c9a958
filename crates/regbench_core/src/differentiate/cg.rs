//! Preconditioned conjugate gradient for symmetric positive-definite operators.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// Matrix-free symmetric operator.
pub trait LinearOperator {
    fn dim(&self) -> usize;
    fn apply(&self, x: &DVector<f64>) -> DVector<f64>;
}

/// Applies an approximate inverse `M^{-1} r`.
pub trait Preconditioner {
    fn apply(&self, r: &DVector<f64>) -> DVector<f64>;
}

/// No preconditioning.
pub struct Identity;

impl Preconditioner for Identity {
    fn apply(&self, r: &DVector<f64>) -> DVector<f64> {
        r.clone()
    }
}

/// Diagonal (Jacobi) preconditioner: `z_i = r_i / p_i`.
#[derive(Debug, Clone)]
pub struct Jacobi {
    inverse: DVector<f64>,
}

impl Jacobi {
    pub fn new(diagonal: &DVector<f64>) -> Self {
        Self {
            inverse: diagonal.map(|v| 1.0 / v),
        }
    }
}

impl Preconditioner for Jacobi {
    fn apply(&self, r: &DVector<f64>) -> DVector<f64> {
        r.component_mul(&self.inverse)
    }
}

/// Cholesky factor `B = R R^T` of a symmetric tridiagonal matrix, applied as `B^{-1}`.
#[derive(Debug, Clone)]
pub struct TridiagonalCholesky {
    /// Diagonal of the lower bidiagonal factor `R`.
    diag: DVector<f64>,
    /// Sub-diagonal of `R`.
    sub: DVector<f64>,
}

impl TridiagonalCholesky {
    /// Factors the matrix with main diagonal `diagonal` and sub-diagonal
    /// `subdiagonal`. Returns `None` if a pivot is not positive.
    pub fn factor(diagonal: &DVector<f64>, subdiagonal: &DVector<f64>) -> Option<Self> {
        let n = diagonal.len();
        if n == 0 || subdiagonal.len() + 1 != n {
            return None;
        }
        let mut diag = DVector::zeros(n);
        let mut sub = DVector::zeros(n - 1);
        for k in 0..n {
            let mut pivot = diagonal[k];
            if k > 0 {
                sub[k - 1] = subdiagonal[k - 1] / diag[k - 1];
                pivot -= sub[k - 1] * sub[k - 1];
            }
            if !(pivot > 0.0) || !pivot.is_finite() {
                return None;
            }
            diag[k] = pivot.sqrt();
        }
        Some(Self { diag, sub })
    }
}

impl Preconditioner for TridiagonalCholesky {
    fn apply(&self, r: &DVector<f64>) -> DVector<f64> {
        let n = self.diag.len();
        // R y = r
        let mut y = DVector::zeros(n);
        for k in 0..n {
            let carry = if k > 0 { self.sub[k - 1] * y[k - 1] } else { 0.0 };
            y[k] = (r[k] - carry) / self.diag[k];
        }
        // R^T z = y
        let mut z = DVector::zeros(n);
        for k in (0..n).rev() {
            let carry = if k + 1 < n { self.sub[k] * z[k + 1] } else { 0.0 };
            z[k] = (y[k] - carry) / self.diag[k];
        }
        z
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CgSettings {
    /// Stop once ‖r‖ <= tolerance · ‖b‖.
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for CgSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-4,
            max_iterations: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CgStatus {
    Converged,
    MaxIterations,
    Breakdown,
}

impl CgStatus {
    /// 0 = converged, >0 = iteration budget exhausted, <0 = breakdown.
    pub fn code(self, iterations: usize) -> i64 {
        match self {
            CgStatus::Converged => 0,
            CgStatus::MaxIterations => iterations.max(1) as i64,
            CgStatus::Breakdown => -1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CgOutcome {
    pub solution: DVector<f64>,
    pub status: CgStatus,
    pub iterations: usize,
    /// ‖b - A x‖ / ‖b‖ of the returned solution.
    pub relative_residual: f64,
}

/// Solves `op x = rhs` from a zero start.
///
/// On breakdown or an exhausted budget the last iterate is still returned.
pub fn conjugate_gradient(
    op: &impl LinearOperator,
    rhs: &DVector<f64>,
    preconditioner: &impl Preconditioner,
    settings: CgSettings,
) -> CgOutcome {
    let n = op.dim();
    let mut x = DVector::zeros(n);
    let rhs_norm = rhs.norm();
    if rhs_norm == 0.0 {
        return CgOutcome {
            solution: x,
            status: CgStatus::Converged,
            iterations: 0,
            relative_residual: 0.0,
        };
    }
    if !rhs_norm.is_finite() {
        return CgOutcome {
            solution: x,
            status: CgStatus::Breakdown,
            iterations: 0,
            relative_residual: f64::NAN,
        };
    }

    let threshold = settings.tolerance * rhs_norm;
    let mut r = rhs.clone();
    let mut z = preconditioner.apply(&r);
    let mut p = z.clone();
    let mut rz = r.dot(&z);

    for iteration in 0..settings.max_iterations {
        if !(rz > 0.0) || !rz.is_finite() {
            return CgOutcome {
                relative_residual: r.norm() / rhs_norm,
                solution: x,
                status: CgStatus::Breakdown,
                iterations: iteration,
            };
        }

        let ap = op.apply(&p);
        let curvature = p.dot(&ap);
        if !(curvature > 0.0) || !curvature.is_finite() {
            return CgOutcome {
                relative_residual: r.norm() / rhs_norm,
                solution: x,
                status: CgStatus::Breakdown,
                iterations: iteration,
            };
        }

        let step = rz / curvature;
        x.axpy(step, &p, 1.0);
        r.axpy(-step, &ap, 1.0);

        let residual = r.norm();
        if residual <= threshold {
            return CgOutcome {
                solution: x,
                status: CgStatus::Converged,
                iterations: iteration + 1,
                relative_residual: residual / rhs_norm,
            };
        }

        z = preconditioner.apply(&r);
        let rz_next = r.dot(&z);
        let beta = rz_next / rz;
        rz = rz_next;
        p.axpy(1.0, &z, beta);
    }

    CgOutcome {
        relative_residual: r.norm() / rhs_norm,
        solution: x,
        status: CgStatus::MaxIterations,
        iterations: settings.max_iterations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    struct Dense(DMatrix<f64>);

    impl LinearOperator for Dense {
        fn dim(&self) -> usize {
            self.0.nrows()
        }

        fn apply(&self, x: &DVector<f64>) -> DVector<f64> {
            &self.0 * x
        }
    }

    fn spd_matrix(n: usize) -> DMatrix<f64> {
        DMatrix::from_fn(n, n, |i, j| {
            if i == j {
                4.0 + i as f64
            } else if i.abs_diff(j) == 1 {
                -1.0
            } else {
                0.0
            }
        })
    }

    #[test]
    fn solves_spd_system_to_tolerance() {
        let a = spd_matrix(20);
        let b = DVector::from_fn(20, |i, _| (i as f64).cos());
        let outcome = conjugate_gradient(
            &Dense(a.clone()),
            &b,
            &Identity,
            CgSettings {
                tolerance: 1e-10,
                max_iterations: 200,
            },
        );
        assert_eq!(outcome.status, CgStatus::Converged);
        assert_eq!(outcome.status.code(outcome.iterations), 0);
        let residual = (&a * &outcome.solution - &b).norm() / b.norm();
        assert!(residual <= 1e-10);
        assert!((residual - outcome.relative_residual).abs() < 1e-8);
    }

    #[test]
    fn jacobi_preconditioner_reaches_same_solution() {
        let a = spd_matrix(15);
        let b = DVector::from_element(15, 1.0);
        let settings = CgSettings {
            tolerance: 1e-12,
            max_iterations: 100,
        };
        let plain = conjugate_gradient(&Dense(a.clone()), &b, &Identity, settings);
        let jacobi = Jacobi::new(&a.diagonal());
        let preconditioned = conjugate_gradient(&Dense(a), &b, &jacobi, settings);
        assert_eq!(preconditioned.status, CgStatus::Converged);
        assert!((plain.solution - preconditioned.solution).norm() < 1e-9);
    }

    #[test]
    fn tridiagonal_cholesky_inverts_its_matrix() {
        let a = spd_matrix(12);
        let diag = a.diagonal();
        let sub = DVector::from_fn(11, |i, _| a[(i + 1, i)]);
        let factor = TridiagonalCholesky::factor(&diag, &sub).expect("matrix is SPD");
        let b = DVector::from_fn(12, |i, _| i as f64 - 3.0);
        let z = factor.apply(&b);
        let expected = a.lu().solve(&b).expect("nonsingular");
        assert!((z - expected).norm() < 1e-12);
    }

    #[test]
    fn tridiagonal_cholesky_rejects_indefinite_matrix() {
        let diag = DVector::from_vec(vec![1.0, 1.0]);
        let sub = DVector::from_vec(vec![2.0]);
        assert!(TridiagonalCholesky::factor(&diag, &sub).is_none());
    }

    #[test]
    fn exact_preconditioner_converges_in_one_step() {
        let a = spd_matrix(10);
        let diag = a.diagonal();
        let sub = DVector::from_fn(9, |i, _| a[(i + 1, i)]);
        let factor = TridiagonalCholesky::factor(&diag, &sub).expect("matrix is SPD");
        let b = DVector::from_element(10, 2.0);
        let outcome = conjugate_gradient(&Dense(a), &b, &factor, CgSettings::default());
        assert_eq!(outcome.status, CgStatus::Converged);
        assert_eq!(outcome.iterations, 1);
    }

    #[test]
    fn zero_rhs_returns_zero_solution() {
        let outcome = conjugate_gradient(
            &Dense(spd_matrix(4)),
            &DVector::zeros(4),
            &Identity,
            CgSettings::default(),
        );
        assert_eq!(outcome.status, CgStatus::Converged);
        assert_eq!(outcome.iterations, 0);
        assert_eq!(outcome.solution, DVector::zeros(4));
    }

    #[test]
    fn indefinite_operator_reports_breakdown() {
        let a = DMatrix::from_diagonal(&DVector::from_vec(vec![1.0, -1.0]));
        let b = DVector::from_vec(vec![0.0, 1.0]);
        let outcome = conjugate_gradient(&Dense(a), &b, &Identity, CgSettings::default());
        assert_eq!(outcome.status, CgStatus::Breakdown);
        assert!(outcome.status.code(outcome.iterations) < 0);
    }

    #[test]
    fn tight_budget_reports_max_iterations() {
        let a = spd_matrix(30);
        let b = DVector::from_fn(30, |i, _| ((i * 7) % 5) as f64 - 2.0);
        let outcome = conjugate_gradient(
            &Dense(a),
            &b,
            &Identity,
            CgSettings {
                tolerance: 1e-14,
                max_iterations: 2,
            },
        );
        assert_eq!(outcome.status, CgStatus::MaxIterations);
        assert!(outcome.status.code(outcome.iterations) > 0);
        assert!(outcome.relative_residual > 1e-14);
    }
}
