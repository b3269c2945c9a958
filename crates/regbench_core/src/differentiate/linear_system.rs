//! Sparse difference operator `D` and the lagged-diffusivity matrix `L`.

use nalgebra::DVector;
use nalgebra_sparse::{CooMatrix, CsrMatrix};

use super::types::Scale;

/// First-difference operator `D` (entries ±1/dx) and its transpose.
///
/// Small: shape (n, n+1), `(D u)_i = (u_{i+1} - u_i) / dx`.
/// Large: shape (n, n), same stencil with the last row zeroed.
#[derive(Debug, Clone)]
pub struct DifferenceOperator {
    scale: Scale,
    dx: f64,
    d: CsrMatrix<f64>,
    dt: CsrMatrix<f64>,
}

impl DifferenceOperator {
    pub fn new(scale: Scale, n: usize, dx: f64) -> Self {
        let c = 1.0 / dx;
        let cols = scale.estimate_len(n);
        let mut coo = CooMatrix::new(n, cols);
        let rows = match scale {
            Scale::Small => n,
            Scale::Large => n.saturating_sub(1),
        };
        for i in 0..rows {
            coo.push(i, i, -c);
            coo.push(i, i + 1, c);
        }
        let d = CsrMatrix::from(&coo);
        let dt = d.transpose();
        Self { scale, dx, d, dt }
    }

    pub fn matrix(&self) -> &CsrMatrix<f64> {
        &self.d
    }

    pub fn transpose(&self) -> &CsrMatrix<f64> {
        &self.dt
    }

    pub fn apply(&self, u: &DVector<f64>) -> DVector<f64> {
        &self.d * u
    }

    /// Builds the weights `Q` and the diffusion matrix `L` for the current `u`.
    ///
    /// Must be called once per outer iteration; `L` depends on `u` through `Q`.
    pub fn diffusion(&self, u: &DVector<f64>, epsilon: f64) -> Diffusion {
        let du = self.apply(u);
        let weights = du.map(|v| 1.0 / (v * v + epsilon).sqrt());
        let q = diagonal_matrix(weights.as_slice());
        let mut l = &(&self.dt * &q) * &self.d;
        if self.scale == Scale::Small {
            for value in l.values_mut() {
                *value *= self.dx;
            }
        }
        Diffusion { weights, l }
    }
}

/// `Q` (as its diagonal) and `L` for one outer iteration.
#[derive(Debug, Clone)]
pub struct Diffusion {
    pub weights: DVector<f64>,
    pub l: CsrMatrix<f64>,
}

impl Diffusion {
    pub fn apply(&self, u: &DVector<f64>) -> DVector<f64> {
        &self.l * u
    }

    pub fn diagonal(&self) -> DVector<f64> {
        let mut diag = DVector::zeros(self.l.nrows());
        for (i, j, v) in self.l.triplet_iter() {
            if i == j {
                diag[i] += *v;
            }
        }
        diag
    }

    /// Sub-diagonal entries `L[i+1, i]`; `L` is tridiagonal.
    pub fn subdiagonal(&self) -> DVector<f64> {
        let n = self.l.nrows();
        let mut sub = DVector::zeros(n.saturating_sub(1));
        for (i, j, v) in self.l.triplet_iter() {
            if i == j + 1 {
                sub[j] += *v;
            }
        }
        sub
    }
}

fn diagonal_matrix(values: &[f64]) -> CsrMatrix<f64> {
    let n = values.len();
    let mut coo = CooMatrix::new(n, n);
    for (i, v) in values.iter().enumerate() {
        coo.push(i, i, *v);
    }
    CsrMatrix::from(&coo)
}
