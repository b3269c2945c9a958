//! Antidifferentiation operator `A` and its adjoint `A*`.
//!
//! TVRegDiff fits `A u` (the integral of the candidate derivative) to the
//! mean-removed data. Gradients need `A*` rather than an explicit transpose,
//! so both directions are implemented matrix-free.

use nalgebra::DVector;

use super::types::Scale;

#[derive(Debug, Clone, Copy)]
pub struct Antiderivative {
    scale: Scale,
    /// Number of data samples.
    n: usize,
    dx: f64,
}

impl Antiderivative {
    pub fn new(scale: Scale, n: usize, dx: f64) -> Self {
        Self { scale, n, dx }
    }

    /// Length of the vectors `A` accepts (the derivative estimate).
    pub fn domain_len(&self) -> usize {
        self.scale.estimate_len(self.n)
    }

    /// Length of the vectors `A` produces (the data).
    pub fn range_len(&self) -> usize {
        self.n
    }

    /// `A u`.
    ///
    /// Small: trapezoidal integral from `u[0]` to `u[i + 1]`, scaled by dx.
    /// Large: plain cumulative sum.
    pub fn apply(&self, u: &DVector<f64>) -> DVector<f64> {
        debug_assert_eq!(u.len(), self.domain_len());
        match self.scale {
            Scale::Small => {
                let mut out = DVector::zeros(self.n);
                let half_first = 0.5 * u[0];
                let mut running = u[0];
                for i in 0..self.n {
                    running += u[i + 1];
                    out[i] = (running - 0.5 * u[i + 1] - half_first) * self.dx;
                }
                out
            }
            Scale::Large => {
                let mut out = DVector::zeros(self.n);
                let mut running = 0.0;
                for i in 0..self.n {
                    running += u[i];
                    out[i] = running;
                }
                out
            }
        }
    }

    /// `A* w`, satisfying `<A u, w> = <u, A* w>`.
    pub fn adjoint(&self, w: &DVector<f64>) -> DVector<f64> {
        debug_assert_eq!(w.len(), self.range_len());
        let total = w.sum();
        match self.scale {
            Scale::Small => {
                let mut out = DVector::zeros(self.n + 1);
                out[0] = 0.5 * total * self.dx;
                let mut prefix = 0.0;
                for k in 1..=self.n {
                    prefix += w[k - 1];
                    out[k] = (total - (prefix - 0.5 * w[k - 1])) * self.dx;
                }
                out
            }
            Scale::Large => {
                // suffix sums: (A* w)_k = sum_{i >= k} w_i
                let mut out = DVector::zeros(self.n);
                let mut prefix = 0.0;
                for k in 0..self.n {
                    out[k] = total - prefix;
                    prefix += w[k];
                }
                out
            }
        }
    }

    /// `A* A u`, the data-fit part of the normal equations.
    pub fn normal(&self, u: &DVector<f64>) -> DVector<f64> {
        self.adjoint(&self.apply(u))
    }
}
