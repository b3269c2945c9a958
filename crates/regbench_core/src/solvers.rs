//! Fixed-step steppers and the trajectory integrator used to sample benchmark systems.

use crate::systems::SystemKind;
use crate::traits::{constant, DynamicalSystem, Scalar, Steppable};
use anyhow::{bail, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Classic Runge-Kutta 4th order stepper with preallocated stage buffers.
pub struct RK4<T: Scalar> {
    k1: Vec<T>,
    k2: Vec<T>,
    k3: Vec<T>,
    k4: Vec<T>,
    tmp: Vec<T>,
}

impl<T: Scalar> RK4<T> {
    pub fn new(dim: usize) -> Self {
        let z = T::zero();
        Self {
            k1: vec![z; dim],
            k2: vec![z; dim],
            k3: vec![z; dim],
            k4: vec![z; dim],
            tmp: vec![z; dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for RK4<T> {
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        let half: T = constant(0.5);
        let sixth: T = constant(1.0 / 6.0);
        let two: T = constant(2.0);
        let t0 = *t;

        system.apply(t0, state, &mut self.k1);

        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k1[i] * half;
        }
        system.apply(t0 + dt * half, &self.tmp, &mut self.k2);

        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k2[i] * half;
        }
        system.apply(t0 + dt * half, &self.tmp, &mut self.k3);

        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k3[i];
        }
        system.apply(t0 + dt, &self.tmp, &mut self.k4);

        for i in 0..state.len() {
            state[i] = state[i]
                + dt * sixth * (self.k1[i] + two * self.k2[i] + two * self.k3[i] + self.k4[i]);
        }

        *t = t0 + dt;
    }
}

/// Map stepper: x_{n+1} = f(x_n). `dt` only advances the time counter.
pub struct DiscreteMap<T: Scalar> {
    tmp: Vec<T>,
}

impl<T: Scalar> DiscreteMap<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            tmp: vec![T::zero(); dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for DiscreteMap<T> {
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        system.apply(*t, state, &mut self.tmp);
        state.copy_from_slice(&self.tmp);
        *t = *t + dt;
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationSettings {
    /// RK4 steps taken between two consecutive output samples of a flow.
    pub substeps: usize,
}

impl Default for IntegrationSettings {
    fn default() -> Self {
        Self { substeps: 10 }
    }
}

/// Samples a trajectory of `system` on `times`, one row per time sample.
///
/// Flows are integrated with RK4 (`settings.substeps` steps per sample
/// interval). Maps are iterated once per sample, so row `i` holds the
/// `i`-th iterate and `times` only labels the rows.
pub fn integrate<S>(
    system: &S,
    kind: SystemKind,
    initial_state: &[f64],
    times: &[f64],
    settings: IntegrationSettings,
) -> Result<DMatrix<f64>>
where
    S: DynamicalSystem<f64>,
{
    let dim = system.dimension();
    if dim == 0 {
        bail!("System has zero dimension.");
    }
    if initial_state.len() != dim {
        bail!(
            "Initial state dimension mismatch. Expected {}, got {}.",
            dim,
            initial_state.len()
        );
    }
    if times.is_empty() {
        bail!("Time grid must contain at least one sample.");
    }
    if settings.substeps == 0 {
        bail!("substeps must be at least 1.");
    }
    if times.windows(2).any(|w| !(w[1] > w[0])) {
        bail!("Time grid must be strictly increasing.");
    }

    let mut trajectory = DMatrix::zeros(times.len(), dim);
    let mut state = initial_state.to_vec();
    let mut t = times[0];
    for (j, value) in state.iter().enumerate() {
        trajectory[(0, j)] = *value;
    }

    match kind {
        SystemKind::Flow => {
            let mut stepper = RK4::new(dim);
            for i in 1..times.len() {
                let dt = (times[i] - times[i - 1]) / settings.substeps as f64;
                for _ in 0..settings.substeps {
                    stepper.step(system, &mut t, &mut state, dt);
                }
                t = times[i];
                for (j, value) in state.iter().enumerate() {
                    trajectory[(i, j)] = *value;
                }
            }
        }
        SystemKind::Map => {
            let mut stepper = DiscreteMap::new(dim);
            for i in 1..times.len() {
                stepper.step(system, &mut t, &mut state, times[i] - times[i - 1]);
                for (j, value) in state.iter().enumerate() {
                    trajectory[(i, j)] = *value;
                }
            }
        }
    }

    if trajectory.iter().any(|v| !v.is_finite()) {
        bail!("Trajectory diverged to a non-finite value.");
    }

    Ok(trajectory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::BenchmarkSystem;

    struct Decay;

    impl DynamicalSystem<f64> for Decay {
        fn dimension(&self) -> usize {
            1
        }

        fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
            out[0] = -x[0];
        }
    }

    #[test]
    fn rk4_step_matches_exponential_decay() {
        let mut stepper = RK4::new(1);
        let mut t = 0.0;
        let mut state = [1.0];
        for _ in 0..100 {
            stepper.step(&Decay, &mut t, &mut state, 0.01);
        }
        assert!((t - 1.0).abs() < 1e-12);
        assert!((state[0] - (-1.0_f64).exp()).abs() < 1e-10);
    }

    #[test]
    fn discrete_map_applies_update_once_per_step() {
        let system = BenchmarkSystem::logistic();
        let mut stepper = DiscreteMap::new(1);
        let mut t = 0.0;
        let mut state = [0.5_f64];
        stepper.step(&system, &mut t, &mut state, 1.0);
        assert!((state[0] - 3.18 * 0.25).abs() < 1e-15);
        assert_eq!(t, 1.0);
    }

    #[test]
    fn integrate_harmonic_oscillator_follows_cosine() {
        let system = BenchmarkSystem::harmonic_oscillator();
        let times: Vec<f64> = (0..=100).map(|i| i as f64 * 0.1).collect();
        let trajectory = integrate(
            &system,
            SystemKind::Flow,
            &[1.0, 0.0],
            &times,
            IntegrationSettings::default(),
        )
        .expect("integration should succeed");

        assert_eq!(trajectory.nrows(), times.len());
        assert_eq!(trajectory.ncols(), 2);
        for (i, t) in times.iter().enumerate() {
            assert!((trajectory[(i, 0)] - t.cos()).abs() < 1e-8);
            assert!((trajectory[(i, 1)] + t.sin()).abs() < 1e-8);
        }
    }

    #[test]
    fn integrate_map_rows_are_iterates() {
        let system = BenchmarkSystem::henon();
        let times = [0.0, 1.0, 2.0];
        let trajectory = integrate(
            &system,
            SystemKind::Map,
            &[0.0, 0.0],
            &times,
            IntegrationSettings::default(),
        )
        .expect("map iteration should succeed");
        assert_eq!(trajectory[(1, 0)], 1.0);
        assert_eq!(trajectory[(1, 1)], 0.0);
        assert!((trajectory[(2, 0)] - (1.0 - 1.4)).abs() < 1e-15);
        assert!((trajectory[(2, 1)] - 0.3).abs() < 1e-15);
    }

    #[test]
    fn integrate_rejects_invalid_inputs() {
        let system = BenchmarkSystem::harmonic_oscillator();
        let settings = IntegrationSettings::default();
        let err = integrate(&system, SystemKind::Flow, &[1.0], &[0.0, 1.0], settings)
            .expect_err("dimension mismatch");
        assert!(format!("{err}").contains("dimension mismatch"));

        let err = integrate(&system, SystemKind::Flow, &[1.0, 0.0], &[0.0, 0.0], settings)
            .expect_err("non-increasing grid");
        assert!(format!("{err}").contains("strictly increasing"));

        let err = integrate(
            &system,
            SystemKind::Flow,
            &[1.0, 0.0],
            &[0.0, 1.0],
            IntegrationSettings { substeps: 0 },
        )
        .expect_err("zero substeps");
        assert!(format!("{err}").contains("substeps"));
    }
}
