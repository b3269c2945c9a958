//! Benchmark dynamical systems: discrete maps and ODE right-hand sides.
//!
//! Every problem is a variant of [`BenchmarkSystem`] carrying its parameters.
//! The named constructors return the reference parameterisation used by the
//! benchmark, and [`registry`] lists all of them under their canonical names.

use crate::traits::{constant, DynamicalSystem, Scalar};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemKind {
    Flow,
    Map,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum BenchmarkSystem {
    Henon { a: f64, b: f64 },
    Chirikov { k: f64 },
    Logistic { r: f64 },
    Bogdanov { eps: f64, k: f64, mu: f64 },
    Duffing { a: f64, b: f64 },
    Tinkerbell { a: f64, b: f64, c: f64, d: f64 },
    HarmonicOscillator { omega: f64 },
    AnharmonicOscillator { omega: f64, c: f64, l: f64 },
    Lorenz { s: f64, r: f64, b: f64 },
    VanDerPol { omega: f64, a: f64, b: f64 },
    MichaelisMenten { vmax: f64, km: f64, rho: f64 },
}

impl BenchmarkSystem {
    pub fn henon() -> Self {
        Self::Henon { a: 1.4, b: 0.3 }
    }

    pub fn chirikov() -> Self {
        Self::Chirikov { k: 1.0 }
    }

    pub fn logistic() -> Self {
        Self::Logistic { r: 3.18 }
    }

    pub fn bogdanov() -> Self {
        Self::Bogdanov {
            eps: 0.0,
            k: 1.2,
            mu: 0.0,
        }
    }

    pub fn duffing() -> Self {
        Self::Duffing { a: 2.75, b: 0.15 }
    }

    pub fn tinkerbell() -> Self {
        Self::Tinkerbell {
            a: 0.9,
            b: -0.6013,
            c: 2.0,
            d: 0.5,
        }
    }

    pub fn harmonic_oscillator() -> Self {
        Self::HarmonicOscillator { omega: 1.0 }
    }

    pub fn anharmonic_oscillator() -> Self {
        Self::AnharmonicOscillator {
            omega: 1.0,
            c: 1.0,
            l: 1.0,
        }
    }

    pub fn lorenz() -> Self {
        Self::Lorenz {
            s: 10.0,
            r: 28.0,
            b: 8.0 / 3.0,
        }
    }

    pub fn van_der_pol() -> Self {
        Self::VanDerPol {
            omega: 1.0,
            a: 0.1,
            b: 0.01,
        }
    }

    pub fn michaelis_menten() -> Self {
        Self::MichaelisMenten {
            vmax: 0.25,
            km: 0.1,
            rho: 1.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Henon { .. } => "henon",
            Self::Chirikov { .. } => "chirikov",
            Self::Logistic { .. } => "logistic",
            Self::Bogdanov { .. } => "bogdanov",
            Self::Duffing { .. } => "duffing",
            Self::Tinkerbell { .. } => "tinkerbell",
            Self::HarmonicOscillator { .. } => "harmonic_oscillator",
            Self::AnharmonicOscillator { .. } => "anharmonic_oscillator",
            Self::Lorenz { .. } => "lorenz",
            Self::VanDerPol { .. } => "van_der_pol",
            Self::MichaelisMenten { .. } => "michaelis_menten",
        }
    }

    pub fn kind(&self) -> SystemKind {
        match self {
            Self::Henon { .. }
            | Self::Chirikov { .. }
            | Self::Logistic { .. }
            | Self::Bogdanov { .. }
            | Self::Duffing { .. }
            | Self::Tinkerbell { .. } => SystemKind::Map,
            Self::HarmonicOscillator { .. }
            | Self::AnharmonicOscillator { .. }
            | Self::Lorenz { .. }
            | Self::VanDerPol { .. }
            | Self::MichaelisMenten { .. } => SystemKind::Flow,
        }
    }

    /// Looks up the reference parameterisation of a system by its registry name.
    pub fn from_name(name: &str) -> Result<Self> {
        match registry().into_iter().find(|system| system.name() == name) {
            Some(system) => Ok(system),
            None => bail!("Unknown benchmark system: {}", name),
        }
    }
}

/// All benchmark systems with their reference parameters, maps first.
pub fn registry() -> Vec<BenchmarkSystem> {
    vec![
        BenchmarkSystem::henon(),
        BenchmarkSystem::chirikov(),
        BenchmarkSystem::logistic(),
        BenchmarkSystem::bogdanov(),
        BenchmarkSystem::duffing(),
        BenchmarkSystem::tinkerbell(),
        BenchmarkSystem::harmonic_oscillator(),
        BenchmarkSystem::anharmonic_oscillator(),
        BenchmarkSystem::lorenz(),
        BenchmarkSystem::van_der_pol(),
        BenchmarkSystem::michaelis_menten(),
    ]
}

impl<T: Scalar> DynamicalSystem<T> for BenchmarkSystem {
    fn dimension(&self) -> usize {
        match self {
            Self::Logistic { .. } => 1,
            Self::Lorenz { .. } => 3,
            _ => 2,
        }
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        let one = T::one();
        match *self {
            Self::Henon { a, b } => {
                out[0] = x[1] + one - constant::<T>(a) * x[0] * x[0];
                out[1] = constant::<T>(b) * x[0];
            }
            Self::Chirikov { k } => {
                // state = (p, theta)
                let p = x[0] + constant::<T>(k) * x[1].sin();
                out[0] = p;
                out[1] = x[1] + p;
            }
            Self::Logistic { r } => {
                out[0] = constant::<T>(r) * x[0] * (one - x[0]);
            }
            Self::Bogdanov { eps, k, mu } => {
                let y = (one + constant::<T>(eps)) * x[1]
                    + constant::<T>(k) * x[0] * (x[0] - one)
                    + constant::<T>(mu) * x[0] * x[1];
                out[0] = x[0] + x[1];
                out[1] = y;
            }
            Self::Duffing { a, b } => {
                out[0] = x[1];
                out[1] = -constant::<T>(b) * x[0] + constant::<T>(a) * x[1] - x[1].powi(3);
            }
            Self::Tinkerbell { a, b, c, d } => {
                out[0] = x[0] * x[0] - x[1] * x[1] + constant::<T>(a) * x[0] + constant::<T>(b) * x[1];
                out[1] = constant::<T>(2.0) * x[0] * x[1]
                    + constant::<T>(c) * x[0]
                    + constant::<T>(d) * x[1];
            }
            Self::HarmonicOscillator { omega } => {
                let w = constant::<T>(omega);
                out[0] = x[1];
                out[1] = -w * w * x[0];
            }
            Self::AnharmonicOscillator { omega, c, l } => {
                let w = constant::<T>(omega);
                out[0] = x[1];
                out[1] = -w * w * x[0] - constant::<T>(l) * x[0] * x[0] - constant::<T>(c) * x[1];
            }
            Self::Lorenz { s, r, b } => {
                out[0] = constant::<T>(s) * (x[1] - x[0]);
                out[1] = constant::<T>(r) * x[0] - x[1] - x[0] * x[2];
                out[2] = x[0] * x[1] - constant::<T>(b) * x[2];
            }
            Self::VanDerPol { omega, a, b } => {
                let w = constant::<T>(omega);
                out[0] = x[1];
                out[1] = -w * w * x[0]
                    + constant::<T>(a) * x[1] * (one - constant::<T>(b) * x[0] * x[0]);
            }
            Self::MichaelisMenten { vmax, km, rho } => {
                // state = (substrate, product)
                let saturation = x[0].powf(constant(rho));
                let rate = constant::<T>(vmax) * saturation / (constant::<T>(km) + saturation);
                out[0] = -rate;
                out[1] = rate;
            }
        }
    }
}
