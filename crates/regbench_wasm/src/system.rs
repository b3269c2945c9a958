//! WASM wrapper around the benchmark systems.

use crate::row_major;
use js_sys::Float64Array;
use regbench_core::solvers::{integrate, DiscreteMap, IntegrationSettings, RK4};
use regbench_core::systems::{registry, BenchmarkSystem, SystemKind};
use regbench_core::traits::{DynamicalSystem, Steppable};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmBenchmarkSystem {
    pub(crate) system: BenchmarkSystem,
    state: Vec<f64>,
    t: f64,
    solver: SolverType,
}

pub(crate) enum SolverType {
    RK4(RK4<f64>),
    Discrete(DiscreteMap<f64>),
}

pub(crate) fn solver_for(system: &BenchmarkSystem) -> SolverType {
    let dim = DynamicalSystem::<f64>::dimension(system);
    match system.kind() {
        SystemKind::Flow => SolverType::RK4(RK4::new(dim)),
        SystemKind::Map => SolverType::Discrete(DiscreteMap::new(dim)),
    }
}

impl WasmBenchmarkSystem {
    pub(crate) fn from_system(system: BenchmarkSystem) -> Self {
        let dim = DynamicalSystem::<f64>::dimension(&system);
        Self {
            solver: solver_for(&system),
            system,
            state: vec![0.0; dim],
            t: 0.0,
        }
    }

    pub(crate) fn dimension(&self) -> usize {
        DynamicalSystem::<f64>::dimension(&self.system)
    }
}

#[wasm_bindgen]
impl WasmBenchmarkSystem {
    /// Looks the system up in the registry by its snake_case name.
    #[wasm_bindgen(constructor)]
    pub fn new(name: &str) -> Result<WasmBenchmarkSystem, JsValue> {
        console_error_panic_hook::set_once();
        let system =
            BenchmarkSystem::from_name(name).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(Self::from_system(system))
    }

    pub fn name(&self) -> String {
        self.system.name().to_string()
    }

    pub fn is_map(&self) -> bool {
        self.system.kind() == SystemKind::Map
    }

    pub fn dim(&self) -> usize {
        self.dimension()
    }

    pub fn set_state(&mut self, state: &[f64]) -> Result<(), JsValue> {
        if state.len() != self.dimension() {
            return Err(JsValue::from_str(&format!(
                "State dimension mismatch. Expected {}, got {}.",
                self.dimension(),
                state.len()
            )));
        }
        self.state = state.to_vec();
        Ok(())
    }

    pub fn get_state(&self) -> Vec<f64> {
        self.state.clone()
    }

    pub fn set_t(&mut self, t: f64) {
        self.t = t;
    }

    pub fn get_t(&self) -> f64 {
        self.t
    }

    pub fn step(&mut self, dt: f64) {
        match &mut self.solver {
            SolverType::RK4(s) => s.step(&self.system, &mut self.t, &mut self.state, dt),
            SolverType::Discrete(s) => s.step(&self.system, &mut self.t, &mut self.state, dt),
        }
    }

    /// Samples a trajectory from `initial_state` on `times`, row-major
    /// (`times.len()` rows of `dim()` values).
    pub fn trajectory(
        &self,
        initial_state: Vec<f64>,
        times: Vec<f64>,
        substeps: usize,
    ) -> Result<Float64Array, JsValue> {
        let samples = integrate(
            &self.system,
            self.system.kind(),
            &initial_state,
            &times,
            IntegrationSettings { substeps },
        )
        .map_err(|e| JsValue::from_str(&format!("Integration failed: {}", e)))?;

        Ok(Float64Array::from(row_major(&samples).as_slice()))
    }
}

/// Canonical names of every registered benchmark system.
#[wasm_bindgen]
pub fn list_systems() -> Vec<String> {
    registry()
        .iter()
        .map(|system| system.name().to_string())
        .collect()
}


#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[wasm_bindgen_test]
    fn unknown_system_name_is_rejected() {
        let err = WasmBenchmarkSystem::new("nope").err().expect("unknown system");
        let message = err.as_string().unwrap_or_default();
        assert!(message.contains("Unknown benchmark system"));
    }

    #[wasm_bindgen_test]
    fn set_state_checks_dimension() {
        let mut system = WasmBenchmarkSystem::new("logistic").expect("system");
        assert!(system.set_state(&[0.5, 0.5]).is_err());
        system.set_state(&[0.5]).expect("matching dimension");
        assert_eq!(system.get_state(), vec![0.5]);
    }

    #[wasm_bindgen_test]
    fn trajectory_is_row_major() {
        let system = WasmBenchmarkSystem::new("harmonic_oscillator").expect("system");
        let samples = system
            .trajectory(vec![1.0, 0.0], vec![0.0, 0.5, 1.0], 50)
            .expect("trajectory")
            .to_vec();
        assert_eq!(samples.len(), 6);
        assert_eq!(&samples[..2], &[1.0, 0.0]);
        assert!((samples[4] - 1.0_f64.cos()).abs() < 1e-6);
        assert!((samples[5] + 1.0_f64.sin()).abs() < 1e-6);
    }

    #[wasm_bindgen_test]
    fn trajectory_reports_integration_errors() {
        let system = WasmBenchmarkSystem::new("lorenz").expect("system");
        let err = system
            .trajectory(vec![1.0], vec![0.0, 1.0], 10)
            .err()
            .expect("dimension mismatch");
        let message = err.as_string().unwrap_or_default();
        assert!(message.contains("Integration failed"));
        assert!(message.contains("Initial state dimension mismatch"));
    }
}
