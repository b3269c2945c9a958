pub mod differentiate;
pub mod error;
pub mod solvers;
pub mod systems;
/// The `regbench_core` crate provides benchmark dynamical systems and the
/// numerical differentiation used to recover their derivatives from sampled
/// trajectories.
///
/// Key components:
/// - **Traits**: `Scalar` (numeric type abstraction), `DynamicalSystem` (ODEs/Maps), `Steppable` (Solvers).
/// - **Systems**: The benchmark registry of maps and flows with their reference parameters.
/// - **Solvers**: RK4 and DiscreteMap steppers plus `integrate` for sampling trajectories.
/// - **Differentiate**: `simple`, `finitediff` and `tvregdiff` behind a single `differentiate` entry point.
pub mod traits;

pub use differentiate::{differentiate, differentiate_by_name, Derivative, DiffOptions, Method, Signal};
pub use error::{ConfigurationError, ConvergenceWarning, DiffResult};
