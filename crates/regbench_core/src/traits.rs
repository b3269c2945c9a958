use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// Numeric type the benchmark systems and steppers are written against.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// Converts an `f64` constant (a system parameter, a Butcher coefficient) into `T`.
/// Falls back to NaN for types that cannot represent the value.
pub fn constant<T: Scalar>(value: f64) -> T {
    T::from_f64(value).unwrap_or_else(T::nan)
}

/// A benchmark problem: either a vector field (flow) or an update rule (map).
pub trait DynamicalSystem<T: Scalar> {
    /// Number of state variables.
    fn dimension(&self) -> usize;

    /// Writes dx/dt (flows) or x_{n+1} (maps) for state `x` at time `t` into `out`.
    fn apply(&self, t: T, x: &[T], out: &mut [T]);
}

/// Advances a state in place by one step of size `dt`.
pub trait Steppable<T: Scalar> {
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T);
}
