use thiserror::Error;

/// Fatal input problems, raised before any numeric work starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("Unknown differentiation method: {0}")]
    UnknownMethod(String),
    #[error("Invalid input shape: {0}")]
    Shape(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type DiffResult<T> = std::result::Result<T, ConfigurationError>;

/// Non-fatal report from an inner CG solve. The outer iteration keeps going.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConvergenceWarning {
    #[error(
        "CG did not reach tolerance after {iterations} iterations (relative residual {relative_residual:.3e})"
    )]
    NotConverged {
        iterations: usize,
        relative_residual: f64,
    },
    #[error("CG broke down at iteration {iteration} (illegal input or loss of positive definiteness)")]
    Breakdown { iteration: usize },
}
