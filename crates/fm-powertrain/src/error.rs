//! Error types for power-train operations.

use fm_solver::SolverError;
use thiserror::Error;

/// Errors that can occur while evaluating a power-train.
#[derive(Error, Debug)]
pub enum PowerTrainError {
    #[error("Non-physical value: {what}")]
    NonPhysical { what: &'static str },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("State vector has {got} entries, expected {expected}")]
    StateShape { expected: usize, got: usize },

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),
}

pub type PowerTrainResult<T> = Result<T, PowerTrainError>;

impl From<PowerTrainError> for SolverError {
    fn from(e: PowerTrainError) -> Self {
        match e {
            PowerTrainError::Solver(inner) => inner,
            other => SolverError::Evaluation {
                what: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = PowerTrainError::NonPhysical { what: "density" };
        assert!(err.to_string().contains("density"));
    }

    #[test]
    fn error_conversion() {
        let solver: SolverError = PowerTrainError::Solver(SolverError::Numeric {
            what: "lu".into(),
        })
        .into();
        assert!(matches!(solver, SolverError::Numeric { .. }));

        let solver: SolverError = PowerTrainError::NonPhysical { what: "soc" }.into();
        assert!(matches!(solver, SolverError::Evaluation { .. }));
    }
}
