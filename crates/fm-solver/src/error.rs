//! Error types for solver operations.

use fm_core::error::FmError;
use thiserror::Error;

/// Hard errors from the solver. Non-convergence is not an error; it is
/// reported through [`crate::SolveStatus`].
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Problem setup error: {what}")]
    ProblemSetup { what: String },

    #[error("Residual evaluation failed: {what}")]
    Evaluation { what: String },

    #[error("Numeric error: {what}")]
    Numeric { what: String },

    #[error("Core error: {0}")]
    Core(#[from] FmError),
}

pub type SolverResult<T> = Result<T, SolverError>;
