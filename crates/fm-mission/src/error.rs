//! Error types for mission operations.
//!
//! Only configuration problems and broken evaluations are errors. Equilibrium
//! and outer-loop non-convergence are reported through statuses.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MissionError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Configuration error: {what}")]
    Config { what: String },

    #[error("Non-physical condition: {what}")]
    NonPhysical { what: &'static str },

    #[error("Backend error: {message}")]
    Backend { message: String },
}

pub type MissionResult<T> = Result<T, MissionError>;

impl From<fm_solver::SolverError> for MissionError {
    fn from(e: fm_solver::SolverError) -> Self {
        MissionError::Backend {
            message: e.to_string(),
        }
    }
}

impl From<fm_powertrain::PowerTrainError> for MissionError {
    fn from(e: fm_powertrain::PowerTrainError) -> Self {
        MissionError::Backend {
            message: e.to_string(),
        }
    }
}

impl From<fm_core::error::FmError> for MissionError {
    fn from(e: fm_core::error::FmError) -> Self {
        MissionError::Backend {
            message: e.to_string(),
        }
    }
}

impl From<MissionError> for fm_solver::SolverError {
    fn from(e: MissionError) -> Self {
        fm_solver::SolverError::Evaluation {
            what: e.to_string(),
        }
    }
}
