//! Error types for the fm-app service layer.

use std::path::PathBuf;

/// Unified error for the CLI over every backend crate.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Project error: {0}")]
    Project(String),

    #[error("Failed to read project file: {path}")]
    ProjectFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Project validation failed: {0}")]
    Validation(String),

    #[error("Runtime compilation failed: {0}")]
    Compile(String),

    #[error("Mission error: {0}")]
    Mission(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for fm-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<fm_project::ProjectError> for AppError {
    fn from(err: fm_project::ProjectError) -> Self {
        match err {
            fm_project::ProjectError::Validation(e) => AppError::Validation(e.to_string()),
            other => AppError::Project(other.to_string()),
        }
    }
}

impl From<fm_project::ValidationError> for AppError {
    fn from(err: fm_project::ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<fm_powertrain::PowerTrainError> for AppError {
    fn from(err: fm_powertrain::PowerTrainError) -> Self {
        AppError::Compile(err.to_string())
    }
}

impl From<fm_mission::MissionError> for AppError {
    fn from(err: fm_mission::MissionError) -> Self {
        AppError::Mission(err.to_string())
    }
}

impl From<fm_results::ResultsError> for AppError {
    fn from(err: fm_results::ResultsError) -> Self {
        match err {
            fm_results::ResultsError::RunNotFound { run_id } => AppError::RunNotFound(run_id),
            other => AppError::Results(other.to_string()),
        }
    }
}
