//! Shared application service layer for flightmission.
//!
//! Centralizes the work the CLI needs: loading and validating projects,
//! compiling them into solver inputs, running missions with a content-hashed
//! run cache, and parameter sweeps.

pub mod error;
pub mod progress;
pub mod project_service;
pub mod run_service;
pub mod runtime_compile;
pub mod sweep;

// Re-export key types for convenience
pub use error::{AppError, AppResult};
pub use progress::{RunProgressEvent, RunStage};
pub use project_service::{load_project, save_project, validate_project};
pub use run_service::{
    RunOptions, RunRequest, RunResponse, RunTimingSummary, ensure_run, ensure_run_with_progress,
    list_runs, load_run, manifest_from_solution, point_records,
};
pub use runtime_compile::{MissionRuntime, build_powertrain, compile_project};
pub use sweep::{SweepCase, SweepParam, run_sweep};
