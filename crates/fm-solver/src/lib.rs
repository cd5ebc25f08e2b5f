//! Equation-oriented nonlinear solver for flightmission.
//!
//! Systems are expressed as residuals `F(x) = 0` with analytic Jacobians
//! assembled from sparse triplets. The Newton driver reports a soft status
//! (converged, stalled, failed) instead of erroring when the iteration does
//! not reach tolerance, so callers can decide whether a degraded answer is
//! acceptable.

pub mod error;
pub mod jacobian;
pub mod linesearch;
pub mod newton;
pub mod system;

pub use error::{SolverError, SolverResult};
pub use jacobian::{SparseJacobian, central_difference_jacobian, finite_difference_jacobian};
pub use linesearch::{ArmijoGoldstein, LineSearchOutcome};
pub use newton::{IterationRecord, NewtonConfig, NewtonResult, SolveStatus, newton_solve};
pub use system::{
    Component, ExplicitMap, GroupNorm, NonlinearSystem, PartialsCheck, ResidualGroup,
    check_partials, group_norms,
};
