//! fm-mission: flight-mission performance solver.
//!
//! Provides:
//! - flight profile initialisation (speed schedules, ISA conditions, phase geometry)
//! - alpha/thrust/trim equilibrium residuals with analytic partials
//! - one Newton system over every mission point, with the power-train
//!   nested or monolithic
//! - mass and CG integration and phase aggregates
//! - the outer fixed-point loop on the mass distribution

pub mod aircraft;
pub mod config;
pub mod driver;
pub mod equilibrium;
pub mod error;
pub mod initializer;
pub mod integrator;
pub mod output;
pub mod phase;
pub mod residuals;

// Re-exports for public API
pub use aircraft::{AeroCoefficients, Aircraft, AircraftGeometry, MassProperties};
pub use config::{CouplingMode, MissionProfile, SolverOptions, TaxiAllowance, TrimPolicy};
pub use driver::{
    EquilibriumReport, Mission, MissionSolution, MissionStatus, OuterProgress, power_demand,
    run_mission, run_mission_with_progress,
};
pub use equilibrium::{EquilibriumOutcome, EquilibriumProblem, Seed, solve_equilibrium};
pub use error::{MissionError, MissionResult};
pub use initializer::{FlightProfile, SpeedBranch, SpeedGoal, SpeedSelection, initialize, select_speed};
pub use integrator::{MassBudget, MissionTotals, PhaseSummary, integrate};
pub use output::MissionPoint;
pub use phase::{Phase, PointCounts};
pub use residuals::{EquilibriumState, PointCondition, ResidualModel};
