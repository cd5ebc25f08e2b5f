//! Parameter sweeps: one independent mission per value, solved in parallel.

use fm_mission::{MissionStatus, run_mission};
use fm_project::{LengthDef, Project, SpeedDef};
use rayon::prelude::*;
use std::str::FromStr;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::runtime_compile;

/// Mission parameter varied by a sweep. Values are SI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepParam {
    /// Cruise range (m)
    Range,
    /// Cruise true airspeed (m/s)
    CruiseSpeed,
    /// Cruise altitude (m)
    CruiseAltitude,
    /// Ramp mass (kg)
    Mtow,
}

impl SweepParam {
    pub fn as_str(&self) -> &'static str {
        match self {
            SweepParam::Range => "range",
            SweepParam::CruiseSpeed => "cruise_speed",
            SweepParam::CruiseAltitude => "cruise_altitude",
            SweepParam::Mtow => "mtow",
        }
    }

    /// Copy of `project` with this parameter set to `value`.
    pub fn apply(&self, project: &Project, value: f64) -> Project {
        let mut p = project.clone();
        match self {
            SweepParam::Range => p.mission.range = LengthDef::Meters(value),
            SweepParam::CruiseSpeed => p.mission.cruise_speed = SpeedDef::MetersPerSecond(value),
            SweepParam::CruiseAltitude => p.mission.cruise_altitude = LengthDef::Meters(value),
            SweepParam::Mtow => p.aircraft.mtow_kg = value,
        }
        p
    }
}

impl FromStr for SweepParam {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "range" => Ok(SweepParam::Range),
            "cruise_speed" => Ok(SweepParam::CruiseSpeed),
            "cruise_altitude" => Ok(SweepParam::CruiseAltitude),
            "mtow" => Ok(SweepParam::Mtow),
            other => Err(AppError::InvalidInput(format!(
                "unknown sweep parameter '{}' (expected range, cruise_speed, cruise_altitude or mtow)",
                other
            ))),
        }
    }
}

/// Outcome of one sweep value. `error` is set when the case could not be
/// solved at all; non-convergence is reported through `status`.
#[derive(Debug, Clone)]
pub struct SweepCase {
    pub value: f64,
    pub status: Option<MissionStatus>,
    pub outer_iterations: usize,
    pub block_fuel_kg: f64,
    pub fuel_loaded_kg: f64,
    pub energy_kwh: f64,
    pub flight_time_s: f64,
    pub error: Option<String>,
}

fn solve_case(project: &Project, param: SweepParam, value: f64) -> AppResult<SweepCase> {
    let project = param.apply(project, value);
    fm_project::validate_project(&project)?;
    let runtime = runtime_compile::compile_project(&project)?;
    let solution = run_mission(&runtime.mission())?;
    let t = &solution.totals;
    Ok(SweepCase {
        value,
        status: Some(solution.status),
        outer_iterations: solution.outer_iterations,
        block_fuel_kg: t.block_fuel_kg,
        fuel_loaded_kg: t.fuel_loaded_kg,
        energy_kwh: t.energy_j / fm_core::constants::J_PER_KWH,
        flight_time_s: t.flight_time_s,
        error: None,
    })
}

/// Solve `project` once per value. Results keep the order of `values`.
pub fn run_sweep(project: &Project, param: SweepParam, values: &[f64]) -> Vec<SweepCase> {
    info!(param = param.as_str(), cases = values.len(), "starting sweep");
    values
        .par_iter()
        .map(|&value| match solve_case(project, param, value) {
            Ok(case) => case,
            Err(e) => {
                warn!(param = param.as_str(), value, error = %e, "sweep case failed");
                SweepCase {
                    value,
                    status: None,
                    outer_iterations: 0,
                    block_fuel_kg: f64::NAN,
                    fuel_loaded_kg: f64::NAN,
                    energy_kwh: f64::NAN,
                    flight_time_s: f64::NAN,
                    error: Some(e.to_string()),
                }
            }
        })
        .collect()
}
