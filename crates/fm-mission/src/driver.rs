//! Outer fixed-point loop on the mass distribution.
//!
//! Each outer iteration rebuilds the flight profile from the current masses,
//! solves the equilibrium with the power-train, integrates fuel into new
//! masses and CG positions, and stops once masses and loaded fuel settle.

use crate::aircraft::Aircraft;
use crate::config::{MissionProfile, SolverOptions};
use crate::equilibrium::{EquilibriumOutcome, EquilibriumProblem, Seed, solve_equilibrium};
use crate::error::{MissionError, MissionResult};
use crate::initializer::{FlightProfile, SpeedSelection, initialize};
use crate::integrator::{Integration, MissionTotals, PhaseSummary, integrate};
use crate::output::{MissionPoint, mission_points};
use crate::residuals::{PointCondition, ResidualModel};
use fm_atmosphere::Atmosphere;
use fm_powertrain::{
    OperatingMode, OperatingPoint, PointResponse, PowerDemand, PowerTrain, PowerTrainResponse,
};
use fm_solver::{GroupNorm, SolveStatus};
use tracing::{debug, info, warn};

/// Mission-level outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionStatus {
    /// Outer loop and every equilibrium converged.
    Converged,
    /// Outer loop converged but the last equilibrium stalled.
    Degraded,
    /// Outer loop hit its cap or the last equilibrium failed.
    Failed,
}

impl MissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissionStatus::Converged => "converged",
            MissionStatus::Degraded => "degraded",
            MissionStatus::Failed => "failed",
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, MissionStatus::Converged)
    }
}

impl std::fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of the equilibrium solve of the last outer iteration.
#[derive(Debug, Clone)]
pub struct EquilibriumReport {
    pub status: SolveStatus,
    pub iterations: usize,
    pub powertrain_iterations: usize,
    pub group_norms: Vec<GroupNorm>,
    pub failed_points: Vec<usize>,
    pub message: Option<String>,
}

impl From<&EquilibriumOutcome> for EquilibriumReport {
    fn from(o: &EquilibriumOutcome) -> Self {
        Self {
            status: o.status,
            iterations: o.iterations,
            powertrain_iterations: o.powertrain_iterations,
            group_norms: o.group_norms.clone(),
            failed_points: o.failed_points.clone(),
            message: o.message.clone(),
        }
    }
}

/// Emitted after every outer iteration.
#[derive(Debug, Clone)]
pub struct OuterProgress {
    pub iteration: usize,
    pub max_iterations: usize,
    /// max |dm| / m over the flight points
    pub mass_residual: f64,
    pub fuel_loaded_kg: f64,
    pub equilibrium_status: SolveStatus,
    pub equilibrium_iterations: usize,
}

#[derive(Debug, Clone)]
pub struct MissionSolution {
    pub status: MissionStatus,
    pub outer_iterations: usize,
    pub mass_residual: f64,
    pub points: Vec<MissionPoint>,
    pub phases: Vec<PhaseSummary>,
    pub totals: MissionTotals,
    pub taxi_out: PointResponse,
    pub taxi_in: PointResponse,
    pub equilibrium: EquilibriumReport,
    pub climb_speed: Option<SpeedSelection>,
    pub descent_speed: Option<SpeedSelection>,
    pub message: Option<String>,
}

/// Inputs of one mission solve.
#[derive(Clone, Copy)]
pub struct Mission<'a> {
    pub aircraft: &'a Aircraft,
    pub profile: &'a MissionProfile,
    pub options: &'a SolverOptions,
    pub powertrain: &'a dyn PowerTrain,
}

impl Mission<'_> {
    pub fn validate(&self) -> MissionResult<()> {
        self.aircraft.validate()?;
        self.profile.validate()?;
        self.options.validate()
    }
}

fn taxi_point(mission: &MissionProfile, atm: &Atmosphere, dt_s: f64) -> OperatingPoint {
    let st = atm.at(mission.climb_start_altitude_m);
    OperatingPoint {
        thrust_n: mission.taxi.thrust_n,
        altitude_m: st.altitude_m,
        tas_mps: mission.taxi.speed_mps,
        density_kgpm3: st.density_kgpm3,
        temperature_k: st.temperature_k,
        dt_s,
        mode: OperatingMode::Taxi,
    }
}

/// Power-train input for a profile; flight thrust is a placeholder the
/// equilibrium overwrites.
pub fn power_demand(
    mission: &MissionProfile,
    profile: &FlightProfile,
    thrust_n: &[f64],
    fuel_loaded_kg: f64,
) -> PowerDemand {
    let atm = Atmosphere::new(mission.delta_isa_k);
    let mut points = Vec::with_capacity(profile.len() + 2);
    points.push(taxi_point(mission, &atm, mission.taxi.out_duration_s));
    for i in 0..profile.len() {
        points.push(OperatingPoint {
            thrust_n: thrust_n.get(i).copied().unwrap_or(0.0),
            altitude_m: profile.altitude_m[i],
            tas_mps: profile.tas_mps[i],
            density_kgpm3: profile.density_kgpm3[i],
            temperature_k: profile.temperature_k[i],
            dt_s: profile.dt_s[i],
            mode: profile.phase[i].operating_mode(),
        });
    }
    points.push(taxi_point(mission, &atm, mission.taxi.in_duration_s));
    PowerDemand {
        points,
        fuel_loaded_kg,
        fuel_before_flight_kg: mission.takeoff_fuel_kg + mission.initial_climb_fuel_kg,
    }
}

fn relative_change(new: f64, old: f64) -> f64 {
    let denom = new.abs().max(old.abs());
    if denom > 0.0 {
        (new - old).abs() / denom
    } else {
        0.0
    }
}

fn mission_status(outer_converged: bool, equilibrium: SolveStatus) -> MissionStatus {
    match (outer_converged, equilibrium) {
        (true, SolveStatus::Converged) => MissionStatus::Converged,
        (true, SolveStatus::Stalled) => MissionStatus::Degraded,
        _ => MissionStatus::Failed,
    }
}

struct LastIterate {
    profile: FlightProfile,
    outcome: EquilibriumOutcome,
    response: PowerTrainResponse,
    integration: Integration,
}

/// Solve a mission.
pub fn run_mission(mission: &Mission<'_>) -> MissionResult<MissionSolution> {
    run_mission_with_progress(mission, None)
}

/// Solve a mission, reporting every outer iteration to `progress_cb`.
pub fn run_mission_with_progress(
    mission: &Mission<'_>,
    mut progress_cb: Option<&mut dyn FnMut(OuterProgress)>,
) -> MissionResult<MissionSolution> {
    mission.validate()?;
    let Mission {
        aircraft,
        profile: mp,
        options,
        powertrain,
    } = *mission;
    let fuel_free;
    let mp = if powertrain.burns_fuel() {
        mp
    } else {
        if mp.takeoff_fuel_kg > 0.0 || mp.initial_climb_fuel_kg > 0.0 {
            debug!(
                powertrain = powertrain.name(),
                "power-train carries no fuel, take-off and initial-climb fuel ignored"
            );
        }
        fuel_free = mp.without_fuel_allowances();
        &fuel_free
    };
    let counts = &options.points;
    let n = counts.total();
    let config = options.newton_config();
    let model = ResidualModel {
        aero: aircraft.aero(options.low_speed_aero),
        geometry: &aircraft.geometry,
        trim: options.trim,
    };

    let mut mass = vec![aircraft.mass.mtow_kg - mp.takeoff_fuel_kg - mp.initial_climb_fuel_kg; n];
    let mut x_cg = vec![aircraft.mass.x_cg_fixed_m; n];
    let mut fuel_loaded = 0.0;
    let mut seed = Seed::default();
    let mut mass_residual = f64::INFINITY;
    let mut outer_converged = false;
    let mut iterations = 0;
    let mut last: Option<LastIterate> = None;

    info!(
        aircraft = aircraft.name.as_str(),
        powertrain = powertrain.name(),
        points = n,
        coupling = options.coupling.as_str(),
        "mission solve started"
    );

    for iter in 1..=options.max_iter_outer {
        iterations = iter;
        let profile = initialize(aircraft, mp, counts, &mass)?;
        let conditions: Vec<PointCondition> = (0..n)
            .map(|i| PointCondition {
                q_pa: profile.q_pa[i],
                mass_kg: mass[i],
                gamma_deg: profile.gamma_deg[i],
                accel_x_mps2: profile.accel_x_mps2[i],
                x_cg_m: x_cg[i],
            })
            .collect();
        let problem = EquilibriumProblem {
            model,
            conditions,
            powertrain,
            demand: power_demand(mp, &profile, &[], fuel_loaded),
        };
        let outcome = solve_equilibrium(
            &problem,
            options.coupling,
            &seed,
            options.pre_condition_pt,
            &config,
        )?;

        let thrust: Vec<f64> = outcome.states.iter().map(|s| s.thrust_n).collect();
        let demand = power_demand(mp, &profile, &thrust, fuel_loaded);
        let response = powertrain.respond(&demand, &outcome.powertrain_states)?;
        let integration = integrate(
            &aircraft.mass,
            mp,
            fuel_loaded,
            counts,
            &profile,
            &response,
        )?;

        mass_residual = integration
            .mass_kg
            .iter()
            .zip(&mass)
            .map(|(new, old)| (new - old).abs() / new.abs().max(f64::MIN_POSITIVE))
            .fold(0.0, f64::max);
        let fuel_change = relative_change(integration.totals.fuel_loaded_kg, fuel_loaded);

        info!(
            iteration = iter,
            mass_residual,
            fuel_loaded_kg = integration.totals.fuel_loaded_kg,
            equilibrium = outcome.status.as_str(),
            newton_iterations = outcome.iterations,
            "outer iteration"
        );
        if let Some(cb) = progress_cb.as_deref_mut() {
            cb(OuterProgress {
                iteration: iter,
                max_iterations: options.max_iter_outer,
                mass_residual,
                fuel_loaded_kg: integration.totals.fuel_loaded_kg,
                equilibrium_status: outcome.status,
                equilibrium_iterations: outcome.iterations,
            });
        }

        mass.clone_from(&integration.mass_kg);
        x_cg.clone_from(&integration.x_cg_m);
        fuel_loaded = integration.totals.fuel_loaded_kg;
        seed = Seed {
            flight: Some(outcome.states.clone()),
            powertrain: Some(outcome.powertrain_states.clone()),
        };
        last = Some(LastIterate {
            profile,
            outcome,
            response,
            integration,
        });

        if mass_residual < options.rtol_outer && fuel_change < options.rtol_outer {
            outer_converged = true;
            break;
        }
    }

    let Some(last) = last else {
        return Err(MissionError::Config {
            what: "max_iter_outer must be at least 1".to_string(),
        });
    };

    let status = mission_status(outer_converged, last.outcome.status);
    let message = if !outer_converged {
        Some(format!(
            "mass did not settle in {} outer iterations, residual {:.3e}",
            iterations, mass_residual
        ))
    } else {
        last.outcome.message.clone()
    };
    match status {
        MissionStatus::Converged => info!(
            outer_iterations = iterations,
            block_fuel_kg = last.integration.totals.block_fuel_kg,
            "mission converged"
        ),
        _ => warn!(
            status = status.as_str(),
            outer_iterations = iterations,
            mass_residual,
            failed_points = last.outcome.failed_points.len(),
            "mission did not fully converge"
        ),
    }

    let points = mission_points(
        &model,
        powertrain,
        &last.profile,
        &last.outcome.states,
        &last.response,
        &last.integration,
    );
    Ok(MissionSolution {
        status,
        outer_iterations: iterations,
        mass_residual,
        points,
        phases: last.integration.phases.clone(),
        totals: last.integration.totals,
        taxi_out: last.response.points[0],
        taxi_in: last.response.points[n + 1],
        equilibrium: EquilibriumReport::from(&last.outcome),
        climb_speed: last.profile.climb_speed,
        descent_speed: last.profile.descent_speed,
        message,
    })
}
