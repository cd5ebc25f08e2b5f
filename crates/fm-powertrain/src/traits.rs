//! The power-train contract consumed by the mission solver.

use crate::error::{PowerTrainError, PowerTrainResult};
use crate::slipstream::Slipstream;
use fm_solver::{
    NewtonConfig, NonlinearSystem, ResidualGroup, SolveStatus, SolverResult, SparseJacobian,
    newton_solve,
};
use nalgebra::DVector;

/// Engine operating mode, one per mission phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingMode {
    Taxi,
    Climb,
    Cruise,
    Descent,
    Reserve,
}

/// Flight condition handed to the power-train at one point.
#[derive(Debug, Clone, Copy)]
pub struct OperatingPoint {
    pub thrust_n: f64,
    pub altitude_m: f64,
    pub tas_mps: f64,
    pub density_kgpm3: f64,
    pub temperature_k: f64,
    /// Duration of the interval ending at this point
    pub dt_s: f64,
    pub mode: OperatingMode,
}

/// Power-train input vector: taxi-out, flight points, taxi-in.
#[derive(Debug, Clone)]
pub struct PowerDemand {
    pub points: Vec<OperatingPoint>,
    /// Fuel in the tanks at engine start
    pub fuel_loaded_kg: f64,
    /// Fuel burnt between the end of taxi-out and the first flight point
    /// (take-off and initial climb allowances)
    pub fuel_before_flight_kg: f64,
}

impl PowerDemand {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn with_thrust(&self, thrust: &[f64]) -> PowerTrainResult<Self> {
        if thrust.len() != self.points.len() {
            return Err(PowerTrainError::StateShape {
                expected: self.points.len(),
                got: thrust.len(),
            });
        }
        let mut out = self.clone();
        for (p, t) in out.points.iter_mut().zip(thrust) {
            p.thrust_n = *t;
        }
        Ok(out)
    }
}

/// Power-train output at one point.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointResponse {
    pub fuel_consumed_kg: f64,
    /// Fuel in the tanks at the start of the interval, clipped at zero
    pub fuel_remaining_kg: f64,
    /// Fuel moment about the datum (kg m), clipped at zero
    pub fuel_lever_arm_kgm: f64,
    /// Non-fuel (electrical) energy drawn over the interval
    pub energy_consumed_j: f64,
    /// Thrust over thrust available
    pub thrust_rate: f64,
    pub engine_setting: f64,
    /// Specific fuel consumption (kg/J of shaft work)
    pub sfc_kg_per_j: f64,
    pub fuel_flow_kgps: f64,
    pub state_of_charge: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct PowerTrainResponse {
    pub points: Vec<PointResponse>,
}

impl PowerTrainResponse {
    pub fn total_fuel_kg(&self) -> f64 {
        self.points.iter().map(|p| p.fuel_consumed_kg).sum()
    }

    pub fn total_energy_j(&self) -> f64 {
        self.points.iter().map(|p| p.energy_consumed_j).sum()
    }
}

/// Jacobian blocks of the internal state residual.
#[derive(Debug, Clone)]
pub struct StatePartials {
    /// d(residual)/d(states), square
    pub wrt_states: SparseJacobian,
    /// d(residual)/d(thrust), one column per power-train point
    pub wrt_thrust: SparseJacobian,
}

/// Converts thrust demand into fuel and energy consumption.
///
/// Power-trains with internal unknowns (battery current, state of charge)
/// expose them as an implicit residual so the mission solver can either
/// solve them on their own after the flight equilibrium (nested) or inside
/// the same Newton system (monolithic). Explicit power-trains keep the
/// default zero-state implementation.
pub trait PowerTrain: Send + Sync {
    fn name(&self) -> &str;

    fn slipstream(&self) -> &Slipstream;

    /// False for power-trains that carry no fuel; fuel allowances do not
    /// apply to them.
    fn burns_fuel(&self) -> bool {
        true
    }

    /// Internal unknowns per power-train point.
    fn states_per_point(&self) -> usize {
        0
    }

    /// Starting point for the internal states. With `pre_condition` the guess
    /// comes from a coarse estimate of the operating point instead of a
    /// neutral value.
    fn initial_states(
        &self,
        _demand: &PowerDemand,
        _pre_condition: bool,
    ) -> PowerTrainResult<DVector<f64>> {
        Ok(DVector::zeros(0))
    }

    fn state_residual(
        &self,
        _demand: &PowerDemand,
        _states: &DVector<f64>,
    ) -> PowerTrainResult<DVector<f64>> {
        Ok(DVector::zeros(0))
    }

    fn state_partials(
        &self,
        demand: &PowerDemand,
        _states: &DVector<f64>,
    ) -> PowerTrainResult<StatePartials> {
        Ok(StatePartials {
            wrt_states: SparseJacobian::new(0, 0),
            wrt_thrust: SparseJacobian::new(0, demand.len()),
        })
    }

    fn state_scale(
        &self,
        demand: &PowerDemand,
        _states: &DVector<f64>,
    ) -> PowerTrainResult<DVector<f64>> {
        Ok(DVector::from_element(
            self.states_per_point() * demand.len(),
            1.0,
        ))
    }

    /// Residual groups over the state vector, local indices.
    fn state_groups(&self, _n_points: usize) -> Vec<ResidualGroup> {
        Vec::new()
    }

    fn respond(
        &self,
        demand: &PowerDemand,
        states: &DVector<f64>,
    ) -> PowerTrainResult<PowerTrainResponse>;
}

pub(crate) fn check_states(
    pt: &dyn PowerTrain,
    demand: &PowerDemand,
    states: &DVector<f64>,
) -> PowerTrainResult<()> {
    let expected = pt.states_per_point() * demand.len();
    if states.len() != expected {
        return Err(PowerTrainError::StateShape {
            expected,
            got: states.len(),
        });
    }
    Ok(())
}

/// Fuel in the tanks at the start of each point's interval, given per-point
/// burn. Index 0 is taxi-out; the pre-flight allowance is drawn after it.
pub fn fuel_remaining(demand: &PowerDemand, burn_kg: &[f64]) -> Vec<f64> {
    let mut remaining = Vec::with_capacity(burn_kg.len());
    let mut used = 0.0;
    for (i, b) in burn_kg.iter().enumerate() {
        if i == 1 {
            used += demand.fuel_before_flight_kg;
        }
        remaining.push(fm_core::clip_non_negative(demand.fuel_loaded_kg - used));
        used += b;
    }
    remaining
}

/// Internal states of a power-train at fixed thrust, as a solver system.
pub struct StateSystem<'a> {
    pub powertrain: &'a dyn PowerTrain,
    pub demand: &'a PowerDemand,
}

impl NonlinearSystem for StateSystem<'_> {
    fn name(&self) -> &str {
        self.powertrain.name()
    }

    fn n_unknowns(&self) -> usize {
        self.powertrain.states_per_point() * self.demand.len()
    }

    fn residual(&self, x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        Ok(self.powertrain.state_residual(self.demand, x)?)
    }

    fn jacobian(&self, x: &DVector<f64>) -> SolverResult<SparseJacobian> {
        Ok(self.powertrain.state_partials(self.demand, x)?.wrt_states)
    }

    fn nominal_scale(&self, x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        Ok(self.powertrain.state_scale(self.demand, x)?)
    }

    fn groups(&self) -> Vec<ResidualGroup> {
        self.powertrain.state_groups(self.demand.len())
    }
}

#[derive(Debug, Clone)]
pub struct StateSolution {
    pub states: DVector<f64>,
    pub status: SolveStatus,
    pub iterations: usize,
}

/// Solve a power-train's internal states at fixed thrust (nested coupling).
///
/// A `guess` of the right length (typically the previous outer iterate) is
/// used as is; otherwise the power-train's own initial states are used.
pub fn solve_states(
    powertrain: &dyn PowerTrain,
    demand: &PowerDemand,
    guess: Option<&DVector<f64>>,
    pre_condition: bool,
    config: &NewtonConfig,
) -> PowerTrainResult<StateSolution> {
    let n = powertrain.states_per_point() * demand.len();
    if n == 0 {
        return Ok(StateSolution {
            states: DVector::zeros(0),
            status: SolveStatus::Converged,
            iterations: 0,
        });
    }
    let x0 = match guess {
        Some(g) if g.len() == n => g.clone(),
        _ => powertrain.initial_states(demand, pre_condition)?,
    };
    let system = StateSystem {
        powertrain,
        demand,
    };
    let result = newton_solve(&system, x0, config)?;
    if !result.status.is_converged() {
        tracing::warn!(
            powertrain = powertrain.name(),
            status = result.status.as_str(),
            merit = result.merit,
            "power-train states did not converge"
        );
    }
    Ok(StateSolution {
        states: result.x,
        status: result.status,
        iterations: result.iterations,
    })
}
