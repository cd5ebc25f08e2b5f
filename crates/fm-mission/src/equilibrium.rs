//! Coupled equilibrium solve over every mission point.
//!
//! Unknown layout: `[alpha_0, T_0, dm_0, alpha_1, T_1, dm_1, ...]` followed,
//! in monolithic coupling, by the power-train states of all power-train
//! points (taxi-out, flight points, taxi-in). Flight rows only couple inside
//! a point (plus thrust through the slipstream); power-train rows may couple
//! a point to its predecessor.

use crate::config::CouplingMode;
use crate::error::MissionResult;
use crate::residuals::{EquilibriumState, PointCondition, ResidualModel};
use fm_powertrain::{AeroDelta, PowerDemand, PowerTrain, solve_states};
use fm_solver::{
    GroupNorm, NewtonConfig, NonlinearSystem, ResidualGroup, SolveStatus, SolverResult,
    SparseJacobian, newton_solve,
};
use nalgebra::DVector;
use tracing::debug;

/// Everything the equilibrium needs for one outer iteration.
pub struct EquilibriumProblem<'a> {
    pub model: ResidualModel<'a>,
    pub conditions: Vec<PointCondition>,
    pub powertrain: &'a dyn PowerTrain,
    /// Power-train input; flight-point thrusts are taken from the unknowns,
    /// taxi thrusts stay as given.
    pub demand: PowerDemand,
}

impl EquilibriumProblem<'_> {
    pub fn n_points(&self) -> usize {
        self.conditions.len()
    }

    fn n_states(&self) -> usize {
        self.powertrain.states_per_point() * self.demand.len()
    }

    /// Power-train demand with flight thrust taken from `x`.
    pub fn demand_at(&self, x: &DVector<f64>) -> PowerDemand {
        let mut demand = self.demand.clone();
        for i in 0..self.n_points() {
            demand.points[i + 1].thrust_n = x[3 * i + 1];
        }
        demand
    }

    fn delta(&self, i: usize, thrust_n: f64) -> AeroDelta {
        self.powertrain
            .slipstream()
            .delta(thrust_n, self.conditions[i].q_pa)
    }
}

fn state_at(x: &DVector<f64>, i: usize) -> EquilibriumState {
    EquilibriumState {
        alpha_deg: x[3 * i],
        thrust_n: x[3 * i + 1],
        delta_m_deg: x[3 * i + 2],
    }
}

/// The equilibrium as a solver system.
pub struct EquilibriumSystem<'a> {
    pub problem: &'a EquilibriumProblem<'a>,
    pub coupling: CouplingMode,
}

impl EquilibriumSystem<'_> {
    fn n_flight(&self) -> usize {
        3 * self.problem.n_points()
    }

    fn monolithic(&self) -> bool {
        self.coupling == CouplingMode::Monolithic && self.problem.n_states() > 0
    }
}

impl NonlinearSystem for EquilibriumSystem<'_> {
    fn name(&self) -> &str {
        "equilibrium"
    }

    fn n_unknowns(&self) -> usize {
        if self.monolithic() {
            self.n_flight() + self.problem.n_states()
        } else {
            self.n_flight()
        }
    }

    fn residual(&self, x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        let p = self.problem;
        let mut r = DVector::zeros(self.n_unknowns());
        for (i, c) in p.conditions.iter().enumerate() {
            let s = state_at(x, i);
            let rows = p.model.residuals(c, &s, &p.delta(i, s.thrust_n));
            r.rows_mut(3 * i, 3).copy_from_slice(&rows);
        }
        if self.monolithic() {
            let n = self.n_flight();
            let states = x.rows(n, p.n_states()).into_owned();
            let rp = p.powertrain.state_residual(&p.demand_at(x), &states)?;
            r.rows_mut(n, rp.len()).copy_from(&rp);
        }
        Ok(r)
    }

    fn jacobian(&self, x: &DVector<f64>) -> SolverResult<SparseJacobian> {
        let p = self.problem;
        let n = self.n_unknowns();
        let mut jac = SparseJacobian::with_capacity(n, n, 9 * p.n_points() + 5 * p.n_states());
        let slip = p.powertrain.slipstream();
        for (i, c) in p.conditions.iter().enumerate() {
            let s = state_at(x, i);
            let d = p.delta(i, s.thrust_n);
            let dd = slip.d_delta_d_thrust(s.thrust_n, c.q_pa);
            let pp = p.model.partials(c, &s, &d);
            for row in 0..3 {
                let chain = pp.wrt_delta[row][0] * dd.cl
                    + pp.wrt_delta[row][1] * dd.cd
                    + pp.wrt_delta[row][2] * dd.cm;
                jac.add(3 * i + row, 3 * i, pp.wrt_state[row][0])?;
                jac.add(3 * i + row, 3 * i + 1, pp.wrt_state[row][1] + chain)?;
                jac.add(3 * i + row, 3 * i + 2, pp.wrt_state[row][2])?;
            }
        }
        if self.monolithic() {
            let nf = self.n_flight();
            let n_points = p.n_points();
            let states = x.rows(nf, p.n_states()).into_owned();
            let parts = p.powertrain.state_partials(&p.demand_at(x), &states)?;
            jac.add_block(&parts.wrt_states, nf, |col| Some(nf + col))?;
            // Power-train point j is flight point j - 1; taxi thrust is fixed.
            jac.add_block(&parts.wrt_thrust, nf, |j| {
                (1..=n_points).contains(&j).then(|| 3 * (j - 1) + 1)
            })?;
        }
        Ok(jac)
    }

    fn nominal_scale(&self, x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        let p = self.problem;
        let mut scale = DVector::from_element(self.n_unknowns(), 1.0);
        for (i, c) in p.conditions.iter().enumerate() {
            scale
                .rows_mut(3 * i, 3)
                .copy_from_slice(&p.model.nominal_scales(c));
        }
        if self.monolithic() {
            let n = self.n_flight();
            let states = x.rows(n, p.n_states()).into_owned();
            let sp = p.powertrain.state_scale(&p.demand_at(x), &states)?;
            scale.rows_mut(n, sp.len()).copy_from(&sp);
        }
        Ok(scale)
    }

    fn groups(&self) -> Vec<ResidualGroup> {
        let n_points = self.problem.n_points();
        let mut groups = vec![
            ResidualGroup::strided("alpha", 0, 3, n_points),
            ResidualGroup::strided("thrust", 1, 3, n_points),
            ResidualGroup::strided("trim", 2, 3, n_points),
        ];
        if self.monolithic() {
            let offset = self.n_flight();
            groups.extend(
                self.problem
                    .powertrain
                    .state_groups(self.problem.demand.len())
                    .into_iter()
                    .map(|g| {
                        ResidualGroup::new(
                            g.name,
                            g.indices.into_iter().map(|k| k + offset).collect(),
                        )
                    }),
            );
        }
        groups
    }
}

/// Starting point for the equilibrium solve.
#[derive(Debug, Clone, Default)]
pub struct Seed {
    /// Previous outer iterate, one state per flight point
    pub flight: Option<Vec<EquilibriumState>>,
    pub powertrain: Option<DVector<f64>>,
}

#[derive(Debug, Clone)]
pub struct EquilibriumOutcome {
    pub states: Vec<EquilibriumState>,
    pub powertrain_states: DVector<f64>,
    pub status: SolveStatus,
    pub iterations: usize,
    pub powertrain_iterations: usize,
    pub group_norms: Vec<GroupNorm>,
    /// Points whose residuals miss either tolerance
    pub failed_points: Vec<usize>,
    pub message: Option<String>,
}

fn severity(s: SolveStatus) -> u8 {
    match s {
        SolveStatus::Converged => 0,
        SolveStatus::NotStarted | SolveStatus::Iterating => 1,
        SolveStatus::Stalled => 2,
        SolveStatus::Failed => 3,
    }
}

/// The less converged of two statuses.
pub fn worse(a: SolveStatus, b: SolveStatus) -> SolveStatus {
    if severity(b) > severity(a) { b } else { a }
}

fn flight_guess(problem: &EquilibriumProblem<'_>, seed: &Seed) -> DVector<f64> {
    let n = problem.n_points();
    let mut x = DVector::zeros(3 * n);
    let warm = seed.flight.as_ref().filter(|s| s.len() == n);
    for (i, c) in problem.conditions.iter().enumerate() {
        let s = match warm {
            Some(prev) => prev[i],
            None => problem.model.estimate(c),
        };
        x[3 * i] = s.alpha_deg;
        x[3 * i + 1] = s.thrust_n;
        x[3 * i + 2] = s.delta_m_deg;
    }
    x
}

fn failed_points(
    system: &EquilibriumSystem<'_>,
    x: &DVector<f64>,
    config: &NewtonConfig,
) -> SolverResult<Vec<usize>> {
    let r = system.residual(x)?;
    let scale = system.nominal_scale(x)?;
    Ok((0..system.problem.n_points())
        .filter(|&i| {
            (3 * i..3 * i + 3).any(|k| {
                let a = r[k].abs();
                !(a < config.abs_tol && a / scale[k] < config.rel_tol)
            })
        })
        .collect())
}

/// Solve alpha, thrust and trim at every point together with the
/// power-train's internal states.
pub fn solve_equilibrium(
    problem: &EquilibriumProblem<'_>,
    coupling: CouplingMode,
    seed: &Seed,
    pre_condition: bool,
    config: &NewtonConfig,
) -> MissionResult<EquilibriumOutcome> {
    let system = EquilibriumSystem { problem, coupling };
    let x_flight = flight_guess(problem, seed);
    let n_flight = x_flight.len();
    let n_states = problem.n_states();
    let pt_seed = seed.powertrain.as_ref().filter(|s| s.len() == n_states);

    let (x, status, iterations, pt_iterations, group_norms, message) = if system.monolithic() {
        let pt0 = match pt_seed {
            Some(s) => s.clone(),
            None => problem
                .powertrain
                .initial_states(&problem.demand_at(&x_flight), pre_condition)?,
        };
        let mut x0 = DVector::zeros(n_flight + n_states);
        x0.rows_mut(0, n_flight).copy_from(&x_flight);
        x0.rows_mut(n_flight, n_states).copy_from(&pt0);
        let result = newton_solve(&system, x0, config)?;
        (
            result.x,
            result.status,
            result.iterations,
            0,
            result.group_norms,
            result.message,
        )
    } else {
        let flight = newton_solve(&system, x_flight, config)?;
        let demand = problem.demand_at(&flight.x);
        let pt = solve_states(problem.powertrain, &demand, pt_seed, pre_condition, config)?;
        let mut x = DVector::zeros(n_flight + pt.states.len());
        x.rows_mut(0, n_flight).copy_from(&flight.x);
        x.rows_mut(n_flight, pt.states.len()).copy_from(&pt.states);
        let message = match (&flight.message, pt.status.is_converged()) {
            (Some(m), _) => Some(m.clone()),
            (None, false) => Some(format!("power-train states {}", pt.status.as_str())),
            (None, true) => None,
        };
        (
            x,
            worse(flight.status, pt.status),
            flight.iterations,
            pt.iterations,
            flight.group_norms,
            message,
        )
    };

    let flight_x = x.rows(0, n_flight).into_owned();
    let flight_system = EquilibriumSystem {
        problem,
        coupling: CouplingMode::Nested,
    };
    let failed = failed_points(&flight_system, &flight_x, config)?;
    debug!(
        points = problem.n_points(),
        coupling = coupling.as_str(),
        status = status.as_str(),
        iterations,
        failed = failed.len()
    );

    Ok(EquilibriumOutcome {
        states: (0..problem.n_points()).map(|i| state_at(&x, i)).collect(),
        powertrain_states: x.rows(n_flight, n_states).into_owned(),
        status,
        iterations,
        powertrain_iterations: pt_iterations,
        group_norms,
        failed_points: failed,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aircraft::{Aircraft, fixtures::light_aircraft};
    use crate::config::{MissionProfile, TrimPolicy};
    use crate::driver::power_demand;
    use crate::initializer::initialize;
    use crate::phase::PointCounts;
    use fm_core::units::{Area, Power};
    use fm_powertrain::{BatteryElectric, BatteryPack, Slipstream};
    use fm_solver::{Component, check_partials};
    use uom::si::{area::square_meter, power::kilowatt};

    fn electric() -> BatteryElectric {
        BatteryElectric::new(
            "electric".into(),
            Power::new::<kilowatt>(150.0),
            0.95,
            0.8,
            BatteryPack::new(400.0, 420.0, 330.0, 0.04).unwrap(),
            Slipstream::new(Area::new::<square_meter>(2.8), 0.1, 0.01, -0.015).unwrap(),
        )
        .unwrap()
    }

    fn problem<'a>(ac: &'a Aircraft, pt: &'a dyn PowerTrain) -> EquilibriumProblem<'a> {
        let mission = MissionProfile {
            range_m: 150e3,
            reserve_duration_s: 600.0,
            ..MissionProfile::default()
        };
        let counts = PointCounts {
            climb: 3,
            cruise: 3,
            descent: 2,
            reserve: 1,
        };
        let mass = vec![1_100.0; counts.total()];
        let profile = initialize(ac, &mission, &counts, &mass).unwrap();
        let conditions = (0..counts.total())
            .map(|i| PointCondition {
                q_pa: profile.q_pa[i],
                mass_kg: mass[i],
                gamma_deg: profile.gamma_deg[i],
                accel_x_mps2: profile.accel_x_mps2[i],
                x_cg_m: 2.4,
            })
            .collect();
        EquilibriumProblem {
            model: ResidualModel {
                aero: ac.aero(false),
                geometry: &ac.geometry,
                trim: TrimPolicy::Solve,
            },
            conditions,
            powertrain: pt,
            demand: power_demand(&mission, &profile, &[], 0.0),
        }
    }

    #[test]
    fn monolithic_jacobian_matches_fd() {
        let ac = light_aircraft();
        let pt = electric();
        let p = problem(&ac, &pt);
        let sys = EquilibriumSystem {
            problem: &p,
            coupling: CouplingMode::Monolithic,
        };
        let xf = flight_guess(&p, &Seed::default());
        let states = pt.initial_states(&p.demand_at(&xf), true).unwrap();
        let mut x = DVector::zeros(sys.n_unknowns());
        x.rows_mut(0, xf.len()).copy_from(&xf);
        x.rows_mut(xf.len(), states.len()).copy_from(&states);

        let check = check_partials(&Component::Implicit(&sys), &x, 1e-6).unwrap();
        assert!(check.max_rel_error < 1e-5, "{:?}", check);
    }

    #[test]
    fn monolithic_groups_follow_flight_rows() {
        let ac = light_aircraft();
        let pt = electric();
        let p = problem(&ac, &pt);
        let sys = EquilibriumSystem {
            problem: &p,
            coupling: CouplingMode::Monolithic,
        };
        let groups = sys.groups();
        assert_eq!(groups[1].name, "thrust");
        assert_eq!(groups[1].indices[..3], [1, 4, 7]);
        let covered: usize = groups.iter().map(|g| g.indices.len()).sum();
        assert_eq!(covered, sys.n_unknowns());
        assert!(groups[3..].iter().all(|g| g.indices.iter().all(|&k| k >= 27)));
    }

    #[test]
    fn coupling_modes_agree() {
        let ac = light_aircraft();
        let pt = electric();
        let p = problem(&ac, &pt);
        let config = NewtonConfig::default();
        let nested = solve_equilibrium(&p, CouplingMode::Nested, &Seed::default(), false, &config)
            .unwrap();
        let mono =
            solve_equilibrium(&p, CouplingMode::Monolithic, &Seed::default(), true, &config)
                .unwrap();
        assert!(nested.status.is_converged(), "{:?}", nested.message);
        assert!(mono.status.is_converged(), "{:?}", mono.message);
        assert!(nested.failed_points.is_empty());
        for (a, b) in nested.states.iter().zip(&mono.states) {
            assert!((a.alpha_deg - b.alpha_deg).abs() < 1e-4);
            assert!((a.thrust_n - b.thrust_n).abs() < 1e-3);
            assert!((a.delta_m_deg - b.delta_m_deg).abs() < 1e-4);
        }
        let soc = |s: &DVector<f64>| s[s.len() - 1];
        assert!((soc(&nested.powertrain_states) - soc(&mono.powertrain_states)).abs() < 1e-6);
    }

    #[test]
    fn warm_start_from_solution_takes_no_step() {
        let ac = light_aircraft();
        let pt = electric();
        let p = problem(&ac, &pt);
        let config = NewtonConfig::default();
        let first =
            solve_equilibrium(&p, CouplingMode::Nested, &Seed::default(), false, &config).unwrap();
        let seed = Seed {
            flight: Some(first.states.clone()),
            powertrain: Some(first.powertrain_states.clone()),
        };
        let again = solve_equilibrium(&p, CouplingMode::Nested, &seed, false, &config).unwrap();
        assert_eq!(again.iterations, 0);
        assert_eq!(again.powertrain_iterations, 0);
        assert_eq!(again.states, first.states);
    }

    #[test]
    fn worse_status_wins() {
        assert_eq!(
            worse(SolveStatus::Converged, SolveStatus::Stalled),
            SolveStatus::Stalled
        );
        assert_eq!(
            worse(SolveStatus::Failed, SolveStatus::Stalled),
            SolveStatus::Failed
        );
        assert_eq!(
            worse(SolveStatus::Converged, SolveStatus::Converged),
            SolveStatus::Converged
        );
    }
}
