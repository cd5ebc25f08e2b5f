//! Battery pack and battery-electric propulsion.
//!
//! The pack carries two unknowns per power-train point, current `I` and state
//! of charge `SoC`:
//!
//! ```text
//! (OCV(SoC_i) - R I_i) I_i = P_i
//! SoC_0 = SoC_init
//! SoC_i = SoC_{i-1} - I_{i-1} dt_{i-1} / Q
//! ```
//!
//! The second equation couples each point to its predecessor, so the state
//! Jacobian is block lower-bidiagonal rather than block diagonal.

use crate::common::{check_finite, shaft_power};
use crate::error::{PowerTrainError, PowerTrainResult};
use crate::slipstream::Slipstream;
use crate::traits::{
    PointResponse, PowerDemand, PowerTrain, PowerTrainResponse, StatePartials, check_states,
    fuel_remaining,
};
use fm_core::units::Power;
use fm_solver::{ResidualGroup, SparseJacobian};
use nalgebra::DVector;
use tracing::warn;

/// Reference power for the current rows when the demand is near zero.
const POWER_SCALE_FLOOR_W: f64 = 1_000.0;

#[derive(Clone, Debug)]
pub struct BatteryPack {
    /// Capacity in coulombs
    pub capacity_c: f64,
    pub ocv_full_v: f64,
    pub ocv_empty_v: f64,
    pub resistance_ohm: f64,
    pub initial_soc: f64,
    pub min_soc: f64,
}

impl BatteryPack {
    pub fn new(
        capacity_ah: f64,
        ocv_full_v: f64,
        ocv_empty_v: f64,
        resistance_ohm: f64,
    ) -> PowerTrainResult<Self> {
        if capacity_ah <= 0.0 {
            return Err(PowerTrainError::InvalidArg {
                what: "battery capacity must be positive",
            });
        }
        if ocv_empty_v <= 0.0 || ocv_full_v <= ocv_empty_v {
            return Err(PowerTrainError::InvalidArg {
                what: "open-circuit voltage must satisfy 0 < empty < full",
            });
        }
        if resistance_ohm < 0.0 {
            return Err(PowerTrainError::InvalidArg {
                what: "internal resistance cannot be negative",
            });
        }
        Ok(Self {
            capacity_c: capacity_ah * 3600.0,
            ocv_full_v,
            ocv_empty_v,
            resistance_ohm,
            initial_soc: 1.0,
            min_soc: 0.2,
        })
    }

    pub fn with_soc_limits(mut self, initial: f64, min: f64) -> PowerTrainResult<Self> {
        if !(0.0..=1.0).contains(&initial) || !(0.0..=initial).contains(&min) {
            return Err(PowerTrainError::InvalidArg {
                what: "state of charge limits must satisfy 0 <= min <= initial <= 1",
            });
        }
        self.initial_soc = initial;
        self.min_soc = min;
        Ok(self)
    }

    pub fn ocv(&self, soc: f64) -> f64 {
        self.ocv_empty_v + (self.ocv_full_v - self.ocv_empty_v) * soc
    }

    fn d_ocv(&self) -> f64 {
        self.ocv_full_v - self.ocv_empty_v
    }

    /// Pack energy at full charge, based on mean open-circuit voltage.
    pub fn energy_j(&self) -> f64 {
        0.5 * (self.ocv_full_v + self.ocv_empty_v) * self.capacity_c
    }

    pub fn initial_states(&self, power_w: &[f64], dt_s: &[f64], pre_condition: bool) -> DVector<f64> {
        let n = power_w.len();
        let mut x = DVector::zeros(2 * n);
        let mut soc = self.initial_soc;
        for i in 0..n {
            let current = if pre_condition {
                power_w[i] / self.ocv(soc)
            } else {
                0.0
            };
            x[2 * i] = current;
            x[2 * i + 1] = soc;
            if pre_condition {
                soc -= current * dt_s[i] / self.capacity_c;
            }
        }
        x
    }

    pub fn residual(&self, power_w: &[f64], dt_s: &[f64], x: &DVector<f64>) -> DVector<f64> {
        let n = power_w.len();
        let mut r = DVector::zeros(2 * n);
        for i in 0..n {
            let (current, soc) = (x[2 * i], x[2 * i + 1]);
            r[2 * i] = (self.ocv(soc) - self.resistance_ohm * current) * current - power_w[i];
            r[2 * i + 1] = if i == 0 {
                soc - self.initial_soc
            } else {
                soc - x[2 * i - 1] + x[2 * i - 2] * dt_s[i - 1] / self.capacity_c
            };
        }
        r
    }

    pub fn partials(
        &self,
        d_power_d_thrust: &[f64],
        dt_s: &[f64],
        x: &DVector<f64>,
    ) -> PowerTrainResult<StatePartials> {
        let n = d_power_d_thrust.len();
        let mut wrt_states = SparseJacobian::with_capacity(2 * n, 2 * n, 5 * n);
        let mut wrt_thrust = SparseJacobian::with_capacity(2 * n, n, n);
        for i in 0..n {
            let (current, soc) = (x[2 * i], x[2 * i + 1]);
            wrt_states.add(
                2 * i,
                2 * i,
                self.ocv(soc) - 2.0 * self.resistance_ohm * current,
            )?;
            wrt_states.add(2 * i, 2 * i + 1, self.d_ocv() * current)?;
            wrt_thrust.add(2 * i, i, -d_power_d_thrust[i])?;

            wrt_states.add(2 * i + 1, 2 * i + 1, 1.0)?;
            if i > 0 {
                wrt_states.add(2 * i + 1, 2 * i - 1, -1.0)?;
                wrt_states.add(2 * i + 1, 2 * i - 2, dt_s[i - 1] / self.capacity_c)?;
            }
        }
        Ok(StatePartials {
            wrt_states,
            wrt_thrust,
        })
    }

    pub fn scale(&self, power_w: &[f64]) -> DVector<f64> {
        let mut s = DVector::from_element(2 * power_w.len(), 1.0);
        for (i, p) in power_w.iter().enumerate() {
            s[2 * i] = p.abs().max(POWER_SCALE_FLOOR_W);
        }
        s
    }

    pub fn groups(n_points: usize) -> Vec<ResidualGroup> {
        vec![
            ResidualGroup::strided("battery current", 0, 2, n_points),
            ResidualGroup::strided("state of charge", 1, 2, n_points),
        ]
    }

    /// Chemical energy drawn per point and the state of charge trace.
    pub fn energy(&self, dt_s: &[f64], x: &DVector<f64>) -> Vec<(f64, f64)> {
        (0..dt_s.len())
            .map(|i| {
                let (current, soc) = (x[2 * i], x[2 * i + 1]);
                (self.ocv(soc) * current * dt_s[i], soc)
            })
            .collect()
    }

    /// Lowest state of charge over the trace, including the charge left
    /// after the last point's draw.
    pub fn lowest_soc(&self, dt_s: &[f64], x: &DVector<f64>) -> f64 {
        let n = x.len() / 2;
        let Some(last) = n.checked_sub(1) else {
            return self.initial_soc;
        };
        let after_last =
            x[2 * last + 1] - x[2 * last] * dt_s.get(last).copied().unwrap_or(0.0) / self.capacity_c;
        (0..n)
            .map(|i| x[2 * i + 1])
            .fold(after_last, f64::min)
    }

    pub(crate) fn warn_if_depleted(&self, name: &str, dt_s: &[f64], x: &DVector<f64>) {
        let min = self.lowest_soc(dt_s, x);
        if min < self.min_soc {
            warn!(
                powertrain = name,
                soc = min,
                min_soc = self.min_soc,
                "battery discharged below its minimum state of charge"
            );
        }
    }
}

/// Electric bus power per point and its derivative with respect to thrust.
pub(crate) struct BusDemand {
    pub shaft_w: Vec<f64>,
    pub bus_w: Vec<f64>,
    pub d_bus_d_thrust: Vec<f64>,
    pub dt_s: Vec<f64>,
}

pub(crate) fn bus_demand(
    demand: &PowerDemand,
    prop_efficiency: f64,
    motor_efficiency: f64,
) -> PowerTrainResult<BusDemand> {
    let n = demand.len();
    let mut out = BusDemand {
        shaft_w: Vec::with_capacity(n),
        bus_w: Vec::with_capacity(n),
        d_bus_d_thrust: Vec::with_capacity(n),
        dt_s: Vec::with_capacity(n),
    };
    for op in &demand.points {
        check_finite(op.thrust_n, "thrust")?;
        check_finite(op.dt_s, "time step")?;
        let sp = shaft_power(op.thrust_n, op.tas_mps, prop_efficiency, 0.0);
        out.shaft_w.push(sp.power_w);
        out.bus_w.push(sp.power_w / motor_efficiency);
        out.d_bus_d_thrust.push(sp.d_power_d_thrust / motor_efficiency);
        out.dt_s.push(op.dt_s);
    }
    Ok(out)
}

pub(crate) fn check_efficiency(v: f64, what: &'static str) -> PowerTrainResult<()> {
    if v <= 0.0 || v > 1.0 {
        return Err(PowerTrainError::InvalidArg { what });
    }
    Ok(())
}

/// Battery feeding an electric motor and propeller.
#[derive(Clone, Debug)]
pub struct BatteryElectric {
    pub name: String,
    pub motor_max_power: Power,
    pub motor_efficiency: f64,
    pub prop_efficiency: f64,
    pub pack: BatteryPack,
    slipstream: Slipstream,
}

impl BatteryElectric {
    pub fn new(
        name: String,
        motor_max_power: Power,
        motor_efficiency: f64,
        prop_efficiency: f64,
        pack: BatteryPack,
        slipstream: Slipstream,
    ) -> PowerTrainResult<Self> {
        if motor_max_power.value <= 0.0 {
            return Err(PowerTrainError::InvalidArg {
                what: "motor max power must be positive",
            });
        }
        check_efficiency(motor_efficiency, "motor efficiency must be in (0,1]")?;
        check_efficiency(prop_efficiency, "propeller efficiency must be in (0,1]")?;
        Ok(Self {
            name,
            motor_max_power,
            motor_efficiency,
            prop_efficiency,
            pack,
            slipstream,
        })
    }

    fn bus(&self, demand: &PowerDemand) -> PowerTrainResult<BusDemand> {
        bus_demand(demand, self.prop_efficiency, self.motor_efficiency)
    }
}

impl PowerTrain for BatteryElectric {
    fn name(&self) -> &str {
        &self.name
    }

    fn slipstream(&self) -> &Slipstream {
        &self.slipstream
    }

    fn burns_fuel(&self) -> bool {
        false
    }

    fn states_per_point(&self) -> usize {
        2
    }

    fn initial_states(
        &self,
        demand: &PowerDemand,
        pre_condition: bool,
    ) -> PowerTrainResult<DVector<f64>> {
        let bus = self.bus(demand)?;
        Ok(self.pack.initial_states(&bus.bus_w, &bus.dt_s, pre_condition))
    }

    fn state_residual(
        &self,
        demand: &PowerDemand,
        states: &DVector<f64>,
    ) -> PowerTrainResult<DVector<f64>> {
        check_states(self, demand, states)?;
        let bus = self.bus(demand)?;
        Ok(self.pack.residual(&bus.bus_w, &bus.dt_s, states))
    }

    fn state_partials(
        &self,
        demand: &PowerDemand,
        states: &DVector<f64>,
    ) -> PowerTrainResult<StatePartials> {
        check_states(self, demand, states)?;
        let bus = self.bus(demand)?;
        self.pack.partials(&bus.d_bus_d_thrust, &bus.dt_s, states)
    }

    fn state_scale(
        &self,
        demand: &PowerDemand,
        _states: &DVector<f64>,
    ) -> PowerTrainResult<DVector<f64>> {
        Ok(self.pack.scale(&self.bus(demand)?.bus_w))
    }

    fn state_groups(&self, n_points: usize) -> Vec<ResidualGroup> {
        BatteryPack::groups(n_points)
    }

    fn respond(
        &self,
        demand: &PowerDemand,
        states: &DVector<f64>,
    ) -> PowerTrainResult<PowerTrainResponse> {
        check_states(self, demand, states)?;
        let bus = self.bus(demand)?;
        self.pack.warn_if_depleted(&self.name, &bus.dt_s, states);

        let burn = vec![0.0; demand.len()];
        let remaining = fuel_remaining(demand, &burn);
        let points = self
            .pack
            .energy(&bus.dt_s, states)
            .into_iter()
            .zip(&bus.shaft_w)
            .zip(remaining)
            .map(|(((energy, soc), shaft), rem)| {
                let setting = shaft / self.motor_max_power.value;
                PointResponse {
                    fuel_remaining_kg: rem,
                    energy_consumed_j: energy,
                    thrust_rate: setting,
                    engine_setting: setting,
                    state_of_charge: Some(soc),
                    ..PointResponse::default()
                }
            })
            .collect();
        Ok(PowerTrainResponse { points })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{OperatingMode, OperatingPoint, StateSystem, solve_states};
    use fm_solver::{Component, NewtonConfig, check_partials};
    use uom::si::power::kilowatt;

    fn pack() -> BatteryPack {
        BatteryPack::new(150.0, 400.0, 320.0, 0.05).unwrap()
    }

    fn electric() -> BatteryElectric {
        BatteryElectric::new(
            "electric".into(),
            Power::new::<kilowatt>(120.0),
            0.95,
            0.82,
            pack(),
            Slipstream::none(),
        )
        .unwrap()
    }

    fn demand(n: usize) -> PowerDemand {
        PowerDemand {
            points: (0..n)
                .map(|i| OperatingPoint {
                    thrust_n: 900.0 + 50.0 * i as f64,
                    altitude_m: 1000.0,
                    tas_mps: 55.0,
                    density_kgpm3: 1.11,
                    temperature_k: 281.65,
                    dt_s: 60.0,
                    mode: OperatingMode::Cruise,
                })
                .collect(),
            fuel_loaded_kg: 0.0,
            fuel_before_flight_kg: 0.0,
        }
    }

    #[test]
    fn state_partials_match_fd() {
        let pt = electric();
        let d = demand(4);
        let x = pt.initial_states(&d, true).unwrap();
        let sys = StateSystem {
            powertrain: &pt,
            demand: &d,
        };
        let check = check_partials(&Component::Implicit(&sys), &x, 1e-6).unwrap();
        assert!(check.max_rel_error < 1e-6, "{:?}", check);
    }

    #[test]
    fn thrust_partials_match_fd() {
        let pt = electric();
        let d = demand(3);
        let x = pt.initial_states(&d, true).unwrap();
        let analytic = pt.state_partials(&d, &x).unwrap().wrt_thrust.to_dense();

        let h = 1e-3;
        for i in 0..3 {
            let mut thrust: Vec<f64> = d.points.iter().map(|p| p.thrust_n).collect();
            thrust[i] += h;
            let plus = pt.state_residual(&d.with_thrust(&thrust).unwrap(), &x).unwrap();
            thrust[i] -= 2.0 * h;
            let minus = pt.state_residual(&d.with_thrust(&thrust).unwrap(), &x).unwrap();
            let fd = (plus - minus) / (2.0 * h);
            for r in 0..6 {
                assert!((analytic[(r, i)] - fd[r]).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn nested_solve_drains_battery() {
        let pt = electric();
        let d = demand(6);
        let sol = solve_states(&pt, &d, None, false, &NewtonConfig::default()).unwrap();
        assert!(sol.status.is_converged());

        let out = pt.respond(&d, &sol.states).unwrap();
        let soc: Vec<f64> = out.points.iter().map(|p| p.state_of_charge.unwrap()).collect();
        assert_eq!(soc[0], 1.0);
        for w in soc.windows(2) {
            assert!(w[1] < w[0]);
        }
        assert!(out.total_energy_j() > 0.0);
        assert_eq!(out.total_fuel_kg(), 0.0);

        // Terminal power balance at every point.
        let r = pt.state_residual(&d, &sol.states).unwrap();
        assert!(r.amax() < 1e-6);
    }

    #[test]
    fn pre_conditioning_needs_no_more_iterations() {
        let pt = electric();
        let d = demand(8);
        let cold = solve_states(&pt, &d, None, false, &NewtonConfig::default()).unwrap();
        let warm = solve_states(&pt, &d, None, true, &NewtonConfig::default()).unwrap();
        assert!(cold.status.is_converged() && warm.status.is_converged());
        assert!(warm.iterations <= cold.iterations);
        assert!((&cold.states - &warm.states).amax() < 1e-6);
    }

    #[test]
    fn unreachable_power_is_not_converged() {
        // OCV^2 < 4 R P: no real current delivers the demand.
        let pack = BatteryPack::new(150.0, 40.0, 32.0, 0.5).unwrap();
        let pt = BatteryElectric::new(
            "weak".into(),
            Power::new::<kilowatt>(120.0),
            0.95,
            0.82,
            pack,
            Slipstream::none(),
        )
        .unwrap();
        let d = demand(2);
        let sol = solve_states(&pt, &d, None, true, &NewtonConfig::default()).unwrap();
        assert!(!sol.status.is_converged());
    }

    #[test]
    fn lowest_soc_counts_the_final_draw() {
        let pack = pack();
        // 150 Ah; 300 A for 1800 s drains 1.0 of charge.
        let x = DVector::from_vec(vec![0.0, 1.0, 0.0, 1.0, 300.0, 1.0]);
        let dt = [60.0, 60.0, 1800.0];
        assert!((pack.lowest_soc(&dt, &x) - 0.0).abs() < 1e-12);

        let idle = DVector::from_vec(vec![0.0, 0.9, 0.0, 0.8]);
        assert_eq!(pack.lowest_soc(&[60.0, 60.0], &idle), 0.8);
        assert_eq!(pack.lowest_soc(&[], &DVector::zeros(0)), pack.initial_soc);
    }

    #[test]
    fn rejects_bad_pack() {
        assert!(BatteryPack::new(0.0, 400.0, 320.0, 0.05).is_err());
        assert!(BatteryPack::new(100.0, 300.0, 320.0, 0.05).is_err());
        assert!(pack().with_soc_limits(0.9, 0.95).is_err());
    }
}
