//! Serial hybrid: battery and fuel generator share the electric bus.
//!
//! The battery delivers a fixed share of the bus power; a piston generator
//! covers the rest and burns fuel. Only the battery carries internal states.

use crate::battery::{BatteryPack, bus_demand, check_efficiency};
use crate::common::check_finite;
use crate::error::{PowerTrainError, PowerTrainResult};
use crate::fuel::PistonEngine;
use crate::slipstream::Slipstream;
use crate::traits::{
    PointResponse, PowerDemand, PowerTrain, PowerTrainResponse, StatePartials, check_states,
    fuel_remaining,
};
use fm_core::constants::RHO0_KGPM3;
use fm_core::units::{Length, Power};
use fm_solver::ResidualGroup;
use nalgebra::DVector;

#[derive(Clone, Debug)]
pub struct SerialHybrid {
    pub name: String,
    pub motor_max_power: Power,
    pub motor_efficiency: f64,
    pub prop_efficiency: f64,
    pub pack: BatteryPack,
    pub generator: PistonEngine,
    /// Shaft-to-bus efficiency of the generator
    pub generator_efficiency: f64,
    /// Share of bus power drawn from the battery, in [0, 1]
    pub battery_share: f64,
    pub tank_x: Length,
    slipstream: Slipstream,
}

impl SerialHybrid {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        motor_max_power: Power,
        motor_efficiency: f64,
        prop_efficiency: f64,
        pack: BatteryPack,
        generator: PistonEngine,
        generator_efficiency: f64,
        battery_share: f64,
        tank_x: Length,
        slipstream: Slipstream,
    ) -> PowerTrainResult<Self> {
        if motor_max_power.value <= 0.0 {
            return Err(PowerTrainError::InvalidArg {
                what: "motor max power must be positive",
            });
        }
        check_efficiency(motor_efficiency, "motor efficiency must be in (0,1]")?;
        check_efficiency(prop_efficiency, "propeller efficiency must be in (0,1]")?;
        check_efficiency(generator_efficiency, "generator efficiency must be in (0,1]")?;
        if !(0.0..=1.0).contains(&battery_share) {
            return Err(PowerTrainError::InvalidArg {
                what: "battery share must be in [0,1]",
            });
        }
        check_finite(tank_x.value, "tank position")?;
        Ok(Self {
            name,
            motor_max_power,
            motor_efficiency,
            prop_efficiency,
            pack,
            generator,
            generator_efficiency,
            battery_share,
            tank_x,
            slipstream,
        })
    }

    /// Battery terminal power per point and its thrust derivative.
    fn battery_demand(&self, demand: &PowerDemand) -> PowerTrainResult<(Vec<f64>, Vec<f64>, Vec<f64>)> {
        let bus = bus_demand(demand, self.prop_efficiency, self.motor_efficiency)?;
        let p = bus.bus_w.iter().map(|w| w * self.battery_share).collect();
        let dp = bus
            .d_bus_d_thrust
            .iter()
            .map(|w| w * self.battery_share)
            .collect();
        Ok((p, dp, bus.dt_s))
    }
}

impl PowerTrain for SerialHybrid {
    fn name(&self) -> &str {
        &self.name
    }

    fn slipstream(&self) -> &Slipstream {
        &self.slipstream
    }

    fn states_per_point(&self) -> usize {
        2
    }

    fn initial_states(
        &self,
        demand: &PowerDemand,
        pre_condition: bool,
    ) -> PowerTrainResult<DVector<f64>> {
        let (p, _, dt) = self.battery_demand(demand)?;
        Ok(self.pack.initial_states(&p, &dt, pre_condition))
    }

    fn state_residual(
        &self,
        demand: &PowerDemand,
        states: &DVector<f64>,
    ) -> PowerTrainResult<DVector<f64>> {
        check_states(self, demand, states)?;
        let (p, _, dt) = self.battery_demand(demand)?;
        Ok(self.pack.residual(&p, &dt, states))
    }

    fn state_partials(
        &self,
        demand: &PowerDemand,
        states: &DVector<f64>,
    ) -> PowerTrainResult<StatePartials> {
        check_states(self, demand, states)?;
        let (_, dp, dt) = self.battery_demand(demand)?;
        self.pack.partials(&dp, &dt, states)
    }

    fn state_scale(
        &self,
        demand: &PowerDemand,
        _states: &DVector<f64>,
    ) -> PowerTrainResult<DVector<f64>> {
        Ok(self.pack.scale(&self.battery_demand(demand)?.0))
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
        let bus = bus_demand(demand, self.prop_efficiency, self.motor_efficiency)?;
        self.pack.warn_if_depleted(&self.name, &bus.dt_s, states);
        let battery = self.pack.energy(&bus.dt_s, states);

        let mut points = Vec::with_capacity(demand.len());
        for (i, op) in demand.points.iter().enumerate() {
            let gen_shaft =
                bus.bus_w[i] * (1.0 - self.battery_share) / self.generator_efficiency;
            let p_max = self
                .generator
                .max_power_w(op.density_kgpm3 / RHO0_KGPM3);
            let gen_setting = gen_shaft / p_max;
            let sfc = if gen_shaft > 0.0 {
                self.generator.bsfc(gen_setting)
            } else {
                0.0
            };
            let flow = sfc * gen_shaft;
            let setting = bus.shaft_w[i] / self.motor_max_power.value;
            points.push(PointResponse {
                fuel_consumed_kg: flow * op.dt_s,
                energy_consumed_j: battery[i].0,
                thrust_rate: setting,
                engine_setting: gen_setting,
                sfc_kg_per_j: sfc,
                fuel_flow_kgps: flow,
                state_of_charge: Some(battery[i].1),
                ..PointResponse::default()
            });
        }

        let burn: Vec<f64> = points.iter().map(|p| p.fuel_consumed_kg).collect();
        for (p, rem) in points.iter_mut().zip(fuel_remaining(demand, &burn)) {
            p.fuel_remaining_kg = rem;
            p.fuel_lever_arm_kgm = fm_core::clip_non_negative(rem * self.tank_x.value);
        }
        Ok(PowerTrainResponse { points })
    }
}
