//! Piston engine driving a fixed-pitch propeller.

use crate::common::{check_finite, clamp, gagg_ferrar, shaft_power};
use crate::error::{PowerTrainError, PowerTrainResult};
use crate::slipstream::Slipstream;
use crate::traits::{
    PointResponse, PowerDemand, PowerTrain, PowerTrainResponse, check_states, fuel_remaining,
};
use fm_core::constants::{J_PER_KWH, RHO0_KGPM3};
use fm_core::units::{Length, Power};
use nalgebra::DVector;
use tracing::warn;

/// Naturally aspirated piston engine.
///
/// ## Model
///
/// ```text
/// P_max(sigma) = P_max_sl * (1.132 sigma - 0.132)
/// bsfc(s)      = bsfc_min * (1 + k_pl (1 - s)^2),  s = P / P_max
/// ```
#[derive(Clone, Debug)]
pub struct PistonEngine {
    pub max_power_sl: Power,
    /// Best specific fuel consumption (kg/J)
    pub bsfc_min: f64,
    pub part_load_penalty: f64,
    /// Minimum power as a fraction of available power
    pub idle_fraction: f64,
}

impl PistonEngine {
    pub fn new(max_power_sl: Power, bsfc_g_per_kwh: f64) -> PowerTrainResult<Self> {
        if max_power_sl.value <= 0.0 {
            return Err(PowerTrainError::InvalidArg {
                what: "engine max power must be positive",
            });
        }
        if bsfc_g_per_kwh <= 0.0 {
            return Err(PowerTrainError::InvalidArg {
                what: "bsfc must be positive",
            });
        }
        Ok(Self {
            max_power_sl,
            bsfc_min: bsfc_g_per_kwh * 1e-3 / J_PER_KWH,
            part_load_penalty: 0.3,
            idle_fraction: 0.05,
        })
    }

    pub fn with_part_load(mut self, penalty: f64, idle_fraction: f64) -> PowerTrainResult<Self> {
        if penalty < 0.0 {
            return Err(PowerTrainError::InvalidArg {
                what: "part-load penalty cannot be negative",
            });
        }
        if !(0.0..1.0).contains(&idle_fraction) {
            return Err(PowerTrainError::InvalidArg {
                what: "idle fraction must be in [0,1)",
            });
        }
        self.part_load_penalty = penalty;
        self.idle_fraction = idle_fraction;
        Ok(self)
    }

    /// Available power at density ratio `sigma`.
    pub fn max_power_w(&self, sigma: f64) -> f64 {
        self.max_power_sl.value * gagg_ferrar(sigma).max(0.05)
    }

    pub fn bsfc(&self, setting: f64) -> f64 {
        let off = 1.0 - clamp(setting, 0.0, 1.0);
        self.bsfc_min * (1.0 + self.part_load_penalty * off * off)
    }
}

#[derive(Clone, Debug)]
pub struct FuelPropeller {
    pub name: String,
    pub engine: PistonEngine,
    pub prop_efficiency: f64,
    /// Tank centroid from the datum
    pub tank_x: Length,
    slipstream: Slipstream,
}

impl FuelPropeller {
    pub fn new(
        name: String,
        engine: PistonEngine,
        prop_efficiency: f64,
        tank_x: Length,
        slipstream: Slipstream,
    ) -> PowerTrainResult<Self> {
        if prop_efficiency <= 0.0 || prop_efficiency > 1.0 {
            return Err(PowerTrainError::InvalidArg {
                what: "propeller efficiency must be in (0,1]",
            });
        }
        check_finite(tank_x.value, "tank position")?;
        Ok(Self {
            name,
            engine,
            prop_efficiency,
            tank_x,
            slipstream,
        })
    }
}

impl PowerTrain for FuelPropeller {
    fn name(&self) -> &str {
        &self.name
    }

    fn slipstream(&self) -> &Slipstream {
        &self.slipstream
    }

    fn respond(
        &self,
        demand: &PowerDemand,
        states: &DVector<f64>,
    ) -> PowerTrainResult<PowerTrainResponse> {
        check_states(self, demand, states)?;

        let mut points = Vec::with_capacity(demand.len());
        let mut over_limit = 0usize;
        for op in &demand.points {
            check_finite(op.thrust_n, "thrust")?;
            if op.density_kgpm3 <= 0.0 {
                return Err(PowerTrainError::NonPhysical {
                    what: "air density must be positive",
                });
            }
            let p_max = self.engine.max_power_w(op.density_kgpm3 / RHO0_KGPM3);
            let sp = shaft_power(
                op.thrust_n,
                op.tas_mps,
                self.prop_efficiency,
                self.engine.idle_fraction * p_max,
            );
            let setting = sp.power_w / p_max;
            if setting > 1.0 {
                over_limit += 1;
            }
            let thrust_rate = if op.tas_mps > crate::common::EPSILON_TAS {
                op.thrust_n * op.tas_mps / (self.prop_efficiency * p_max)
            } else {
                setting
            };
            let sfc = self.engine.bsfc(setting);
            let flow = sfc * sp.power_w;
            points.push(PointResponse {
                fuel_consumed_kg: flow * op.dt_s,
                thrust_rate,
                engine_setting: setting,
                sfc_kg_per_j: sfc,
                fuel_flow_kgps: flow,
                ..PointResponse::default()
            });
        }
        if over_limit > 0 {
            warn!(
                powertrain = self.name.as_str(),
                points = over_limit,
                "power demand exceeds available engine power"
            );
        }

        let burn: Vec<f64> = points.iter().map(|p| p.fuel_consumed_kg).collect();
        for (p, rem) in points.iter_mut().zip(fuel_remaining(demand, &burn)) {
            p.fuel_remaining_kg = rem;
            p.fuel_lever_arm_kgm = fm_core::clip_non_negative(rem * self.tank_x.value);
        }
        Ok(PowerTrainResponse { points })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{OperatingMode, OperatingPoint};
    use fm_core::units::m;
    use uom::si::power::kilowatt;

    fn powertrain() -> FuelPropeller {
        let engine = PistonEngine::new(Power::new::<kilowatt>(130.0), 250.0).unwrap();
        FuelPropeller::new("piston".into(), engine, 0.8, m(2.4), Slipstream::none()).unwrap()
    }

    fn point(thrust_n: f64, density: f64) -> OperatingPoint {
        OperatingPoint {
            thrust_n,
            altitude_m: 0.0,
            tas_mps: 60.0,
            density_kgpm3: density,
            temperature_k: 288.15,
            dt_s: 10.0,
            mode: OperatingMode::Cruise,
        }
    }

    #[test]
    fn fuel_follows_bsfc() {
        let pt = powertrain();
        let demand = PowerDemand {
            points: vec![point(1_200.0, RHO0_KGPM3)],
            fuel_loaded_kg: 100.0,
            fuel_before_flight_kg: 0.0,
        };
        let out = pt.respond(&demand, &DVector::zeros(0)).unwrap();
        let p = out.points[0];
        let power = 1_200.0 * 60.0 / 0.8;
        let setting = power / 130_000.0;
        assert!((p.engine_setting - setting).abs() < 1e-12);
        let bsfc = 250.0e-3 / J_PER_KWH * (1.0 + 0.3 * (1.0 - setting).powi(2));
        assert!((p.fuel_consumed_kg - bsfc * power * 10.0).abs() < 1e-12);
        assert_eq!(p.fuel_remaining_kg, 100.0);
        assert!((p.fuel_lever_arm_kgm - 240.0).abs() < 1e-12);
        assert_eq!(p.energy_consumed_j, 0.0);
    }

    #[test]
    fn altitude_lowers_available_power() {
        let pt = powertrain();
        let demand = PowerDemand {
            points: vec![point(1_200.0, RHO0_KGPM3), point(1_200.0, 0.9)],
            fuel_loaded_kg: 100.0,
            fuel_before_flight_kg: 5.0,
        };
        let out = pt.respond(&demand, &DVector::zeros(0)).unwrap();
        assert!(out.points[1].thrust_rate > out.points[0].thrust_rate);
        // Pre-flight allowance is drawn after the first point.
        let expected = 100.0 - out.points[0].fuel_consumed_kg - 5.0;
        assert!((out.points[1].fuel_remaining_kg - expected).abs() < 1e-12);
    }

    #[test]
    fn part_load_costs_fuel_per_joule() {
        let e = PistonEngine::new(Power::new::<kilowatt>(100.0), 240.0).unwrap();
        assert!(e.bsfc(0.3) > e.bsfc(0.9));
        assert!((e.bsfc(1.0) - e.bsfc_min).abs() < 1e-18);
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(PistonEngine::new(Power::new::<kilowatt>(0.0), 240.0).is_err());
        let e = PistonEngine::new(Power::new::<kilowatt>(100.0), 240.0).unwrap();
        assert!(e.clone().with_part_load(0.2, 1.5).is_err());
        assert!(FuelPropeller::new("x".into(), e, 1.2, m(1.0), Slipstream::none()).is_err());
    }
}
