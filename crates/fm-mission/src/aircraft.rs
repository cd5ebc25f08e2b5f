//! Aircraft data consumed by the mission solver.
//!
//! Lift slopes are per radian; the tail lift coefficient is referenced to the
//! wing area. Positions are measured aft from a common datum.

use crate::error::{MissionError, MissionResult};

/// One aerodynamic coefficient set (clean cruise, or low-speed with flaps).
#[derive(Debug, Clone, PartialEq)]
pub struct AeroCoefficients {
    pub cl0_wing: f64,
    pub cl_alpha_wing: f64,
    pub cm0_wing: f64,
    /// Induced drag factor of the wing
    pub k_wing: f64,
    pub cl0_tail: f64,
    pub cl_alpha_tail: f64,
    /// Tail lift per radian of elevator
    pub cl_delta_elev: f64,
    pub k_tail: f64,
    /// Elevator drag per radian squared
    pub cd_delta_elev: f64,
    pub cd0: f64,
    pub cm_alpha_fus: f64,
    pub cl_max_clean: f64,
    pub delta_cl_flaps: f64,
    pub delta_cd_flaps: f64,
    pub delta_cm_flaps: f64,
}

impl Default for AeroCoefficients {
    /// Clean four-seat single.
    fn default() -> Self {
        Self {
            cl0_wing: 0.25,
            cl_alpha_wing: 4.9,
            cm0_wing: -0.07,
            k_wing: 0.045,
            cl0_tail: -0.01,
            cl_alpha_tail: 0.55,
            cl_delta_elev: 0.4,
            k_tail: 0.3,
            cd_delta_elev: 0.02,
            cd0: 0.028,
            cm_alpha_fus: 0.12,
            cl_max_clean: 1.5,
            delta_cl_flaps: 0.0,
            delta_cd_flaps: 0.0,
            delta_cm_flaps: 0.0,
        }
    }
}

impl AeroCoefficients {
    pub fn validate(&self, what: &'static str) -> MissionResult<()> {
        let values = [
            self.cl0_wing,
            self.cl_alpha_wing,
            self.cm0_wing,
            self.k_wing,
            self.cl0_tail,
            self.cl_alpha_tail,
            self.cl_delta_elev,
            self.k_tail,
            self.cd_delta_elev,
            self.cd0,
            self.cm_alpha_fus,
            self.cl_max_clean,
            self.delta_cl_flaps,
            self.delta_cd_flaps,
            self.delta_cm_flaps,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(MissionError::Config {
                what: format!("{what}: non-finite aerodynamic coefficient"),
            });
        }
        if self.cd0 <= 0.0 || self.k_wing <= 0.0 {
            return Err(MissionError::Config {
                what: format!("{what}: cd0 and induced drag factor must be positive"),
            });
        }
        if self.cl_max_clean <= 0.0 {
            return Err(MissionError::Config {
                what: format!("{what}: CL max must be positive"),
            });
        }
        if self.cl_alpha_wing + self.cl_alpha_tail <= 0.0 {
            return Err(MissionError::Config {
                what: format!("{what}: total lift slope must be positive"),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AircraftGeometry {
    pub wing_area_m2: f64,
    /// Mean aerodynamic chord
    pub mac_m: f64,
    pub x_ac_wing_m: f64,
    pub x_ac_tail_m: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MassProperties {
    /// Ramp mass at engine start
    pub mtow_kg: f64,
    /// CG of the aircraft without fuel
    pub x_cg_fixed_m: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aircraft {
    pub name: String,
    pub geometry: AircraftGeometry,
    pub mass: MassProperties,
    pub cruise_aero: AeroCoefficients,
    pub low_speed_aero: AeroCoefficients,
}

impl Aircraft {
    /// Coefficient set for the equilibrium residuals.
    pub fn aero(&self, low_speed: bool) -> &AeroCoefficients {
        if low_speed {
            &self.low_speed_aero
        } else {
            &self.cruise_aero
        }
    }

    pub fn validate(&self) -> MissionResult<()> {
        let g = &self.geometry;
        if !(g.wing_area_m2 > 0.0) || !(g.mac_m > 0.0) {
            return Err(MissionError::Config {
                what: "wing area and MAC must be positive".into(),
            });
        }
        if !g.x_ac_wing_m.is_finite() || !g.x_ac_tail_m.is_finite() {
            return Err(MissionError::Config {
                what: "aerodynamic centre positions must be finite".into(),
            });
        }
        if !(self.mass.mtow_kg > 0.0) || !self.mass.x_cg_fixed_m.is_finite() {
            return Err(MissionError::Config {
                what: "MTOW must be positive and fixed CG finite".into(),
            });
        }
        self.cruise_aero.validate("cruise aerodynamics")?;
        self.low_speed_aero.validate("low-speed aerodynamics")?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn light_aircraft() -> Aircraft {
        let cruise = AeroCoefficients::default();
        let low_speed = AeroCoefficients {
            delta_cl_flaps: 0.35,
            delta_cd_flaps: 0.012,
            delta_cm_flaps: -0.05,
            ..cruise.clone()
        };
        Aircraft {
            name: "light".into(),
            geometry: AircraftGeometry {
                wing_area_m2: 16.0,
                mac_m: 1.5,
                x_ac_wing_m: 2.45,
                x_ac_tail_m: 7.6,
            },
            mass: MassProperties {
                mtow_kg: 1150.0,
                x_cg_fixed_m: 2.35,
            },
            cruise_aero: cruise,
            low_speed_aero: low_speed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_speed_flag_selects_set() {
        let a = fixtures::light_aircraft();
        assert_eq!(a.aero(false).delta_cl_flaps, 0.0);
        assert_eq!(a.aero(true).delta_cl_flaps, 0.35);
        a.validate().unwrap();
    }

    #[test]
    fn rejects_bad_geometry() {
        let mut a = fixtures::light_aircraft();
        a.geometry.wing_area_m2 = 0.0;
        assert!(matches!(a.validate(), Err(MissionError::Config { .. })));

        let mut a = fixtures::light_aircraft();
        a.cruise_aero.cd0 = f64::NAN;
        assert!(a.validate().is_err());
    }
}
