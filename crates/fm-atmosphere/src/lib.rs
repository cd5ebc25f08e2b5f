//! fm-atmosphere: ISA standard atmosphere for general-aviation altitudes.
//!
//! Pure functions of altitude (and an optional ISA temperature offset). Covers
//! the troposphere and the isothermal lower stratosphere up to 20 km, which is
//! well beyond any piston or electric GA ceiling. Altitudes below sea level
//! are clamped to sea level.

use fm_core::constants::{G0_MPS2, RHO0_KGPM3};

/// Specific gas constant for dry air, J/(kg·K)
pub const R_AIR: f64 = 287.052_87;
/// Ratio of specific heats for air
pub const GAMMA_AIR: f64 = 1.4;
/// Sea-level temperature, K
pub const T0_K: f64 = 288.15;
/// Sea-level pressure, Pa
pub const P0_PA: f64 = 101_325.0;

const LAPSE_K_PER_M: f64 = -0.0065;
const TROPOPAUSE_M: f64 = 11_000.0;
const TROPOPAUSE_T_K: f64 = 216.65;
const CEILING_M: f64 = 20_000.0;

/// Atmospheric state at one altitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtmosphereState {
    pub altitude_m: f64,
    pub temperature_k: f64,
    pub pressure_pa: f64,
    pub density_kgpm3: f64,
    pub speed_of_sound_mps: f64,
}

impl AtmosphereState {
    /// Density ratio rho/rho0.
    pub fn sigma(&self) -> f64 {
        self.density_kgpm3 / RHO0_KGPM3
    }

    /// True airspeed for a given equivalent airspeed.
    pub fn tas_from_eas(&self, eas_mps: f64) -> f64 {
        eas_mps / self.sigma().sqrt()
    }

    /// Equivalent airspeed for a given true airspeed.
    pub fn eas_from_tas(&self, tas_mps: f64) -> f64 {
        tas_mps * self.sigma().sqrt()
    }

    pub fn mach(&self, tas_mps: f64) -> f64 {
        tas_mps / self.speed_of_sound_mps
    }

    pub fn dynamic_pressure(&self, tas_mps: f64) -> f64 {
        0.5 * self.density_kgpm3 * tas_mps * tas_mps
    }
}

/// ISA model with an optional uniform temperature offset (hot/cold day).
#[derive(Debug, Clone, Copy, Default)]
pub struct Atmosphere {
    pub delta_isa_k: f64,
}

impl Atmosphere {
    pub fn new(delta_isa_k: f64) -> Self {
        Self { delta_isa_k }
    }

    /// Standard day.
    pub fn standard() -> Self {
        Self::default()
    }

    pub fn at(&self, altitude_m: f64) -> AtmosphereState {
        let h = altitude_m.clamp(0.0, CEILING_M);

        let (t_std, pressure) = if h <= TROPOPAUSE_M {
            let t = T0_K + LAPSE_K_PER_M * h;
            let p = P0_PA * (t / T0_K).powf(-G0_MPS2 / (LAPSE_K_PER_M * R_AIR));
            (t, p)
        } else {
            let p_tp = P0_PA
                * (TROPOPAUSE_T_K / T0_K).powf(-G0_MPS2 / (LAPSE_K_PER_M * R_AIR));
            let p = p_tp * (-G0_MPS2 / (R_AIR * TROPOPAUSE_T_K) * (h - TROPOPAUSE_M)).exp();
            (TROPOPAUSE_T_K, p)
        };

        // Offset changes temperature (and therefore density) at constant pressure.
        let temperature = t_std + self.delta_isa_k;
        let density = pressure / (R_AIR * temperature);

        AtmosphereState {
            altitude_m: h,
            temperature_k: temperature,
            pressure_pa: pressure,
            density_kgpm3: density,
            speed_of_sound_mps: (GAMMA_AIR * R_AIR * temperature).sqrt(),
        }
    }

    /// Vectorized lookup.
    pub fn at_all(&self, altitudes_m: &[f64]) -> Vec<AtmosphereState> {
        altitudes_m.iter().map(|&h| self.at(h)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sea_level_standard_values() {
        let a = Atmosphere::standard().at(0.0);
        assert!((a.temperature_k - 288.15).abs() < 1e-9);
        assert!((a.pressure_pa - 101_325.0).abs() < 1e-6);
        assert!((a.density_kgpm3 - 1.225).abs() < 1e-3);
        assert!((a.speed_of_sound_mps - 340.29).abs() < 0.05);
    }

    #[test]
    fn two_thousand_meters() {
        let a = Atmosphere::standard().at(2000.0);
        assert!((a.temperature_k - 275.15).abs() < 1e-9);
        assert!((a.density_kgpm3 - 1.0066).abs() < 1e-3);
    }

    #[test]
    fn tropopause_is_continuous() {
        let atm = Atmosphere::standard();
        let below = atm.at(TROPOPAUSE_M - 1e-6);
        let above = atm.at(TROPOPAUSE_M + 1e-6);
        assert!((below.pressure_pa - above.pressure_pa).abs() < 1e-3);
        assert!((below.temperature_k - above.temperature_k).abs() < 1e-6);
    }

    #[test]
    fn eas_tas_round_trip() {
        let a = Atmosphere::standard().at(3000.0);
        let tas = a.tas_from_eas(60.0);
        assert!(tas > 60.0);
        assert!((a.eas_from_tas(tas) - 60.0).abs() < 1e-12);
    }

    #[test]
    fn hot_day_is_less_dense() {
        let std = Atmosphere::standard().at(1000.0);
        let hot = Atmosphere::new(15.0).at(1000.0);
        assert!(hot.density_kgpm3 < std.density_kgpm3);
        assert_eq!(hot.pressure_pa, std.pressure_pa);
    }

    #[test]
    fn negative_altitude_clamps_to_sea_level() {
        let a = Atmosphere::standard().at(-300.0);
        assert_eq!(a.altitude_m, 0.0);
        assert!((a.temperature_k - T0_K).abs() < 1e-12);
    }
}
