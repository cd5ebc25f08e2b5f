//! Common utilities for power-train calculations.

use crate::error::{PowerTrainError, PowerTrainResult};
use fm_core::numeric::ensure_finite;

/// Speeds below this are treated as static (taxi hold, run-up).
pub const EPSILON_TAS: f64 = 1e-3;

/// Ensure a value is finite, returning PowerTrainError if not.
pub fn check_finite(value: f64, what: &'static str) -> PowerTrainResult<()> {
    ensure_finite(value, what).map_err(|_| PowerTrainError::NonPhysical { what })?;
    Ok(())
}

/// Clamp a value between min and max.
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Shaft power demand and its derivative with respect to thrust.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShaftPower {
    pub power_w: f64,
    pub d_power_d_thrust: f64,
}

/// Shaft power needed to deliver `thrust_n` at `tas_mps` through a
/// propeller of efficiency `eta`, never below `idle_w`.
pub fn shaft_power(thrust_n: f64, tas_mps: f64, eta: f64, idle_w: f64) -> ShaftPower {
    if tas_mps <= EPSILON_TAS {
        return ShaftPower {
            power_w: idle_w,
            d_power_d_thrust: 0.0,
        };
    }
    let p = thrust_n * tas_mps / eta;
    if p <= idle_w {
        ShaftPower {
            power_w: idle_w,
            d_power_d_thrust: 0.0,
        }
    } else {
        ShaftPower {
            power_w: p,
            d_power_d_thrust: tas_mps / eta,
        }
    }
}

/// Gagg-Ferrar altitude lapse of naturally aspirated piston power.
pub fn gagg_ferrar(sigma: f64) -> f64 {
    1.132 * sigma - 0.132
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(5.0, 0.0, 10.0), 5.0);
        assert_eq!(clamp(-1.0, 0.0, 10.0), 0.0);
        assert_eq!(clamp(11.0, 0.0, 10.0), 10.0);
    }

    #[test]
    fn test_check_finite() {
        assert!(check_finite(1.0, "test").is_ok());
        assert!(check_finite(f64::INFINITY, "test").is_err());
        assert!(check_finite(f64::NAN, "test").is_err());
    }

    #[test]
    fn idle_floor_has_zero_slope() {
        let sp = shaft_power(-200.0, 60.0, 0.8, 5_000.0);
        assert_eq!(sp.power_w, 5_000.0);
        assert_eq!(sp.d_power_d_thrust, 0.0);

        let sp = shaft_power(2_000.0, 60.0, 0.8, 5_000.0);
        assert!((sp.power_w - 150_000.0).abs() < 1e-9);
        assert!((sp.d_power_d_thrust - 75.0).abs() < 1e-12);
    }

    #[test]
    fn lapse_is_unity_at_sea_level() {
        assert!((gagg_ferrar(1.0) - 1.0).abs() < 1e-12);
        assert!(gagg_ferrar(0.8) < 0.8);
    }
}
