//! Propeller slipstream interaction with the wing.
//!
//! Actuator-disk model: the blown part of the wing sees a dynamic pressure
//! increase of `T / A_disk`, so each coefficient increment is linear in the
//! thrust loading `T / (q A_disk)`:
//!
//! ```text
//! delta_C = k_C * T / (q * A_disk)      for T > 0
//! ```
//!
//! Windmilling (negative thrust) is treated as unblown.

use crate::error::{PowerTrainError, PowerTrainResult};
use fm_core::units::Area;
use fm_solver::{ExplicitMap, SolverError, SolverResult};
use nalgebra::{DMatrix, DVector};
use uom::si::area::square_meter;

/// Incremental lift, drag and pitching-moment coefficients at one point.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AeroDelta {
    pub cl: f64,
    pub cd: f64,
    pub cm: f64,
}

impl AeroDelta {
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            cl: self.cl * factor,
            cd: self.cd * factor,
            cm: self.cm * factor,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Slipstream {
    pub disk_area: Area,
    pub k_cl: f64,
    pub k_cd: f64,
    pub k_cm: f64,
}

impl Slipstream {
    pub fn new(disk_area: Area, k_cl: f64, k_cd: f64, k_cm: f64) -> PowerTrainResult<Self> {
        if disk_area.value <= 0.0 {
            return Err(PowerTrainError::InvalidArg {
                what: "propeller disk area must be positive",
            });
        }
        for (v, what) in [
            (k_cl, "slipstream lift factor"),
            (k_cd, "slipstream drag factor"),
            (k_cm, "slipstream moment factor"),
        ] {
            crate::common::check_finite(v, what)?;
        }
        Ok(Self {
            disk_area,
            k_cl,
            k_cd,
            k_cm,
        })
    }

    /// No interaction.
    pub fn none() -> Self {
        Self {
            disk_area: Area::new::<square_meter>(1.0),
            k_cl: 0.0,
            k_cd: 0.0,
            k_cm: 0.0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.k_cl != 0.0 || self.k_cd != 0.0 || self.k_cm != 0.0
    }

    fn loading_slope(&self, thrust_n: f64, q_pa: f64) -> f64 {
        if thrust_n > 0.0 && q_pa > 0.0 {
            1.0 / (q_pa * self.disk_area.value)
        } else {
            0.0
        }
    }

    pub fn delta(&self, thrust_n: f64, q_pa: f64) -> AeroDelta {
        let loading = thrust_n * self.loading_slope(thrust_n, q_pa);
        AeroDelta {
            cl: self.k_cl * loading,
            cd: self.k_cd * loading,
            cm: self.k_cm * loading,
        }
    }

    /// `d(delta)/d(thrust)` at fixed dynamic pressure.
    pub fn d_delta_d_thrust(&self, thrust_n: f64, q_pa: f64) -> AeroDelta {
        let slope = self.loading_slope(thrust_n, q_pa);
        AeroDelta {
            cl: self.k_cl * slope,
            cd: self.k_cd * slope,
            cm: self.k_cm * slope,
        }
    }
}

/// Inputs `[thrust, q]`, outputs `[delta_cl, delta_cd, delta_cm]`.
impl ExplicitMap for Slipstream {
    fn name(&self) -> &str {
        "slipstream"
    }

    fn n_inputs(&self) -> usize {
        2
    }

    fn n_outputs(&self) -> usize {
        3
    }

    fn compute(&self, x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        if x.len() != 2 {
            return Err(SolverError::ProblemSetup {
                what: format!("slipstream expects 2 inputs, got {}", x.len()),
            });
        }
        let d = self.delta(x[0], x[1]);
        Ok(DVector::from_vec(vec![d.cl, d.cd, d.cm]))
    }

    fn partials(&self, x: &DVector<f64>) -> SolverResult<DMatrix<f64>> {
        let (t, q) = (x[0], x[1]);
        let dt = self.d_delta_d_thrust(t, q);
        // d/dq of k T / (q A) is -delta / q
        let d = self.delta(t, q);
        let inv_q = if q > 0.0 { 1.0 / q } else { 0.0 };
        Ok(DMatrix::from_row_slice(
            3,
            2,
            &[
                dt.cl,
                -d.cl * inv_q,
                dt.cd,
                -d.cd * inv_q,
                dt.cm,
                -d.cm * inv_q,
            ],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fm_solver::{Component, check_partials};

    fn blown() -> Slipstream {
        Slipstream::new(Area::new::<square_meter>(2.5), 0.12, 0.015, -0.02).unwrap()
    }

    #[test]
    fn delta_is_linear_in_thrust() {
        let s = blown();
        let d1 = s.delta(1_000.0, 2_500.0);
        let d2 = s.delta(2_000.0, 2_500.0);
        assert!((d2.cl - 2.0 * d1.cl).abs() < 1e-12);
        assert!((d1.cl - 0.12 * 1_000.0 / (2_500.0 * 2.5)).abs() < 1e-12);
    }

    #[test]
    fn negative_thrust_is_unblown() {
        let s = blown();
        assert_eq!(s.delta(-300.0, 2_000.0), AeroDelta::default());
        assert_eq!(s.d_delta_d_thrust(-300.0, 2_000.0), AeroDelta::default());
    }

    #[test]
    fn partials_match_fd() {
        let s = blown();
        let x = DVector::from_vec(vec![1_800.0, 2_200.0]);
        let check = check_partials(&Component::Explicit(&s), &x, 1e-6).unwrap();
        assert!(check.max_rel_error < 1e-7, "{:?}", check);
    }

    #[test]
    fn rejects_bad_disk() {
        assert!(Slipstream::new(Area::new::<square_meter>(0.0), 0.1, 0.0, 0.0).is_err());
        assert!(!Slipstream::none().is_active());
    }
}
