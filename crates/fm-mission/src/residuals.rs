//! Force and moment balance at one mission point.
//!
//! Unknowns cross this interface in degrees (alpha, elevator) and Newtons
//! (thrust). Every trigonometric evaluation happens in radians; partials
//! taken in radians are scaled by `RAD_PER_DEG` so that the Jacobian matches
//! the degree-valued unknowns.
//!
//! With `q` the dynamic pressure and `S` the wing area:
//!
//! ```text
//! CL_w  = CL0_w + CLa_w a + dCl + dCL_flaps
//! CL_ht = CL0_ht + CLa_ht a + CLd dm
//! CD    = CD0 + k_w CL_w^2 + k_ht CL_ht^2 + CDd dm^2 + dCd + dCD_flaps
//!
//! R_alpha  = CL_w + CL_ht + T sin(a) / (qS) - m g cos(g) / (qS)
//! R_thrust = T cos(a) - qS CD - m g sin(g) - m a_x
//! R_trim   = (x_cg - x_w) CL_w + (x_cg - x_ht) CL_ht
//!            + (Cm0_w + dCm + Cma_fus a + dCm_flaps) c
//! ```

use crate::aircraft::{AeroCoefficients, AircraftGeometry};
use crate::config::TrimPolicy;
use fm_core::constants::G0_MPS2;
use fm_core::{RAD_PER_DEG, deg_to_rad};
use fm_powertrain::AeroDelta;

/// Inputs of the balance at one point that the unknowns do not change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointCondition {
    pub q_pa: f64,
    pub mass_kg: f64,
    pub gamma_deg: f64,
    pub accel_x_mps2: f64,
    pub x_cg_m: f64,
}

/// Equilibrium unknowns at one point.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EquilibriumState {
    pub alpha_deg: f64,
    pub thrust_n: f64,
    pub delta_m_deg: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AeroBreakdown {
    pub cl_wing: f64,
    pub cl_tail: f64,
    pub cl: f64,
    pub cd_wing: f64,
    pub cd_tail: f64,
    pub cd: f64,
    pub lift_to_drag: f64,
}

/// Partial derivatives of the three residuals at one point.
///
/// Rows are alpha, thrust and trim residuals. `wrt_state` columns are alpha
/// (per degree), thrust and elevator (per degree); `wrt_delta` columns are
/// the slipstream lift, drag and moment increments.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointPartials {
    pub wrt_state: [[f64; 3]; 3],
    pub wrt_delta: [[f64; 3]; 3],
}

#[derive(Debug, Clone, Copy)]
pub struct ResidualModel<'a> {
    pub aero: &'a AeroCoefficients,
    pub geometry: &'a AircraftGeometry,
    pub trim: TrimPolicy,
}

impl ResidualModel<'_> {
    fn q_s(&self, c: &PointCondition) -> f64 {
        c.q_pa * self.geometry.wing_area_m2
    }

    fn lift(&self, alpha: f64, delta_m: f64, d: &AeroDelta) -> (f64, f64) {
        let a = self.aero;
        let cl_wing = a.cl0_wing + a.cl_alpha_wing * alpha + d.cl + a.delta_cl_flaps;
        let cl_tail = a.cl0_tail + a.cl_alpha_tail * alpha + a.cl_delta_elev * delta_m;
        (cl_wing, cl_tail)
    }

    pub fn breakdown(&self, s: &EquilibriumState, d: &AeroDelta) -> AeroBreakdown {
        let a = self.aero;
        let alpha = deg_to_rad(s.alpha_deg);
        let delta_m = deg_to_rad(s.delta_m_deg);
        let (cl_wing, cl_tail) = self.lift(alpha, delta_m, d);
        let cd_wing = a.cd0 + a.k_wing * cl_wing * cl_wing + d.cd + a.delta_cd_flaps;
        let cd_tail = a.k_tail * cl_tail * cl_tail + a.cd_delta_elev * delta_m * delta_m;
        let cl = cl_wing + cl_tail;
        let cd = cd_wing + cd_tail;
        AeroBreakdown {
            cl_wing,
            cl_tail,
            cl,
            cd_wing,
            cd_tail,
            cd,
            lift_to_drag: cl / cd,
        }
    }

    pub fn alpha_residual(&self, c: &PointCondition, s: &EquilibriumState, d: &AeroDelta) -> f64 {
        let alpha = deg_to_rad(s.alpha_deg);
        let gamma = deg_to_rad(c.gamma_deg);
        let qs = self.q_s(c);
        let b = self.breakdown(s, d);
        b.cl + s.thrust_n * alpha.sin() / qs - c.mass_kg * G0_MPS2 * gamma.cos() / qs
    }

    pub fn thrust_residual(&self, c: &PointCondition, s: &EquilibriumState, d: &AeroDelta) -> f64 {
        let alpha = deg_to_rad(s.alpha_deg);
        let gamma = deg_to_rad(c.gamma_deg);
        let b = self.breakdown(s, d);
        s.thrust_n * alpha.cos()
            - self.q_s(c) * b.cd
            - c.mass_kg * G0_MPS2 * gamma.sin()
            - c.mass_kg * c.accel_x_mps2
    }

    pub fn trim_residual(&self, c: &PointCondition, s: &EquilibriumState, d: &AeroDelta) -> f64 {
        match self.trim {
            TrimPolicy::Constant { delta_m_deg } => s.delta_m_deg - delta_m_deg,
            TrimPolicy::Solve => {
                let a = self.aero;
                let g = self.geometry;
                let alpha = deg_to_rad(s.alpha_deg);
                let b = self.breakdown(s, d);
                (c.x_cg_m - g.x_ac_wing_m) * b.cl_wing
                    + (c.x_cg_m - g.x_ac_tail_m) * b.cl_tail
                    + (a.cm0_wing + d.cm + a.cm_alpha_fus * alpha + a.delta_cm_flaps) * g.mac_m
            }
        }
    }

    pub fn residuals(&self, c: &PointCondition, s: &EquilibriumState, d: &AeroDelta) -> [f64; 3] {
        [
            self.alpha_residual(c, s, d),
            self.thrust_residual(c, s, d),
            self.trim_residual(c, s, d),
        ]
    }

    /// Reference magnitudes: required lift coefficient, weight, chord.
    pub fn nominal_scales(&self, c: &PointCondition) -> [f64; 3] {
        let weight = c.mass_kg * G0_MPS2;
        let trim = match self.trim {
            TrimPolicy::Solve => self.geometry.mac_m,
            TrimPolicy::Constant { .. } => 1.0,
        };
        [weight / self.q_s(c), weight, trim]
    }

    pub fn partials(&self, c: &PointCondition, s: &EquilibriumState, d: &AeroDelta) -> PointPartials {
        let a = self.aero;
        let g = self.geometry;
        let alpha = deg_to_rad(s.alpha_deg);
        let delta_m = deg_to_rad(s.delta_m_deg);
        let qs = self.q_s(c);
        let t = s.thrust_n;
        let (cl_wing, cl_tail) = self.lift(alpha, delta_m, d);
        let (sin_a, cos_a) = alpha.sin_cos();

        let mut p = PointPartials::default();

        // alpha residual
        p.wrt_state[0] = [
            (a.cl_alpha_wing + a.cl_alpha_tail + t * cos_a / qs) * RAD_PER_DEG,
            sin_a / qs,
            a.cl_delta_elev * RAD_PER_DEG,
        ];
        p.wrt_delta[0] = [1.0, 0.0, 0.0];

        // thrust residual
        let dcd_dalpha =
            2.0 * a.k_wing * cl_wing * a.cl_alpha_wing + 2.0 * a.k_tail * cl_tail * a.cl_alpha_tail;
        let dcd_ddelta =
            2.0 * a.k_tail * cl_tail * a.cl_delta_elev + 2.0 * a.cd_delta_elev * delta_m;
        p.wrt_state[1] = [
            (-t * sin_a - qs * dcd_dalpha) * RAD_PER_DEG,
            cos_a,
            -qs * dcd_ddelta * RAD_PER_DEG,
        ];
        p.wrt_delta[1] = [-qs * 2.0 * a.k_wing * cl_wing, -qs, 0.0];

        // trim residual
        match self.trim {
            TrimPolicy::Constant { .. } => {
                p.wrt_state[2] = [0.0, 0.0, 1.0];
            }
            TrimPolicy::Solve => {
                let arm_w = c.x_cg_m - g.x_ac_wing_m;
                let arm_t = c.x_cg_m - g.x_ac_tail_m;
                p.wrt_state[2] = [
                    (arm_w * a.cl_alpha_wing + arm_t * a.cl_alpha_tail + a.cm_alpha_fus * g.mac_m)
                        * RAD_PER_DEG,
                    0.0,
                    arm_t * a.cl_delta_elev * RAD_PER_DEG,
                ];
                p.wrt_delta[2] = [arm_w, 0.0, g.mac_m];
            }
        }
        p
    }

    /// Closed-form starting point: lift balance solved linearly in alpha with
    /// the elevator at its fixed or neutral value, thrust from the drag there.
    pub fn estimate(&self, c: &PointCondition) -> EquilibriumState {
        let a = self.aero;
        let delta_m_deg = match self.trim {
            TrimPolicy::Constant { delta_m_deg } => delta_m_deg,
            TrimPolicy::Solve => 0.0,
        };
        let gamma = deg_to_rad(c.gamma_deg);
        let weight = c.mass_kg * G0_MPS2;
        let cl_req = weight * gamma.cos() / self.q_s(c);
        let alpha = (cl_req
            - a.cl0_wing
            - a.cl0_tail
            - a.delta_cl_flaps
            - a.cl_delta_elev * deg_to_rad(delta_m_deg))
            / (a.cl_alpha_wing + a.cl_alpha_tail);
        let mut s = EquilibriumState {
            alpha_deg: fm_core::rad_to_deg(alpha),
            thrust_n: 0.0,
            delta_m_deg,
        };
        let cd = self.breakdown(&s, &AeroDelta::default()).cd;
        s.thrust_n = self.q_s(c) * cd + weight * gamma.sin() + c.mass_kg * c.accel_x_mps2;
        s
    }
}
