//! Per-point output rows.

use crate::initializer::FlightProfile;
use crate::integrator::Integration;
use crate::phase::Phase;
use crate::residuals::{EquilibriumState, ResidualModel};
use fm_powertrain::{PowerTrain, PowerTrainResponse};

/// Everything reported for one mission point.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionPoint {
    pub index: usize,
    pub phase: Phase,
    pub time_s: f64,
    pub dt_s: f64,
    pub altitude_m: f64,
    pub position_m: f64,
    pub mass_kg: f64,
    pub x_cg_m: f64,
    pub tas_mps: f64,
    pub eas_mps: f64,
    pub mach: f64,
    pub vertical_speed_mps: f64,
    pub accel_x_mps2: f64,
    pub accel_z_mps2: f64,
    pub density_kgpm3: f64,
    pub temperature_k: f64,
    pub gamma_deg: f64,
    pub alpha_deg: f64,
    pub delta_m_deg: f64,
    pub cl_wing: f64,
    pub cl_tail: f64,
    pub cl: f64,
    pub cd_wing: f64,
    pub cd_tail: f64,
    pub cd: f64,
    pub lift_to_drag: f64,
    pub delta_cl: f64,
    pub delta_cd: f64,
    pub delta_cm: f64,
    pub thrust_n: f64,
    pub thrust_rate: f64,
    pub engine_setting: f64,
    pub sfc_kg_per_j: f64,
    pub fuel_flow_kgps: f64,
    pub fuel_consumed_kg: f64,
    pub energy_consumed_j: f64,
    pub state_of_charge: Option<f64>,
}

/// Assemble one row per flight point from the final iterate.
pub fn mission_points(
    model: &ResidualModel<'_>,
    powertrain: &dyn PowerTrain,
    profile: &FlightProfile,
    states: &[EquilibriumState],
    response: &PowerTrainResponse,
    integration: &Integration,
) -> Vec<MissionPoint> {
    let slip = powertrain.slipstream();
    states
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let delta = slip.delta(s.thrust_n, profile.q_pa[i]);
            let aero = model.breakdown(s, &delta);
            let pt = &response.points[i + 1];
            MissionPoint {
                index: i,
                phase: profile.phase[i],
                time_s: profile.time_s[i],
                dt_s: profile.dt_s[i],
                altitude_m: profile.altitude_m[i],
                position_m: profile.position_m[i],
                mass_kg: integration.mass_kg[i],
                x_cg_m: integration.x_cg_m[i],
                tas_mps: profile.tas_mps[i],
                eas_mps: profile.eas_mps[i],
                mach: profile.mach[i],
                vertical_speed_mps: profile.vertical_speed_mps[i],
                accel_x_mps2: profile.accel_x_mps2[i],
                accel_z_mps2: profile.accel_z_mps2[i],
                density_kgpm3: profile.density_kgpm3[i],
                temperature_k: profile.temperature_k[i],
                gamma_deg: profile.gamma_deg[i],
                alpha_deg: s.alpha_deg,
                delta_m_deg: s.delta_m_deg,
                cl_wing: aero.cl_wing,
                cl_tail: aero.cl_tail,
                cl: aero.cl,
                cd_wing: aero.cd_wing,
                cd_tail: aero.cd_tail,
                cd: aero.cd,
                lift_to_drag: aero.lift_to_drag,
                delta_cl: delta.cl,
                delta_cd: delta.cd,
                delta_cm: delta.cm,
                thrust_n: s.thrust_n,
                thrust_rate: pt.thrust_rate,
                engine_setting: pt.engine_setting,
                sfc_kg_per_j: pt.sfc_kg_per_j,
                fuel_flow_kgps: pt.fuel_flow_kgps,
                fuel_consumed_kg: pt.fuel_consumed_kg,
                energy_consumed_j: pt.energy_consumed_j,
                state_of_charge: pt.state_of_charge,
            }
        })
        .collect()
}
