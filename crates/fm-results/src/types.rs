//! Result data types.

use serde::{Deserialize, Serialize};

pub type RunId = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    pub run_id: RunId,
    pub project_name: String,
    pub timestamp: String,
    pub solver_version: String,
    pub powertrain: String,
    /// converged, degraded or failed
    pub status: String,
    pub outer_iterations: usize,
    pub mass_residual: f64,
    pub equilibrium: EquilibriumRecord,
    pub totals: TotalsRecord,
    pub phases: Vec<PhaseRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub climb_speed: Option<SpeedRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descent_speed: Option<SpeedRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RunManifest {
    pub fn is_converged(&self) -> bool {
        self.status == "converged"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EquilibriumRecord {
    pub status: String,
    pub iterations: usize,
    pub powertrain_iterations: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_points: Vec<usize>,
    #[serde(default)]
    pub groups: Vec<GroupRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupRecord {
    pub name: String,
    pub max_abs: f64,
    pub max_rel: f64,
    pub converged: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TotalsRecord {
    pub taxi_out_fuel_kg: f64,
    pub takeoff_fuel_kg: f64,
    pub initial_climb_fuel_kg: f64,
    pub trip_fuel_kg: f64,
    pub reserve_fuel_kg: f64,
    pub taxi_in_fuel_kg: f64,
    pub block_fuel_kg: f64,
    pub fuel_loaded_kg: f64,
    pub energy_kwh: f64,
    pub flight_time_s: f64,
    pub block_time_s: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseRecord {
    pub phase: String,
    pub fuel_kg: f64,
    pub energy_kwh: f64,
    pub duration_s: f64,
    pub distance_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeedRecord {
    pub eas_mps: f64,
    pub optimum_eas_mps: f64,
    pub stall_eas_mps: f64,
    pub branch: String,
}

/// One mission point; field order is the CSV column order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MissionPointRecord {
    pub index: usize,
    pub phase: String,
    pub time_s: f64,
    pub dt_s: f64,
    pub altitude_m: f64,
    pub ground_distance_m: f64,
    pub mass_kg: f64,
    pub x_cg_m: f64,
    pub tas_mps: f64,
    pub eas_mps: f64,
    pub mach: f64,
    pub vertical_speed_mps: f64,
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
    pub sfc_kg_per_kwh: f64,
    pub fuel_flow_kgph: f64,
    pub fuel_consumed_kg: f64,
    pub energy_consumed_kwh: f64,
    pub state_of_charge: Option<f64>,
}
