//! Project schema definitions.

use fm_core::units::{Length, Velocity, ft, ft_per_min, kt, m, mps, nmi};
use serde::{Deserialize, Serialize};
use uom::si::{length::meter, velocity::meter_per_second};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub version: u32,
    pub name: String,
    pub aircraft: AircraftDef,
    pub powertrain: PowerTrainDef,
    #[serde(default)]
    pub mission: MissionDef,
    #[serde(default)]
    pub solver: SolverDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AircraftDef {
    pub name: String,
    pub wing_area_m2: f64,
    /// Mean aerodynamic chord
    pub mac_m: f64,
    pub x_ac_wing_m: f64,
    pub x_ac_tail_m: f64,
    /// Ramp mass at engine start
    pub mtow_kg: f64,
    pub x_cg_fixed_m: f64,
    #[serde(default)]
    pub cruise_aero: AeroDef,
    /// Flaps-down set; the cruise set is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_speed_aero: Option<AeroDef>,
}

/// Aerodynamic coefficients. Lift and moment slopes are per radian.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AeroDef {
    pub cl0_wing: f64,
    pub cl_alpha_wing: f64,
    pub cm0_wing: f64,
    pub k_wing: f64,
    pub cl0_tail: f64,
    pub cl_alpha_tail: f64,
    pub cl_delta_elev: f64,
    pub k_tail: f64,
    pub cd_delta_elev: f64,
    pub cd0: f64,
    pub cm_alpha_fus: f64,
    pub cl_max_clean: f64,
    pub delta_cl_flaps: f64,
    pub delta_cd_flaps: f64,
    pub delta_cm_flaps: f64,
}

impl Default for AeroDef {
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

/// Propulsion architecture.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum PowerTrainDef {
    FuelPropeller {
        engine: EngineDef,
        prop_efficiency: f64,
        tank_x_m: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slipstream: Option<SlipstreamDef>,
    },
    BatteryElectric {
        motor_max_power_kw: f64,
        motor_efficiency: f64,
        prop_efficiency: f64,
        battery: BatteryDef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slipstream: Option<SlipstreamDef>,
    },
    SerialHybrid {
        motor_max_power_kw: f64,
        motor_efficiency: f64,
        prop_efficiency: f64,
        battery: BatteryDef,
        generator: EngineDef,
        generator_efficiency: f64,
        /// Fraction of bus power drawn from the battery
        battery_share: f64,
        tank_x_m: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slipstream: Option<SlipstreamDef>,
    },
}

impl PowerTrainDef {
    pub fn kind(&self) -> &'static str {
        match self {
            PowerTrainDef::FuelPropeller { .. } => "FuelPropeller",
            PowerTrainDef::BatteryElectric { .. } => "BatteryElectric",
            PowerTrainDef::SerialHybrid { .. } => "SerialHybrid",
        }
    }

    pub fn burns_fuel(&self) -> bool {
        !matches!(self, PowerTrainDef::BatteryElectric { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineDef {
    pub max_power_kw: f64,
    pub bsfc_g_per_kwh: f64,
    #[serde(default = "default_part_load_penalty")]
    pub part_load_penalty: f64,
    #[serde(default = "default_idle_fraction")]
    pub idle_fraction: f64,
}

fn default_part_load_penalty() -> f64 {
    0.3
}

fn default_idle_fraction() -> f64 {
    0.05
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatteryDef {
    pub capacity_ah: f64,
    pub ocv_full_v: f64,
    pub ocv_empty_v: f64,
    pub resistance_ohm: f64,
    #[serde(default = "default_initial_soc")]
    pub initial_soc: f64,
    #[serde(default = "default_min_soc")]
    pub min_soc: f64,
}

fn default_initial_soc() -> f64 {
    1.0
}

fn default_min_soc() -> f64 {
    0.2
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlipstreamDef {
    pub disk_area_m2: f64,
    pub k_cl: f64,
    pub k_cd: f64,
    pub k_cm: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LengthUnit {
    M,
    Ft,
    Nmi,
}

/// A length given in metres, or as `{ value, unit }`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum LengthDef {
    Meters(f64),
    WithUnit { value: f64, unit: LengthUnit },
}

impl LengthDef {
    pub fn to_length(&self) -> Length {
        match *self {
            LengthDef::Meters(v) => m(v),
            LengthDef::WithUnit { value, unit } => match unit {
                LengthUnit::M => m(value),
                LengthUnit::Ft => ft(value),
                LengthUnit::Nmi => nmi(value),
            },
        }
    }

    pub fn meters(&self) -> f64 {
        self.to_length().get::<meter>()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpeedUnit {
    Mps,
    Kt,
    FtPerMin,
}

/// A speed given in metres per second, or as `{ value, unit }`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SpeedDef {
    MetersPerSecond(f64),
    WithUnit { value: f64, unit: SpeedUnit },
}

impl SpeedDef {
    pub fn to_velocity(&self) -> Velocity {
        match *self {
            SpeedDef::MetersPerSecond(v) => mps(v),
            SpeedDef::WithUnit { value, unit } => match unit {
                SpeedUnit::Mps => mps(value),
                SpeedUnit::Kt => kt(value),
                SpeedUnit::FtPerMin => ft_per_min(value),
            },
        }
    }

    pub fn mps(&self) -> f64 {
        self.to_velocity().get::<meter_per_second>()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TaxiDef {
    pub out_duration_s: f64,
    pub in_duration_s: f64,
    pub speed_mps: f64,
    pub thrust_n: f64,
}

impl Default for TaxiDef {
    fn default() -> Self {
        Self {
            out_duration_s: 300.0,
            in_duration_s: 300.0,
            speed_mps: 5.0,
            thrust_n: 500.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MissionDef {
    pub range: LengthDef,
    pub cruise_altitude: LengthDef,
    /// True airspeed in cruise
    pub cruise_speed: SpeedDef,
    pub climb_rate_sl: SpeedDef,
    pub climb_rate_cruise: SpeedDef,
    /// Negative down
    pub descent_rate: SpeedDef,
    pub climb_start_altitude: LengthDef,
    pub descent_end_altitude: LengthDef,
    pub reserve_altitude: LengthDef,
    pub reserve_duration_s: f64,
    pub stall_margin: f64,
    pub taxi: TaxiDef,
    /// Unset means the default for fuel-burning power-trains, zero otherwise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub takeoff_fuel_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_climb_fuel_kg: Option<f64>,
    pub delta_isa_k: f64,
}

pub const DEFAULT_TAKEOFF_FUEL_KG: f64 = 0.6;
pub const DEFAULT_INITIAL_CLIMB_FUEL_KG: f64 = 0.4;

impl MissionDef {
    /// Take-off and initial-climb fuel, in kg.
    pub fn fuel_allowances(&self, burns_fuel: bool) -> (f64, f64) {
        if !burns_fuel {
            return (0.0, 0.0);
        }
        (
            self.takeoff_fuel_kg.unwrap_or(DEFAULT_TAKEOFF_FUEL_KG),
            self.initial_climb_fuel_kg
                .unwrap_or(DEFAULT_INITIAL_CLIMB_FUEL_KG),
        )
    }
}

impl Default for MissionDef {
    fn default() -> Self {
        Self {
            range: LengthDef::Meters(750e3),
            cruise_altitude: LengthDef::Meters(2_000.0),
            cruise_speed: SpeedDef::MetersPerSecond(67.0),
            climb_rate_sl: SpeedDef::MetersPerSecond(3.5),
            climb_rate_cruise: SpeedDef::MetersPerSecond(2.5),
            descent_rate: SpeedDef::MetersPerSecond(-2.5),
            climb_start_altitude: LengthDef::Meters(15.24),
            descent_end_altitude: LengthDef::Meters(15.24),
            reserve_altitude: LengthDef::Meters(450.0),
            reserve_duration_s: 2_700.0,
            stall_margin: 1.3,
            taxi: TaxiDef::default(),
            takeoff_fuel_kg: None,
            initial_climb_fuel_kg: None,
            delta_isa_k: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PointsDef {
    pub climb: usize,
    pub cruise: usize,
    pub descent: usize,
    pub reserve: usize,
}

impl Default for PointsDef {
    fn default() -> Self {
        Self {
            climb: 100,
            cruise: 100,
            descent: 50,
            reserve: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TrimDef {
    Solve,
    Constant { delta_m_deg: f64 },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CouplingDef {
    #[default]
    Nested,
    Monolithic,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SolverDef {
    pub points: PointsDef,
    pub use_linesearch: bool,
    pub pre_condition_pt: bool,
    pub rtol_outer: f64,
    pub rtol_inner: f64,
    pub atol: f64,
    pub stall_tol: f64,
    pub stall_limit: usize,
    pub max_iter_inner: usize,
    pub max_iter_outer: usize,
    pub trim: TrimDef,
    pub low_speed_aero: bool,
    pub coupling: CouplingDef,
}

impl Default for SolverDef {
    fn default() -> Self {
        Self {
            points: PointsDef::default(),
            use_linesearch: true,
            pre_condition_pt: false,
            rtol_outer: 1e-5,
            rtol_inner: 1e-6,
            atol: 1e-6,
            stall_tol: 1e-6,
            stall_limit: 5,
            max_iter_inner: 30,
            max_iter_outer: 100,
            trim: TrimDef::Solve,
            low_speed_aero: false,
            coupling: CouplingDef::Nested,
        }
    }
}
