//! Project validation logic.

use crate::schema::{
    AeroDef, AircraftDef, BatteryDef, EngineDef, MissionDef, PowerTrainDef, Project,
    SlipstreamDef, SolverDef, TrimDef,
};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: &str, value: f64, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn finite(field: &str, v: f64) -> Result<f64, ValidationError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(invalid(field, v, "must be finite"))
    }
}

fn positive(field: &str, v: f64) -> Result<(), ValidationError> {
    if finite(field, v)? > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, v, "must be positive"))
    }
}

fn non_negative(field: &str, v: f64) -> Result<(), ValidationError> {
    if finite(field, v)? >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, v, "must be non-negative"))
    }
}

fn fraction(field: &str, v: f64) -> Result<(), ValidationError> {
    if finite(field, v)? > 0.0 && v <= 1.0 {
        Ok(())
    } else {
        Err(invalid(field, v, "must be in (0, 1]"))
    }
}

pub fn validate_project(project: &Project) -> Result<(), ValidationError> {
    if project.version != crate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: project.version,
        });
    }
    if project.name.trim().is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "name".to_string(),
            value: String::new(),
            reason: "must not be empty".to_string(),
        });
    }
    validate_aircraft(&project.aircraft)?;
    validate_powertrain(&project.powertrain)?;
    validate_mission(&project.mission, project.powertrain.burns_fuel())?;
    validate_solver(&project.solver)
}

fn validate_aircraft(a: &AircraftDef) -> Result<(), ValidationError> {
    positive("aircraft.wing_area_m2", a.wing_area_m2)?;
    positive("aircraft.mac_m", a.mac_m)?;
    positive("aircraft.mtow_kg", a.mtow_kg)?;
    finite("aircraft.x_ac_wing_m", a.x_ac_wing_m)?;
    finite("aircraft.x_ac_tail_m", a.x_ac_tail_m)?;
    finite("aircraft.x_cg_fixed_m", a.x_cg_fixed_m)?;
    if a.x_ac_tail_m <= a.x_ac_wing_m {
        return Err(invalid(
            "aircraft.x_ac_tail_m",
            a.x_ac_tail_m,
            "tail must be aft of the wing",
        ));
    }
    validate_aero("aircraft.cruise_aero", &a.cruise_aero)?;
    if let Some(low) = &a.low_speed_aero {
        validate_aero("aircraft.low_speed_aero", low)?;
    }
    Ok(())
}

fn validate_aero(context: &str, a: &AeroDef) -> Result<(), ValidationError> {
    let field = |name: &str| format!("{context}.{name}");
    for (name, v) in [
        ("cl0_wing", a.cl0_wing),
        ("cm0_wing", a.cm0_wing),
        ("cl0_tail", a.cl0_tail),
        ("cl_alpha_tail", a.cl_alpha_tail),
        ("cl_delta_elev", a.cl_delta_elev),
        ("cm_alpha_fus", a.cm_alpha_fus),
        ("delta_cl_flaps", a.delta_cl_flaps),
        ("delta_cm_flaps", a.delta_cm_flaps),
    ] {
        finite(&field(name), v)?;
    }
    positive(&field("cl_alpha_wing"), a.cl_alpha_wing)?;
    positive(&field("k_wing"), a.k_wing)?;
    positive(&field("cd0"), a.cd0)?;
    positive(&field("cl_max_clean"), a.cl_max_clean)?;
    non_negative(&field("k_tail"), a.k_tail)?;
    non_negative(&field("cd_delta_elev"), a.cd_delta_elev)?;
    non_negative(&field("delta_cd_flaps"), a.delta_cd_flaps)
}

fn validate_engine(context: &str, e: &EngineDef) -> Result<(), ValidationError> {
    positive(&format!("{context}.max_power_kw"), e.max_power_kw)?;
    positive(&format!("{context}.bsfc_g_per_kwh"), e.bsfc_g_per_kwh)?;
    non_negative(&format!("{context}.part_load_penalty"), e.part_load_penalty)?;
    let idle = e.idle_fraction;
    if !(finite(&format!("{context}.idle_fraction"), idle)? >= 0.0 && idle < 1.0) {
        return Err(invalid(
            &format!("{context}.idle_fraction"),
            idle,
            "must be in [0, 1)",
        ));
    }
    Ok(())
}

fn validate_battery(b: &BatteryDef) -> Result<(), ValidationError> {
    positive("battery.capacity_ah", b.capacity_ah)?;
    positive("battery.ocv_empty_v", b.ocv_empty_v)?;
    if !(finite("battery.ocv_full_v", b.ocv_full_v)? > b.ocv_empty_v) {
        return Err(invalid(
            "battery.ocv_full_v",
            b.ocv_full_v,
            "must exceed ocv_empty_v",
        ));
    }
    non_negative("battery.resistance_ohm", b.resistance_ohm)?;
    fraction("battery.initial_soc", b.initial_soc)?;
    non_negative("battery.min_soc", b.min_soc)?;
    if b.min_soc >= b.initial_soc {
        return Err(invalid(
            "battery.min_soc",
            b.min_soc,
            "must be below initial_soc",
        ));
    }
    Ok(())
}

fn validate_slipstream(s: &Option<SlipstreamDef>) -> Result<(), ValidationError> {
    if let Some(s) = s {
        positive("slipstream.disk_area_m2", s.disk_area_m2)?;
        finite("slipstream.k_cl", s.k_cl)?;
        finite("slipstream.k_cd", s.k_cd)?;
        finite("slipstream.k_cm", s.k_cm)?;
    }
    Ok(())
}

fn validate_powertrain(pt: &PowerTrainDef) -> Result<(), ValidationError> {
    match pt {
        PowerTrainDef::FuelPropeller {
            engine,
            prop_efficiency,
            tank_x_m,
            slipstream,
        } => {
            validate_engine("powertrain.engine", engine)?;
            fraction("powertrain.prop_efficiency", *prop_efficiency)?;
            finite("powertrain.tank_x_m", *tank_x_m)?;
            validate_slipstream(slipstream)
        }
        PowerTrainDef::BatteryElectric {
            motor_max_power_kw,
            motor_efficiency,
            prop_efficiency,
            battery,
            slipstream,
        } => {
            positive("powertrain.motor_max_power_kw", *motor_max_power_kw)?;
            fraction("powertrain.motor_efficiency", *motor_efficiency)?;
            fraction("powertrain.prop_efficiency", *prop_efficiency)?;
            validate_battery(battery)?;
            validate_slipstream(slipstream)
        }
        PowerTrainDef::SerialHybrid {
            motor_max_power_kw,
            motor_efficiency,
            prop_efficiency,
            battery,
            generator,
            generator_efficiency,
            battery_share,
            tank_x_m,
            slipstream,
        } => {
            positive("powertrain.motor_max_power_kw", *motor_max_power_kw)?;
            fraction("powertrain.motor_efficiency", *motor_efficiency)?;
            fraction("powertrain.prop_efficiency", *prop_efficiency)?;
            validate_battery(battery)?;
            validate_engine("powertrain.generator", generator)?;
            fraction("powertrain.generator_efficiency", *generator_efficiency)?;
            let share = *battery_share;
            if !(finite("powertrain.battery_share", share)? >= 0.0 && share <= 1.0) {
                return Err(invalid(
                    "powertrain.battery_share",
                    share,
                    "must be in [0, 1]",
                ));
            }
            finite("powertrain.tank_x_m", *tank_x_m)?;
            validate_slipstream(slipstream)
        }
    }
}

fn validate_mission(m: &MissionDef, burns_fuel: bool) -> Result<(), ValidationError> {
    positive("mission.range", m.range.meters())?;
    positive("mission.cruise_speed", m.cruise_speed.mps())?;
    positive("mission.climb_rate_sl", m.climb_rate_sl.mps())?;
    positive("mission.climb_rate_cruise", m.climb_rate_cruise.mps())?;
    // A positive descent rate is corrected at solve time, zero is not.
    if finite("mission.descent_rate", m.descent_rate.mps())? == 0.0 {
        return Err(invalid("mission.descent_rate", 0.0, "must be non-zero"));
    }
    let cruise = finite("mission.cruise_altitude", m.cruise_altitude.meters())?;
    for (field, h) in [
        ("mission.climb_start_altitude", m.climb_start_altitude.meters()),
        ("mission.descent_end_altitude", m.descent_end_altitude.meters()),
    ] {
        if !(finite(field, h)? < cruise) {
            return Err(invalid(field, h, "must be below the cruise altitude"));
        }
    }
    finite("mission.reserve_altitude", m.reserve_altitude.meters())?;
    non_negative("mission.reserve_duration_s", m.reserve_duration_s)?;
    if !(finite("mission.stall_margin", m.stall_margin)? >= 1.0) {
        return Err(invalid(
            "mission.stall_margin",
            m.stall_margin,
            "must be at least 1",
        ));
    }
    non_negative("mission.taxi.out_duration_s", m.taxi.out_duration_s)?;
    non_negative("mission.taxi.in_duration_s", m.taxi.in_duration_s)?;
    non_negative("mission.taxi.speed_mps", m.taxi.speed_mps)?;
    non_negative("mission.taxi.thrust_n", m.taxi.thrust_n)?;
    for (field, allowance) in [
        ("mission.takeoff_fuel_kg", m.takeoff_fuel_kg),
        ("mission.initial_climb_fuel_kg", m.initial_climb_fuel_kg),
    ] {
        let Some(kg) = allowance else { continue };
        non_negative(field, kg)?;
        if !burns_fuel && kg != 0.0 {
            return Err(invalid(field, kg, "must be zero for a power-train without fuel"));
        }
    }
    finite("mission.delta_isa_k", m.delta_isa_k)?;
    Ok(())
}

fn validate_solver(s: &SolverDef) -> Result<(), ValidationError> {
    if s.points.climb < 2 {
        return Err(invalid(
            "solver.points.climb",
            s.points.climb as f64,
            "needs at least 2 points",
        ));
    }
    for (field, n) in [
        ("solver.points.cruise", s.points.cruise),
        ("solver.points.descent", s.points.descent),
        ("solver.stall_limit", s.stall_limit),
        ("solver.max_iter_inner", s.max_iter_inner),
        ("solver.max_iter_outer", s.max_iter_outer),
    ] {
        if n == 0 {
            return Err(invalid(field, 0.0, "must be at least 1"));
        }
    }
    positive("solver.rtol_outer", s.rtol_outer)?;
    positive("solver.rtol_inner", s.rtol_inner)?;
    positive("solver.atol", s.atol)?;
    non_negative("solver.stall_tol", s.stall_tol)?;
    if let TrimDef::Constant { delta_m_deg } = s.trim {
        finite("solver.trim.delta_m_deg", delta_m_deg)?;
    }
    Ok(())
}
