//! Runtime compilation of a Project into solver inputs.

use fm_core::units::{Area, Power, m};
use fm_mission::{
    AeroCoefficients, Aircraft, AircraftGeometry, CouplingMode, MassProperties, Mission,
    MissionProfile, PointCounts, SolverOptions, TaxiAllowance, TrimPolicy,
};
use fm_powertrain::{
    BatteryElectric, BatteryPack, FuelPropeller, PistonEngine, PowerTrain, SerialHybrid,
    Slipstream,
};
use fm_project::{
    AeroDef, AircraftDef, BatteryDef, CouplingDef, EngineDef, MissionDef, PowerTrainDef, Project,
    SlipstreamDef, SolverDef, TrimDef,
};
use uom::si::area::square_meter;
use uom::si::power::kilowatt;

use crate::error::AppResult;

/// Everything one mission solve needs, owned.
pub struct MissionRuntime {
    pub aircraft: Aircraft,
    pub profile: MissionProfile,
    pub options: SolverOptions,
    pub powertrain: Box<dyn PowerTrain>,
}

impl MissionRuntime {
    pub fn mission(&self) -> Mission<'_> {
        Mission {
            aircraft: &self.aircraft,
            profile: &self.profile,
            options: &self.options,
            powertrain: self.powertrain.as_ref(),
        }
    }
}

pub fn compile_project(project: &Project) -> AppResult<MissionRuntime> {
    Ok(MissionRuntime {
        aircraft: compile_aircraft(&project.aircraft),
        profile: compile_profile(&project.mission, project.powertrain.burns_fuel()),
        options: compile_options(&project.solver),
        powertrain: build_powertrain(&project.powertrain)?,
    })
}

fn compile_aero(def: &AeroDef) -> AeroCoefficients {
    AeroCoefficients {
        cl0_wing: def.cl0_wing,
        cl_alpha_wing: def.cl_alpha_wing,
        cm0_wing: def.cm0_wing,
        k_wing: def.k_wing,
        cl0_tail: def.cl0_tail,
        cl_alpha_tail: def.cl_alpha_tail,
        cl_delta_elev: def.cl_delta_elev,
        k_tail: def.k_tail,
        cd_delta_elev: def.cd_delta_elev,
        cd0: def.cd0,
        cm_alpha_fus: def.cm_alpha_fus,
        cl_max_clean: def.cl_max_clean,
        delta_cl_flaps: def.delta_cl_flaps,
        delta_cd_flaps: def.delta_cd_flaps,
        delta_cm_flaps: def.delta_cm_flaps,
    }
}

fn compile_aircraft(def: &AircraftDef) -> Aircraft {
    let cruise_aero = compile_aero(&def.cruise_aero);
    // Without a low-speed set the clean coefficients are reused.
    let low_speed_aero = def
        .low_speed_aero
        .as_ref()
        .map(compile_aero)
        .unwrap_or_else(|| cruise_aero.clone());
    Aircraft {
        name: def.name.clone(),
        geometry: AircraftGeometry {
            wing_area_m2: def.wing_area_m2,
            mac_m: def.mac_m,
            x_ac_wing_m: def.x_ac_wing_m,
            x_ac_tail_m: def.x_ac_tail_m,
        },
        mass: MassProperties {
            mtow_kg: def.mtow_kg,
            x_cg_fixed_m: def.x_cg_fixed_m,
        },
        cruise_aero,
        low_speed_aero,
    }
}

fn compile_profile(def: &MissionDef, burns_fuel: bool) -> MissionProfile {
    let (takeoff_fuel_kg, initial_climb_fuel_kg) = def.fuel_allowances(burns_fuel);
    MissionProfile {
        range_m: def.range.meters(),
        cruise_altitude_m: def.cruise_altitude.meters(),
        cruise_tas_mps: def.cruise_speed.mps(),
        climb_rate_sl_mps: def.climb_rate_sl.mps(),
        climb_rate_cruise_mps: def.climb_rate_cruise.mps(),
        descent_rate_mps: def.descent_rate.mps(),
        climb_start_altitude_m: def.climb_start_altitude.meters(),
        descent_end_altitude_m: def.descent_end_altitude.meters(),
        reserve_altitude_m: def.reserve_altitude.meters(),
        reserve_duration_s: def.reserve_duration_s,
        stall_margin: def.stall_margin,
        taxi: TaxiAllowance {
            out_duration_s: def.taxi.out_duration_s,
            in_duration_s: def.taxi.in_duration_s,
            speed_mps: def.taxi.speed_mps,
            thrust_n: def.taxi.thrust_n,
        },
        takeoff_fuel_kg,
        initial_climb_fuel_kg,
        delta_isa_k: def.delta_isa_k,
    }
}

fn compile_options(def: &SolverDef) -> SolverOptions {
    SolverOptions {
        points: PointCounts {
            climb: def.points.climb,
            cruise: def.points.cruise,
            descent: def.points.descent,
            reserve: def.points.reserve,
        },
        use_linesearch: def.use_linesearch,
        pre_condition_pt: def.pre_condition_pt,
        rtol_outer: def.rtol_outer,
        rtol_inner: def.rtol_inner,
        atol: def.atol,
        stall_tol: def.stall_tol,
        stall_limit: def.stall_limit,
        max_iter_inner: def.max_iter_inner,
        max_iter_outer: def.max_iter_outer,
        trim: match def.trim {
            TrimDef::Solve => TrimPolicy::Solve,
            TrimDef::Constant { delta_m_deg } => TrimPolicy::Constant { delta_m_deg },
        },
        low_speed_aero: def.low_speed_aero,
        coupling: match def.coupling {
            CouplingDef::Nested => CouplingMode::Nested,
            CouplingDef::Monolithic => CouplingMode::Monolithic,
        },
    }
}

fn build_engine(def: &EngineDef) -> AppResult<PistonEngine> {
    Ok(
        PistonEngine::new(Power::new::<kilowatt>(def.max_power_kw), def.bsfc_g_per_kwh)?
            .with_part_load(def.part_load_penalty, def.idle_fraction)?,
    )
}

fn build_pack(def: &BatteryDef) -> AppResult<BatteryPack> {
    Ok(
        BatteryPack::new(
            def.capacity_ah,
            def.ocv_full_v,
            def.ocv_empty_v,
            def.resistance_ohm,
        )?
        .with_soc_limits(def.initial_soc, def.min_soc)?,
    )
}

fn build_slipstream(def: Option<&SlipstreamDef>) -> AppResult<Slipstream> {
    match def {
        Some(s) => Ok(Slipstream::new(
            Area::new::<square_meter>(s.disk_area_m2),
            s.k_cl,
            s.k_cd,
            s.k_cm,
        )?),
        None => Ok(Slipstream::none()),
    }
}

/// Instantiate the power-train named by the project's tagged definition.
pub fn build_powertrain(def: &PowerTrainDef) -> AppResult<Box<dyn PowerTrain>> {
    let name = def.kind().to_string();
    let powertrain: Box<dyn PowerTrain> = match def {
        PowerTrainDef::FuelPropeller {
            engine,
            prop_efficiency,
            tank_x_m,
            slipstream,
        } => Box::new(FuelPropeller::new(
            name,
            build_engine(engine)?,
            *prop_efficiency,
            m(*tank_x_m),
            build_slipstream(slipstream.as_ref())?,
        )?),
        PowerTrainDef::BatteryElectric {
            motor_max_power_kw,
            motor_efficiency,
            prop_efficiency,
            battery,
            slipstream,
        } => Box::new(BatteryElectric::new(
            name,
            Power::new::<kilowatt>(*motor_max_power_kw),
            *motor_efficiency,
            *prop_efficiency,
            build_pack(battery)?,
            build_slipstream(slipstream.as_ref())?,
        )?),
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
        } => Box::new(SerialHybrid::new(
            name,
            Power::new::<kilowatt>(*motor_max_power_kw),
            *motor_efficiency,
            *prop_efficiency,
            build_pack(battery)?,
            build_engine(generator)?,
            *generator_efficiency,
            *battery_share,
            m(*tank_x_m),
            build_slipstream(slipstream.as_ref())?,
        )?),
    };
    Ok(powertrain)
}
