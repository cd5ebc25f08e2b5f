//! Flight-condition initializer.
//!
//! Produces the still-air state of every mission point (altitude, speeds,
//! flight-path angle, time, position) before any force balance is solved.
//! Climb and descent fly a constant equivalent airspeed chosen from the
//! phase's initial mass; cruise flies the configured true airspeed; the
//! reserve holds the cruise equivalent airspeed at the reserve altitude for a
//! fixed duration.

use crate::aircraft::{AeroCoefficients, Aircraft};
use crate::config::MissionProfile;
use crate::error::{MissionError, MissionResult};
use crate::phase::{Phase, PointCounts};
use fm_atmosphere::Atmosphere;
use fm_core::constants::{G0_MPS2, RHO0_KGPM3};
use fm_core::{linspace, rad_to_deg};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedGoal {
    /// Best rate of climb
    Climb,
    /// Best lift-to-drag ratio
    Descent,
}

/// Which side of `max(V_opt, margin * VS1)` was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedBranch {
    AerodynamicOptimum,
    StallMargin,
}

impl SpeedBranch {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeedBranch::AerodynamicOptimum => "optimum",
            SpeedBranch::StallMargin => "stall-margin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedSelection {
    pub eas_mps: f64,
    pub optimum_eas_mps: f64,
    /// 1-g stall speed, clean
    pub stall_eas_mps: f64,
    pub branch: SpeedBranch,
}

/// Equivalent airspeed for a climb or descent flown at `mass_kg`.
///
/// ```text
/// VS1   = sqrt(2 m g / (rho0 S CL_max))
/// CL*   = sqrt(3 CD0 / k)   (climb)     sqrt(CD0 / k)   (descent)
/// V*    = sqrt(2 m g / (rho0 S CL*))
/// EAS   = max(V*, margin VS1)
/// ```
pub fn select_speed(
    aero: &AeroCoefficients,
    wing_area_m2: f64,
    mass_kg: f64,
    stall_margin: f64,
    goal: SpeedGoal,
) -> MissionResult<SpeedSelection> {
    if !(mass_kg > 0.0) {
        return Err(MissionError::NonPhysical {
            what: "mass must be positive",
        });
    }
    let weight_loading = 2.0 * mass_kg * G0_MPS2 / (RHO0_KGPM3 * wing_area_m2);
    let vs1 = (weight_loading / aero.cl_max_clean).sqrt();
    let cl_opt = match goal {
        SpeedGoal::Climb => (3.0 * aero.cd0 / aero.k_wing).sqrt(),
        SpeedGoal::Descent => (aero.cd0 / aero.k_wing).sqrt(),
    };
    let v_opt = (weight_loading / cl_opt).sqrt();
    let v_stall = stall_margin * vs1;
    let (eas_mps, branch) = if v_opt >= v_stall {
        (v_opt, SpeedBranch::AerodynamicOptimum)
    } else {
        (v_stall, SpeedBranch::StallMargin)
    };
    Ok(SpeedSelection {
        eas_mps,
        optimum_eas_mps: v_opt,
        stall_eas_mps: vs1,
        branch,
    })
}

/// Per-point flight conditions, flight points only.
#[derive(Debug, Clone, Default)]
pub struct FlightProfile {
    pub phase: Vec<Phase>,
    pub altitude_m: Vec<f64>,
    pub tas_mps: Vec<f64>,
    pub eas_mps: Vec<f64>,
    pub gamma_deg: Vec<f64>,
    pub vertical_speed_mps: Vec<f64>,
    pub time_s: Vec<f64>,
    pub position_m: Vec<f64>,
    /// Duration of the interval ending at each point; zero at the first point
    pub dt_s: Vec<f64>,
    /// Along-path acceleration dTAS/dt
    pub accel_x_mps2: Vec<f64>,
    /// Vertical acceleration dvz/dt
    pub accel_z_mps2: Vec<f64>,
    pub density_kgpm3: Vec<f64>,
    pub temperature_k: Vec<f64>,
    pub mach: Vec<f64>,
    pub q_pa: Vec<f64>,
    pub climb_speed: Option<SpeedSelection>,
    pub descent_speed: Option<SpeedSelection>,
}

impl FlightProfile {
    pub fn len(&self) -> usize {
        self.altitude_m.len()
    }

    pub fn is_empty(&self) -> bool {
        self.altitude_m.is_empty()
    }

    fn push(&mut self, phase: Phase, altitude_m: f64, tas_mps: f64, eas_mps: f64, vz_mps: f64) {
        self.phase.push(phase);
        self.altitude_m.push(altitude_m);
        self.tas_mps.push(tas_mps);
        self.eas_mps.push(eas_mps);
        self.vertical_speed_mps.push(vz_mps);
        self.gamma_deg.push(rad_to_deg((vz_mps / tas_mps).asin()));
    }

    fn advance(&mut self, dt_s: f64, dx_m: f64) {
        let (t, x) = match (self.time_s.last(), self.position_m.last()) {
            (Some(t), Some(x)) => (*t, *x),
            _ => (0.0, 0.0),
        };
        self.dt_s.push(dt_s);
        self.time_s.push(t + dt_s);
        self.position_m.push(x + dx_m);
    }
}

fn horizontal_speed(tas_mps: f64, vz_mps: f64) -> f64 {
    (tas_mps * tas_mps - vz_mps * vz_mps).max(0.0).sqrt()
}

/// Central differences inside each phase, one-sided at phase ends.
fn phase_gradient(values: &[f64], time: &[f64], counts: &PointCounts) -> Vec<f64> {
    let mut out = vec![0.0; values.len()];
    for phase in Phase::FLIGHT {
        let r = counts.range(phase);
        if r.len() < 2 {
            continue;
        }
        for i in r.clone() {
            let lo = if i == r.start { i } else { i - 1 };
            let hi = if i + 1 == r.end { i } else { i + 1 };
            let dt = time[hi] - time[lo];
            out[i] = if dt > 0.0 {
                (values[hi] - values[lo]) / dt
            } else {
                0.0
            };
        }
    }
    out
}

/// Build the flight profile for the current mass estimate.
///
/// `mass_kg` holds one entry per flight point; the climb speed uses the mass
/// at the first climb point and the descent speed the mass at the first
/// descent point.
pub fn initialize(
    aircraft: &Aircraft,
    mission: &MissionProfile,
    counts: &PointCounts,
    mass_kg: &[f64],
) -> MissionResult<FlightProfile> {
    if mass_kg.len() != counts.total() {
        return Err(MissionError::InvalidArg {
            what: "mass vector length must equal the number of mission points",
        });
    }
    if counts.climb < 2 || counts.cruise == 0 || counts.descent == 0 {
        return Err(MissionError::InvalidArg {
            what: "climb needs 2 points, cruise and descent 1 each",
        });
    }

    let atm = Atmosphere::new(mission.delta_isa_k);
    let aero = &aircraft.cruise_aero;
    let wing_area = aircraft.geometry.wing_area_m2;
    let h_cruise = mission.cruise_altitude_m;
    let mut fp = FlightProfile::default();

    // Climb
    let climb_speed = select_speed(
        aero,
        wing_area,
        mass_kg[counts.range(Phase::Climb).start],
        mission.stall_margin,
        SpeedGoal::Climb,
    )?;
    let climb_rate = |h: f64| {
        let frac = (h / h_cruise).clamp(0.0, 1.0);
        mission.climb_rate_sl_mps + (mission.climb_rate_cruise_mps - mission.climb_rate_sl_mps) * frac
    };
    let altitudes = linspace(mission.climb_start_altitude_m, h_cruise, counts.climb);
    let mut prev: Option<(f64, f64, f64)> = None;
    for h in altitudes {
        let tas = atm.at(h).tas_from_eas(climb_speed.eas_mps);
        let vz = climb_rate(h);
        if vz >= tas {
            return Err(MissionError::NonPhysical {
                what: "climb rate exceeds airspeed",
            });
        }
        let vh = horizontal_speed(tas, vz);
        fp.push(Phase::Climb, h, tas, climb_speed.eas_mps, vz);
        match prev {
            None => fp.advance(0.0, 0.0),
            Some((h0, vz0, vh0)) => {
                let dt = (h - h0) / (0.5 * (vz + vz0));
                fp.advance(dt, 0.5 * (vh + vh0) * dt);
            }
        }
        prev = Some((h, vz, vh));
    }
    let climb_end_x = *fp.position_m.last().unwrap_or(&0.0);

    // Descent geometry first: cruise takes whatever range is left.
    let descent_speed = select_speed(
        aero,
        wing_area,
        mass_kg[counts.range(Phase::Descent).start],
        mission.stall_margin,
        SpeedGoal::Descent,
    )?;
    let mut rate = mission.descent_rate_mps;
    if rate > 0.0 {
        warn!(
            descent_rate_mps = rate,
            "positive descent rate, using its absolute value"
        );
    }
    rate = rate.abs();
    let dh = (h_cruise - mission.descent_end_altitude_m) / counts.descent as f64;
    let mut descent = Vec::with_capacity(counts.descent);
    let mut vh_prev = horizontal_speed(atm.at(h_cruise).tas_from_eas(descent_speed.eas_mps), rate);
    let mut descent_distance = 0.0;
    for k in 1..=counts.descent {
        let h = h_cruise - dh * k as f64;
        let tas = atm.at(h).tas_from_eas(descent_speed.eas_mps);
        if rate >= tas {
            return Err(MissionError::NonPhysical {
                what: "descent rate exceeds airspeed",
            });
        }
        let vh = horizontal_speed(tas, rate);
        let dt = dh / rate;
        let dx = 0.5 * (vh + vh_prev) * dt;
        descent_distance += dx;
        descent.push((h, tas, dt, dx));
        vh_prev = vh;
    }

    // Cruise
    let cruise_distance = mission.range_m - climb_end_x - descent_distance;
    if cruise_distance < 0.0 {
        return Err(MissionError::Config {
            what: format!(
                "range {:.0} m is shorter than climb ({:.0} m) plus descent ({:.0} m)",
                mission.range_m, climb_end_x, descent_distance
            ),
        });
    }
    let cruise_state = atm.at(h_cruise);
    let cruise_eas = cruise_state.eas_from_tas(mission.cruise_tas_mps);
    let step = cruise_distance / counts.cruise as f64;
    for _ in 0..counts.cruise {
        fp.push(Phase::Cruise, h_cruise, mission.cruise_tas_mps, cruise_eas, 0.0);
        fp.advance(step / mission.cruise_tas_mps, step);
    }

    for (h, tas, dt, dx) in descent {
        fp.push(Phase::Descent, h, tas, descent_speed.eas_mps, -rate);
        fp.advance(dt, dx);
    }

    // Reserve
    if counts.reserve > 0 {
        let h = mission.reserve_altitude_m;
        let tas = atm.at(h).tas_from_eas(cruise_eas);
        let dt = mission.reserve_duration_s / counts.reserve as f64;
        for _ in 0..counts.reserve {
            fp.push(Phase::Reserve, h, tas, cruise_eas, 0.0);
            fp.advance(dt, dt * tas);
        }
    }

    fp.accel_x_mps2 = phase_gradient(&fp.tas_mps, &fp.time_s, counts);
    fp.accel_z_mps2 = phase_gradient(&fp.vertical_speed_mps, &fp.time_s, counts);
    for (h, tas) in fp.altitude_m.iter().zip(&fp.tas_mps) {
        let st = atm.at(*h);
        fp.density_kgpm3.push(st.density_kgpm3);
        fp.temperature_k.push(st.temperature_k);
        fp.mach.push(st.mach(*tas));
        fp.q_pa.push(st.dynamic_pressure(*tas));
    }
    fp.climb_speed = Some(climb_speed);
    fp.descent_speed = Some(descent_speed);
    Ok(fp)
}
