//! Mission profile and solver options.

use crate::error::{MissionError, MissionResult};
use crate::phase::PointCounts;
use fm_solver::{ArmijoGoldstein, NewtonConfig};

/// How the pitch-trim unknown is determined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrimPolicy {
    /// Solve the pitching-moment balance for the elevator deflection.
    Solve,
    /// Hold the elevator at a fixed deflection (degrees).
    Constant { delta_m_deg: f64 },
}

/// How power-train internal states join the equilibrium solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CouplingMode {
    /// Flight equilibrium first, then the power-train's own Newton solve.
    #[default]
    Nested,
    /// One Newton system over flight unknowns and power-train states.
    Monolithic,
}

impl CouplingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouplingMode::Nested => "nested",
            CouplingMode::Monolithic => "monolithic",
        }
    }
}

/// Ground operations before and after the flight.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxiAllowance {
    pub out_duration_s: f64,
    pub in_duration_s: f64,
    pub speed_mps: f64,
    pub thrust_n: f64,
}

impl Default for TaxiAllowance {
    fn default() -> Self {
        Self {
            out_duration_s: 300.0,
            in_duration_s: 300.0,
            speed_mps: 5.0,
            thrust_n: 500.0,
        }
    }
}

/// Mission definition. Altitudes are geometric, speeds true unless noted.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionProfile {
    pub range_m: f64,
    pub cruise_altitude_m: f64,
    pub cruise_tas_mps: f64,
    pub climb_rate_sl_mps: f64,
    pub climb_rate_cruise_mps: f64,
    /// Expected negative; a positive value is corrected with a warning.
    pub descent_rate_mps: f64,
    pub climb_start_altitude_m: f64,
    pub descent_end_altitude_m: f64,
    pub reserve_altitude_m: f64,
    pub reserve_duration_s: f64,
    /// Multiple of VS1 enforced on climb and descent speeds
    pub stall_margin: f64,
    pub taxi: TaxiAllowance,
    pub takeoff_fuel_kg: f64,
    pub initial_climb_fuel_kg: f64,
    pub delta_isa_k: f64,
}

impl Default for MissionProfile {
    fn default() -> Self {
        Self {
            range_m: 750_000.0,
            cruise_altitude_m: 2_000.0,
            cruise_tas_mps: 67.0,
            climb_rate_sl_mps: 3.5,
            climb_rate_cruise_mps: 2.5,
            descent_rate_mps: -2.5,
            climb_start_altitude_m: 15.24,
            descent_end_altitude_m: 15.24,
            reserve_altitude_m: 450.0,
            reserve_duration_s: 2_700.0,
            stall_margin: 1.3,
            taxi: TaxiAllowance::default(),
            takeoff_fuel_kg: 0.6,
            initial_climb_fuel_kg: 0.4,
            delta_isa_k: 0.0,
        }
    }
}

fn finite(v: f64, what: &str) -> MissionResult<f64> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(MissionError::Config {
            what: format!("{what} must be finite"),
        })
    }
}

impl MissionProfile {
    pub fn validate(&self) -> MissionResult<()> {
        for (v, what) in [
            (self.range_m, "range"),
            (self.cruise_tas_mps, "cruise speed"),
            (self.climb_rate_sl_mps, "sea-level climb rate"),
            (self.climb_rate_cruise_mps, "cruise-level climb rate"),
            (self.stall_margin, "stall margin"),
        ] {
            if finite(v, what)? <= 0.0 {
                return Err(MissionError::Config {
                    what: format!("{what} must be positive"),
                });
            }
        }
        if finite(self.descent_rate_mps, "descent rate")? == 0.0 {
            return Err(MissionError::Config {
                what: "descent rate must be non-zero".into(),
            });
        }
        for (v, what) in [
            (self.climb_start_altitude_m, "climb start altitude"),
            (self.descent_end_altitude_m, "descent end altitude"),
            (self.reserve_altitude_m, "reserve altitude"),
            (self.reserve_duration_s, "reserve duration"),
            (self.takeoff_fuel_kg, "take-off fuel"),
            (self.initial_climb_fuel_kg, "initial climb fuel"),
            (self.taxi.out_duration_s, "taxi-out duration"),
            (self.taxi.in_duration_s, "taxi-in duration"),
            (self.taxi.speed_mps, "taxi speed"),
            (self.taxi.thrust_n, "taxi thrust"),
        ] {
            if finite(v, what)? < 0.0 {
                return Err(MissionError::Config {
                    what: format!("{what} cannot be negative"),
                });
            }
        }
        finite(self.delta_isa_k, "ISA deviation")?;
        if finite(self.cruise_altitude_m, "cruise altitude")? <= self.climb_start_altitude_m {
            return Err(MissionError::Config {
                what: "cruise altitude must be above climb start altitude".into(),
            });
        }
        if self.cruise_altitude_m <= self.descent_end_altitude_m {
            return Err(MissionError::Config {
                what: "cruise altitude must be above descent end altitude".into(),
            });
        }
        Ok(())
    }

    /// The same mission with take-off and initial-climb fuel removed.
    pub fn without_fuel_allowances(&self) -> Self {
        Self {
            takeoff_fuel_kg: 0.0,
            initial_climb_fuel_kg: 0.0,
            ..self.clone()
        }
    }
}

/// Mission solver options.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOptions {
    pub points: PointCounts,
    pub use_linesearch: bool,
    pub pre_condition_pt: bool,
    /// Outer mass fixed-point relative tolerance
    pub rtol_outer: f64,
    pub rtol_inner: f64,
    pub atol: f64,
    pub stall_tol: f64,
    pub stall_limit: usize,
    pub max_iter_inner: usize,
    pub max_iter_outer: usize,
    pub trim: TrimPolicy,
    pub low_speed_aero: bool,
    pub coupling: CouplingMode,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            points: PointCounts::default(),
            use_linesearch: true,
            pre_condition_pt: false,
            rtol_outer: 1e-5,
            rtol_inner: 1e-6,
            atol: 1e-6,
            stall_tol: 1e-6,
            stall_limit: 5,
            max_iter_inner: 30,
            max_iter_outer: 100,
            trim: TrimPolicy::Solve,
            low_speed_aero: false,
            coupling: CouplingMode::Nested,
        }
    }
}

impl SolverOptions {
    pub fn validate(&self) -> MissionResult<()> {
        let p = &self.points;
        if p.climb < 2 {
            return Err(MissionError::Config {
                what: format!("climb needs at least 2 points, got {}", p.climb),
            });
        }
        if p.cruise == 0 || p.descent == 0 {
            return Err(MissionError::Config {
                what: "cruise and descent need at least one point each".into(),
            });
        }
        for (v, what) in [
            (self.rtol_outer, "outer tolerance"),
            (self.rtol_inner, "inner tolerance"),
            (self.atol, "absolute tolerance"),
        ] {
            if !(v > 0.0 && v.is_finite()) {
                return Err(MissionError::Config {
                    what: format!("{what} must be positive"),
                });
            }
        }
        if !(self.stall_tol >= 0.0) || self.stall_limit == 0 {
            return Err(MissionError::Config {
                what: "stall tolerance must be non-negative and stall limit positive".into(),
            });
        }
        if self.max_iter_inner == 0 || self.max_iter_outer == 0 {
            return Err(MissionError::Config {
                what: "iteration caps must be positive".into(),
            });
        }
        if let TrimPolicy::Constant { delta_m_deg } = self.trim {
            finite(delta_m_deg, "constant elevator deflection")?;
        }
        Ok(())
    }

    pub fn newton_config(&self) -> NewtonConfig {
        NewtonConfig {
            max_iterations: self.max_iter_inner,
            abs_tol: self.atol,
            rel_tol: self.rtol_inner,
            stall_tol: self.stall_tol,
            stall_limit: self.stall_limit,
            line_search: self.use_linesearch.then(ArmijoGoldstein::default),
        }
    }
}
