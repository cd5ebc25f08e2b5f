//! Mass, centre of gravity and phase aggregates from a power-train response.

use crate::aircraft::MassProperties;
use crate::config::MissionProfile;
use crate::error::{MissionError, MissionResult};
use crate::initializer::FlightProfile;
use crate::phase::{Phase, PointCounts};
use fm_core::clip_non_negative;
use fm_powertrain::PowerTrainResponse;

/// Fixed (non-fuel) mass and its CG; the fuel moment is added per point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassBudget {
    pub fixed_mass_kg: f64,
    pub x_cg_fixed_m: f64,
}

impl MassBudget {
    /// CG with `fuel_kg` on board carrying a moment of `fuel_moment_kgm`.
    pub fn cg(&self, fuel_kg: f64, fuel_moment_kgm: f64) -> f64 {
        let fuel = clip_non_negative(fuel_kg);
        let moment = clip_non_negative(fuel_moment_kgm);
        (self.x_cg_fixed_m * self.fixed_mass_kg + moment) / (self.fixed_mass_kg + fuel)
    }
}

/// Fuel, energy, duration and distance of one phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseSummary {
    pub phase: Phase,
    pub fuel_kg: f64,
    pub energy_j: f64,
    pub duration_s: f64,
    pub distance_m: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MissionTotals {
    pub taxi_out_fuel_kg: f64,
    pub takeoff_fuel_kg: f64,
    pub initial_climb_fuel_kg: f64,
    /// Climb, cruise and descent
    pub trip_fuel_kg: f64,
    pub reserve_fuel_kg: f64,
    pub taxi_in_fuel_kg: f64,
    /// Taxi-out, take-off, initial climb, trip and taxi-in
    pub block_fuel_kg: f64,
    /// Block fuel plus reserve
    pub fuel_loaded_kg: f64,
    pub energy_j: f64,
    pub flight_time_s: f64,
    pub block_time_s: f64,
}

/// Integrated state of one outer iteration.
#[derive(Debug, Clone)]
pub struct Integration {
    pub mass_kg: Vec<f64>,
    pub x_cg_m: Vec<f64>,
    /// Fuel and energy of each flight point's interval
    pub fuel_kg: Vec<f64>,
    pub energy_j: Vec<f64>,
    pub phases: Vec<PhaseSummary>,
    pub totals: MissionTotals,
}

/// Mass at each flight point: ramp mass less everything burnt before it.
pub fn point_masses(mtow_kg: f64, before_flight_kg: f64, flight_fuel_kg: &[f64]) -> Vec<f64> {
    let mut mass = Vec::with_capacity(flight_fuel_kg.len());
    let mut m = mtow_kg - before_flight_kg;
    for f in flight_fuel_kg {
        mass.push(m);
        m -= f;
    }
    mass
}

fn phase_summary(
    phase: Phase,
    counts: &PointCounts,
    profile: &FlightProfile,
    fuel: &[f64],
    energy: &[f64],
) -> PhaseSummary {
    let range = counts.range(phase);
    // Phases end where the previous one ended; climb starts at its first point.
    let start = match range.start {
        0 => 0,
        s => s - 1,
    };
    let (duration_s, distance_m) = if range.is_empty() {
        (0.0, 0.0)
    } else {
        let end = range.end - 1;
        (
            profile.time_s[end] - profile.time_s[start],
            profile.position_m[end] - profile.position_m[start],
        )
    };
    PhaseSummary {
        phase,
        fuel_kg: fuel[range.clone()].iter().sum(),
        energy_j: energy[range].iter().sum(),
        duration_s,
        distance_m,
    }
}

/// Close the loop for one outer iteration: masses, CG, phase aggregates.
///
/// `response` covers the power-train points, taxi-out first and taxi-in
/// last; its remaining fuel and lever arms were computed with
/// `fuel_loaded_kg` in the tanks, which also fixes the non-fuel mass.
pub fn integrate(
    mass: &MassProperties,
    mission: &MissionProfile,
    fuel_loaded_kg: f64,
    counts: &PointCounts,
    profile: &FlightProfile,
    response: &PowerTrainResponse,
) -> MissionResult<Integration> {
    let n = counts.total();
    if response.points.len() != n + 2 || profile.len() != n {
        return Err(MissionError::InvalidArg {
            what: "power-train response must cover taxi-out, every flight point and taxi-in",
        });
    }
    let flight = &response.points[1..=n];
    let taxi_out = response.points[0];
    let taxi_in = response.points[n + 1];
    let fuel: Vec<f64> = flight.iter().map(|p| p.fuel_consumed_kg).collect();
    let energy: Vec<f64> = flight.iter().map(|p| p.energy_consumed_j).collect();

    let before_flight =
        taxi_out.fuel_consumed_kg + mission.takeoff_fuel_kg + mission.initial_climb_fuel_kg;
    let mass_kg = point_masses(mass.mtow_kg, before_flight, &fuel);

    let phases: Vec<PhaseSummary> = Phase::FLIGHT
        .iter()
        .map(|&ph| phase_summary(ph, counts, profile, &fuel, &energy))
        .collect();
    let phase_fuel = |ph: Phase| {
        phases
            .iter()
            .find(|s| s.phase == ph)
            .map_or(0.0, |s| s.fuel_kg)
    };
    let trip = phase_fuel(Phase::Climb) + phase_fuel(Phase::Cruise) + phase_fuel(Phase::Descent);
    let reserve = phase_fuel(Phase::Reserve);
    let block = before_flight + trip + taxi_in.fuel_consumed_kg;

    let budget = MassBudget {
        fixed_mass_kg: mass.mtow_kg - clip_non_negative(fuel_loaded_kg),
        x_cg_fixed_m: mass.x_cg_fixed_m,
    };
    let x_cg_m = flight
        .iter()
        .map(|p| budget.cg(p.fuel_remaining_kg, p.fuel_lever_arm_kgm))
        .collect();

    let flight_time = profile.time_s.last().copied().unwrap_or(0.0);
    let totals = MissionTotals {
        taxi_out_fuel_kg: taxi_out.fuel_consumed_kg,
        takeoff_fuel_kg: mission.takeoff_fuel_kg,
        initial_climb_fuel_kg: mission.initial_climb_fuel_kg,
        trip_fuel_kg: trip,
        reserve_fuel_kg: reserve,
        taxi_in_fuel_kg: taxi_in.fuel_consumed_kg,
        block_fuel_kg: block,
        fuel_loaded_kg: block + reserve,
        energy_j: response.total_energy_j(),
        flight_time_s: flight_time,
        block_time_s: flight_time + mission.taxi.out_duration_s + mission.taxi.in_duration_s,
    };

    Ok(Integration {
        mass_kg,
        x_cg_m,
        fuel_kg: fuel,
        energy_j: energy,
        phases,
        totals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aircraft::fixtures::light_aircraft;
    use crate::initializer::initialize;
    use fm_powertrain::PointResponse;

    fn counts() -> PointCounts {
        PointCounts {
            climb: 5,
            cruise: 6,
            descent: 4,
            reserve: 2,
        }
    }

    fn response(n: usize, burn: f64) -> PowerTrainResponse {
        PowerTrainResponse {
            points: (0..n + 2)
                .map(|i| PointResponse {
                    fuel_consumed_kg: burn,
                    energy_consumed_j: 1_000.0 * i as f64,
                    fuel_remaining_kg: 100.0 - burn * i as f64,
                    fuel_lever_arm_kgm: 2.5 * (100.0 - burn * i as f64),
                    ..PointResponse::default()
                })
                .collect(),
        }
    }

    #[test]
    fn masses_drop_by_previous_burn() {
        let m = point_masses(1_000.0, 5.0, &[1.0, 2.0, 0.0, 3.0]);
        assert_eq!(m, vec![995.0, 994.0, 992.0, 992.0]);
    }

    #[test]
    fn cg_without_fuel_is_fixed_cg() {
        let b = MassBudget {
            fixed_mass_kg: 900.0,
            x_cg_fixed_m: 2.3,
        };
        assert_eq!(b.cg(0.0, 0.0), 2.3);
        assert_eq!(b.cg(-4.0, -10.0), 2.3);
        // Fuel aft of the fixed CG moves it aft.
        assert!(b.cg(100.0, 250.0) > 2.3);
    }

    #[test]
    fn aggregates_close_over_the_mission() {
        let ac = light_aircraft();
        let mission = MissionProfile {
            range_m: 200e3,
            ..MissionProfile::default()
        };
        let c = counts();
        let n = c.total();
        let profile = initialize(&ac, &mission, &c, &vec![1_100.0; n]).unwrap();
        let out = integrate(&ac.mass, &mission, 0.0, &c, &profile, &response(n, 0.5)).unwrap();

        let phase_fuel: f64 = out.phases.iter().map(|p| p.fuel_kg).sum();
        assert!((phase_fuel - 0.5 * n as f64).abs() < 1e-12);
        let duration: f64 = out.phases.iter().map(|p| p.duration_s).sum();
        assert!((duration - profile.time_s[n - 1]).abs() < 1e-9);
        let distance: f64 = out.phases[..3].iter().map(|p| p.distance_m).sum();
        assert!((distance - mission.range_m).abs() < 1e-6);

        let t = out.totals;
        assert_eq!(t.reserve_fuel_kg, 1.0);
        assert!(
            (t.block_fuel_kg
                - (t.taxi_out_fuel_kg
                    + t.takeoff_fuel_kg
                    + t.initial_climb_fuel_kg
                    + t.trip_fuel_kg
                    + t.taxi_in_fuel_kg))
                .abs()
                < 1e-12
        );
        assert!((t.fuel_loaded_kg - t.block_fuel_kg - t.reserve_fuel_kg).abs() < 1e-12);
        assert_eq!(
            out.mass_kg[0],
            ac.mass.mtow_kg - 0.5 - mission.takeoff_fuel_kg - mission.initial_climb_fuel_kg
        );
        assert!(out.mass_kg.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn reserve_point_carries_its_share_of_duration() {
        let ac = light_aircraft();
        let mission = MissionProfile {
            range_m: 200e3,
            reserve_duration_s: 3_500.0,
            ..MissionProfile::default()
        };
        let c = PointCounts {
            reserve: 1,
            ..counts()
        };
        let n = c.total();
        let profile = initialize(&ac, &mission, &c, &vec![1_100.0; n]).unwrap();
        let out = integrate(&ac.mass, &mission, 50.0, &c, &profile, &response(n, 0.1)).unwrap();
        let reserve = out.phases[3];
        assert_eq!(reserve.phase, Phase::Reserve);
        assert!((reserve.duration_s - 3_500.0).abs() < 1e-9);
        assert!((reserve.distance_m - 3_500.0 * profile.tas_mps[n - 1]).abs() < 1e-6);
    }

    #[test]
    fn short_response_is_rejected() {
        let ac = light_aircraft();
        let mission = MissionProfile {
            range_m: 200e3,
            ..MissionProfile::default()
        };
        let c = counts();
        let profile = initialize(&ac, &mission, &c, &vec![1_100.0; c.total()]).unwrap();
        let err = integrate(&ac.mass, &mission, 0.0, &c, &profile, &response(c.total() - 1, 0.1));
        assert!(matches!(err, Err(MissionError::InvalidArg { .. })));
    }
}
