//! Content-based hashing for run IDs.

use fm_project::Project;
use sha2::{Digest, Sha256};

/// SHA-256 of the serialized project and the solver version.
pub fn compute_run_id(project: &Project, solver_version: &str) -> String {
    let mut hasher = Sha256::new();

    let project_json = serde_json::to_string(project).unwrap_or_default();
    hasher.update(project_json.as_bytes());
    hasher.update(solver_version.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fm_project::*;

    fn project(range_m: f64) -> Project {
        Project {
            version: LATEST_VERSION,
            name: "hash".to_string(),
            aircraft: AircraftDef {
                name: "a".to_string(),
                wing_area_m2: 16.0,
                mac_m: 1.5,
                x_ac_wing_m: 2.45,
                x_ac_tail_m: 7.6,
                mtow_kg: 1_150.0,
                x_cg_fixed_m: 2.35,
                cruise_aero: AeroDef::default(),
                low_speed_aero: None,
            },
            powertrain: PowerTrainDef::FuelPropeller {
                engine: EngineDef {
                    max_power_kw: 134.0,
                    bsfc_g_per_kwh: 260.0,
                    part_load_penalty: 0.3,
                    idle_fraction: 0.05,
                },
                prop_efficiency: 0.8,
                tank_x_m: 2.4,
                slipstream: None,
            },
            mission: MissionDef {
                range: LengthDef::Meters(range_m),
                ..MissionDef::default()
            },
            solver: SolverDef::default(),
        }
    }

    #[test]
    fn hash_stability() {
        let p = project(500e3);
        assert_eq!(compute_run_id(&p, "v1"), compute_run_id(&p, "v1"));
        assert_eq!(compute_run_id(&p, "v1").len(), 64);
    }

    #[test]
    fn hash_differs_for_different_inputs() {
        assert_ne!(
            compute_run_id(&project(500e3), "v1"),
            compute_run_id(&project(600e3), "v1")
        );
        assert_ne!(
            compute_run_id(&project(500e3), "v1"),
            compute_run_id(&project(500e3), "v2")
        );
    }
}
