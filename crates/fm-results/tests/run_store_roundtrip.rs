use fm_results::*;

fn manifest(run_id: &str, timestamp: &str, status: &str) -> RunManifest {
    RunManifest {
        run_id: run_id.to_string(),
        project_name: "trainer".to_string(),
        timestamp: timestamp.to_string(),
        solver_version: "0.1.0".to_string(),
        powertrain: "fuel-propeller".to_string(),
        status: status.to_string(),
        outer_iterations: 4,
        mass_residual: 2.0e-7,
        equilibrium: EquilibriumRecord {
            status: "converged".to_string(),
            iterations: 5,
            powertrain_iterations: 0,
            failed_points: Vec::new(),
            groups: vec![GroupRecord {
                name: "alpha".to_string(),
                max_abs: 1e-9,
                max_rel: 1e-12,
                converged: true,
            }],
        },
        totals: TotalsRecord {
            trip_fuel_kg: 61.0,
            block_fuel_kg: 68.0,
            fuel_loaded_kg: 80.0,
            ..TotalsRecord::default()
        },
        phases: vec![PhaseRecord {
            phase: "cruise".to_string(),
            fuel_kg: 40.0,
            energy_kwh: 0.0,
            duration_s: 5400.0,
            distance_m: 4.0e5,
        }],
        climb_speed: Some(SpeedRecord {
            eas_mps: 45.0,
            optimum_eas_mps: 38.0,
            stall_eas_mps: 45.0,
            branch: "stall-margin".to_string(),
        }),
        descent_speed: None,
        message: None,
    }
}

fn point(index: usize, phase: &str) -> MissionPointRecord {
    MissionPointRecord {
        index,
        phase: phase.to_string(),
        time_s: 60.0 * index as f64,
        dt_s: 60.0,
        altitude_m: 1000.0,
        ground_distance_m: 3000.0 * index as f64,
        mass_kg: 1100.0 - index as f64,
        x_cg_m: 2.4,
        tas_mps: 60.0,
        eas_mps: 57.0,
        mach: 0.18,
        vertical_speed_mps: 0.0,
        accel_z_mps2: 0.0,
        density_kgpm3: 1.11,
        temperature_k: 281.65,
        gamma_deg: 0.0,
        alpha_deg: 1.2,
        delta_m_deg: -1.5,
        cl_wing: 0.31,
        cl_tail: -0.01,
        cl: 0.30,
        cd_wing: 0.028,
        cd_tail: 0.001,
        cd: 0.029,
        lift_to_drag: 10.3,
        delta_cl: 0.0,
        delta_cd: 0.0,
        delta_cm: 0.0,
        thrust_n: 1200.0,
        thrust_rate: 0.6,
        engine_setting: 0.62,
        sfc_kg_per_kwh: 0.25,
        fuel_flow_kgph: 27.0,
        fuel_consumed_kg: 0.45,
        energy_consumed_kwh: 0.0,
        state_of_charge: None,
    }
}

#[test]
fn save_list_load_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let project_path = dir.path().join("trainer.yaml");
    std::fs::write(&project_path, "version: 1\n").unwrap();

    let store = RunStore::for_project(&project_path).unwrap();
    assert!(store.root_dir().ends_with(".flightmission/runs"));

    let records = vec![point(0, "climb"), point(1, "cruise")];
    store
        .save_run(&manifest("b", "2026-02-26T00:00:00Z", "converged"), &records)
        .unwrap();
    store
        .save_run(&manifest("a", "2026-02-25T00:00:00Z", "failed"), &records[..1])
        .unwrap();

    assert!(store.has_run("a"));
    let runs = store.list_runs().unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].run_id, "a");
    assert!(!runs[0].is_converged());
    assert!(runs[1].is_converged());

    let loaded = store.load_manifest("b").unwrap();
    assert_eq!(loaded, manifest("b", "2026-02-26T00:00:00Z", "converged"));
    assert_eq!(store.load_timeseries("b").unwrap(), records);
}

#[test]
fn missing_run_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = RunStore::new(dir.path().join("runs")).unwrap();
    assert!(!store.has_run("nope"));
    assert!(matches!(
        store.load_manifest("nope"),
        Err(ResultsError::RunNotFound { .. })
    ));
    assert!(store.list_runs().unwrap().is_empty());
}

#[test]
fn delete_removes_run() {
    let dir = tempfile::tempdir().unwrap();
    let store = RunStore::new(dir.path().to_path_buf()).unwrap();
    store
        .save_run(&manifest("gone", "2026-01-01T00:00:00Z", "converged"), &[])
        .unwrap();
    store.delete_run("gone").unwrap();
    assert!(!store.has_run("gone"));
    store.delete_run("gone").unwrap();
}

#[test]
fn csv_has_header_and_one_row_per_point() {
    let records = vec![point(0, "climb"), point(1, "cruise"), point(2, "descent")];
    let mut buf = Vec::new();
    write_csv(&mut buf, &records).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("index,phase,time_s,dt_s,altitude_m"));
    assert!(lines[0].ends_with("state_of_charge"));
    assert!(lines[2].starts_with("1,cruise,60"));
    // Empty cell for a power-train without a battery.
    assert!(lines[1].ends_with(','));
}

#[test]
fn csv_export_writes_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("points.csv");
    let mut electric = point(0, "climb");
    electric.state_of_charge = Some(0.9);
    export_csv(&path, &[electric]).unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let rows: Vec<MissionPointRecord> = reader.deserialize().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].state_of_charge, Some(0.9));
}
