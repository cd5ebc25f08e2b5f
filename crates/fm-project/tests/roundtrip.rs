use fm_project::*;

fn project() -> Project {
    Project {
        version: LATEST_VERSION,
        name: "Roundtrip".to_string(),
        aircraft: AircraftDef {
            name: "trainer".to_string(),
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
            slipstream: Some(SlipstreamDef {
                disk_area_m2: 2.8,
                k_cl: 0.1,
                k_cd: 0.01,
                k_cm: -0.015,
            }),
        },
        mission: MissionDef {
            range: LengthDef::WithUnit {
                value: 400.0,
                unit: LengthUnit::Nmi,
            },
            ..MissionDef::default()
        },
        solver: SolverDef {
            trim: TrimDef::Constant { delta_m_deg: -1.0 },
            coupling: CouplingDef::Monolithic,
            ..SolverDef::default()
        },
    }
}

#[test]
fn roundtrip_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("project.yaml");
    let p = project();
    save_yaml(&path, &p).unwrap();
    assert_eq!(load_yaml(&path).unwrap(), p);
    assert_eq!(load_project(&path).unwrap(), p);
}

#[test]
fn roundtrip_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("project.json");
    let p = project();
    save_json(&path, &p).unwrap();
    assert_eq!(load_json(&path).unwrap(), p);
    assert_eq!(load_project(&path).unwrap(), p);
}

#[test]
fn invalid_project_is_not_saved() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.yaml");
    let mut p = project();
    p.aircraft.wing_area_m2 = -1.0;
    assert!(matches!(
        save_yaml(&path, &p),
        Err(ProjectError::Validation(_))
    ));
    assert!(!path.exists());
}

#[test]
fn validation_catches_bad_inputs() {
    let mut p = project();
    p.version = 7;
    assert!(matches!(
        validate_project(&p),
        Err(ValidationError::UnsupportedVersion { version: 7 })
    ));

    let mut p = project();
    p.solver.points.climb = 1;
    assert!(validate_project(&p).is_err());

    let mut p = project();
    p.mission.cruise_altitude = LengthDef::Meters(f64::NAN);
    assert!(validate_project(&p).is_err());

    let mut p = project();
    p.mission.descent_end_altitude = LengthDef::Meters(5_000.0);
    assert!(validate_project(&p).is_err());

    let mut p = project();
    p.powertrain = PowerTrainDef::BatteryElectric {
        motor_max_power_kw: 150.0,
        motor_efficiency: 1.2,
        prop_efficiency: 0.8,
        battery: BatteryDef {
            capacity_ah: 200.0,
            ocv_full_v: 420.0,
            ocv_empty_v: 330.0,
            resistance_ohm: 0.04,
            initial_soc: 1.0,
            min_soc: 0.2,
        },
        slipstream: None,
    };
    let err = validate_project(&p).unwrap_err().to_string();
    assert!(err.contains("motor_efficiency"), "{err}");

    // Positive descent rate is accepted and corrected later.
    let mut p = project();
    p.mission.descent_rate = SpeedDef::MetersPerSecond(2.5);
    validate_project(&p).unwrap();
}

#[test]
fn unknown_powertrain_type_is_rejected() {
    let yaml = r#"
version: 1
name: bad
aircraft: { name: a, wing_area_m2: 16, mac_m: 1.5, x_ac_wing_m: 2.45, x_ac_tail_m: 7.6, mtow_kg: 1150, x_cg_fixed_m: 2.35 }
powertrain: { type: Turbofan, thrust_kn: 20 }
"#;
    assert!(serde_yaml::from_str::<Project>(yaml).is_err());
}

fn electric() -> PowerTrainDef {
    PowerTrainDef::BatteryElectric {
        motor_max_power_kw: 150.0,
        motor_efficiency: 0.95,
        prop_efficiency: 0.8,
        battery: BatteryDef {
            capacity_ah: 400.0,
            ocv_full_v: 420.0,
            ocv_empty_v: 330.0,
            resistance_ohm: 0.04,
            initial_soc: 1.0,
            min_soc: 0.2,
        },
        slipstream: None,
    }
}

#[test]
fn fuel_allowances_depend_on_powertrain() {
    let p = project();
    assert_eq!(p.mission.fuel_allowances(p.powertrain.burns_fuel()), (0.6, 0.4));

    let mut p = project();
    p.powertrain = electric();
    assert!(!p.powertrain.burns_fuel());
    assert_eq!(p.mission.fuel_allowances(false), (0.0, 0.0));
    validate_project(&p).unwrap();

    p.mission.takeoff_fuel_kg = Some(0.0);
    validate_project(&p).unwrap();

    p.mission.initial_climb_fuel_kg = Some(0.4);
    let err = validate_project(&p).unwrap_err().to_string();
    assert!(err.contains("initial_climb_fuel_kg"), "{err}");
}

#[test]
fn unset_allowances_stay_unset_on_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("project.yaml");
    let mut p = project();
    p.mission.takeoff_fuel_kg = Some(1.5);
    save_yaml(&path, &p).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("takeoff_fuel_kg"));
    assert!(!text.contains("initial_climb_fuel_kg"));
    assert_eq!(load_yaml(&path).unwrap().mission.fuel_allowances(true), (1.5, 0.4));
}
