use std::path::Path;

#[test]
fn demos_load_and_validate() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/projects");
    let demos = [
        "01_piston_trainer.yaml",
        "02_electric_trainer.yaml",
        "03_serial_hybrid.yaml",
    ];

    for name in demos {
        let path = root.join(name);
        let project = fm_project::load_yaml(&path)
            .unwrap_or_else(|e| panic!("Failed to load {}: {}", name, e));
        fm_project::validate_project(&project)
            .unwrap_or_else(|e| panic!("Failed to validate {}: {}", name, e));
    }
}

#[test]
fn demo_units_are_converted() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/projects");
    let p = fm_project::load_yaml(&root.join("01_piston_trainer.yaml")).unwrap();
    assert!((p.mission.range.meters() - 400.0 * 1_852.0).abs() < 1e-6);
    assert!((p.mission.cruise_altitude.meters() - 6_500.0 * 0.3048).abs() < 1e-9);
    assert_eq!(p.powertrain.kind(), "FuelPropeller");
    // Sections left out fall back to defaults.
    assert_eq!(p.mission.stall_margin, 1.3);
    assert!(p.solver.use_linesearch);
}
