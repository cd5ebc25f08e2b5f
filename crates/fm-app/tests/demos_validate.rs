use fm_app::{compile_project, load_project, validate_project};
use std::path::Path;

#[test]
fn every_demo_compiles() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/projects");
    let mut count = 0;
    for entry in std::fs::read_dir(&dir).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
            continue;
        }
        let project = load_project(&path).unwrap();
        validate_project(&project).unwrap();
        let runtime = compile_project(&project).unwrap();
        assert_eq!(runtime.powertrain.name(), project.powertrain.kind());
        count += 1;
    }
    assert_eq!(count, 3);
}
