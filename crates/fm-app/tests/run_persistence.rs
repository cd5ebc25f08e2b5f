use fm_app::{
    RunOptions, RunRequest, RunStage, SweepParam, ensure_run, ensure_run_with_progress,
    list_runs, load_project, load_run, run_sweep, save_project,
};
use fm_project::{PointsDef, Project};
use std::path::{Path, PathBuf};

fn demo(name: &str) -> Project {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos/projects")
        .join(name);
    load_project(&path).expect("demo project should load")
}

/// Piston trainer over a short leg with few points, saved into `dir`.
fn small_project(dir: &Path) -> PathBuf {
    let mut project = demo("01_piston_trainer.yaml");
    project.mission.range = fm_project::LengthDef::Meters(300e3);
    project.solver.points = PointsDef {
        climb: 8,
        cruise: 8,
        descent: 5,
        reserve: 1,
    };
    let path = dir.join("trainer.yaml");
    save_project(&path, &project).unwrap();
    path
}

#[test]
fn converged_run_is_persisted_and_reused() {
    let dir = tempfile::tempdir().unwrap();
    let path = small_project(dir.path());

    let mut stages = Vec::new();
    let mut outer_events = 0;
    let mut cb = |e: fm_app::RunProgressEvent| {
        if e.outer.is_some() {
            outer_events += 1;
        }
        stages.push(e.stage);
    };
    let first = ensure_run_with_progress(
        &RunRequest {
            project_path: &path,
            options: RunOptions::default(),
        },
        Some(&mut cb),
    )
    .unwrap();

    assert!(!first.loaded_from_cache);
    assert_eq!(first.manifest.status, "converged");
    assert!(first.manifest.totals.block_fuel_kg > 0.0);
    assert_eq!(first.manifest.phases.len(), 4);
    assert!(outer_events >= 2);
    assert_eq!(stages.first(), Some(&RunStage::LoadingProject));
    assert_eq!(stages.last(), Some(&RunStage::Completed));
    assert!(stages.contains(&RunStage::SavingResults));

    let second = ensure_run(&RunRequest {
        project_path: &path,
        options: RunOptions::default(),
    })
    .unwrap();
    assert!(second.loaded_from_cache);
    assert_eq!(second.run_id, first.run_id);
    assert_eq!(second.manifest, first.manifest);

    let runs = list_runs(&path).unwrap();
    assert_eq!(runs.len(), 1);

    let (manifest, records) = load_run(&path, &first.run_id).unwrap();
    assert_eq!(manifest.run_id, first.run_id);
    assert_eq!(records.len(), 8 + 8 + 5 + 1);
    assert_eq!(records[0].phase, "climb");
    assert_eq!(records.last().map(|r| r.phase.as_str()), Some("reserve"));
    assert!(records.iter().all(|r| r.state_of_charge.is_none()));
}

#[test]
fn no_cache_solves_again() {
    let dir = tempfile::tempdir().unwrap();
    let path = small_project(dir.path());
    let request = RunRequest {
        project_path: &path,
        options: RunOptions {
            use_cache: false,
            ..RunOptions::default()
        },
    };
    ensure_run(&request).unwrap();
    let again = ensure_run(&request).unwrap();
    assert!(!again.loaded_from_cache);
}

#[test]
fn unconverged_run_is_not_reused() {
    let dir = tempfile::tempdir().unwrap();
    let path = small_project(dir.path());
    let mut project = load_project(&path).unwrap();
    project.solver.max_iter_outer = 1;
    save_project(&path, &project).unwrap();

    let request = RunRequest {
        project_path: &path,
        options: RunOptions::default(),
    };
    let first = ensure_run(&request).unwrap();
    assert_eq!(first.manifest.status, "failed");
    assert_eq!(first.manifest.outer_iterations, 1);

    let second = ensure_run(&request).unwrap();
    assert!(!second.loaded_from_cache);
}

#[test]
fn missing_project_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ensure_run(&RunRequest {
        project_path: &dir.path().join("absent.yaml"),
        options: RunOptions::default(),
    });
    assert!(matches!(err, Err(fm_app::AppError::ProjectFileRead { .. })));
}

#[test]
fn range_sweep_burns_more_fuel_further() {
    let dir = tempfile::tempdir().unwrap();
    let project = load_project(&small_project(dir.path())).unwrap();
    let values = [200e3, 300e3, 400e3, 10e3];
    let cases = run_sweep(&project, SweepParam::Range, &values);

    assert_eq!(cases.len(), 4);
    for (case, value) in cases.iter().zip(values) {
        assert_eq!(case.value, value);
    }
    for case in &cases[..3] {
        assert!(case.error.is_none(), "{:?}", case.error);
        assert!(case.status.is_some_and(|s| s.is_converged()));
    }
    assert!(cases[0].block_fuel_kg < cases[1].block_fuel_kg);
    assert!(cases[1].block_fuel_kg < cases[2].block_fuel_kg);
    // Too short to fit climb and descent.
    assert!(cases[3].error.is_some());
    assert!(cases[3].status.is_none());
}
