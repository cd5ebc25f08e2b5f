//! Run execution and caching service.

use fm_core::constants::J_PER_KWH;
use fm_mission::{MissionSolution, OuterProgress, run_mission_with_progress};
use fm_project::Project;
use fm_results::{
    EquilibriumRecord, GroupRecord, MissionPointRecord, PhaseRecord, RunManifest, RunStore,
    SpeedRecord, TotalsRecord,
};
use std::path::Path;
use std::time::Instant;
use tracing::info;

use crate::error::AppResult;
use crate::progress::{RunProgressEvent, RunStage};
use crate::project_service;
use crate::runtime_compile;

/// Options for running missions.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub use_cache: bool,
    pub solver_version: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            solver_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Request to execute a run.
pub struct RunRequest<'a> {
    pub project_path: &'a Path,
    pub options: RunOptions,
}

#[derive(Debug, Clone, Default)]
pub struct RunTimingSummary {
    pub compile_time_s: f64,
    pub solve_time_s: f64,
    pub save_time_s: f64,
    pub load_cache_time_s: f64,
    pub total_time_s: f64,
}

/// Response from a run execution.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub manifest: RunManifest,
    pub loaded_from_cache: bool,
    pub timing: RunTimingSummary,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
    outer: Option<OuterProgress>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent {
            stage,
            elapsed_wall_s: started.elapsed().as_secs_f64(),
            message,
            outer,
        });
    }
}

/// Execute or load a run.
pub fn ensure_run(request: &RunRequest) -> AppResult<RunResponse> {
    ensure_run_with_progress(request, None)
}

/// Execute or load a run and stream progress events.
///
/// A stored run is reused only when it converged; degraded and failed runs
/// are solved again and overwritten.
pub fn ensure_run_with_progress(
    request: &RunRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let mut timing = RunTimingSummary::default();

    emit_progress(
        &mut progress_cb,
        RunStage::LoadingProject,
        started,
        Some("Loading project".to_string()),
        None,
    );
    let project = project_service::load_project(request.project_path)?;

    emit_progress(
        &mut progress_cb,
        RunStage::CheckingCache,
        started,
        Some("Checking run cache".to_string()),
        None,
    );
    let run_id = fm_results::compute_run_id(&project, &request.options.solver_version);
    let store = RunStore::for_project(request.project_path)?;

    if request.options.use_cache && store.has_run(&run_id) {
        let load_started = Instant::now();
        let manifest = store.load_manifest(&run_id)?;
        if manifest.is_converged() {
            emit_progress(
                &mut progress_cb,
                RunStage::LoadingCachedResult,
                started,
                Some("Loading cached run".to_string()),
                None,
            );
            timing.load_cache_time_s = load_started.elapsed().as_secs_f64();
            timing.total_time_s = started.elapsed().as_secs_f64();
            emit_progress(
                &mut progress_cb,
                RunStage::Completed,
                started,
                Some("Loaded cached run".to_string()),
                None,
            );
            return Ok(RunResponse {
                run_id,
                manifest,
                loaded_from_cache: true,
                timing,
            });
        }
        info!(run_id = %run_id, status = %manifest.status, "cached run did not converge, solving again");
    }

    emit_progress(
        &mut progress_cb,
        RunStage::CompilingRuntime,
        started,
        Some("Compiling runtime".to_string()),
        None,
    );
    let compile_started = Instant::now();
    let runtime = runtime_compile::compile_project(&project)?;
    timing.compile_time_s = compile_started.elapsed().as_secs_f64();

    emit_progress(
        &mut progress_cb,
        RunStage::SolvingMission,
        started,
        Some("Solving mission".to_string()),
        None,
    );
    let solve_started = Instant::now();
    let solution = {
        let mut forward = |p: OuterProgress| {
            let message = format!(
                "Outer iteration {}/{}: mass change {:.3e}",
                p.iteration, p.max_iterations, p.mass_residual
            );
            emit_progress(
                &mut progress_cb,
                RunStage::SolvingMission,
                started,
                Some(message),
                Some(p),
            );
        };
        run_mission_with_progress(&runtime.mission(), Some(&mut forward))?
    };
    timing.solve_time_s = solve_started.elapsed().as_secs_f64();

    // The driver has returned; nothing is written before this point.
    emit_progress(
        &mut progress_cb,
        RunStage::SavingResults,
        started,
        Some("Saving results".to_string()),
        None,
    );
    let save_started = Instant::now();
    let manifest = manifest_from_solution(
        &run_id,
        &project,
        runtime.powertrain.name(),
        &request.options.solver_version,
        &solution,
    );
    store.save_run(&manifest, &point_records(&solution))?;
    timing.save_time_s = save_started.elapsed().as_secs_f64();
    timing.total_time_s = started.elapsed().as_secs_f64();

    info!(
        run_id = %run_id,
        status = %manifest.status,
        block_fuel_kg = manifest.totals.block_fuel_kg,
        total_time_s = timing.total_time_s,
        "run completed"
    );
    emit_progress(
        &mut progress_cb,
        RunStage::Completed,
        started,
        Some(format!("Run {}", manifest.status)),
        None,
    );

    Ok(RunResponse {
        run_id,
        manifest,
        loaded_from_cache: false,
        timing,
    })
}

/// Manifest of a finished solve, stamped with the current UTC time.
pub fn manifest_from_solution(
    run_id: &str,
    project: &Project,
    powertrain: &str,
    solver_version: &str,
    solution: &MissionSolution,
) -> RunManifest {
    let t = &solution.totals;
    let eq = &solution.equilibrium;
    let speed = |s: &fm_mission::SpeedSelection| SpeedRecord {
        eas_mps: s.eas_mps,
        optimum_eas_mps: s.optimum_eas_mps,
        stall_eas_mps: s.stall_eas_mps,
        branch: s.branch.as_str().to_string(),
    };
    RunManifest {
        run_id: run_id.to_string(),
        project_name: project.name.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        solver_version: solver_version.to_string(),
        powertrain: powertrain.to_string(),
        status: solution.status.as_str().to_string(),
        outer_iterations: solution.outer_iterations,
        mass_residual: solution.mass_residual,
        equilibrium: EquilibriumRecord {
            status: eq.status.as_str().to_string(),
            iterations: eq.iterations,
            powertrain_iterations: eq.powertrain_iterations,
            failed_points: eq.failed_points.clone(),
            groups: eq
                .group_norms
                .iter()
                .map(|g| GroupRecord {
                    name: g.name.clone(),
                    max_abs: g.max_abs,
                    max_rel: g.max_rel,
                    converged: g.converged,
                })
                .collect(),
        },
        totals: TotalsRecord {
            taxi_out_fuel_kg: t.taxi_out_fuel_kg,
            takeoff_fuel_kg: t.takeoff_fuel_kg,
            initial_climb_fuel_kg: t.initial_climb_fuel_kg,
            trip_fuel_kg: t.trip_fuel_kg,
            reserve_fuel_kg: t.reserve_fuel_kg,
            taxi_in_fuel_kg: t.taxi_in_fuel_kg,
            block_fuel_kg: t.block_fuel_kg,
            fuel_loaded_kg: t.fuel_loaded_kg,
            energy_kwh: t.energy_j / J_PER_KWH,
            flight_time_s: t.flight_time_s,
            block_time_s: t.block_time_s,
        },
        phases: solution
            .phases
            .iter()
            .map(|p| PhaseRecord {
                phase: p.phase.as_str().to_string(),
                fuel_kg: p.fuel_kg,
                energy_kwh: p.energy_j / J_PER_KWH,
                duration_s: p.duration_s,
                distance_m: p.distance_m,
            })
            .collect(),
        climb_speed: solution.climb_speed.as_ref().map(speed),
        descent_speed: solution.descent_speed.as_ref().map(speed),
        message: solution.message.clone().or_else(|| eq.message.clone()),
    }
}

/// One record per flight point, in kWh and per-hour units.
pub fn point_records(solution: &MissionSolution) -> Vec<MissionPointRecord> {
    solution
        .points
        .iter()
        .map(|p| MissionPointRecord {
            index: p.index,
            phase: p.phase.as_str().to_string(),
            time_s: p.time_s,
            dt_s: p.dt_s,
            altitude_m: p.altitude_m,
            ground_distance_m: p.position_m,
            mass_kg: p.mass_kg,
            x_cg_m: p.x_cg_m,
            tas_mps: p.tas_mps,
            eas_mps: p.eas_mps,
            mach: p.mach,
            vertical_speed_mps: p.vertical_speed_mps,
            accel_z_mps2: p.accel_z_mps2,
            density_kgpm3: p.density_kgpm3,
            temperature_k: p.temperature_k,
            gamma_deg: p.gamma_deg,
            alpha_deg: p.alpha_deg,
            delta_m_deg: p.delta_m_deg,
            cl_wing: p.cl_wing,
            cl_tail: p.cl_tail,
            cl: p.cl,
            cd_wing: p.cd_wing,
            cd_tail: p.cd_tail,
            cd: p.cd,
            lift_to_drag: p.lift_to_drag,
            delta_cl: p.delta_cl,
            delta_cd: p.delta_cd,
            delta_cm: p.delta_cm,
            thrust_n: p.thrust_n,
            thrust_rate: p.thrust_rate,
            engine_setting: p.engine_setting,
            sfc_kg_per_kwh: p.sfc_kg_per_j * J_PER_KWH,
            fuel_flow_kgph: p.fuel_flow_kgps * 3600.0,
            fuel_consumed_kg: p.fuel_consumed_kg,
            energy_consumed_kwh: p.energy_consumed_j / J_PER_KWH,
            state_of_charge: p.state_of_charge,
        })
        .collect()
}

/// Stored runs of a project, oldest first.
pub fn list_runs(project_path: &Path) -> AppResult<Vec<RunManifest>> {
    let store = RunStore::for_project(project_path)?;
    Ok(store.list_runs()?)
}

pub fn load_run(
    project_path: &Path,
    run_id: &str,
) -> AppResult<(RunManifest, Vec<MissionPointRecord>)> {
    let store = RunStore::for_project(project_path)?;
    let manifest = store.load_manifest(run_id)?;
    let records = store.load_timeseries(run_id)?;
    Ok((manifest, records))
}
