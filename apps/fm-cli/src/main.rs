use clap::{Parser, Subcommand};
use fm_app::{
    AppResult, RunOptions, RunProgressEvent, RunRequest, SweepParam, load_project, run_service,
    validate_project,
};
use fm_results::RunManifest;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fm-cli")]
#[command(about = "FlightMission CLI - mission performance of propeller aircraft", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate project file syntax and values
    Validate {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
    },
    /// Solve the mission of a project
    Run {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
        /// Skip cache and force re-run
        #[arg(long)]
        no_cache: bool,
    },
    /// List stored runs for a project
    Runs {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
    },
    /// Show details of a stored run
    ShowRun {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
        /// Run ID to display
        run_id: String,
    },
    /// Export the per-point table of a run as CSV
    Export {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
        /// Run ID
        run_id: String,
        /// Output CSV file path (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Solve the project once per value of a mission parameter
    Sweep {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
        /// range, cruise_speed, cruise_altitude or mtow
        #[arg(long)]
        param: SweepParam,
        /// Comma-separated SI values
        #[arg(long, value_delimiter = ',', num_args = 1..)]
        values: Vec<f64>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { project_path } => cmd_validate(&project_path),
        Commands::Run {
            project_path,
            no_cache,
        } => cmd_run(&project_path, !no_cache),
        Commands::Runs { project_path } => cmd_runs(&project_path),
        Commands::ShowRun {
            project_path,
            run_id,
        } => cmd_show_run(&project_path, &run_id),
        Commands::Export {
            project_path,
            run_id,
            output,
        } => cmd_export(&project_path, &run_id, output.as_deref()),
        Commands::Sweep {
            project_path,
            param,
            values,
        } => cmd_sweep(&project_path, param, &values),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Exit code 2 for a solve that did not converge.
fn status_code(status: &str) -> ExitCode {
    if status == "failed" {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}

fn cmd_validate(project_path: &Path) -> AppResult<ExitCode> {
    println!("Validating project: {}", project_path.display());
    let project = load_project(project_path)?;
    validate_project(&project)?;
    println!("✓ Project is valid");
    Ok(ExitCode::SUCCESS)
}

fn cmd_run(project_path: &Path, use_cache: bool) -> AppResult<ExitCode> {
    let request = RunRequest {
        project_path,
        options: RunOptions {
            use_cache,
            ..RunOptions::default()
        },
    };

    let mut last_emit = Instant::now();
    let mut last_stage = String::new();
    let response = run_service::ensure_run_with_progress(
        &request,
        Some(&mut |event| {
            let stage_key = format!("{:?}", event.stage);
            let emit_now = stage_key != last_stage || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                last_stage = stage_key;
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    if response.loaded_from_cache {
        println!("✓ Loaded from cache: {}", response.run_id);
    } else {
        println!("✓ Mission solved: {}", response.run_id);
        println!(
            "  compile {:.3}s  solve {:.3}s  save {:.3}s",
            response.timing.compile_time_s,
            response.timing.solve_time_s,
            response.timing.save_time_s
        );
    }
    print_manifest(&response.manifest);
    Ok(status_code(&response.manifest.status))
}

fn cmd_runs(project_path: &Path) -> AppResult<ExitCode> {
    let runs = run_service::list_runs(project_path)?;
    if runs.is_empty() {
        println!("No stored runs");
    } else {
        println!("Runs:");
        for run in runs {
            println!(
                "  {}  {}  {:<9}  block fuel {:.2} kg",
                run.run_id, run.timestamp, run.status, run.totals.block_fuel_kg
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_show_run(project_path: &Path, run_id: &str) -> AppResult<ExitCode> {
    let (manifest, records) = run_service::load_run(project_path, run_id)?;
    print_manifest(&manifest);
    println!("  Points: {}", records.len());
    Ok(ExitCode::SUCCESS)
}

fn cmd_export(project_path: &Path, run_id: &str, output: Option<&Path>) -> AppResult<ExitCode> {
    let (_manifest, records) = run_service::load_run(project_path, run_id)?;
    match output {
        Some(path) => {
            fm_results::export_csv(path, &records)?;
            println!("✓ Exported {} points to {}", records.len(), path.display());
        }
        None => fm_results::write_csv(io::stdout().lock(), &records)?,
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_sweep(project_path: &Path, param: SweepParam, values: &[f64]) -> AppResult<ExitCode> {
    let project = load_project(project_path)?;
    let cases = fm_app::run_sweep(&project, param, values);

    println!(
        "{:>14}  {:<9}  {:>6}  {:>12}  {:>12}  {:>10}",
        param.as_str(),
        "status",
        "outer",
        "block [kg]",
        "energy [kWh]",
        "time [min]"
    );
    let mut any_failed = false;
    for case in &cases {
        match (&case.status, &case.error) {
            (Some(status), _) => {
                any_failed |= !status.is_converged();
                println!(
                    "{:>14.3}  {:<9}  {:>6}  {:>12.3}  {:>12.3}  {:>10.1}",
                    case.value,
                    status.as_str(),
                    case.outer_iterations,
                    case.block_fuel_kg,
                    case.energy_kwh,
                    case.flight_time_s / 60.0
                );
            }
            (None, error) => {
                any_failed = true;
                println!(
                    "{:>14.3}  error      {}",
                    case.value,
                    error.as_deref().unwrap_or("unknown")
                );
            }
        }
    }
    Ok(if any_failed {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    })
}

fn print_manifest(m: &RunManifest) {
    println!("Run: {}", m.run_id);
    println!("  Project: {}", m.project_name);
    println!("  Power-train: {}", m.powertrain);
    println!("  Timestamp: {}", m.timestamp);
    println!(
        "  Status: {} ({} outer iterations, mass change {:.2e})",
        m.status, m.outer_iterations, m.mass_residual
    );
    println!(
        "  Equilibrium: {} after {} iterations",
        m.equilibrium.status, m.equilibrium.iterations
    );
    if !m.equilibrium.failed_points.is_empty() {
        println!("  Unconverged points: {:?}", m.equilibrium.failed_points);
    }
    if let Some(msg) = &m.message {
        println!("  Message: {}", msg);
    }
    for p in &m.phases {
        println!(
            "  {:<8} fuel {:>8.2} kg  energy {:>8.2} kWh  {:>7.1} min  {:>8.1} km",
            p.phase,
            p.fuel_kg,
            p.energy_kwh,
            p.duration_s / 60.0,
            p.distance_m / 1000.0
        );
    }
    let t = &m.totals;
    println!("  Trip fuel: {:.2} kg", t.trip_fuel_kg);
    println!("  Block fuel: {:.2} kg", t.block_fuel_kg);
    println!("  Fuel loaded: {:.2} kg", t.fuel_loaded_kg);
    println!("  Energy: {:.2} kWh", t.energy_kwh);
    println!("  Block time: {:.1} min", t.block_time_s / 60.0);
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    let spinner = ['|', '/', '-', '\\'];
    let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
    let mut line = format!(
        "\r{} {}  elapsed={:.2}s",
        spinner[spin_idx],
        event.stage.label(),
        event.elapsed_wall_s
    );
    if let Some(o) = &event.outer {
        line.push_str(&format!(
            "  outer={}/{}  dm={:.3e}  fuel={:.2}kg  eq={}",
            o.iteration,
            o.max_iterations,
            o.mass_residual,
            o.fuel_loaded_kg,
            o.equilibrium_status.as_str()
        ));
    } else if let Some(msg) = &event.message {
        line.push_str(&format!("  {}", msg));
    }
    print!("{}", line);
    let _ = io::stdout().flush();
}
