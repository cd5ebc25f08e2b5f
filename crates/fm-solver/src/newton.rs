//! Newton solver with optional line search, stall detection and soft failure.

use crate::error::{SolverError, SolverResult};
use crate::linesearch::{ArmijoGoldstein, merit};
use crate::system::{GroupNorm, NonlinearSystem, group_norms};
use nalgebra::DVector;
use tracing::{debug, warn};

/// Newton solver configuration.
#[derive(Debug, Clone)]
pub struct NewtonConfig {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Absolute tolerance on every residual row
    pub abs_tol: f64,
    /// Relative tolerance on every residual row (against its nominal scale)
    pub rel_tol: f64,
    /// Minimum relative merit improvement per iteration before counting a stall
    pub stall_tol: f64,
    /// Consecutive stalled iterations before giving up
    pub stall_limit: usize,
    /// Backtracking line search; `None` takes full Newton steps
    pub line_search: Option<ArmijoGoldstein>,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            abs_tol: 1e-6,
            rel_tol: 1e-6,
            stall_tol: 1e-6,
            stall_limit: 5,
            line_search: Some(ArmijoGoldstein::default()),
        }
    }
}

/// Solver state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    NotStarted,
    Iterating,
    /// Every residual group met both tolerances.
    Converged,
    /// Progress fell below the stall tolerance; best iterate returned.
    Stalled,
    /// Iteration cap hit or the linear solve broke down; best iterate returned.
    Failed,
}

impl SolveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SolveStatus::NotStarted => "not-started",
            SolveStatus::Iterating => "iterating",
            SolveStatus::Converged => "converged",
            SolveStatus::Stalled => "stalled",
            SolveStatus::Failed => "failed",
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, SolveStatus::Converged)
    }
}

/// One accepted Newton step.
#[derive(Debug, Clone)]
pub struct IterationRecord {
    pub iteration: usize,
    pub merit: f64,
    pub step: f64,
    pub backtracks: usize,
}

/// Newton iteration result.
#[derive(Debug, Clone)]
pub struct NewtonResult {
    /// Returned iterate (best seen unless converged)
    pub x: DVector<f64>,
    pub status: SolveStatus,
    /// Number of Newton steps taken
    pub iterations: usize,
    /// Scaled residual norm at `x`
    pub merit: f64,
    /// Per-group criteria at `x`
    pub group_norms: Vec<GroupNorm>,
    pub history: Vec<IterationRecord>,
    pub message: Option<String>,
}

struct Iterate {
    x: DVector<f64>,
    r: DVector<f64>,
    scale: DVector<f64>,
    merit: f64,
}

fn checked_scale<S: NonlinearSystem + ?Sized>(
    system: &S,
    x: &DVector<f64>,
) -> SolverResult<DVector<f64>> {
    let scale = system.nominal_scale(x)?;
    if scale.iter().any(|s| !s.is_finite() || *s <= 0.0) {
        return Err(SolverError::Numeric {
            what: format!("{}: nominal scales must be positive", system.name()),
        });
    }
    Ok(scale)
}

fn evaluate<S: NonlinearSystem + ?Sized>(
    system: &S,
    x: DVector<f64>,
) -> SolverResult<Iterate> {
    let r = system.residual(&x)?;
    if r.iter().any(|v| !v.is_finite()) {
        return Err(SolverError::Evaluation {
            what: format!("{}: non-finite residual", system.name()),
        });
    }
    let scale = checked_scale(system, &x)?;
    let merit = merit(&r, &scale);
    Ok(Iterate { x, r, scale, merit })
}

/// Solve `F(x) = 0` by full Newton iteration from `x0`.
///
/// Hard errors are limited to problem setup and an unusable initial guess;
/// every other failure mode is reported through [`SolveStatus`] together with
/// the best iterate found.
pub fn newton_solve<S: NonlinearSystem + ?Sized>(
    system: &S,
    x0: DVector<f64>,
    config: &NewtonConfig,
) -> SolverResult<NewtonResult> {
    let n = system.n_unknowns();
    if x0.len() != n {
        return Err(SolverError::ProblemSetup {
            what: format!(
                "{}: initial guess has {} entries, system has {}",
                system.name(),
                x0.len(),
                n
            ),
        });
    }

    let groups = system.groups();
    let mut current = evaluate(system, x0)?;
    debug!(
        system = system.name(),
        unknowns = n,
        merit = current.merit,
        status = SolveStatus::Iterating.as_str()
    );

    let mut best_x = current.x.clone();
    let mut best_merit = current.merit;
    let mut stall_count = 0;
    let mut history = Vec::new();

    let finish = |x: DVector<f64>,
                  status: SolveStatus,
                  iterations: usize,
                  history: Vec<IterationRecord>,
                  message: Option<String>|
     -> SolverResult<NewtonResult> {
        let r = system.residual(&x)?;
        let scale = checked_scale(system, &x)?;
        Ok(NewtonResult {
            merit: merit(&r, &scale),
            group_norms: group_norms(&groups, &r, &scale, config.abs_tol, config.rel_tol),
            x,
            status,
            iterations,
            history,
            message,
        })
    };

    for iter in 0..config.max_iterations {
        let norms = group_norms(
            &groups,
            &current.r,
            &current.scale,
            config.abs_tol,
            config.rel_tol,
        );
        if norms.iter().all(|g| g.converged) {
            return finish(current.x, SolveStatus::Converged, iter, history, None);
        }

        let jac = system.jacobian(&current.x)?.to_dense();
        let Some(dx) = jac.lu().solve(&(-&current.r)) else {
            warn!(system = system.name(), iteration = iter, "singular Jacobian");
            return finish(
                best_x,
                SolveStatus::Failed,
                iter,
                history,
                Some(format!("singular Jacobian at iteration {}", iter)),
            );
        };

        let (next, step, backtracks) = match &config.line_search {
            Some(ls) => {
                let out = ls.search(system, &current.x, &dx, current.merit, &current.scale)?;
                (out.x, out.step, out.backtracks)
            }
            None => (&current.x + &dx, 1.0, 0),
        };

        let previous_merit = current.merit;
        current = match evaluate(system, next) {
            Ok(it) => it,
            Err(e) => {
                warn!(system = system.name(), iteration = iter, error = %e, "step left the valid domain");
                return finish(
                    best_x,
                    SolveStatus::Failed,
                    iter + 1,
                    history,
                    Some(e.to_string()),
                );
            }
        };

        if current.merit < best_merit {
            best_merit = current.merit;
            best_x = current.x.clone();
        }

        let improvement = (previous_merit - current.merit) / previous_merit.max(f64::MIN_POSITIVE);
        if improvement < config.stall_tol {
            stall_count += 1;
        } else {
            stall_count = 0;
        }

        debug!(
            system = system.name(),
            iteration = iter + 1,
            merit = current.merit,
            step,
            backtracks
        );
        history.push(IterationRecord {
            iteration: iter + 1,
            merit: current.merit,
            step,
            backtracks,
        });

        if stall_count >= config.stall_limit {
            let norms = group_norms(
                &groups,
                &current.r,
                &current.scale,
                config.abs_tol,
                config.rel_tol,
            );
            if norms.iter().all(|g| g.converged) {
                return finish(current.x, SolveStatus::Converged, iter + 1, history, None);
            }
            warn!(
                system = system.name(),
                iteration = iter + 1,
                merit = best_merit,
                "iteration stalled"
            );
            return finish(
                best_x,
                SolveStatus::Stalled,
                iter + 1,
                history,
                Some(format!(
                    "no progress for {} consecutive iterations",
                    config.stall_limit
                )),
            );
        }
    }

    let norms = group_norms(
        &groups,
        &current.r,
        &current.scale,
        config.abs_tol,
        config.rel_tol,
    );
    if norms.iter().all(|g| g.converged) {
        return finish(
            current.x,
            SolveStatus::Converged,
            config.max_iterations,
            history,
            None,
        );
    }

    warn!(
        system = system.name(),
        max_iterations = config.max_iterations,
        merit = best_merit,
        "iteration cap reached"
    );
    finish(
        best_x,
        SolveStatus::Failed,
        config.max_iterations,
        history,
        Some(format!(
            "maximum iterations {} reached, merit = {:.3e}",
            config.max_iterations, best_merit
        )),
    )
}
