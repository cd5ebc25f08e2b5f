//! Backtracking line search on the scaled residual norm.

use crate::error::SolverResult;
use crate::system::NonlinearSystem;
use nalgebra::DVector;

/// Armijo-Goldstein backtracking.
///
/// A step length `a` is accepted when the merit `phi(a) = ||F(x + a dx) / scale||`
/// satisfies the sufficient-decrease condition `phi(a) <= (1 - c a) phi(0)`.
/// Trial points whose residual is not finite are always rejected.
#[derive(Debug, Clone, Copy)]
pub struct ArmijoGoldstein {
    /// Sufficient decrease coefficient
    pub c: f64,
    /// Backtracking factor
    pub rho: f64,
    /// Maximum number of backtracks
    pub max_backtracks: usize,
}

impl Default for ArmijoGoldstein {
    fn default() -> Self {
        Self {
            c: 0.1,
            rho: 0.5,
            max_backtracks: 10,
        }
    }
}

/// Accepted point of a line search.
#[derive(Debug, Clone)]
pub struct LineSearchOutcome {
    pub x: DVector<f64>,
    pub r: DVector<f64>,
    pub merit: f64,
    pub step: f64,
    pub backtracks: usize,
    /// False when the backtrack budget ran out and the last trial was taken.
    pub sufficient_decrease: bool,
}

pub(crate) fn merit(r: &DVector<f64>, scale: &DVector<f64>) -> f64 {
    r.component_div(scale).norm()
}

impl ArmijoGoldstein {
    pub fn search<S: NonlinearSystem + ?Sized>(
        &self,
        system: &S,
        x: &DVector<f64>,
        dx: &DVector<f64>,
        merit0: f64,
        scale: &DVector<f64>,
    ) -> SolverResult<LineSearchOutcome> {
        let mut step = 1.0;
        let mut last: Option<LineSearchOutcome> = None;

        for backtracks in 0..=self.max_backtracks {
            let x_trial = x + step * dx;
            // Evaluation failures at a trial point count as rejection.
            if let Ok(r_trial) = system.residual(&x_trial) {
                let phi = merit(&r_trial, scale);
                if phi.is_finite() {
                    let accept = phi <= (1.0 - self.c * step) * merit0;
                    let outcome = LineSearchOutcome {
                        x: x_trial,
                        r: r_trial,
                        merit: phi,
                        step,
                        backtracks,
                        sufficient_decrease: accept,
                    };
                    if accept {
                        return Ok(outcome);
                    }
                    last = Some(outcome);
                }
            }
            step *= self.rho;
        }

        match last {
            Some(outcome) => Ok(outcome),
            None => {
                // Every trial was non-finite: stay put.
                let r = system.residual(x)?;
                Ok(LineSearchOutcome {
                    x: x.clone(),
                    merit: merit(&r, scale),
                    r,
                    step: 0.0,
                    backtracks: self.max_backtracks,
                    sufficient_decrease: false,
                })
            }
        }
    }
}
