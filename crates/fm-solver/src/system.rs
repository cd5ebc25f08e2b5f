//! System definitions: implicit residual systems and explicit maps.

use crate::error::{SolverError, SolverResult};
use crate::jacobian::central_difference_jacobian;
use nalgebra::{DMatrix, DVector};

/// A named subset of residual rows checked jointly for convergence.
#[derive(Debug, Clone)]
pub struct ResidualGroup {
    pub name: String,
    pub indices: Vec<usize>,
}

impl ResidualGroup {
    pub fn new(name: impl Into<String>, indices: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            indices,
        }
    }

    /// Every `stride`-th row starting at `offset`, `count` rows.
    pub fn strided(name: impl Into<String>, offset: usize, stride: usize, count: usize) -> Self {
        Self::new(name, (0..count).map(|i| offset + i * stride).collect())
    }

    pub fn all(n: usize) -> Self {
        Self::new("residual", (0..n).collect())
    }
}

/// Implicit system `F(x) = 0` with an analytic Jacobian.
pub trait NonlinearSystem {
    /// System name for logging.
    fn name(&self) -> &str;

    /// Number of unknowns (equal to the number of residuals).
    fn n_unknowns(&self) -> usize;

    fn residual(&self, x: &DVector<f64>) -> SolverResult<DVector<f64>>;

    fn jacobian(&self, x: &DVector<f64>) -> SolverResult<crate::SparseJacobian>;

    /// Positive reference magnitude per residual row, used for the relative
    /// tolerance and to balance rows with different units in the merit
    /// function.
    fn nominal_scale(&self, _x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        Ok(DVector::from_element(self.n_unknowns(), 1.0))
    }

    /// Residual groups that must each satisfy both tolerances.
    fn groups(&self) -> Vec<ResidualGroup> {
        vec![ResidualGroup::all(self.n_unknowns())]
    }
}

/// Explicit map `y = f(x)` with analytic partials `dy/dx`.
pub trait ExplicitMap {
    fn name(&self) -> &str;
    fn n_inputs(&self) -> usize;
    fn n_outputs(&self) -> usize;
    fn compute(&self, x: &DVector<f64>) -> SolverResult<DVector<f64>>;
    fn partials(&self, x: &DVector<f64>) -> SolverResult<DMatrix<f64>>;
}

/// The two kinds of model component the solver works with.
pub enum Component<'a> {
    Explicit(&'a dyn ExplicitMap),
    Implicit(&'a dyn NonlinearSystem),
}

impl Component<'_> {
    pub fn name(&self) -> &str {
        match self {
            Component::Explicit(c) => c.name(),
            Component::Implicit(c) => c.name(),
        }
    }

    fn evaluate(&self, x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        match self {
            Component::Explicit(c) => c.compute(x),
            Component::Implicit(c) => c.residual(x),
        }
    }

    fn analytic(&self, x: &DVector<f64>) -> SolverResult<DMatrix<f64>> {
        match self {
            Component::Explicit(c) => c.partials(x),
            Component::Implicit(c) => Ok(c.jacobian(x)?.to_dense()),
        }
    }
}

/// Per-group convergence metrics.
#[derive(Debug, Clone)]
pub struct GroupNorm {
    pub name: String,
    pub max_abs: f64,
    pub max_rel: f64,
    pub converged: bool,
}

/// Evaluate the joint absolute/relative criterion for every group.
pub fn group_norms(
    groups: &[ResidualGroup],
    r: &DVector<f64>,
    scale: &DVector<f64>,
    abs_tol: f64,
    rel_tol: f64,
) -> Vec<GroupNorm> {
    groups
        .iter()
        .map(|g| {
            let mut max_abs: f64 = 0.0;
            let mut max_rel: f64 = 0.0;
            for &i in &g.indices {
                let a = r[i].abs();
                max_abs = max_abs.max(a);
                max_rel = max_rel.max(a / scale[i]);
            }
            GroupNorm {
                name: g.name.clone(),
                max_abs,
                max_rel,
                converged: max_abs < abs_tol && max_rel < rel_tol,
            }
        })
        .collect()
}

/// Result of comparing analytic partials against central differences.
#[derive(Debug, Clone)]
pub struct PartialsCheck {
    pub component: String,
    pub max_abs_error: f64,
    pub max_rel_error: f64,
    pub worst_entry: (usize, usize),
}

/// Compare a component's analytic partials with central differences at `x`.
///
/// Relative error is measured against `max(|fd|, 1)` so that entries near
/// zero do not dominate.
pub fn check_partials(
    component: &Component<'_>,
    x: &DVector<f64>,
    epsilon: f64,
) -> SolverResult<PartialsCheck> {
    let analytic = component.analytic(x)?;
    let fd = central_difference_jacobian(x, |xp| component.evaluate(xp), epsilon)?;

    if analytic.shape() != fd.shape() {
        return Err(SolverError::ProblemSetup {
            what: format!(
                "{}: analytic partials {:?} vs finite-difference {:?}",
                component.name(),
                analytic.shape(),
                fd.shape()
            ),
        });
    }

    let mut check = PartialsCheck {
        component: component.name().to_string(),
        max_abs_error: 0.0,
        max_rel_error: 0.0,
        worst_entry: (0, 0),
    };
    for r in 0..fd.nrows() {
        for c in 0..fd.ncols() {
            let err = (analytic[(r, c)] - fd[(r, c)]).abs();
            let rel = err / fd[(r, c)].abs().max(1.0);
            if rel > check.max_rel_error {
                check.max_rel_error = rel;
                check.worst_entry = (r, c);
            }
            check.max_abs_error = check.max_abs_error.max(err);
        }
    }
    Ok(check)
}
