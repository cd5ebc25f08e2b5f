use fm_solver::{
    ArmijoGoldstein, Component, NewtonConfig, NonlinearSystem, ResidualGroup, SolveStatus,
    SolverResult, SparseJacobian, check_partials, newton_solve,
};
use nalgebra::DVector;
use proptest::prelude::*;

/// Chain of points where each state depends on its predecessor, like a
/// battery state of charge drained point by point.
///
/// Rows 2i:   y_i - (y_{i-1} - 0.1 z_{i-1})   (y_{-1} = 1)
/// Rows 2i+1: z_i^3 + z_i - y_i
struct Chain {
    n: usize,
}

impl NonlinearSystem for Chain {
    fn name(&self) -> &str {
        "chain"
    }

    fn n_unknowns(&self) -> usize {
        2 * self.n
    }

    fn residual(&self, x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        let mut r = DVector::zeros(2 * self.n);
        for i in 0..self.n {
            let (y, z) = (x[2 * i], x[2 * i + 1]);
            let prev = if i == 0 {
                1.0
            } else {
                x[2 * i - 2] - 0.1 * x[2 * i - 1]
            };
            r[2 * i] = y - prev;
            r[2 * i + 1] = z * z * z + z - y;
        }
        Ok(r)
    }

    fn jacobian(&self, x: &DVector<f64>) -> SolverResult<SparseJacobian> {
        let mut j = SparseJacobian::with_capacity(2 * self.n, 2 * self.n, 5 * self.n);
        for i in 0..self.n {
            let z = x[2 * i + 1];
            j.add(2 * i, 2 * i, 1.0)?;
            if i > 0 {
                j.add(2 * i, 2 * i - 2, -1.0)?;
                j.add(2 * i, 2 * i - 1, 0.1)?;
            }
            j.add(2 * i + 1, 2 * i + 1, 3.0 * z * z + 1.0)?;
            j.add(2 * i + 1, 2 * i, -1.0)?;
        }
        Ok(j)
    }

    fn nominal_scale(&self, _x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        Ok(DVector::from_element(2 * self.n, 1.0))
    }

    fn groups(&self) -> Vec<ResidualGroup> {
        vec![
            ResidualGroup::strided("charge", 0, 2, self.n),
            ResidualGroup::strided("load", 1, 2, self.n),
        ]
    }
}

#[test]
fn cross_point_coupling_converges() {
    let sys = Chain { n: 20 };
    let x0 = DVector::from_element(40, 0.5);
    let result = newton_solve(&sys, x0, &NewtonConfig::default()).unwrap();

    assert_eq!(result.status, SolveStatus::Converged);
    assert_eq!(result.group_norms.len(), 2);
    assert!(result.group_norms.iter().all(|g| g.max_abs < 1e-6));

    // The chain drains monotonically.
    for i in 1..20 {
        assert!(result.x[2 * i] < result.x[2 * i - 2]);
    }
}

#[test]
fn jacobian_couples_to_previous_point_only() {
    let sys = Chain { n: 4 };
    let x = DVector::from_element(8, 0.3);
    let j = sys.jacobian(&x).unwrap();
    assert!(!j.couples_outside(0, 0, 2));
    assert!(j.couples_outside(2, 2, 4));
    assert!(!j.couples_outside(2, 0, 4));
}

#[test]
fn line_search_is_optional() {
    let sys = Chain { n: 5 };
    let with = newton_solve(&sys, DVector::from_element(10, 0.5), &NewtonConfig::default()).unwrap();
    let without = newton_solve(
        &sys,
        DVector::from_element(10, 0.5),
        &NewtonConfig {
            line_search: None,
            ..NewtonConfig::default()
        },
    )
    .unwrap();
    assert!(with.status.is_converged());
    assert!(without.status.is_converged());
    assert!((&with.x - &without.x).amax() < 1e-8);
    assert!(without.history.iter().all(|h| h.step == 1.0));
}

#[test]
fn resolve_from_solution_is_idempotent() {
    let sys = Chain { n: 6 };
    let config = NewtonConfig {
        line_search: Some(ArmijoGoldstein::default()),
        ..NewtonConfig::default()
    };
    let first = newton_solve(&sys, DVector::from_element(12, 0.2), &config).unwrap();
    let second = newton_solve(&sys, first.x.clone(), &config).unwrap();
    assert_eq!(second.iterations, 0);
    assert_eq!(second.x, first.x);
}

#[test]
fn iteration_cap_is_soft() {
    let sys = Chain { n: 10 };
    let config = NewtonConfig {
        max_iterations: 1,
        abs_tol: 1e-14,
        rel_tol: 1e-14,
        ..NewtonConfig::default()
    };
    let result = newton_solve(&sys, DVector::from_element(20, 3.0), &config).unwrap();
    assert_eq!(result.status, SolveStatus::Failed);
    assert_eq!(result.iterations, 1);
    assert!(result.message.unwrap().contains("maximum iterations"));
}

proptest! {
    #[test]
    fn chain_partials_match_finite_differences(
        values in proptest::collection::vec(-2.0_f64..2.0, 6)
    ) {
        let sys = Chain { n: 3 };
        let x = DVector::from_vec(values);
        let check = check_partials(&Component::Implicit(&sys), &x, 1e-6).unwrap();
        prop_assert!(check.max_rel_error < 1e-6, "{:?}", check);
    }
}
