//! Sparse Jacobian assembly and finite-difference reference Jacobians.
//!
//! Production solves always use analytic partials. The finite-difference
//! routines exist to verify those partials.

use crate::error::{SolverError, SolverResult};
use nalgebra::{DMatrix, DVector};

/// Jacobian stored as (row, col, value) triplets.
///
/// Duplicate entries are summed on assembly, which lets independent
/// contributions (e.g. a residual and an explicit map chained into it) be
/// added without bookkeeping.
#[derive(Debug, Clone)]
pub struct SparseJacobian {
    nrows: usize,
    ncols: usize,
    triplets: Vec<(usize, usize, f64)>,
}

impl SparseJacobian {
    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            triplets: Vec::new(),
        }
    }

    pub fn with_capacity(nrows: usize, ncols: usize, nnz: usize) -> Self {
        Self {
            nrows,
            ncols,
            triplets: Vec::with_capacity(nnz),
        }
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Number of stored triplets (before summing duplicates).
    pub fn nnz(&self) -> usize {
        self.triplets.len()
    }

    /// Add `value` at (row, col). Exact zeros are skipped.
    pub fn add(&mut self, row: usize, col: usize, value: f64) -> SolverResult<()> {
        if row >= self.nrows || col >= self.ncols {
            return Err(SolverError::ProblemSetup {
                what: format!(
                    "Jacobian entry ({}, {}) outside {}x{}",
                    row, col, self.nrows, self.ncols
                ),
            });
        }
        if !value.is_finite() {
            return Err(SolverError::Numeric {
                what: format!("Non-finite Jacobian entry at ({}, {})", row, col),
            });
        }
        if value != 0.0 {
            self.triplets.push((row, col, value));
        }
        Ok(())
    }

    pub fn triplets(&self) -> &[(usize, usize, f64)] {
        &self.triplets
    }

    /// Dense assembly, summing duplicates.
    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut dense = DMatrix::zeros(self.nrows, self.ncols);
        for &(r, c, v) in &self.triplets {
            dense[(r, c)] += v;
        }
        dense
    }

    /// Copy every entry of `block` into `self`, shifting rows by `row_offset`
    /// and remapping columns. Columns mapped to `None` are dropped.
    pub fn add_block<F>(
        &mut self,
        block: &SparseJacobian,
        row_offset: usize,
        col_map: F,
    ) -> SolverResult<()>
    where
        F: Fn(usize) -> Option<usize>,
    {
        for &(r, c, v) in &block.triplets {
            if let Some(col) = col_map(c) {
                self.add(row_offset + r, col, v)?;
            }
        }
        Ok(())
    }

    /// True when some entry couples row `r` to a column outside `[lo, hi)`.
    pub fn couples_outside(&self, r: usize, lo: usize, hi: usize) -> bool {
        self.triplets
            .iter()
            .any(|&(row, col, _)| row == r && (col < lo || col >= hi))
    }
}

/// Compute Jacobian using forward finite differences.
///
/// For each column j, perturbs x[j] by epsilon and computes (f(x+e) - f(x))/epsilon.
pub fn finite_difference_jacobian<F>(
    x: &DVector<f64>,
    f: F,
    epsilon: f64,
) -> SolverResult<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    let n = x.len();
    let f_x = f(x)?;
    let m = f_x.len();

    let mut jac = DMatrix::zeros(m, n);

    for j in 0..n {
        let mut x_perturbed = x.clone();
        let dx = epsilon * x[j].abs().max(1.0);
        x_perturbed[j] += dx;

        let f_perturbed = f(&x_perturbed)?;
        let df = (f_perturbed - &f_x) / dx;

        jac.set_column(j, &df);
    }

    Ok(jac)
}

/// Compute Jacobian using central finite differences (more accurate but 2x cost).
pub fn central_difference_jacobian<F>(
    x: &DVector<f64>,
    f: F,
    epsilon: f64,
) -> SolverResult<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    let n = x.len();
    let f_x = f(x)?;
    let m = f_x.len();

    let mut jac = DMatrix::zeros(m, n);

    for j in 0..n {
        let dx = epsilon * x[j].abs().max(1.0);

        let mut x_plus = x.clone();
        x_plus[j] += dx;
        let f_plus = f(&x_plus)?;

        let mut x_minus = x.clone();
        x_minus[j] -= dx;
        let f_minus = f(&x_minus)?;

        let df = (f_plus - f_minus) / (2.0 * dx);

        jac.set_column(j, &df);
    }

    Ok(jac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jacobian_linear() {
        // f(x) = 2*x, J = 2
        let f = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_element(1, 2.0 * x[0]))
        };

        let x = DVector::from_element(1, 3.0);
        let jac = finite_difference_jacobian(&x, f, 1e-7).unwrap();

        assert!((jac[(0, 0)] - 2.0).abs() < 1e-5);
    }

    #[test]
    fn jacobian_quadratic_central() {
        // f(x) = x^2, J = 2*x
        let f = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_element(1, x[0] * x[0]))
        };

        let x = DVector::from_element(1, 3.0);
        let jac = central_difference_jacobian(&x, f, 1e-6).unwrap();

        assert!((jac[(0, 0)] - 6.0).abs() < 1e-8);
    }

    #[test]
    fn sparse_duplicates_are_summed() {
        let mut jac = SparseJacobian::new(2, 2);
        jac.add(0, 0, 1.5).unwrap();
        jac.add(0, 0, 2.5).unwrap();
        jac.add(1, 0, 0.0).unwrap();
        jac.add(1, 1, -1.0).unwrap();
        assert_eq!(jac.nnz(), 3);
        let dense = jac.to_dense();
        assert_eq!(dense[(0, 0)], 4.0);
        assert_eq!(dense[(1, 0)], 0.0);
        assert_eq!(dense[(1, 1)], -1.0);
    }

    #[test]
    fn sparse_rejects_out_of_range_and_nan() {
        let mut jac = SparseJacobian::new(2, 2);
        assert!(jac.add(2, 0, 1.0).is_err());
        assert!(jac.add(0, 0, f64::NAN).is_err());
    }

    #[test]
    fn block_is_shifted_and_remapped() {
        let mut block = SparseJacobian::new(2, 3);
        block.add(0, 0, 1.0).unwrap();
        block.add(1, 2, 2.0).unwrap();
        block.add(1, 1, 5.0).unwrap();

        let mut big = SparseJacobian::new(4, 6);
        big.add_block(&block, 2, |c| if c == 1 { None } else { Some(c + 3) })
            .unwrap();
        let dense = big.to_dense();
        assert_eq!(dense[(2, 3)], 1.0);
        assert_eq!(dense[(3, 5)], 2.0);
        assert_eq!(big.nnz(), 2);
    }

    #[test]
    fn detects_cross_block_coupling() {
        let mut jac = SparseJacobian::new(4, 4);
        jac.add(2, 2, 1.0).unwrap();
        jac.add(3, 1, 0.5).unwrap();
        assert!(!jac.couples_outside(2, 2, 4));
        assert!(jac.couples_outside(3, 2, 4));
    }
}
