//! Sparse linear solver backends for the Poisson system.
use super::options::SolverOptions;
use super::system::CsrMatrix;
use log::debug;
use nalgebra::DVector;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolverError {
    #[error("hole component of {cells} cells at {seed:?} touches no known cell")]
    Unanchored { cells: usize, seed: (usize, usize) },
    #[error("system matrix is singular or not positive definite")]
    Singular,
    #[error("no convergence after {iterations} iterations (relative residual {residual:.3e})")]
    NotConverged { iterations: usize, residual: f64 },
    #[error("right-hand side has {rhs} entries for a {dim}x{dim} system")]
    Shape { dim: usize, rhs: usize },
}

/// Solution of `A x = b` plus convergence data.
#[derive(Clone, Debug)]
pub struct Solution {
    pub x: DVector<f64>,
    pub iterations: usize,
    /// `‖b − A x‖ / ‖b‖` (absolute when `b = 0`).
    pub residual: f64,
}

/// Solver for symmetric positive definite sparse systems.
pub trait SparseLinearSolver {
    fn solve(&self, matrix: &CsrMatrix, rhs: &DVector<f64>) -> Result<Solution, SolverError>;
}

fn check_shape(matrix: &CsrMatrix, rhs: &DVector<f64>) -> Result<(), SolverError> {
    if matrix.dim() != rhs.len() {
        return Err(SolverError::Shape {
            dim: matrix.dim(),
            rhs: rhs.len(),
        });
    }
    Ok(())
}

fn relative_residual(matrix: &CsrMatrix, rhs: &DVector<f64>, x: &DVector<f64>) -> f64 {
    let r = (rhs - matrix.mul_vec(x)).norm();
    let b = rhs.norm();
    if b > 0.0 {
        r / b
    } else {
        r
    }
}

/// Jacobi-preconditioned conjugate gradient.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConjugateGradientSolver {
    pub options: SolverOptions,
}

impl ConjugateGradientSolver {
    pub fn new(options: SolverOptions) -> Self {
        Self { options }
    }
}

impl SparseLinearSolver for ConjugateGradientSolver {
    fn solve(&self, matrix: &CsrMatrix, rhs: &DVector<f64>) -> Result<Solution, SolverError> {
        check_shape(matrix, rhs)?;
        let n = matrix.dim();
        let mut x = DVector::zeros(n);
        let b_norm = rhs.norm();
        if n == 0 || b_norm == 0.0 {
            return Ok(Solution {
                x,
                iterations: 0,
                residual: 0.0,
            });
        }

        let inv_diag = matrix.diagonal().map(|d| if d > 0.0 { 1.0 / d } else { 0.0 });
        if inv_diag.iter().any(|&d| d == 0.0) {
            return Err(SolverError::Singular);
        }
        let max_iterations = self.options.iteration_cap(n);
        let tol = self.options.tolerance;

        let mut r = rhs.clone();
        let mut z = r.component_mul(&inv_diag);
        let mut p = z.clone();
        let mut rz = r.dot(&z);
        let mut residual = 1.0;
        for it in 0..max_iterations {
            let ap = matrix.mul_vec(&p);
            let pap = p.dot(&ap);
            if pap <= 0.0 || !pap.is_finite() {
                return Err(SolverError::Singular);
            }
            let alpha = rz / pap;
            x.axpy(alpha, &p, 1.0);
            r.axpy(-alpha, &ap, 1.0);
            residual = r.norm() / b_norm;
            if residual <= tol {
                debug!("cg: converged in {} iterations, residual {residual:.3e}", it + 1);
                return Ok(Solution {
                    x,
                    iterations: it + 1,
                    residual,
                });
            }
            z = r.component_mul(&inv_diag);
            let rz_next = r.dot(&z);
            p = &z + (rz_next / rz) * &p;
            rz = rz_next;
        }
        Err(SolverError::NotConverged {
            iterations: max_iterations,
            residual,
        })
    }
}

/// Dense Cholesky factorisation through nalgebra. Memory is O(n²), so this
/// is meant for small holes and for cross-checking the iterative backend.
#[derive(Clone, Copy, Debug, Default)]
pub struct DenseCholeskySolver;

impl SparseLinearSolver for DenseCholeskySolver {
    fn solve(&self, matrix: &CsrMatrix, rhs: &DVector<f64>) -> Result<Solution, SolverError> {
        check_shape(matrix, rhs)?;
        let dense = matrix.to_dense();
        let scale = dense.diagonal().amax();
        let chol = dense.cholesky().ok_or(SolverError::Singular)?;
        // A zero pivot still factorises; reject it before dividing by it.
        if chol.l_dirty().diagonal().iter().any(|&d| d <= 1e-12 * scale.sqrt()) {
            return Err(SolverError::Singular);
        }
        let x = chol.solve(rhs);
        if x.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::Singular);
        }
        let residual = relative_residual(matrix, rhs, &x);
        debug!("cholesky: {} unknowns, residual {residual:.3e}", matrix.dim());
        Ok(Solution {
            x,
            iterations: 1,
            residual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn laplacian_1d(n: usize) -> CsrMatrix {
        CsrMatrix::from_rows(
            (0..n)
                .map(|i| {
                    let mut row = vec![(i, 2.0)];
                    if i > 0 {
                        row.push((i - 1, -1.0));
                    }
                    if i + 1 < n {
                        row.push((i + 1, -1.0));
                    }
                    row
                })
                .collect(),
        )
    }

    #[test]
    fn backends_agree_on_spd_system() {
        let a = laplacian_1d(20);
        let b = DVector::from_fn(20, |i, _| (i as f64 * 0.3).sin());
        let cg = ConjugateGradientSolver::default().solve(&a, &b).unwrap();
        let chol = DenseCholeskySolver.solve(&a, &b).unwrap();
        assert!(cg.residual <= 1e-6);
        assert!((cg.x - chol.x).amax() < 1e-4);
    }

    #[test]
    fn zero_rhs_gives_zero_solution() {
        let a = laplacian_1d(4);
        let sol = ConjugateGradientSolver::default()
            .solve(&a, &DVector::zeros(4))
            .unwrap();
        assert_eq!(sol.iterations, 0);
        assert_eq!(sol.x, DVector::zeros(4));
    }

    #[test]
    fn singular_matrix_is_reported() {
        // Pure Neumann Laplacian: constant vectors are in the kernel.
        let a = CsrMatrix::from_rows(vec![vec![(0, 1.0), (1, -1.0)], vec![(0, -1.0), (1, 1.0)]]);
        let b = DVector::from_vec(vec![1.0, 1.0]);
        assert_eq!(DenseCholeskySolver.solve(&a, &b).unwrap_err(), SolverError::Singular);
    }

    #[test]
    fn iteration_cap_is_enforced() {
        let a = laplacian_1d(50);
        let b = DVector::from_element(50, 1.0);
        let solver = ConjugateGradientSolver::new(SolverOptions {
            tolerance: 1e-12,
            max_iterations: 2,
        });
        assert!(matches!(
            solver.solve(&a, &b),
            Err(SolverError::NotConverged { iterations: 2, .. })
        ));
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let a = laplacian_1d(3);
        assert!(matches!(
            DenseCholeskySolver.solve(&a, &DVector::zeros(2)),
            Err(SolverError::Shape { dim: 3, rhs: 2 })
        ));
    }
}
