use serde::Deserialize;

/// Stopping rule for iterative solvers.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    /// Target relative residual `‖b − A x‖ / ‖b‖`.
    pub tolerance: f64,
    /// Iteration cap; 0 selects `10 · unknowns`.
    pub max_iterations: usize,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 0,
        }
    }
}

impl SolverOptions {
    pub fn iteration_cap(&self, unknowns: usize) -> usize {
        if self.max_iterations == 0 {
            (10 * unknowns).max(1)
        } else {
            self.max_iterations
        }
    }
}
