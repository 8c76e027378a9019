//! Gradient-domain depth reconstruction.
//!
//! [`reconstruct_depth`] keeps every known depth sample bit for bit and
//! solves a discrete Poisson problem for the hole cells so their finite
//! differences match a filled gradient field in the least-squares sense.
//! Assembly lives in [`system`]; the linear solve is delegated to a
//! [`SparseLinearSolver`] backend.

pub mod options;
pub mod solver;
pub mod system;

pub use options::SolverOptions;
pub use solver::{
    ConjugateGradientSolver, DenseCholeskySolver, Solution, SolverError, SparseLinearSolver,
};
pub use system::CsrMatrix;

use crate::error::Result;
use crate::gradient::GRADIENT_CHANNELS;
use crate::image::{ImageView, Raster, ValidityMask};
use log::debug;

/// Reconstructed depth plus solve statistics.
#[derive(Clone, Debug)]
pub struct Reconstruction {
    pub depth: Raster,
    pub unknowns: usize,
    pub iterations: usize,
    pub residual: f64,
}

/// Rebuild depth over the whole grid.
///
/// - `original`: 1-channel depth, trusted where `mask` is valid.
/// - `filled_gradient`: 2-channel (∂x, ∂y) field laid out per
///   [`crate::gradient::convention`], defined everywhere.
///
/// Valid cells of the result equal `original` exactly. Errors with
/// [`SolverError::Unanchored`] when a hole component has no known
/// neighbour, since its depth offset is then undetermined.
pub fn reconstruct_depth(
    original: &Raster,
    mask: &ValidityMask,
    filled_gradient: &Raster,
    solver: &dyn SparseLinearSolver,
) -> Result<Reconstruction> {
    original.ensure_channels(1)?;
    filled_gradient.ensure_channels(GRADIENT_CHANNELS)?;
    let region = mask.region();
    original.ensure_region(region)?;
    filled_gradient.ensure_region(region)?;

    let mut depth = original.clone();
    if !mask.has_holes() {
        return Ok(Reconstruction {
            depth,
            unknowns: 0,
            iterations: 0,
            residual: 0.0,
        });
    }

    system::check_anchored(mask)?;
    let system = system::assemble(original, mask, filled_gradient);
    debug!(
        "poisson: {} unknowns, {} non-zeros",
        system.cells.len(),
        system.matrix.nnz()
    );
    let solution = solver.solve(&system.matrix, &system.rhs)?;
    for (&(x, y), &v) in system.cells.iter().zip(solution.x.iter()) {
        depth.set(x, y, 0, v as f32);
    }

    Ok(Reconstruction {
        depth,
        unknowns: system.cells.len(),
        iterations: solution.iterations,
        residual: solution.residual,
    })
}
