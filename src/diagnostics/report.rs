use super::timing::TimingBreakdown;
use crate::image::{HoleBounds, Region};
use crate::poisson::Reconstruction;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PipelineKind {
    /// Texture fill followed by depth reconstruction.
    Full,
    /// Depth reconstruction from a precomputed filled RGBDxDy raster.
    ReconstructionOnly,
}

/// Statistics of the Poisson solve.
#[derive(Clone, Copy, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveStats {
    pub unknowns: usize,
    pub iterations: usize,
    pub residual: f64,
}

impl From<&Reconstruction> for SolveStats {
    fn from(r: &Reconstruction) -> Self {
        Self {
            unknowns: r.unknowns,
            iterations: r.iterations,
            residual: r.residual,
        }
    }
}

/// Summary of one pipeline run, written by the binaries with `--report`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub pipeline: PipelineKind,
    pub region: Region,
    /// Hole cells of the edit mask.
    pub hole_cells: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hole_bounds: Option<HoleBounds>,
    /// Sensor-invalid cells patched by the small-hole pre-fill.
    pub prefilled_cells: usize,
    pub solve: SolveStats,
    pub timings: TimingBreakdown,
}
