#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod cloud;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod image;
pub mod pipeline;

// Algorithm stages – public so tools and tests can run them one by one.
pub mod compose;
pub mod fill;
pub mod gradient;
pub mod poisson;

// --- High-level re-exports -------------------------------------------------

// Main entry points: pipeline + results.
pub use crate::config::PipelineParams;
pub use crate::error::{Error, Result};
pub use crate::pipeline::{HoleFillingPipeline, PipelineOutput};

// Data model.
pub use crate::cloud::{GridCloud, Point};
pub use crate::image::{Raster, Region, ValidityMask};

// Reports returned by both drivers.
pub use crate::diagnostics::{RunReport, TimingBreakdown};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use rgbd_hole_filling::prelude::*;
/// use std::path::Path;
///
/// # fn main() -> rgbd_hole_filling::Result<()> {
/// let cloud = read_ptx(Path::new("scan.ptx"))?;
/// let mask = load_mask(Path::new("hole.mask"))?;
///
/// let out = HoleFillingPipeline::new(PipelineParams::default()).run_full(&cloud, &mask)?;
/// write_vtp(&out.cloud, Path::new("filled.vtp"))?;
/// println!("filled={} in {:.1} ms", out.report.hole_cells, out.report.timings.total_ms);
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::cloud::ptx::{read_ptx, write_ptx};
    pub use crate::cloud::vtp::write_vtp;
    pub use crate::image::io::load_mask;
    pub use crate::{GridCloud, HoleFillingPipeline, PipelineParams, Raster, ValidityMask};
}

// --- Stage-level API (for tools & advanced users) --------------------------

pub mod stages {
    pub use crate::compose::{extract, stack, DEPTH_GRADIENT_CHANNELS, RGB_CHANNELS};
    pub use crate::fill::{
        KernelSmallHoleFiller, MultiChannelFiller, PatchTextureFiller, SmallHoleFiller,
    };
    pub use crate::gradient::masked_gradient;
    pub use crate::pipeline::{DiagnosticSink, FileSink, MemorySink, NullSink};
    pub use crate::poisson::{
        reconstruct_depth, ConjugateGradientSolver, DenseCholeskySolver, SparseLinearSolver,
    };
}
