//! End-to-end hole filling for organised RGB-D clouds.
//!
//! Two drivers share one [`HoleFillingPipeline`]:
//!
//! - [`HoleFillingPipeline::run_full`]: masked depth gradient, RGB +
//!   gradient composite, texture fill, Poisson depth reconstruction.
//! - [`HoleFillingPipeline::run_reconstruction`]: skips the texture fill and
//!   reads a precomputed filled RGBDxDy raster instead. Sensor-invalid
//!   cells are pre-filled first, and every intermediate result is handed
//!   to a [`DiagnosticSink`].
//!
//! Stages run strictly in sequence. Every precondition (mask and raster
//! regions, channel counts) is checked before the first stage runs, and
//! the input cloud is never mutated: the drivers work on copies and return
//! the filled cloud with a [`RunReport`].

pub mod sink;

pub use sink::{
    names, Artifact, ArtifactKind, DiagnosticSink, FileSink, MemorySink, NullSink,
    RecordedArtifact,
};

use crate::cloud::GridCloud;
use crate::compose::{extract, stack, DEPTH_GRADIENT_CHANNELS, RGBDXDY_CHANNELS, RGB_CHANNELS};
use crate::config::PipelineParams;
use crate::diagnostics::timing::elapsed_ms;
use crate::diagnostics::{PipelineKind, RunReport, SolveStats, TimingBreakdown};
use crate::error::{Error, Result};
use crate::fill::{KernelSmallHoleFiller, MultiChannelFiller, PatchTextureFiller, SmallHoleFiller};
use crate::gradient::masked_gradient;
use crate::image::{ImageView, Raster, ValidityMask};
use crate::poisson::{reconstruct_depth, ConjugateGradientSolver, SparseLinearSolver};
use log::{debug, info};
use std::time::Instant;

/// Label value of hole cells in a cloud's validity raster.
const INVALID_LABEL: f32 = 0.0;

/// Output of either driver.
#[derive(Clone, Debug)]
pub struct PipelineOutput {
    pub cloud: GridCloud,
    pub report: RunReport,
}

/// Fail fast when the edit mask does not cover the cloud's grid exactly.
pub fn validate_regions(cloud: &GridCloud, mask: &ValidityMask) -> Result<()> {
    if !mask.same_region(&cloud.validity_raster()) {
        return Err(Error::RegionMismatch {
            cloud: cloud.region(),
            mask: mask.region(),
        });
    }
    Ok(())
}

/// Pipeline parameters plus the three pluggable collaborators.
pub struct HoleFillingPipeline {
    params: PipelineParams,
    texture_filler: Box<dyn MultiChannelFiller>,
    small_hole_filler: Box<dyn SmallHoleFiller>,
    solver: Box<dyn SparseLinearSolver>,
}

impl Default for HoleFillingPipeline {
    fn default() -> Self {
        Self::new(PipelineParams::default())
    }
}

impl HoleFillingPipeline {
    /// Default collaborators: patch texture fill, kernel small-hole fill and
    /// conjugate gradient with `params.solver`.
    pub fn new(params: PipelineParams) -> Self {
        Self {
            params,
            texture_filler: Box::new(PatchTextureFiller),
            small_hole_filler: Box::new(KernelSmallHoleFiller),
            solver: Box::new(ConjugateGradientSolver::new(params.solver)),
        }
    }

    pub fn with_texture_filler(mut self, filler: impl MultiChannelFiller + 'static) -> Self {
        self.texture_filler = Box::new(filler);
        self
    }

    pub fn with_small_hole_filler(mut self, filler: impl SmallHoleFiller + 'static) -> Self {
        self.small_hole_filler = Box::new(filler);
        self
    }

    pub fn with_solver(mut self, solver: impl SparseLinearSolver + 'static) -> Self {
        self.solver = Box::new(solver);
        self
    }

    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    /// Texture-fill the edit mask's holes in colour and depth gradient, then
    /// integrate the filled gradient back to depth.
    ///
    /// Cells the sensor never returned are pre-filled with the small-hole
    /// filler first, so sparse dropouts outside the edit mask neither feed
    /// garbage range into the gradient nor rule out source patches.
    pub fn run_full(&self, cloud: &GridCloud, mask: &ValidityMask) -> Result<PipelineOutput> {
        validate_regions(cloud, mask)?;
        let total = Instant::now();
        let mut timings = TimingBreakdown::default();
        info!(
            "full pipeline: {} grid, {} hole cells",
            cloud.region(),
            mask.hole_count()
        );

        let invalid = ValidityMask::from_raster(&cloud.validity_raster(), INVALID_LABEL);
        let prefilled = timings.time("smallHoleFill", || {
            self.small_hole_filler
                .fill(&cloud.rgbd_raster(), &invalid, &self.params.small_holes)
        })?;
        let mut valid_cloud = cloud.clone();
        valid_cloud.mark_all_valid();
        valid_cloud.replace_rgbd(&prefilled)?;
        debug!("full pipeline: pre-filled {} sensor dropouts", invalid.hole_count());

        let depth = valid_cloud.depth_raster();
        let gradient = timings.time("maskedGradient", || masked_gradient(&depth, mask))?;
        let rgb = valid_cloud.rgb_raster();
        let composite = stack(&[&rgb, &gradient])?;
        debug!("full pipeline: composite has {} channels", composite.channels);

        let filled = timings.time("textureFill", || {
            self.texture_filler
                .fill(&composite, mask, &self.params.texture)
        })?;
        let filled_gradient = extract(&filled, &DEPTH_GRADIENT_CHANNELS)?;
        let filled_rgb = extract(&filled, &RGB_CHANNELS)?;

        let rec = timings.time("reconstructDepth", || {
            reconstruct_depth(&depth, mask, &filled_gradient, self.solver.as_ref())
        })?;

        let output = timings.time("assemble", || {
            assemble(&valid_cloud, &rec.depth, &filled_rgb)
        })?;
        timings.total_ms = elapsed_ms(total);

        Ok(PipelineOutput {
            cloud: output,
            report: RunReport {
                pipeline: PipelineKind::Full,
                region: cloud.region(),
                hole_cells: mask.hole_count(),
                hole_bounds: mask.hole_bounds(),
                prefilled_cells: invalid.hole_count(),
                solve: SolveStats::from(&rec),
                timings,
            },
        })
    }

    /// Rebuild the cloud from an already filled RGBDxDy raster.
    ///
    /// Sensor-invalid cells are pre-filled with the small-hole filler, the
    /// cloud is rewritten from the result, and the edit mask's holes are
    /// then reconstructed from the filled gradient channels.
    pub fn run_reconstruction(
        &self,
        cloud: &GridCloud,
        mask: &ValidityMask,
        filled: &Raster,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<PipelineOutput> {
        validate_regions(cloud, mask)?;
        filled.ensure_channels(RGBDXDY_CHANNELS)?;
        filled.ensure_region(cloud.region())?;
        let total = Instant::now();
        let mut timings = TimingBreakdown::default();
        info!(
            "reconstruction pipeline: {} grid, {} hole cells",
            cloud.region(),
            mask.hole_count()
        );

        sink.emit(names::ORIGINAL, Artifact::Cloud(cloud))?;

        let invalid = ValidityMask::from_raster(&cloud.validity_raster(), INVALID_LABEL);
        let rgbd = cloud.rgbd_raster();
        sink.emit(names::RGBD, Artifact::Raster(&rgbd))?;

        let prefilled = timings.time("smallHoleFill", || {
            self.small_hole_filler
                .fill(&rgbd, &invalid, &self.params.small_holes)
        })?;
        sink.emit(names::VALID, Artifact::Raster(&prefilled))?;
        debug!("reconstruction pipeline: pre-filled {} cells", invalid.hole_count());

        let mut valid_cloud = cloud.clone();
        valid_cloud.mark_all_valid();
        valid_cloud.replace_rgbd(&prefilled)?;
        sink.emit(names::VALID, Artifact::Cloud(&valid_cloud))?;

        let filled_gradient = extract(filled, &DEPTH_GRADIENT_CHANNELS)?;
        sink.emit(
            names::INPAINTED_DEPTH_GRADIENTS,
            Artifact::Raster(&filled_gradient),
        )?;
        let filled_rgb = extract(filled, &RGB_CHANNELS)?;
        sink.emit(names::INPAINTED_RGB, Artifact::Rgb(&filled_rgb))?;

        let depth = valid_cloud.depth_raster();
        let rec = timings.time("reconstructDepth", || {
            reconstruct_depth(&depth, mask, &filled_gradient, self.solver.as_ref())
        })?;
        sink.emit(names::RECONSTRUCTED_DEPTH, Artifact::Raster(&rec.depth))?;

        let output = timings.time("assemble", || {
            assemble(&valid_cloud, &rec.depth, &filled_rgb)
        })?;
        timings.total_ms = elapsed_ms(total);

        Ok(PipelineOutput {
            cloud: output,
            report: RunReport {
                pipeline: PipelineKind::ReconstructionOnly,
                region: cloud.region(),
                hole_cells: mask.hole_count(),
                hole_bounds: mask.hole_bounds(),
                prefilled_cells: invalid.hole_count(),
                solve: SolveStats::from(&rec),
                timings,
            },
        })
    }
}

/// Copy `source`, mark every cell valid, then write depth and colour.
/// Marking first is required: replacement only touches valid cells.
fn assemble(source: &GridCloud, depth: &Raster, rgb: &Raster) -> Result<GridCloud> {
    let mut out = source.clone();
    out.mark_all_valid();
    out.replace_depth(depth)?;
    out.replace_rgb(rgb)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::Point;
    use crate::image::mask::rectangular_hole;
    use crate::image::Region;
    use nalgebra::Vector3;

    fn flat_cloud(w: usize, h: usize) -> GridCloud {
        GridCloud::from_fn(w, h, |x, y| Point {
            position: Vector3::new(5.0, 0.01 * x as f32, 0.01 * y as f32).normalize() * 5.0,
            intensity: 0.5,
            color: [90, 120, 150],
            valid: true,
        })
    }

    #[test]
    fn region_mismatch_is_reported_with_both_regions() {
        let cloud = flat_cloud(6, 4);
        let mask = ValidityMask::all_valid(4, 6);
        let err = HoleFillingPipeline::default()
            .run_full(&cloud, &mask)
            .unwrap_err();
        assert!(matches!(err, Error::RegionMismatch { .. }));
        assert_eq!(
            err.to_string(),
            "point cloud and mask must be the same size! cloud is [6, 4] and mask is [4, 6]"
        );
    }

    #[test]
    fn reconstruction_rejects_wrong_channel_count_before_emitting() {
        let cloud = flat_cloud(5, 5);
        let mask = rectangular_hole(Region::new(5, 5), 2, 2, 1, 1);
        let mut sink = MemorySink::default();
        let err = HoleFillingPipeline::default()
            .run_reconstruction(&cloud, &mask, &Raster::new(5, 5, 4), &mut sink)
            .unwrap_err();
        assert!(matches!(err, Error::ChannelCount { expected: 5, found: 4 }));
        assert!(sink.records.is_empty());
    }

    #[test]
    fn full_pipeline_leaves_input_untouched() {
        let cloud = flat_cloud(10, 8);
        let before = cloud.clone();
        let mask = rectangular_hole(Region::new(10, 8), 4, 3, 2, 2);
        let params = PipelineParams {
            texture: crate::fill::TextureFillOptions::new(1),
            ..Default::default()
        };
        let out = HoleFillingPipeline::new(params)
            .run_full(&cloud, &mask)
            .unwrap();
        assert_eq!(cloud.points(), before.points());
        assert_eq!(out.cloud.valid_count(), 80);
        assert_eq!(out.report.hole_cells, 4);
        assert_eq!(out.report.solve.unknowns, 4);
    }

    #[test]
    fn unanchored_hole_aborts_without_output() {
        let cloud = flat_cloud(4, 4);
        let mask = ValidityMask::from_fn(4, 4, |_, _| false);
        let filled = Raster::new(4, 4, RGBDXDY_CHANNELS);
        let err = HoleFillingPipeline::default()
            .run_reconstruction(&cloud, &mask, &filled, &mut NullSink)
            .unwrap_err();
        assert!(matches!(err, Error::Solver(_)));
    }
}
