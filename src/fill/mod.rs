//! Hole-filling collaborators used by the pipelines.
//!
//! Both stages are trait seams so alternate heuristics can be plugged into
//! the drivers without touching pipeline logic:
//!
//! - [`MultiChannelFiller`]: fills a large structured hole in a
//!   multi-channel raster; default [`PatchTextureFiller`].
//! - [`SmallHoleFiller`]: patches small or sparse gaps in an RGBD raster;
//!   default [`KernelSmallHoleFiller`].
//!
//! Contract shared by both: the output has the input's dimensions and
//! channel count, every cell is defined, and cells valid in the mask keep
//! their input value. A filler that cannot progress returns
//! [`Error::FillIncomplete`](crate::Error::FillIncomplete).

pub mod options;
pub mod small_holes;
pub mod texture;

pub use options::{SmallHoleOptions, TextureFillOptions};
pub use small_holes::KernelSmallHoleFiller;
pub use texture::PatchTextureFiller;

use crate::error::Result;
use crate::image::{Raster, ValidityMask};

pub trait MultiChannelFiller {
    fn fill(
        &self,
        image: &Raster,
        hole_mask: &ValidityMask,
        options: &TextureFillOptions,
    ) -> Result<Raster>;
}

pub trait SmallHoleFiller {
    fn fill(&self, image: &Raster, mask: &ValidityMask, options: &SmallHoleOptions) -> Result<Raster>;
}
