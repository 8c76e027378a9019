//! Masked depth gradients.
//!
//! - Forward differences per [`convention`](super::convention) wherever both
//!   samples are valid.
//! - At cells whose forward neighbour is a hole (or off the grid) the
//!   estimate falls back to the backward difference, so a ramp running into
//!   a hole keeps its slope right up to the hole boundary.
//! - Cells with no valid pair along an axis, including every hole cell, get
//!   0 for that axis. Hole cells are overwritten by the texture fill anyway.
//!
//! Complexity: O(W·H).
use super::convention::{backward, forward, Axis, GRADIENT_CHANNELS};
use crate::error::Result;
use crate::image::{ImageView, Raster, ValidityMask};
use log::debug;

/// Compute the 2-channel (∂x, ∂y) gradient of a scalar raster, never
/// differencing against a hole sample.
pub fn masked_gradient(scalar: &Raster, mask: &ValidityMask) -> Result<Raster> {
    scalar.ensure_channels(1)?;
    scalar.ensure_region(mask.region())?;
    let (w, h) = (scalar.w, scalar.h);
    let mut out = Raster::new(w, h, GRADIENT_CHANNELS);
    let mut fallbacks = 0usize;

    for y in 0..h {
        for x in 0..w {
            if mask.is_hole(x, y) {
                continue;
            }
            let here = scalar.get(x, y, 0);
            for axis in Axis::ALL {
                let ahead = forward(w, h, x, y, axis).filter(|&(nx, ny)| mask.is_valid(nx, ny));
                let behind = backward(x, y, axis).filter(|&(nx, ny)| mask.is_valid(nx, ny));
                let diff = match (ahead, behind) {
                    (Some((nx, ny)), _) => scalar.get(nx, ny, 0) - here,
                    (None, Some((bx, by))) => {
                        fallbacks += 1;
                        here - scalar.get(bx, by, 0)
                    }
                    (None, None) => 0.0,
                };
                out.set(x, y, axis.channel(), diff);
            }
        }
    }

    debug!("masked_gradient: {w}x{h}, {fallbacks} one-sided estimates");
    Ok(out)
}
