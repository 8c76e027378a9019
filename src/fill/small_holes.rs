//! Kernel-weighted pre-fill for small and sparse gaps.
//!
//! Each pass assigns every hole cell that has at least one known cell in
//! its `(2k+1)²` window the Gaussian-weighted mean of those known cells.
//! Updates of a pass are applied together, so the result does not depend
//! on scan order. Passes repeat until no hole remains; the front advances
//! by at least one cell per pass as long as one known cell exists.
//!
//! With `downsample_factor > 1` the passes run on a block-averaged coarse
//! grid instead and each hole cell takes the value of its coarse block.
use super::options::SmallHoleOptions;
use super::SmallHoleFiller;
use crate::error::{Error, Result};
use crate::image::{ImageView, Raster, ValidityMask};
use log::debug;

#[derive(Clone, Copy, Debug, Default)]
pub struct KernelSmallHoleFiller;

impl SmallHoleFiller for KernelSmallHoleFiller {
    fn fill(&self, image: &Raster, mask: &ValidityMask, options: &SmallHoleOptions) -> Result<Raster> {
        image.ensure_region(mask.region())?;
        if options.downsample_factor == 0 {
            return Err(Error::Config("downsample_factor must be at least 1".to_string()));
        }
        if options.kernel_radius == 0 {
            return Err(Error::Config("kernel_radius must be at least 1".to_string()));
        }
        let holes = mask.hole_count();
        if holes == 0 {
            return Ok(image.clone());
        }
        if mask.valid_count() == 0 {
            return Err(Error::FillIncomplete { remaining: holes });
        }
        let radius = options.kernel_radius;

        if options.downsample_factor == 1 {
            let (filled, passes) = fill_level(image, mask, radius);
            debug!("small-hole fill: {holes} cells in {passes} passes, radius {radius}");
            return Ok(filled);
        }

        let f = options.downsample_factor;
        let (coarse, coarse_mask) = block_average(image, mask, f);
        let (coarse, passes) = fill_level(&coarse, &coarse_mask, radius);
        let mut out = image.clone();
        for (x, y) in mask.hole_cells() {
            out.pixel_mut(x, y).copy_from_slice(coarse.pixel(x / f, y / f));
        }
        debug!(
            "small-hole fill: {holes} cells via {}x{} coarse grid (factor {f}) in {passes} passes",
            coarse.w, coarse.h
        );
        Ok(out)
    }
}

/// Fill every hole of `mask`; returns the filled raster and the pass count.
/// The mask must contain at least one valid cell.
fn fill_level(image: &Raster, mask: &ValidityMask, radius: usize) -> (Raster, usize) {
    let mut out = image.clone();
    let mut known = mask.clone();
    let mut remaining: Vec<(usize, usize)> = mask.hole_cells().collect();
    let weights = gaussian_window(radius);
    let r = radius as isize;
    let region = mask.region();
    let c = image.channels;
    let mut passes = 0;

    while !remaining.is_empty() {
        let mut updates: Vec<((usize, usize), Vec<f32>)> = Vec::new();
        for &(x, y) in &remaining {
            let mut acc = vec![0.0f32; c];
            let mut total = 0.0f32;
            for dy in -r..=r {
                for dx in -r..=r {
                    let (nx, ny) = (x as isize + dx, y as isize + dy);
                    if !region.contains(nx, ny) || known.is_hole(nx as usize, ny as usize) {
                        continue;
                    }
                    let wgt = weights[((dy + r) * (2 * r + 1) + dx + r) as usize];
                    for (a, v) in acc.iter_mut().zip(out.pixel(nx as usize, ny as usize)) {
                        *a += wgt * v;
                    }
                    total += wgt;
                }
            }
            if total > 0.0 {
                acc.iter_mut().for_each(|a| *a /= total);
                updates.push(((x, y), acc));
            }
        }
        if updates.is_empty() {
            break;
        }
        for ((x, y), value) in updates {
            out.pixel_mut(x, y).copy_from_slice(&value);
            known.set(x, y, true);
        }
        remaining.retain(|&(x, y)| known.is_hole(x, y));
        passes += 1;
    }
    (out, passes)
}

fn gaussian_window(radius: usize) -> Vec<f32> {
    let r = radius as isize;
    let sigma = radius as f32;
    let denom = 2.0 * sigma * sigma;
    (-r..=r)
        .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
        .map(|(dx, dy)| (-((dx * dx + dy * dy) as f32) / denom).exp())
        .collect()
}

/// Mean of the valid cells of each `f×f` block; a block is valid when any
/// of its cells is.
fn block_average(image: &Raster, mask: &ValidityMask, f: usize) -> (Raster, ValidityMask) {
    let (cw, ch) = (image.w.div_ceil(f), image.h.div_ceil(f));
    let c = image.channels;
    let mut sums = Raster::new(cw, ch, c);
    let mut counts = vec![0usize; cw * ch];
    for y in 0..image.h {
        for x in 0..image.w {
            if mask.is_hole(x, y) {
                continue;
            }
            let (bx, by) = (x / f, y / f);
            counts[by * cw + bx] += 1;
            for (s, v) in sums.pixel_mut(bx, by).iter_mut().zip(image.pixel(x, y)) {
                *s += v;
            }
        }
    }
    let coarse_mask = ValidityMask::from_fn(cw, ch, |x, y| counts[y * cw + x] > 0);
    for (i, px) in sums.data.chunks_exact_mut(c.max(1)).enumerate() {
        if counts[i] > 0 {
            px.iter_mut().for_each(|s| *s /= counts[i] as f32);
        }
    }
    (sums, coarse_mask)
}
