//! Exemplar-based multi-channel texture fill.
//!
//! Onion-peel filling driven by patch confidence:
//!
//! 1. Source patches are all `(2r+1)²` windows that lie inside the raster
//!    and contain no hole cell.
//! 2. Each step picks the hole cell on the fill front (a hole cell with a
//!    known 8-neighbour) whose patch has the most known cells.
//! 3. Sources are ranked by SSD over the target's known cells, all
//!    channels; the `knn_candidates` best are kept.
//! 4. Among those, the source whose per-channel spread is closest to the
//!    target's known cells wins, so flat patches are not pasted into
//!    textured regions just because their mean matches.
//! 5. The winner's samples are copied into the target's unknown cells.
//!
//! Known cells are never written. The SSD scan over sources runs on rayon.
use super::options::TextureFillOptions;
use super::MultiChannelFiller;
use crate::error::{Error, Result};
use crate::image::{ImageView, Raster, ValidityMask};
use log::debug;
use rayon::prelude::*;

#[derive(Clone, Copy, Debug, Default)]
pub struct PatchTextureFiller;

impl MultiChannelFiller for PatchTextureFiller {
    fn fill(
        &self,
        image: &Raster,
        hole_mask: &ValidityMask,
        options: &TextureFillOptions,
    ) -> Result<Raster> {
        image.ensure_region(hole_mask.region())?;
        let side = options.patch_size().ok_or_else(|| {
            Error::Config(format!(
                "patch half width {} is too large",
                options.patch_half_width
            ))
        })?;
        let mut state = FillState {
            image: image.clone(),
            known: hole_mask.clone(),
            radius: (side / 2) as isize,
        };
        let mut remaining: Vec<(usize, usize)> = hole_mask.hole_cells().collect();
        if remaining.is_empty() {
            return Ok(state.image);
        }

        let sources = source_patches(hole_mask, side);
        if sources.is_empty() {
            return Err(Error::FillIncomplete {
                remaining: remaining.len(),
            });
        }
        debug!(
            "texture fill: {} hole cells, {} source patches, patch {side}x{side}, k={}",
            remaining.len(),
            sources.len(),
            options.knn_candidates
        );

        let k = options.knn_candidates.max(1);
        let mut steps = 0usize;
        while !remaining.is_empty() {
            let target = state.pick_target(&remaining).ok_or(Error::FillIncomplete {
                remaining: remaining.len(),
            })?;
            let source = state.best_source(target, &sources, k);
            state.copy_patch(source, target);
            remaining.retain(|&(x, y)| state.known.is_hole(x, y));
            steps += 1;
        }
        debug!("texture fill: done in {steps} patch copies");
        Ok(state.image)
    }
}

/// Centres of hole-free `side × side` patches fully inside the raster.
fn source_patches(mask: &ValidityMask, side: usize) -> Vec<(usize, usize)> {
    let (w, h) = (mask.w, mask.h);
    let half_width = side / 2;
    if w < side || h < side {
        return Vec::new();
    }
    // Summed-area table of hole cells.
    let mut sat = vec![0u32; (w + 1) * (h + 1)];
    for y in 0..h {
        for x in 0..w {
            let hole = u32::from(mask.is_hole(x, y));
            sat[(y + 1) * (w + 1) + x + 1] =
                hole + sat[y * (w + 1) + x + 1] + sat[(y + 1) * (w + 1) + x] - sat[y * (w + 1) + x];
        }
    }
    let holes_in = |x0: usize, y0: usize| {
        let (x1, y1) = (x0 + side, y0 + side);
        sat[y1 * (w + 1) + x1] + sat[y0 * (w + 1) + x0]
            - sat[y0 * (w + 1) + x1]
            - sat[y1 * (w + 1) + x0]
    };
    let mut out = Vec::new();
    for y0 in 0..=h - side {
        for x0 in 0..=w - side {
            if holes_in(x0, y0) == 0 {
                out.push((x0 + half_width, y0 + half_width));
            }
        }
    }
    out
}

struct FillState {
    image: Raster,
    known: ValidityMask,
    radius: isize,
}

impl FillState {
    fn offsets(&self) -> impl Iterator<Item = (isize, isize)> {
        let r = self.radius;
        (-r..=r).flat_map(move |dy| (-r..=r).map(move |dx| (dx, dy)))
    }

    fn cell(&self, (x, y): (usize, usize), (dx, dy): (isize, isize)) -> Option<(usize, usize)> {
        let (nx, ny) = (x as isize + dx, y as isize + dy);
        self.known
            .region()
            .contains(nx, ny)
            .then_some((nx as usize, ny as usize))
    }

    fn on_front(&self, (x, y): (usize, usize)) -> bool {
        (-1..=1)
            .flat_map(|dy| (-1..=1).map(move |dx| (dx, dy)))
            .filter(|&d| d != (0, 0))
            .filter_map(|d| self.cell((x, y), d))
            .any(|(nx, ny)| self.known.is_valid(nx, ny))
    }

    fn confidence(&self, target: (usize, usize)) -> usize {
        self.offsets()
            .filter_map(|d| self.cell(target, d))
            .filter(|&(x, y)| self.known.is_valid(x, y))
            .count()
    }

    fn pick_target(&self, remaining: &[(usize, usize)]) -> Option<(usize, usize)> {
        let mut best: Option<((usize, usize), usize)> = None;
        for &cell in remaining {
            if !self.on_front(cell) {
                continue;
            }
            let c = self.confidence(cell);
            if best.map_or(true, |(_, bc)| c > bc) {
                best = Some((cell, c));
            }
        }
        best.map(|(cell, _)| cell)
    }

    /// SSD over the target's known cells against each source; `None`
    /// offsets (outside the raster) are skipped.
    fn ssd(&self, target: (usize, usize), source: (usize, usize)) -> f32 {
        let mut sum = 0.0f32;
        for d in self.offsets() {
            let Some(t) = self.cell(target, d) else {
                continue;
            };
            if self.known.is_hole(t.0, t.1) {
                continue;
            }
            let s = (
                (source.0 as isize + d.0) as usize,
                (source.1 as isize + d.1) as usize,
            );
            for (a, b) in self.image.pixel(t.0, t.1).iter().zip(self.image.pixel(s.0, s.1)) {
                let diff = a - b;
                sum += diff * diff;
            }
        }
        sum
    }

    /// Mean per-channel standard deviation over a set of cells.
    fn spread(&self, cells: impl Iterator<Item = (usize, usize)>) -> f32 {
        let c = self.image.channels;
        let mut sum = vec![0.0f64; c];
        let mut sum_sq = vec![0.0f64; c];
        let mut n = 0usize;
        for (x, y) in cells {
            for (i, &v) in self.image.pixel(x, y).iter().enumerate() {
                sum[i] += v as f64;
                sum_sq[i] += (v as f64) * (v as f64);
            }
            n += 1;
        }
        if n == 0 || c == 0 {
            return 0.0;
        }
        let n = n as f64;
        let total: f64 = sum
            .iter()
            .zip(&sum_sq)
            .map(|(s, sq)| (sq / n - (s / n).powi(2)).max(0.0).sqrt())
            .sum();
        (total / c as f64) as f32
    }

    fn best_source(&self, target: (usize, usize), sources: &[(usize, usize)], k: usize) -> (usize, usize) {
        let mut ranked: Vec<(f32, usize)> = sources
            .par_iter()
            .enumerate()
            .map(|(i, &s)| (self.ssd(target, s), i))
            .collect();
        let k = k.min(ranked.len());
        if k < ranked.len() {
            ranked.select_nth_unstable_by(k - 1, |a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            ranked.truncate(k);
        }
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let target_known: Vec<(usize, usize)> = self
            .offsets()
            .filter_map(|d| self.cell(target, d))
            .filter(|&(x, y)| self.known.is_valid(x, y))
            .collect();
        let target_spread = self.spread(target_known.into_iter());

        let mut best = ranked[0];
        let mut best_gap = f32::INFINITY;
        for &(score, i) in &ranked {
            let s = sources[i];
            let gap = (self
                .spread(self.offsets().filter_map(|d| self.cell(s, d)))
                - target_spread)
                .abs();
            if gap < best_gap {
                best_gap = gap;
                best = (score, i);
            }
        }
        sources[best.1]
    }

    fn copy_patch(&mut self, source: (usize, usize), target: (usize, usize)) {
        let offsets: Vec<_> = self.offsets().collect();
        for d in offsets {
            let Some(t) = self.cell(target, d) else {
                continue;
            };
            if self.known.is_valid(t.0, t.1) {
                continue;
            }
            let s = (
                (source.0 as isize + d.0) as usize,
                (source.1 as isize + d.1) as usize,
            );
            let src: Vec<f32> = self.image.pixel(s.0, s.1).to_vec();
            self.image.pixel_mut(t.0, t.1).copy_from_slice(&src);
            self.known.set(t.0, t.1, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::mask::rectangular_hole;
    use crate::image::Region;

    #[test]
    fn constant_image_is_filled_with_the_constant() {
        let mut image = Raster::from_fn(10, 10, 5, |_, _| vec![40.0, 80.0, 120.0, 0.0, 0.0]);
        let mask = rectangular_hole(Region::new(10, 10), 3, 3, 4, 4);
        for (x, y) in mask.hole_cells().collect::<Vec<_>>() {
            image.pixel_mut(x, y).copy_from_slice(&[-1.0; 5]);
        }
        let filled = PatchTextureFiller
            .fill(&image, &mask, &TextureFillOptions::new(1))
            .unwrap();
        for y in 0..10 {
            for x in 0..10 {
                assert_eq!(filled.pixel(x, y), &[40.0, 80.0, 120.0, 0.0, 0.0]);
            }
        }
    }

    #[test]
    fn known_cells_are_never_modified() {
        let image = Raster::from_fn(12, 9, 3, |x, y| {
            vec![(x % 3) as f32 * 50.0, (y % 2) as f32 * 90.0, (x + y) as f32]
        });
        let mask = rectangular_hole(Region::new(12, 9), 5, 3, 3, 3);
        let filled = PatchTextureFiller
            .fill(&image, &mask, &TextureFillOptions::new(1).with_knn_candidates(5))
            .unwrap();
        for y in 0..9 {
            for x in 0..12 {
                if mask.is_valid(x, y) {
                    assert_eq!(filled.pixel(x, y), image.pixel(x, y));
                }
            }
        }
    }

    #[test]
    fn periodic_texture_is_continued_into_the_hole() {
        // Vertical stripes with period 2: every source patch agrees on the
        // stripe phase, so the fill must reproduce it exactly.
        let image = Raster::from_fn(11, 11, 1, |x, _| vec![if x % 2 == 0 { 0.0 } else { 100.0 }]);
        let mask = rectangular_hole(Region::new(11, 11), 4, 4, 3, 3);
        let filled = PatchTextureFiller
            .fill(&image, &mask, &TextureFillOptions::new(1))
            .unwrap();
        assert_eq!(filled, image);
    }

    #[test]
    fn no_source_patch_is_fill_incomplete() {
        let image = Raster::new(4, 4, 3);
        let mask = rectangular_hole(Region::new(4, 4), 1, 1, 2, 2);
        let err = PatchTextureFiller
            .fill(&image, &mask, &TextureFillOptions::new(2))
            .unwrap_err();
        assert!(matches!(err, Error::FillIncomplete { remaining: 4 }));
    }

    #[test]
    fn oversized_half_width_is_an_error_not_a_panic() {
        let image = Raster::new(6, 6, 5);
        let mask = rectangular_hole(Region::new(6, 6), 2, 2, 2, 2);
        let err = PatchTextureFiller
            .fill(&image, &mask, &TextureFillOptions::new(usize::MAX))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        // Representable but larger than the grid: nothing to copy from.
        let err = PatchTextureFiller
            .fill(&image, &mask, &TextureFillOptions::new(1 << 20))
            .unwrap_err();
        assert!(matches!(err, Error::FillIncomplete { remaining: 4 }));
    }

    #[test]
    fn source_patches_exclude_windows_touching_holes() {
        let mask = rectangular_hole(Region::new(5, 5), 2, 2, 1, 1);
        let sources = source_patches(&mask, 3);
        // Any 3x3 window inside 5x5 contains the centre cell.
        assert!(sources.is_empty());
        let mask = rectangular_hole(Region::new(6, 6), 0, 0, 1, 1);
        let sources = source_patches(&mask, 3);
        assert_eq!(sources.len(), 15);
        assert!(!sources.contains(&(1, 1)));
    }
}
