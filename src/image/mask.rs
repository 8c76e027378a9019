//! Binary validity mask: `true` marks a usable sample, `false` a hole.
//!
//! The hole region is never materialised as its own structure; it is
//! derived on demand from the mask (counts, bounding box, boundary ring).
use super::raster::Raster;
use super::traits::{ImageView, ImageViewMut, Region};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidityMask {
    pub w: usize,
    pub h: usize,
    pub data: Vec<bool>,
}

/// Inclusive bounding box of the hole cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoleBounds {
    pub x_min: usize,
    pub y_min: usize,
    pub x_max: usize,
    pub y_max: usize,
}

impl ValidityMask {
    /// Mask with every cell valid.
    pub fn all_valid(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![true; w * h],
        }
    }

    pub fn from_fn<F>(w: usize, h: usize, mut valid: F) -> Self
    where
        F: FnMut(usize, usize) -> bool,
    {
        let mut data = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                data.push(valid(x, y));
            }
        }
        Self { w, h, data }
    }

    /// Treat cells of a labelled single-channel raster equal to `hole_value`
    /// as holes and everything else as valid.
    pub fn from_raster(labels: &Raster, hole_value: f32) -> Self {
        Self::from_fn(labels.w, labels.h, |x, y| labels.get(x, y, 0) != hole_value)
    }

    /// 1.0 for valid cells, 0.0 for holes.
    pub fn to_raster(&self) -> Raster {
        let data = self
            .data
            .iter()
            .map(|&v| if v { 1.0 } else { 0.0 })
            .collect();
        Raster {
            w: self.w,
            h: self.h,
            channels: 1,
            data,
        }
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.w + x
    }

    #[inline]
    pub fn is_valid(&self, x: usize, y: usize) -> bool {
        self.data[self.idx(x, y)]
    }

    #[inline]
    pub fn is_hole(&self, x: usize, y: usize) -> bool {
        !self.is_valid(x, y)
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, valid: bool) {
        let i = self.idx(x, y);
        self.data[i] = valid;
    }

    pub fn hole_count(&self) -> usize {
        self.data.iter().filter(|&&v| !v).count()
    }

    pub fn valid_count(&self) -> usize {
        self.data.len() - self.hole_count()
    }

    pub fn has_holes(&self) -> bool {
        self.data.iter().any(|&v| !v)
    }

    /// Coordinates of every hole cell in row-major order.
    pub fn hole_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.data
            .iter()
            .enumerate()
            .filter(|(_, &v)| !v)
            .map(move |(i, _)| (i % self.w, i / self.w))
    }

    pub fn hole_bounds(&self) -> Option<HoleBounds> {
        let mut bounds: Option<HoleBounds> = None;
        for (x, y) in self.hole_cells() {
            let b = bounds.get_or_insert(HoleBounds {
                x_min: x,
                y_min: y,
                x_max: x,
                y_max: y,
            });
            b.x_min = b.x_min.min(x);
            b.y_min = b.y_min.min(y);
            b.x_max = b.x_max.max(x);
            b.y_max = b.y_max.max(y);
        }
        bounds
    }

    /// Valid cells with at least one 4-connected hole neighbour.
    pub fn boundary_cells(&self) -> Vec<(usize, usize)> {
        let region = self.region();
        let mut out = Vec::new();
        for y in 0..self.h {
            for x in 0..self.w {
                if self.is_valid(x, y)
                    && region
                        .neighbors4(x, y)
                        .any(|(nx, ny)| self.is_hole(nx, ny))
                {
                    out.push((x, y));
                }
            }
        }
        out
    }
}

impl ImageView for ValidityMask {
    type Pixel = bool;

    #[inline]
    fn width(&self) -> usize {
        self.w
    }
    #[inline]
    fn height(&self) -> usize {
        self.h
    }
    #[inline]
    fn row(&self, y: usize) -> &[bool] {
        let start = y * self.w;
        &self.data[start..start + self.w]
    }
}

impl ImageViewMut for ValidityMask {
    #[inline]
    fn row_mut(&mut self, y: usize) -> &mut [bool] {
        let start = y * self.w;
        &mut self.data[start..start + self.w]
    }
}

/// Convenience used by tests and fixtures: a centred rectangular hole.
pub fn rectangular_hole(region: Region, x0: usize, y0: usize, w: usize, h: usize) -> ValidityMask {
    ValidityMask::from_fn(region.width, region.height, |x, y| {
        !(x >= x0 && x < x0 + w && y >= y0 && y < y0 + h)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_value_marks_holes() {
        let mut labels = Raster::filled(3, 3, 1, 1.0);
        labels.set(1, 1, 0, 0.0);
        labels.set(2, 0, 0, 0.0);
        let mask = ValidityMask::from_raster(&labels, 0.0);
        assert_eq!(mask.hole_count(), 2);
        assert!(mask.is_hole(1, 1));
        assert!(mask.is_hole(2, 0));
        assert!(mask.is_valid(0, 0));
    }

    #[test]
    fn hole_bounds_and_boundary_ring() {
        let mask = rectangular_hole(Region::new(10, 10), 3, 4, 4, 2);
        assert_eq!(
            mask.hole_bounds(),
            Some(HoleBounds {
                x_min: 3,
                y_min: 4,
                x_max: 6,
                y_max: 5
            })
        );
        // 4 above, 4 below, 2 left, 2 right
        assert_eq!(mask.boundary_cells().len(), 12);
        assert_eq!(mask.hole_count(), 8);
        assert_eq!(mask.valid_count(), 92);
    }

    #[test]
    fn region_comparison_requires_exact_size() {
        let a = ValidityMask::all_valid(4, 5);
        let b = ValidityMask::all_valid(5, 4);
        let c = Raster::new(4, 5, 3);
        assert!(!a.same_region(&b));
        assert!(a.same_region(&c));
    }

    #[test]
    fn full_mask_has_no_bounds() {
        let mask = ValidityMask::all_valid(3, 3);
        assert!(mask.hole_bounds().is_none());
        assert!(!mask.has_holes());
        assert!(mask.boundary_cells().is_empty());
    }
}
