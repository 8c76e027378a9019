//! The one finite-difference convention shared by gradient estimation and
//! gradient-domain reconstruction.
//!
//! Gradient rasters have two channels. At cell `(x, y)`:
//!
//! - channel 0 holds `f(x + 1, y) - f(x, y)`
//! - channel 1 holds `f(x, y + 1) - f(x, y)`
//!
//! i.e. forward differences stored at the lower-index cell of each grid
//! edge. The reconstructor reads edge targets back through
//! [`edge_target`], so both sides agree on which cell owns which edge.
//!
//! Known integrability risk: agreeing on the operator does not make a
//! filled field integrable. The texture fill copies gradient samples from
//! elsewhere in the raster, and cells next to a hole may carry a one-sided
//! (backward) estimate in the forward slot. The Poisson solve returns the
//! least-squares compromise, so the reconstruction is biased wherever the
//! filled field has curl.

/// Number of channels in a gradient raster.
pub const GRADIENT_CHANNELS: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub const ALL: [Axis; 2] = [Axis::X, Axis::Y];

    /// Gradient channel storing differences along this axis.
    #[inline]
    pub fn channel(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
        }
    }

    #[inline]
    fn step(self) -> (usize, usize) {
        match self {
            Axis::X => (1, 0),
            Axis::Y => (0, 1),
        }
    }
}

/// Forward neighbour of `(x, y)` along `axis`, if it lies inside `w × h`.
#[inline]
pub fn forward(w: usize, h: usize, x: usize, y: usize, axis: Axis) -> Option<(usize, usize)> {
    let (dx, dy) = axis.step();
    let (nx, ny) = (x + dx, y + dy);
    (nx < w && ny < h).then_some((nx, ny))
}

/// Backward neighbour of `(x, y)` along `axis`, if it lies inside the grid.
#[inline]
pub fn backward(x: usize, y: usize, axis: Axis) -> Option<(usize, usize)> {
    let (dx, dy) = axis.step();
    Some((x.checked_sub(dx)?, y.checked_sub(dy)?))
}

/// Desired `f(q) - f(p)` for 4-connected neighbours `p` and `q`, read from
/// a gradient raster laid out per this module's convention.
///
/// # Panics
/// If `p` and `q` are not 4-connected neighbours.
#[inline]
pub fn edge_target(gradient: &crate::image::Raster, p: (usize, usize), q: (usize, usize)) -> f32 {
    match (q.0 as isize - p.0 as isize, q.1 as isize - p.1 as isize) {
        (1, 0) => gradient.get(p.0, p.1, Axis::X.channel()),
        (-1, 0) => -gradient.get(q.0, q.1, Axis::X.channel()),
        (0, 1) => gradient.get(p.0, p.1, Axis::Y.channel()),
        (0, -1) => -gradient.get(q.0, q.1, Axis::Y.channel()),
        d => panic!("cells {p:?} and {q:?} are not 4-neighbours (offset {d:?})"),
    }
}
