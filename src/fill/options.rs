use serde::Deserialize;

/// Parameters of the exemplar-based texture fill.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TextureFillOptions {
    /// Patch side length is `2 * patch_half_width + 1`.
    pub patch_half_width: usize,
    /// How many nearest source patches are kept for the texture comparison.
    pub knn_candidates: usize,
}

impl Default for TextureFillOptions {
    fn default() -> Self {
        Self {
            patch_half_width: 7,
            knn_candidates: 100,
        }
    }
}

impl TextureFillOptions {
    pub fn new(patch_half_width: usize) -> Self {
        Self {
            patch_half_width,
            ..Default::default()
        }
    }

    pub fn with_knn_candidates(mut self, knn_candidates: usize) -> Self {
        self.knn_candidates = knn_candidates;
        self
    }

    /// Patch side length, or `None` when `2r + 1` does not fit the index type.
    pub fn patch_size(&self) -> Option<usize> {
        let side = self.patch_half_width.checked_mul(2)?.checked_add(1)?;
        isize::try_from(side).is_ok().then_some(side)
    }
}

/// Parameters of the small-hole pre-fill.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SmallHoleOptions {
    /// Half side of the square interpolation window.
    pub kernel_radius: usize,
    /// Block size of the coarse grid used for filling; 1 disables coarsening.
    pub downsample_factor: usize,
}

impl Default for SmallHoleOptions {
    fn default() -> Self {
        Self {
            kernel_radius: 1,
            downsample_factor: 1,
        }
    }
}
