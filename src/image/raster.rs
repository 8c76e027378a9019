//! Owned multi-channel f32 raster in row-major layout with interleaved
//! channels.
//!
//! Depth is a 1-channel raster, gradients are 2 channels (∂x, ∂y), colour is
//! 3 channels and the composites used for joint filling carry 4 (RGBD) or 5
//! (RGBDxDy). The channel count is a runtime property; callers that need a
//! specific layout check it with [`Raster::ensure_channels`].
use super::traits::{ImageView, ImageViewMut, Region};
use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    /// Width in cells
    pub w: usize,
    /// Height in cells
    pub h: usize,
    /// Samples per cell
    pub channels: usize,
    /// Backing storage, `w * h * channels` samples
    pub data: Vec<f32>,
}

impl Raster {
    /// Zero-initialised raster.
    pub fn new(w: usize, h: usize, channels: usize) -> Self {
        Self::filled(w, h, channels, 0.0)
    }

    pub fn filled(w: usize, h: usize, channels: usize, value: f32) -> Self {
        Self {
            w,
            h,
            channels,
            data: vec![value; w * h * channels],
        }
    }

    pub fn with_region(region: Region, channels: usize) -> Self {
        Self::new(region.width, region.height, channels)
    }

    /// Wrap an existing buffer; its length must be `w * h * channels`.
    pub fn from_vec(w: usize, h: usize, channels: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != w * h * channels {
            return Err(Error::Config(format!(
                "raster buffer holds {} samples, {}x{}x{} needs {}",
                data.len(),
                w,
                h,
                channels,
                w * h * channels
            )));
        }
        Ok(Self {
            w,
            h,
            channels,
            data,
        })
    }

    /// Build a raster by evaluating `f(x, y)` for every cell.
    pub fn from_fn<F>(w: usize, h: usize, channels: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> Vec<f32>,
    {
        let mut out = Self::new(w, h, channels);
        for y in 0..h {
            for x in 0..w {
                let px = f(x, y);
                out.pixel_mut(x, y).copy_from_slice(&px[..channels]);
            }
        }
        out
    }

    #[inline]
    /// Linear index of the first sample of cell (x, y).
    pub fn idx(&self, x: usize, y: usize) -> usize {
        (y * self.w + x) * self.channels
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> &[f32] {
        let i = self.idx(x, y);
        &self.data[i..i + self.channels]
    }

    #[inline]
    pub fn pixel_mut(&mut self, x: usize, y: usize) -> &mut [f32] {
        let i = self.idx(x, y);
        let c = self.channels;
        &mut self.data[i..i + c]
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, c: usize) -> f32 {
        self.data[self.idx(x, y) + c]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, c: usize, v: f32) {
        let i = self.idx(x, y) + c;
        self.data[i] = v;
    }

    pub fn ensure_channels(&self, expected: usize) -> Result<()> {
        if self.channels != expected {
            return Err(Error::ChannelCount {
                expected,
                found: self.channels,
            });
        }
        Ok(())
    }

    pub fn ensure_region(&self, expected: Region) -> Result<()> {
        let found = ImageView::region(self);
        if found != expected {
            return Err(Error::DimensionMismatch { expected, found });
        }
        Ok(())
    }

    /// Largest absolute per-sample difference; `None` when the shapes differ.
    pub fn max_abs_diff(&self, other: &Raster) -> Option<f32> {
        if self.w != other.w || self.h != other.h || self.channels != other.channels {
            return None;
        }
        Some(
            self.data
                .iter()
                .zip(&other.data)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0f32, f32::max),
        )
    }
}

impl ImageView for Raster {
    type Pixel = f32;

    #[inline]
    fn width(&self) -> usize {
        self.w
    }
    #[inline]
    fn height(&self) -> usize {
        self.h
    }
    #[inline]
    fn channels(&self) -> usize {
        self.channels
    }
    #[inline]
    fn row(&self, y: usize) -> &[f32] {
        let len = self.w * self.channels;
        let start = y * len;
        &self.data[start..start + len]
    }
}

impl ImageViewMut for Raster {
    #[inline]
    fn row_mut(&mut self, y: usize) -> &mut [f32] {
        let len = self.w * self.channels;
        let start = y * len;
        &mut self.data[start..start + len]
    }
}
