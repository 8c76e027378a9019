//! Organized point cloud: a fixed `width × height` grid of scanner returns.
//!
//! Each cell holds a 3-D position, intensity, colour and a validity flag.
//! Rasters derived from the cloud (depth, RGB, RGBD, validity) always share
//! its region. The only mutation points are [`GridCloud::mark_all_valid`]
//! and the `replace_*` family, all in place.
//!
//! Replacement contract: `replace_depth`, `replace_rgb` and `replace_rgbd`
//! overwrite cells that are currently valid and leave invalid cells
//! untouched. Callers that want every cell overwritten call
//! `mark_all_valid` first.
//!
//! Depth is the range along each cell's viewing ray from the scanner
//! origin, see [`geometry::ScanGeometry`].

pub mod geometry;
pub mod ptx;
pub mod vtp;

use crate::error::Result;
use crate::image::{Raster, Region, ValidityMask};
use geometry::ScanGeometry;
use log::debug;
use nalgebra::{Matrix4, Vector3};

/// A single grid cell of the scan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub position: Vector3<f32>,
    pub intensity: f32,
    pub color: [u8; 3],
    pub valid: bool,
}

impl Point {
    /// Placeholder stored for a missing return.
    pub fn invalid() -> Self {
        Self {
            position: Vector3::zeros(),
            intensity: 0.5,
            color: [0, 0, 0],
            valid: false,
        }
    }

    pub fn range(&self) -> f32 {
        self.position.norm()
    }
}

/// Scanner pose block carried through from the input file.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanHeader {
    pub scanner_position: Vector3<f64>,
    pub scanner_axes: [Vector3<f64>; 3],
    pub transform: Matrix4<f64>,
}

impl Default for ScanHeader {
    fn default() -> Self {
        Self {
            scanner_position: Vector3::zeros(),
            scanner_axes: [Vector3::x(), Vector3::y(), Vector3::z()],
            transform: Matrix4::identity(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GridCloud {
    w: usize,
    h: usize,
    points: Vec<Point>,
    pub header: ScanHeader,
}

impl GridCloud {
    /// Cloud with every cell invalid.
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            points: vec![Point::invalid(); w * h],
            header: ScanHeader::default(),
        }
    }

    pub fn from_fn<F>(w: usize, h: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> Point,
    {
        let mut cloud = Self::new(w, h);
        for y in 0..h {
            for x in 0..w {
                *cloud.point_mut(x, y) = f(x, y);
            }
        }
        cloud
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn height(&self) -> usize {
        self.h
    }

    pub fn region(&self) -> Region {
        Region::new(self.w, self.h)
    }

    #[inline]
    fn idx(&self, x: usize, y: usize) -> usize {
        y * self.w + x
    }

    #[inline]
    pub fn point(&self, x: usize, y: usize) -> &Point {
        &self.points[self.idx(x, y)]
    }

    #[inline]
    pub fn point_mut(&mut self, x: usize, y: usize) -> &mut Point {
        let i = self.idx(x, y);
        &mut self.points[i]
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn valid_count(&self) -> usize {
        self.points.iter().filter(|p| p.valid).count()
    }

    /// Range per cell. Invalid cells report whatever position they store.
    pub fn depth_raster(&self) -> Raster {
        self.map_raster(1, |p, out| out[0] = p.range())
    }

    pub fn rgb_raster(&self) -> Raster {
        self.map_raster(3, |p, out| {
            for (o, &c) in out.iter_mut().zip(&p.color) {
                *o = c as f32;
            }
        })
    }

    /// Colour in channels 0..3, range in channel 3.
    pub fn rgbd_raster(&self) -> Raster {
        self.map_raster(4, |p, out| {
            for (o, &c) in out.iter_mut().zip(&p.color) {
                *o = c as f32;
            }
            out[3] = p.range();
        })
    }

    /// 1.0 for valid cells, 0.0 for invalid ones.
    pub fn validity_raster(&self) -> Raster {
        self.map_raster(1, |p, out| out[0] = if p.valid { 1.0 } else { 0.0 })
    }

    pub fn validity_mask(&self) -> ValidityMask {
        ValidityMask::from_fn(self.w, self.h, |x, y| self.point(x, y).valid)
    }

    fn map_raster<F>(&self, channels: usize, mut f: F) -> Raster
    where
        F: FnMut(&Point, &mut [f32]),
    {
        let mut out = Raster::new(self.w, self.h, channels);
        for (p, px) in self.points.iter().zip(out.data.chunks_exact_mut(channels)) {
            f(p, px);
        }
        out
    }

    pub fn mark_all_valid(&mut self) {
        for p in &mut self.points {
            p.valid = true;
        }
    }

    /// Move every valid point along its viewing ray to the supplied range.
    /// Returns the number of cells written.
    pub fn replace_depth(&mut self, depth: &Raster) -> Result<usize> {
        depth.ensure_region(self.region())?;
        depth.ensure_channels(1)?;
        let geometry = ScanGeometry::estimate(self);
        let written = self.replace_valid(|cloud, x, y| {
            let ray = geometry.ray(cloud, x, y);
            cloud.point_mut(x, y).position = ray * depth.get(x, y, 0);
        });
        debug!("replace_depth: wrote {written} cells");
        Ok(written)
    }

    pub fn replace_rgb(&mut self, rgb: &Raster) -> Result<usize> {
        rgb.ensure_region(self.region())?;
        rgb.ensure_channels(3)?;
        let written = self.replace_valid(|cloud, x, y| {
            cloud.point_mut(x, y).color = to_color(rgb.pixel(x, y));
        });
        debug!("replace_rgb: wrote {written} cells");
        Ok(written)
    }

    /// Colour and range together from a 4-channel raster.
    pub fn replace_rgbd(&mut self, rgbd: &Raster) -> Result<usize> {
        rgbd.ensure_region(self.region())?;
        rgbd.ensure_channels(4)?;
        let geometry = ScanGeometry::estimate(self);
        let written = self.replace_valid(|cloud, x, y| {
            let px = rgbd.pixel(x, y);
            let ray = geometry.ray(cloud, x, y);
            let point = cloud.point_mut(x, y);
            point.color = to_color(&px[..3]);
            point.position = ray * px[3];
        });
        debug!("replace_rgbd: wrote {written} cells");
        Ok(written)
    }

    fn replace_valid<F>(&mut self, mut write: F) -> usize
    where
        F: FnMut(&mut Self, usize, usize),
    {
        let mut written = 0;
        for y in 0..self.h {
            for x in 0..self.w {
                if self.point(x, y).valid {
                    write(self, x, y);
                    written += 1;
                }
            }
        }
        written
    }
}

fn to_color(px: &[f32]) -> [u8; 3] {
    let to_u8 = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    [to_u8(px[0]), to_u8(px[1]), to_u8(px[2])]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloud_with_holes() -> GridCloud {
        GridCloud::from_fn(4, 3, |x, y| {
            let valid = (x + y) % 3 != 0;
            if !valid {
                return Point::invalid();
            }
            let az = 0.1 * x as f32;
            let el = 0.05 * y as f32;
            let dir = Vector3::new(az.cos() * el.cos(), az.sin() * el.cos(), el.sin());
            Point {
                position: dir * (2.0 + x as f32),
                intensity: 0.3,
                color: [10 * x as u8, 20 * y as u8, 7],
                valid,
            }
        })
    }

    #[test]
    fn replace_depth_touches_only_valid_cells() {
        let mut cloud = cloud_with_holes();
        let before = cloud.clone();
        let k = cloud.valid_count();
        let target = Raster::filled(4, 3, 1, 42.0);
        let written = cloud.replace_depth(&target).unwrap();
        assert_eq!(written, k);

        let mut changed = 0;
        for y in 0..3 {
            for x in 0..4 {
                let old = before.point(x, y);
                let new = cloud.point(x, y);
                if old.position != new.position {
                    changed += 1;
                    assert!(old.valid);
                    assert!((new.range() - 42.0).abs() < 1e-3);
                } else {
                    assert!(!old.valid);
                }
            }
        }
        assert_eq!(changed, k);
    }

    #[test]
    fn mark_all_valid_then_replace_writes_everything() {
        let mut cloud = cloud_with_holes();
        cloud.mark_all_valid();
        let written = cloud.replace_rgb(&Raster::filled(4, 3, 3, 200.0)).unwrap();
        assert_eq!(written, 12);
        assert!(cloud.points().iter().all(|p| p.color == [200, 200, 200]));
    }

    #[test]
    fn replace_rejects_mismatched_region() {
        let mut cloud = cloud_with_holes();
        let err = cloud.replace_depth(&Raster::new(3, 4, 1)).unwrap_err();
        assert!(err.to_string().contains("[4, 3]"), "{err}");
    }

    #[test]
    fn rgbd_raster_stacks_color_and_range() {
        let cloud = cloud_with_holes();
        let rgbd = cloud.rgbd_raster();
        let p = cloud.point(1, 0);
        assert_eq!(rgbd.pixel(1, 0)[..3], [10.0, 0.0, 7.0]);
        assert!((rgbd.get(1, 0, 3) - p.range()).abs() < 1e-6);
        assert_eq!(cloud.validity_raster().get(0, 0, 0), 0.0);
    }
}
