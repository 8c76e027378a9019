use nalgebra::Vector3;
use rgbd_hole_filling::image::mask::rectangular_hole;
use rgbd_hole_filling::{GridCloud, Point, Region, ValidityMask};
use std::path::PathBuf;

/// Unit viewing ray of a small spherical scan: columns sweep azimuth,
/// rows sweep elevation.
pub fn scan_ray(x: usize, y: usize) -> Vector3<f32> {
    let az = -0.2 + 0.02 * x as f32;
    let el = 0.1 - 0.02 * y as f32;
    Vector3::new(az.cos() * el.cos(), az.sin() * el.cos(), el.sin())
}

/// Scan where every return lies at `range(x, y)` with a constant colour.
pub fn scan_cloud<F>(width: usize, height: usize, color: [u8; 3], mut range: F) -> GridCloud
where
    F: FnMut(usize, usize) -> f32,
{
    assert!(width > 0 && height > 0, "scan dimensions must be positive");
    GridCloud::from_fn(width, height, |x, y| Point {
        position: scan_ray(x, y) * range(x, y),
        intensity: 0.5,
        color,
        valid: true,
    })
}

/// Centred square hole of side `size`.
pub fn centred_hole(width: usize, height: usize, size: usize) -> ValidityMask {
    rectangular_hole(
        Region::new(width, height),
        (width - size) / 2,
        (height - size) / 2,
        size,
        size,
    )
}

/// Drop the returns under the mask's holes, as a sensor dropout would.
pub fn punch_holes(cloud: &mut GridCloud, mask: &ValidityMask) {
    for (x, y) in mask.hole_cells().collect::<Vec<_>>() {
        *cloud.point_mut(x, y) = Point::invalid();
    }
}

/// Fresh per-test scratch directory under the system temp dir.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "rgbd_hole_filling_{}_{}",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}
