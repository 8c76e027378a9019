//! Viewing rays for every grid cell of a spherical scan.
//!
//! A cell with a stored return looks along its own normalised position. A
//! cell without one (zero position) has no direction of its own, so it gets
//! the scan-pattern direction instead: columns sweep azimuth and rows sweep
//! elevation, each averaged over the cells that do have returns and
//! linearly interpolated across columns/rows that are entirely empty.
//!
//! With no returns at all the scan pattern is unknown and every empty cell
//! looks along +x.
use super::GridCloud;
use nalgebra::Vector3;

const MIN_RANGE: f32 = 1e-9;

#[derive(Clone, Debug)]
pub struct ScanGeometry {
    /// Azimuth per column (radians)
    azimuth: Vec<f32>,
    /// Elevation per row (radians)
    elevation: Vec<f32>,
}

impl ScanGeometry {
    pub fn estimate(cloud: &GridCloud) -> Self {
        let (w, h) = (cloud.width(), cloud.height());
        // Azimuth is circular, so accumulate unit vectors rather than angles.
        let mut col_acc = vec![(0.0f64, 0.0f64, 0usize); w];
        let mut row_acc = vec![(0.0f64, 0usize); h];
        for y in 0..h {
            for x in 0..w {
                let p = cloud.point(x, y).position;
                if p.norm() <= MIN_RANGE {
                    continue;
                }
                let horiz = (p.x as f64).hypot(p.y as f64);
                let az = (p.y as f64).atan2(p.x as f64);
                let el = (p.z as f64).atan2(horiz);
                let c = &mut col_acc[x];
                c.0 += az.cos();
                c.1 += az.sin();
                c.2 += 1;
                let r = &mut row_acc[y];
                r.0 += el;
                r.1 += 1;
            }
        }

        let azimuth_known: Vec<Option<(f32, f32)>> = col_acc
            .iter()
            .map(|&(c, s, n)| (n > 0).then(|| ((c / n as f64) as f32, (s / n as f64) as f32)))
            .collect();
        let azimuth = fill_gaps(&azimuth_known, (1.0, 0.0))
            .into_iter()
            .map(|(c, s)| s.atan2(c))
            .collect();

        let elevation_known: Vec<Option<(f32, f32)>> = row_acc
            .iter()
            .map(|&(sum, n)| (n > 0).then(|| ((sum / n as f64) as f32, 0.0)))
            .collect();
        let elevation = fill_gaps(&elevation_known, (0.0, 0.0))
            .into_iter()
            .map(|(e, _)| e)
            .collect();

        Self { azimuth, elevation }
    }

    /// Scan-pattern direction of cell (x, y), ignoring any stored return.
    pub fn pattern_ray(&self, x: usize, y: usize) -> Vector3<f32> {
        let az = self.azimuth[x];
        let el = self.elevation[y];
        Vector3::new(az.cos() * el.cos(), az.sin() * el.cos(), el.sin())
    }

    /// Unit viewing ray of cell (x, y).
    pub fn ray(&self, cloud: &GridCloud, x: usize, y: usize) -> Vector3<f32> {
        let p = cloud.point(x, y).position;
        let range = p.norm();
        if range > MIN_RANGE {
            p / range
        } else {
            self.pattern_ray(x, y)
        }
    }
}

/// Linear interpolation over missing entries, nearest-value extension at the
/// ends, `fallback` everywhere when nothing is known.
fn fill_gaps(known: &[Option<(f32, f32)>], fallback: (f32, f32)) -> Vec<(f32, f32)> {
    let anchors: Vec<(usize, (f32, f32))> = known
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .collect();
    if anchors.is_empty() {
        return vec![fallback; known.len()];
    }
    let mut out = Vec::with_capacity(known.len());
    let mut next = 0usize;
    for i in 0..known.len() {
        while next < anchors.len() && anchors[next].0 < i {
            next += 1;
        }
        let value = match (next.checked_sub(1).map(|p| anchors[p]), anchors.get(next)) {
            (_, Some(&(j, v))) if j == i => v,
            (Some((i0, v0)), Some(&(i1, v1))) => {
                let t = (i - i0) as f32 / (i1 - i0) as f32;
                (v0.0 + t * (v1.0 - v0.0), v0.1 + t * (v1.1 - v0.1))
            }
            (Some((_, v0)), None) => v0,
            (None, Some(&(_, v1))) => v1,
            (None, None) => fallback,
        };
        out.push(value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::Point;

    fn spherical(az: f32, el: f32, r: f32) -> Vector3<f32> {
        Vector3::new(az.cos() * el.cos(), az.sin() * el.cos(), el.sin()) * r
    }

    #[test]
    fn empty_column_is_interpolated_from_neighbors() {
        let cloud = GridCloud::from_fn(3, 2, |x, y| {
            if x == 1 {
                return Point::invalid();
            }
            Point {
                position: spherical(0.2 * x as f32, 0.1 * y as f32, 5.0),
                intensity: 0.5,
                color: [0; 3],
                valid: true,
            }
        });
        let geometry = ScanGeometry::estimate(&cloud);
        let ray = geometry.ray(&cloud, 1, 1);
        let expected = spherical(0.2, 0.1, 1.0);
        assert!((ray - expected).norm() < 1e-4, "ray={ray:?}");
    }

    #[test]
    fn valid_cell_keeps_its_own_direction() {
        let cloud = GridCloud::from_fn(1, 1, |_, _| Point {
            position: Vector3::new(0.0, 3.0, 4.0),
            intensity: 0.5,
            color: [0; 3],
            valid: true,
        });
        let geometry = ScanGeometry::estimate(&cloud);
        let ray = geometry.ray(&cloud, 0, 0);
        assert!((ray - Vector3::new(0.0, 0.6, 0.8)).norm() < 1e-6);
    }

    #[test]
    fn fill_gaps_extends_ends() {
        let filled = fill_gaps(&[None, Some((1.0, 0.0)), None, Some((3.0, 0.0)), None], (9.0, 9.0));
        let firsts: Vec<f32> = filled.iter().map(|v| v.0).collect();
        assert_eq!(firsts, vec![1.0, 1.0, 2.0, 3.0, 3.0]);
    }
}
