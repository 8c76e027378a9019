//! PTX range-scan files.
//!
//! Layout: column count, row count, scanner position, three scanner axes,
//! a 4×4 transform (one row per line), then `columns * rows` point lines
//! `x y z intensity [r g b]` listed column by column. Grid column `c` maps
//! to raster x, row `r` to raster y. A point at the origin is a missing
//! return.
use super::{GridCloud, Point, ScanHeader};
use crate::error::{Error, Result};
use crate::image::io::ensure_parent_dir;
use log::debug;
use nalgebra::{Matrix4, Vector3};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

pub fn read_ptx(path: &Path) -> Result<GridCloud> {
    let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());

    let mut next_line = |what: &str| {
        lines
            .next()
            .ok_or_else(|| Error::parse(path, format!("unexpected end of file reading {what}")))
    };

    let columns = parse_count(path, next_line("column count")?)?;
    let rows = parse_count(path, next_line("row count")?)?;

    let scanner_position = parse_vec3(path, next_line("scanner position")?)?;
    let scanner_axes = [
        parse_vec3(path, next_line("scanner x axis")?)?,
        parse_vec3(path, next_line("scanner y axis")?)?,
        parse_vec3(path, next_line("scanner z axis")?)?,
    ];
    let mut transform = Matrix4::<f64>::identity();
    for r in 0..4 {
        let values = parse_floats(path, next_line("transform")?)?;
        if values.len() != 4 {
            return Err(Error::parse(path, "transform rows need 4 values"));
        }
        for (c, v) in values.into_iter().enumerate() {
            transform[(r, c)] = v;
        }
    }

    let mut cloud = GridCloud::new(columns, rows);
    cloud.header = ScanHeader {
        scanner_position,
        scanner_axes,
        transform,
    };

    for col in 0..columns {
        for row in 0..rows {
            let (line_no, line) = next_line("points")?;
            let v = parse_floats(path, (line_no, line))?;
            if v.len() != 4 && v.len() != 7 {
                return Err(Error::parse(
                    path,
                    format!("line {}: expected 4 or 7 values, found {}", line_no + 1, v.len()),
                ));
            }
            let position = Vector3::new(v[0] as f32, v[1] as f32, v[2] as f32);
            let color = if v.len() == 7 {
                [v[4] as u8, v[5] as u8, v[6] as u8]
            } else {
                [0, 0, 0]
            };
            *cloud.point_mut(col, row) = Point {
                position,
                intensity: v[3] as f32,
                color,
                valid: position != Vector3::zeros(),
            };
        }
    }

    debug!(
        "read_ptx: {} -> {}x{} grid, {} valid points",
        path.display(),
        columns,
        rows,
        cloud.valid_count()
    );
    Ok(cloud)
}

pub fn write_ptx(cloud: &GridCloud, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut out = BufWriter::new(file);
    write_ptx_to(cloud, &mut out).map_err(|e| Error::io(path, e))?;
    out.flush().map_err(|e| Error::io(path, e))
}

fn write_ptx_to<W: Write>(cloud: &GridCloud, out: &mut W) -> std::io::Result<()> {
    let header = &cloud.header;
    writeln!(out, "{}", cloud.width())?;
    writeln!(out, "{}", cloud.height())?;
    let p = header.scanner_position;
    writeln!(out, "{} {} {}", p.x, p.y, p.z)?;
    for axis in &header.scanner_axes {
        writeln!(out, "{} {} {}", axis.x, axis.y, axis.z)?;
    }
    for r in 0..4 {
        let t = &header.transform;
        writeln!(out, "{} {} {} {}", t[(r, 0)], t[(r, 1)], t[(r, 2)], t[(r, 3)])?;
    }
    for col in 0..cloud.width() {
        for row in 0..cloud.height() {
            let point = cloud.point(col, row);
            if point.valid {
                let [r, g, b] = point.color;
                let pos = point.position;
                writeln!(
                    out,
                    "{} {} {} {} {} {} {}",
                    pos.x, pos.y, pos.z, point.intensity, r, g, b
                )?;
            } else {
                writeln!(out, "0 0 0 0.5 0 0 0")?;
            }
        }
    }
    Ok(())
}

fn parse_count(path: &Path, (line_no, line): (usize, &str)) -> Result<usize> {
    line.trim().parse().map_err(|e| {
        Error::parse(
            path,
            format!("line {}: bad grid size '{}': {e}", line_no + 1, line.trim()),
        )
    })
}

fn parse_floats(path: &Path, (line_no, line): (usize, &str)) -> Result<Vec<f64>> {
    line.split_whitespace()
        .map(|tok| {
            tok.parse::<f64>().map_err(|e| {
                Error::parse(path, format!("line {}: bad number '{tok}': {e}", line_no + 1))
            })
        })
        .collect()
}

fn parse_vec3(path: &Path, line: (usize, &str)) -> Result<Vector3<f64>> {
    let line_no = line.0;
    let v = parse_floats(path, line)?;
    if v.len() != 3 {
        return Err(Error::parse(
            path,
            format!("line {}: expected 3 values, found {}", line_no + 1, v.len()),
        ));
    }
    Ok(Vector3::new(v[0], v[1], v[2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ptx() -> String {
        let mut s = String::from("2\n3\n0 0 0\n1 0 0\n0 1 0\n0 0 1\n");
        s.push_str("1 0 0 0\n0 1 0 0\n0 0 1 0\n0 0 0 1\n");
        // column 0
        s.push_str("1 0 0 0.2 10 20 30\n");
        s.push_str("0 0 0 0.5 0 0 0\n");
        s.push_str("1 0 1 0.2 11 21 31\n");
        // column 1
        s.push_str("1 1 0 0.2 12 22 32\n");
        s.push_str("1 1 0.5 0.2 13 23 33\n");
        s.push_str("1 1 1 0.2 14 24 34\n");
        s
    }

    #[test]
    fn reads_column_major_grid() {
        let dir = std::env::temp_dir().join(format!("rgbd_ptx_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("scan.ptx");
        fs::write(&path, sample_ptx()).unwrap();

        let cloud = read_ptx(&path).unwrap();
        assert_eq!(cloud.width(), 2);
        assert_eq!(cloud.height(), 3);
        assert!(!cloud.point(0, 1).valid);
        assert_eq!(cloud.point(1, 1).color, [13, 23, 33]);
        assert_eq!(cloud.valid_count(), 5);

        let out = dir.join("copy.ptx");
        write_ptx(&cloud, &out).unwrap();
        let again = read_ptx(&out).unwrap();
        assert_eq!(again, cloud);
        let lines = fs::read_to_string(&out).unwrap().lines().count();
        // 10 header lines, one line per grid cell
        assert_eq!(lines, 10 + 6);
    }

    #[test]
    fn truncated_file_names_missing_section() {
        let dir = std::env::temp_dir().join(format!("rgbd_ptx_trunc_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("short.ptx");
        fs::write(&path, "2\n3\n0 0 0\n").unwrap();
        let err = read_ptx(&path).unwrap_err();
        assert!(err.to_string().contains("scanner x axis"), "{err}");
    }
}
