//! Point-set export as VTK XML PolyData (`.vtp`, ASCII payload).
//!
//! Only valid cells are written. Each point carries an `RGB` unsigned-char
//! triple and its `Depth` (range) so the set can be coloured either way.
use super::GridCloud;
use crate::error::{Error, Result};
use crate::image::io::ensure_parent_dir;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

pub fn write_vtp(cloud: &GridCloud, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = Writer::new_with_indent(BufWriter::new(file), b' ', 2);
    write_polydata(cloud, &mut writer).map_err(|e| Error::io(path, e))?;
    writer
        .into_inner()
        .flush()
        .map_err(|e| Error::io(path, e))
}

type XmlResult = io::Result<()>;

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> XmlResult {
    writer.write_event(event).map_err(io::Error::other)
}

fn write_polydata<W: Write>(cloud: &GridCloud, writer: &mut Writer<W>) -> XmlResult {
    let valid: Vec<_> = cloud.points().iter().filter(|p| p.valid).collect();
    let n = valid.len().to_string();

    let mut positions = String::new();
    let mut colors = String::new();
    let mut depths = String::new();
    let mut connectivity = String::new();
    let mut offsets = String::new();
    for (i, p) in valid.iter().enumerate() {
        let pos = p.position;
        let [r, g, b] = p.color;
        // Writing into a String cannot fail.
        let _ = write!(positions, "{} {} {} ", pos.x, pos.y, pos.z);
        let _ = write!(colors, "{r} {g} {b} ");
        let _ = write!(depths, "{} ", p.range());
        let _ = write!(connectivity, "{i} ");
        let _ = write!(offsets, "{} ", i + 1);
    }

    emit(writer, Event::Decl(BytesDecl::new("1.0", None, None)))?;
    emit(
        writer,
        Event::Start(BytesStart::new("VTKFile").with_attributes([
            ("type", "PolyData"),
            ("version", "0.1"),
            ("byte_order", "LittleEndian"),
        ])),
    )?;
    emit(writer, Event::Start(BytesStart::new("PolyData")))?;
    emit(
        writer,
        Event::Start(BytesStart::new("Piece").with_attributes([
            ("NumberOfPoints", n.as_str()),
            ("NumberOfVerts", n.as_str()),
            ("NumberOfLines", "0"),
            ("NumberOfStrips", "0"),
            ("NumberOfPolys", "0"),
        ])),
    )?;

    emit(
        writer,
        Event::Start(BytesStart::new("PointData").with_attributes([("Scalars", "RGB")])),
    )?;
    data_array(writer, &[("type", "UInt8"), ("Name", "RGB"), ("NumberOfComponents", "3")], &colors)?;
    data_array(writer, &[("type", "Float32"), ("Name", "Depth")], &depths)?;
    emit(writer, Event::End(BytesEnd::new("PointData")))?;

    emit(writer, Event::Start(BytesStart::new("Points")))?;
    data_array(writer, &[("type", "Float32"), ("NumberOfComponents", "3")], &positions)?;
    emit(writer, Event::End(BytesEnd::new("Points")))?;

    emit(writer, Event::Start(BytesStart::new("Verts")))?;
    data_array(writer, &[("type", "Int64"), ("Name", "connectivity")], &connectivity)?;
    data_array(writer, &[("type", "Int64"), ("Name", "offsets")], &offsets)?;
    emit(writer, Event::End(BytesEnd::new("Verts")))?;

    emit(writer, Event::End(BytesEnd::new("Piece")))?;
    emit(writer, Event::End(BytesEnd::new("PolyData")))?;
    emit(writer, Event::End(BytesEnd::new("VTKFile")))
}

fn data_array<W: Write>(writer: &mut Writer<W>, attrs: &[(&str, &str)], body: &str) -> XmlResult {
    let mut start = BytesStart::new("DataArray");
    for &attr in attrs {
        start.push_attribute(attr);
    }
    start.push_attribute(("format", "ascii"));
    emit(writer, Event::Start(start))?;
    emit(writer, Event::Text(BytesText::new(body.trim_end())))?;
    emit(writer, Event::End(BytesEnd::new("DataArray")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::Point;
    use nalgebra::Vector3;

    #[test]
    fn writes_only_valid_points() {
        let cloud = GridCloud::from_fn(3, 1, |x, _| {
            if x == 1 {
                return Point::invalid();
            }
            Point {
                position: Vector3::new(x as f32 + 1.0, 0.0, 0.0),
                intensity: 0.5,
                color: [x as u8, 2, 3],
                valid: true,
            }
        });
        let dir = std::env::temp_dir().join(format!("rgbd_vtp_{}", std::process::id()));
        let path = dir.join("points.vtp");
        write_vtp(&cloud, &path).unwrap();
        let xml = std::fs::read_to_string(&path).unwrap();
        assert!(xml.contains(r#"NumberOfPoints="2""#), "{xml}");
        assert!(xml.contains("1 0 0 3 0 0"), "{xml}");
        assert!(xml.contains("0 2 3 2 2 3"), "{xml}");
        assert!(xml.contains(r#"Name="Depth""#));
    }

    #[test]
    fn write_failures_are_io_errors() {
        let full = std::path::Path::new("/dev/full");
        if !full.exists() {
            return;
        }
        // Large enough that the buffered writer spills while writing XML.
        let cloud = GridCloud::from_fn(100, 100, |x, y| Point {
            position: Vector3::new(x as f32 + 1.5, y as f32 + 0.25, 1.0),
            intensity: 0.5,
            color: [1, 2, 3],
            valid: true,
        });
        let err = write_vtp(&cloud, full).unwrap_err();
        assert!(matches!(err, Error::Io { .. }), "{err}");
        assert!(err.to_string().contains("/dev/full"), "{err}");
    }
}
