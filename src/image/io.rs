//! I/O helpers for rasters, masks and JSON.
//!
//! - `read_meta_image` / `write_meta_image`: MetaImage (`.mha`) container,
//!   header plus little-endian payload, any channel count.
//! - `save_rgb_png`: write a 3-channel raster (0..255 scale) to PNG.
//! - `load_mask` / `save_mask`: validity masks as `.mask` descriptors or plain images.
//! - `write_json_file`: pretty-print a serializable value to disk.
use super::{ImageView, Raster, ValidityMask};
use crate::error::{Error, Result};
use image::{GrayImage, Luma, RgbImage};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Pixel value marking a hole in mask images unless a descriptor says otherwise.
pub const DEFAULT_HOLE_VALUE: u8 = 255;
/// Pixel value marking a valid cell in mask images unless a descriptor says otherwise.
pub const DEFAULT_VALID_VALUE: u8 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MetaElement {
    UChar,
    Float,
    Double,
}

impl MetaElement {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "MET_UCHAR" => Some(Self::UChar),
            "MET_FLOAT" => Some(Self::Float),
            "MET_DOUBLE" => Some(Self::Double),
            _ => None,
        }
    }

    fn size(self) -> usize {
        match self {
            Self::UChar => 1,
            Self::Float => 4,
            Self::Double => 8,
        }
    }

    fn decode(self, bytes: &[u8], msb: bool) -> f32 {
        match self {
            Self::UChar => bytes[0] as f32,
            Self::Float => {
                let b = [bytes[0], bytes[1], bytes[2], bytes[3]];
                if msb {
                    f32::from_be_bytes(b)
                } else {
                    f32::from_le_bytes(b)
                }
            }
            Self::Double => {
                let mut b = [0u8; 8];
                b.copy_from_slice(&bytes[..8]);
                let v = if msb {
                    f64::from_be_bytes(b)
                } else {
                    f64::from_le_bytes(b)
                };
                v as f32
            }
        }
    }
}

#[derive(Debug, Default)]
struct MetaHeader {
    dims: Option<(usize, usize)>,
    channels: usize,
    element: Option<MetaElement>,
    msb: bool,
    data_file: Option<String>,
}

/// Read a 2-D MetaImage into a raster. Supports `MET_UCHAR`, `MET_FLOAT`
/// and `MET_DOUBLE` payloads, either embedded (`LOCAL`) or in a sibling file.
pub fn read_meta_image(path: &Path) -> Result<Raster> {
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    let mut header = MetaHeader {
        channels: 1,
        ..Default::default()
    };
    let mut offset = 0usize;
    while offset < bytes.len() {
        let end = bytes[offset..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|p| offset + p)
            .unwrap_or(bytes.len());
        let line = String::from_utf8_lossy(&bytes[offset..end]).trim().to_string();
        offset = (end + 1).min(bytes.len());
        if line.is_empty() {
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .map(|(k, v)| (k.trim(), v.trim()))
            .ok_or_else(|| Error::parse(path, format!("malformed header line '{line}'")))?;
        match key {
            "NDims" if value != "2" => {
                return Err(Error::parse(path, format!("expected 2 dimensions, found {value}")))
            }
            "DimSize" => {
                let sizes: Vec<usize> = value
                    .split_whitespace()
                    .map(|s| s.parse::<usize>())
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| Error::parse(path, format!("bad DimSize '{value}': {e}")))?;
                if sizes.len() != 2 {
                    return Err(Error::parse(path, format!("bad DimSize '{value}'")));
                }
                header.dims = Some((sizes[0], sizes[1]));
            }
            "ElementNumberOfChannels" => {
                header.channels = value
                    .parse()
                    .map_err(|e| Error::parse(path, format!("bad channel count: {e}")))?;
            }
            "ElementType" => {
                header.element = Some(MetaElement::parse(value).ok_or_else(|| {
                    Error::parse(path, format!("unsupported element type {value}"))
                })?);
            }
            "ElementByteOrderMSB" | "BinaryDataByteOrderMSB" => {
                header.msb = value.eq_ignore_ascii_case("true");
            }
            "ElementDataFile" => {
                header.data_file = Some(value.to_string());
                break;
            }
            _ => {}
        }
    }

    let (w, h) = header
        .dims
        .ok_or_else(|| Error::parse(path, "missing DimSize"))?;
    let element = header
        .element
        .ok_or_else(|| Error::parse(path, "missing ElementType"))?;
    let data_file = header
        .data_file
        .ok_or_else(|| Error::parse(path, "missing ElementDataFile"))?;

    let payload = if data_file == "LOCAL" {
        bytes[offset..].to_vec()
    } else {
        let raw = path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(&data_file);
        fs::read(&raw).map_err(|e| Error::io(&raw, e))?
    };

    let needed = w
        .checked_mul(h)
        .and_then(|n| n.checked_mul(header.channels))
        .and_then(|n| n.checked_mul(element.size()))
        .ok_or_else(|| {
            Error::parse(
                path,
                format!("DimSize {w} {h} with {} channels is too large", header.channels),
            )
        })?;
    if payload.len() < needed {
        return Err(Error::parse(
            path,
            format!("payload has {} bytes, expected {needed}", payload.len()),
        ));
    }
    let data = payload[..needed]
        .chunks_exact(element.size())
        .map(|b| element.decode(b, header.msb))
        .collect();
    Raster::from_vec(w, h, header.channels, data)
}

/// Write a raster as a single-file MetaImage with a float32 payload.
pub fn write_meta_image(raster: &Raster, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let header = format!(
        "ObjectType = Image\nNDims = 2\nBinaryData = True\nBinaryDataByteOrderMSB = False\n\
         DimSize = {} {}\nElementNumberOfChannels = {}\nElementType = MET_FLOAT\n\
         ElementDataFile = LOCAL\n",
        raster.w, raster.h, raster.channels
    );
    let mut bytes = Vec::with_capacity(header.len() + raster.data.len() * 4);
    bytes.extend_from_slice(header.as_bytes());
    for v in &raster.data {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    fs::write(path, bytes).map_err(|e| Error::io(path, e))
}

/// Save a 3-channel raster to an 8-bit RGB PNG, clamping to [0, 255].
pub fn save_rgb_png(raster: &Raster, path: &Path) -> Result<()> {
    raster.ensure_channels(3)?;
    ensure_parent_dir(path)?;
    let mut out = RgbImage::new(raster.w as u32, raster.h as u32);
    for y in 0..raster.h {
        for x in 0..raster.w {
            let px = raster.pixel(x, y);
            let to_u8 = |v: f32| v.round().clamp(0.0, 255.0) as u8;
            out.put_pixel(
                x as u32,
                y as u32,
                image::Rgb([to_u8(px[0]), to_u8(px[1]), to_u8(px[2])]),
            );
        }
    }
    out.save(path)
        .map_err(|e| Error::parse(path, format!("failed to encode PNG: {e}")))
}

/// Load a validity mask.
///
/// A `.mask` file is a small text descriptor:
///
/// ```text
/// HoleValue 255
/// ValidValue 0
/// mask.png
/// ```
///
/// The image path is resolved relative to the descriptor. Any other file is
/// read directly as an image with the default hole value.
pub fn load_mask(path: &Path) -> Result<ValidityMask> {
    let is_descriptor = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mask"));
    if !is_descriptor {
        return mask_from_image(path, DEFAULT_HOLE_VALUE, None);
    }

    let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let mut hole_value = DEFAULT_HOLE_VALUE;
    let mut valid_value = DEFAULT_VALID_VALUE;
    let mut image_name: Option<String> = None;
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let mut tokens = line.split_whitespace();
        let key = tokens.next().unwrap_or_default();
        let key = key.trim_end_matches(':');
        match key {
            "HoleValue" | "ValidValue" => {
                let value: u8 = tokens
                    .next()
                    .ok_or_else(|| Error::parse(path, format!("{key} needs a value")))?
                    .parse()
                    .map_err(|e| Error::parse(path, format!("bad {key}: {e}")))?;
                if key == "HoleValue" {
                    hole_value = value;
                } else {
                    valid_value = value;
                }
            }
            _ => image_name = Some(line.to_string()),
        }
    }
    let image_name =
        image_name.ok_or_else(|| Error::parse(path, "descriptor names no mask image"))?;
    if hole_value == valid_value {
        return Err(Error::parse(path, "hole and valid values must differ"));
    }
    let image_path = path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(image_name);
    mask_from_image(&image_path, hole_value, Some(valid_value))
}

fn mask_from_image(path: &Path, hole_value: u8, valid_value: Option<u8>) -> Result<ValidityMask> {
    let img = image::open(path)
        .map_err(|e| Error::parse(path, format!("failed to open image: {e}")))?
        .into_luma8();
    let (w, h) = (img.width() as usize, img.height() as usize);
    let mut mask = ValidityMask::all_valid(w, h);
    for (x, y, px) in img.enumerate_pixels() {
        let v = px.0[0];
        if v == hole_value {
            mask.set(x as usize, y as usize, false);
        } else if valid_value.is_some_and(|valid| v != valid) {
            return Err(Error::parse(
                path,
                format!("pixel ({x}, {y}) = {v} is neither the hole nor the valid value"),
            ));
        }
    }
    Ok(mask)
}

/// Save a mask as a grayscale PNG using the default hole/valid values.
pub fn save_mask(mask: &ValidityMask, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let mut out = GrayImage::new(mask.width() as u32, mask.height() as u32);
    for (y, row) in mask.rows().enumerate() {
        for (x, &valid) in row.iter().enumerate() {
            let v = if valid {
                DEFAULT_VALID_VALUE
            } else {
                DEFAULT_HOLE_VALUE
            };
            out.put_pixel(x as u32, y as u32, Luma([v]));
        }
    }
    out.save(path)
        .map_err(|e| Error::parse(path, format!("failed to encode PNG: {e}")))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| Error::parse(path, format!("failed to serialize JSON: {e}")))?;
    fs::write(path, json).map_err(|e| Error::io(path, e))
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "rgbd_hole_filling_io_{}_{}",
            name,
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn meta_image_preserves_five_channels() {
        let dir = scratch_dir("mha");
        let raster = Raster::from_fn(4, 3, 5, |x, y| {
            (0..5).map(|c| (x * 100 + y * 10 + c) as f32 * 0.5).collect()
        });
        let path = dir.join("rgbdxdy.mha");
        write_meta_image(&raster, &path).unwrap();
        let back = read_meta_image(&path).unwrap();
        assert_eq!(back, raster);
    }

    #[test]
    fn meta_image_without_dims_is_rejected() {
        let dir = scratch_dir("bad_mha");
        let path = dir.join("broken.mha");
        fs::write(&path, b"NDims = 2\nElementType = MET_FLOAT\nElementDataFile = LOCAL\n").unwrap();
        let err = read_meta_image(&path).unwrap_err();
        assert!(err.to_string().contains("DimSize"), "{err}");
    }

    #[test]
    fn meta_image_with_overflowing_dims_is_rejected() {
        let dir = scratch_dir("huge_mha");
        let path = dir.join("huge.mha");
        let header = format!(
            "NDims = 2\nDimSize = {} {}\nElementNumberOfChannels = 5\n\
             ElementType = MET_FLOAT\nElementDataFile = LOCAL\n",
            usize::MAX / 2,
            3
        );
        fs::write(&path, header).unwrap();
        let err = read_meta_image(&path).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }), "{err}");
        assert!(err.to_string().contains("too large"), "{err}");
    }

    #[test]
    fn mask_descriptor_resolves_image_and_values() {
        let dir = scratch_dir("mask");
        let mut mask = ValidityMask::all_valid(5, 4);
        mask.set(2, 1, false);
        mask.set(3, 3, false);
        save_mask(&mask, &dir.join("holes.png")).unwrap();
        fs::write(
            dir.join("holes.mask"),
            "HoleValue 255\nValidValue 0\nholes.png\n",
        )
        .unwrap();

        let loaded = load_mask(&dir.join("holes.mask")).unwrap();
        assert_eq!(loaded, mask);
        let direct = load_mask(&dir.join("holes.png")).unwrap();
        assert_eq!(direct, mask);
    }

    #[test]
    fn mask_descriptor_rejects_unknown_pixel_values() {
        let dir = scratch_dir("mask_values");
        let mut img = GrayImage::new(2, 2);
        img.put_pixel(1, 1, Luma([128]));
        img.save(dir.join("odd.png")).unwrap();
        fs::write(dir.join("odd.mask"), "HoleValue 255\nValidValue 0\nodd.png\n").unwrap();
        assert!(load_mask(&dir.join("odd.mask")).is_err());
    }
}
