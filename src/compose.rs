//! Channel compositing: stack independent rasters into one multi-channel
//! raster and extract sub-rasters back out by channel index.
//!
//! The 5-channel composite handed to the texture fill has a fixed layout
//! that any precomputed filled raster must honour: RGB in channels 0..3,
//! depth gradient (∂x, ∂y) in channels 3..5.
use crate::error::{Error, Result};
use crate::image::{ImageView, Raster};

/// Colour channels of the RGBDxDy composite.
pub const RGB_CHANNELS: [usize; 3] = [0, 1, 2];
/// Depth-gradient channels of the RGBDxDy composite.
pub const DEPTH_GRADIENT_CHANNELS: [usize; 2] = [3, 4];
/// Total channels of the RGBDxDy composite.
pub const RGBDXDY_CHANNELS: usize = 5;

/// Concatenate channels in input order. Input `i` occupies the output
/// channels starting at the sum of the channel counts before it.
pub fn stack(rasters: &[&Raster]) -> Result<Raster> {
    let first = rasters
        .first()
        .ok_or_else(|| Error::Config("cannot stack an empty raster list".to_string()))?;
    let region = first.region();
    for r in rasters {
        r.ensure_region(region)?;
    }
    let channels: usize = rasters.iter().map(|r| r.channels).sum();
    let mut out = Raster::with_region(region, channels);
    if channels == 0 {
        return Ok(out);
    }
    for (cell, dst) in out.data.chunks_exact_mut(channels).enumerate() {
        let mut offset = 0;
        for r in rasters {
            let src = &r.data[cell * r.channels..(cell + 1) * r.channels];
            dst[offset..offset + r.channels].copy_from_slice(src);
            offset += r.channels;
        }
    }
    Ok(out)
}

/// Select channels by index, in the order given (not necessarily ascending).
pub fn extract(raster: &Raster, channels: &[usize]) -> Result<Raster> {
    if let Some(&index) = channels.iter().find(|&&c| c >= raster.channels) {
        return Err(Error::ChannelOutOfRange {
            index,
            channels: raster.channels,
        });
    }
    let mut out = Raster::with_region(raster.region(), channels.len());
    if channels.is_empty() {
        return Ok(out);
    }
    for (src, dst) in raster
        .data
        .chunks_exact(raster.channels)
        .zip(out.data.chunks_exact_mut(channels.len()))
    {
        for (d, &c) in dst.iter_mut().zip(channels) {
            *d = src[c];
        }
    }
    Ok(out)
}

/// Channel indices occupied by each input of [`stack`], in input order.
pub fn channel_ranges(channel_counts: &[usize]) -> Vec<Vec<usize>> {
    let mut offset = 0;
    channel_counts
        .iter()
        .map(|&n| {
            let range = (offset..offset + n).collect();
            offset += n;
            range
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterned(channels: usize, seed: f32) -> Raster {
        Raster::from_fn(4, 3, channels, |x, y| {
            (0..channels)
                .map(|c| seed + (x * 31 + y * 7 + c) as f32)
                .collect()
        })
    }

    #[test]
    fn stack_then_extract_is_lossless() {
        let rgb = patterned(3, 0.0);
        let grad = patterned(2, 1000.0);
        let depth = patterned(1, -50.0);
        let stacked = stack(&[&rgb, &grad, &depth]).unwrap();
        assert_eq!(stacked.channels, 6);

        let ranges = channel_ranges(&[3, 2, 1]);
        assert_eq!(extract(&stacked, &ranges[0]).unwrap(), rgb);
        assert_eq!(extract(&stacked, &ranges[1]).unwrap(), grad);
        assert_eq!(extract(&stacked, &ranges[2]).unwrap(), depth);
    }

    #[test]
    fn rgbdxdy_layout_matches_constants() {
        let rgb = patterned(3, 0.0);
        let grad = patterned(2, 500.0);
        let composite = stack(&[&rgb, &grad]).unwrap();
        assert_eq!(composite.channels, RGBDXDY_CHANNELS);
        assert_eq!(extract(&composite, &RGB_CHANNELS).unwrap(), rgb);
        assert_eq!(extract(&composite, &DEPTH_GRADIENT_CHANNELS).unwrap(), grad);
    }

    #[test]
    fn extract_preserves_requested_order() {
        let grad = patterned(2, 0.0);
        let swapped = extract(&grad, &[1, 0]).unwrap();
        assert_eq!(swapped.get(2, 1, 0), grad.get(2, 1, 1));
        assert_eq!(swapped.get(2, 1, 1), grad.get(2, 1, 0));
    }

    #[test]
    fn out_of_range_channel_is_an_error() {
        let rgb = patterned(3, 0.0);
        let err = extract(&rgb, &[0, 3]).unwrap_err();
        assert!(matches!(
            err,
            Error::ChannelOutOfRange {
                index: 3,
                channels: 3
            }
        ));
    }

    #[test]
    fn stack_rejects_mismatched_regions() {
        let a = Raster::new(4, 3, 1);
        let b = Raster::new(3, 4, 1);
        assert!(matches!(
            stack(&[&a, &b]),
            Err(Error::DimensionMismatch { .. })
        ));
    }
}
