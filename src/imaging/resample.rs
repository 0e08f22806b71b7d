//! Resampling a decoded raster to planned dimensions.
//!
//! The filter is picked by scale direction. When neither axis grows the
//! downscale filter runs (Lanczos3 by default); `image::imageops::resize`
//! widens the kernel support by the shrink ratio on each axis, so every source
//! pixel under an output pixel contributes and the result is low-passed rather
//! than aliased. When any axis grows the upscale filter runs (Catmull-Rom by
//! default), which interpolates smoothly without Lanczos ringing.
//!
//! The color model of the input is kept: an RGBA8 raster comes back RGBA8, a
//! 16-bit grayscale raster comes back 16-bit grayscale.

use super::calculations::CropBox;
use super::params::ResampleOptions;
use image::DynamicImage;
use image::imageops::FilterType;
use thiserror::Error;

/// `imageops::resize` runs through an RGBA `f32` buffer, source width by
/// target height, before the final pass.
const WORKING_BYTES_PER_PIXEL: u64 = 16;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResampleError {
    #[error("target dimensions {width}x{height} contain no pixels")]
    EmptyTarget { width: u32, height: u32 },
    #[error("target raster {width}x{height} needs more than the {limit} byte budget")]
    TooLarge { width: u32, height: u32, limit: u64 },
    #[error("crop box {width}x{height}+{x}+{y} is outside a {source_width}x{source_height} image")]
    CropOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        source_width: u32,
        source_height: u32,
    },
}

/// Which way the raster is being scaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Down,
    Up,
}

pub fn direction(source: (u32, u32), target: (u32, u32)) -> Direction {
    if target.0 <= source.0 && target.1 <= source.1 {
        Direction::Down
    } else {
        Direction::Up
    }
}

fn select_filter(source: (u32, u32), target: (u32, u32), options: &ResampleOptions) -> FilterType {
    match direction(source, target) {
        Direction::Down => options.downscale.filter_type(),
        Direction::Up => options.upscale.filter_type(),
    }
}

/// Fail unless resampling `img` to `width` x `height` stays within `max_bytes`,
/// counting both the output raster and the working buffer.
pub fn check_budget(
    img: &DynamicImage,
    width: u32,
    height: u32,
    max_bytes: u64,
) -> Result<(), ResampleError> {
    let bytes = |w: u32, h: u32, per_pixel: u64| {
        u64::from(w)
            .checked_mul(u64::from(h))
            .and_then(|px| px.checked_mul(per_pixel))
    };
    let output = bytes(width, height, u64::from(img.color().bytes_per_pixel()));
    let working = bytes(img.width(), height, WORKING_BYTES_PER_PIXEL);
    let fits = |b: Option<u64>| b.is_some_and(|b| b <= max_bytes);
    if fits(output) && fits(working) {
        Ok(())
    } else {
        Err(ResampleError::TooLarge {
            width,
            height,
            limit: max_bytes,
        })
    }
}

/// Produce a new raster of exactly `width` x `height`.
pub fn resample(
    img: &DynamicImage,
    width: u32,
    height: u32,
    options: &ResampleOptions,
) -> Result<DynamicImage, ResampleError> {
    if width == 0 || height == 0 {
        return Err(ResampleError::EmptyTarget { width, height });
    }

    check_budget(img, width, height, options.max_bytes)?;

    let source = (img.width(), img.height());
    let filter = select_filter(source, (width, height), options);
    tracing::debug!(
        from = ?source,
        to = ?(width, height),
        ?filter,
        "resampling"
    );
    Ok(img.resize_exact(width, height, filter))
}

/// Cut `crop` out of `img`. The box must lie inside the image.
pub fn crop_center(img: &DynamicImage, crop: CropBox) -> Result<DynamicImage, ResampleError> {
    let fits_x = crop.x.checked_add(crop.width).is_some_and(|r| r <= img.width());
    let fits_y = crop.y.checked_add(crop.height).is_some_and(|b| b <= img.height());
    if !fits_x || !fits_y || crop.width == 0 || crop.height == 0 {
        return Err(ResampleError::CropOutOfBounds {
            x: crop.x,
            y: crop.y,
            width: crop.width,
            height: crop.height,
            source_width: img.width(),
            source_height: img.height(),
        });
    }
    Ok(img.crop_imm(crop.x, crop.y, crop.width, crop.height))
}
