//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.
//!
//! Each [`ResizeStyle`] has its own planning function so the tie-break rules
//! stay separate:
//!
//! | Style | Scale factor | Aspect ratio |
//! |---|---|---|
//! | `Default` | 1 | kept |
//! | `Fit` | `min(w / src_w, h / src_h)` | kept |
//! | `Fill` | `max(w / src_w, h / src_h)` | kept |
//! | `Exact` | per axis | ignored |
//!
//! For `Fit` and `Fill` a requested dimension of 0 leaves that axis unbounded;
//! both zero behaves like `Default`. The constraining axis always lands on the
//! requested value exactly, only the other one is rounded.

use super::params::{ResizeRequest, ResizeStyle};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("exact resize needs both width and height, got {width}x{height}")]
    ExactNeedsBothDimensions { width: u32, height: u32 },
    #[error("source image has no pixels ({width}x{height})")]
    EmptySource { width: u32, height: u32 },
}

/// Planned output dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub width: u32,
    pub height: u32,
    /// False only when the target equals the source exactly.
    pub needs_resample: bool,
}

/// A rectangle to cut out of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Compute target dimensions for `source` under `request`.
///
/// # Examples
/// ```
/// # use picpress::imaging::{ResizeRequest, ResizeStyle, plan};
/// // 800x600 fit into 400x400 → width constrains → 400x300
/// let p = plan((800, 600), &ResizeRequest::new(ResizeStyle::Fit, 400, 400)).unwrap();
/// assert_eq!((p.width, p.height), (400, 300));
///
/// // Default never resizes
/// let p = plan((800, 600), &ResizeRequest::new(ResizeStyle::Default, 10, 10)).unwrap();
/// assert!(!p.needs_resample);
/// ```
pub fn plan(source: (u32, u32), request: &ResizeRequest) -> Result<Plan, PlanError> {
    let (src_w, src_h) = source;
    if src_w == 0 || src_h == 0 {
        return Err(PlanError::EmptySource {
            width: src_w,
            height: src_h,
        });
    }

    let requested = (request.width, request.height);
    let (width, height) = match request.style {
        ResizeStyle::Default => plan_default(source),
        ResizeStyle::Fit => plan_fit(source, requested),
        ResizeStyle::Fill => plan_fill(source, requested),
        ResizeStyle::Exact => plan_exact(requested)?,
    };

    Ok(Plan {
        width,
        height,
        needs_resample: (width, height) != source,
    })
}

fn plan_default(source: (u32, u32)) -> (u32, u32) {
    source
}

/// Largest size that fits inside the box, aspect ratio preserved.
fn plan_fit(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    match target {
        (0, 0) => source,
        (w, 0) => (w, scale_axis(src_h, w, src_w).max(1)),
        (0, h) => (scale_axis(src_w, h, src_h).max(1), h),
        (w, h) => {
            // w / src_w <= h / src_h, cross-multiplied
            if u64::from(w) * u64::from(src_h) <= u64::from(h) * u64::from(src_w) {
                (w, scale_axis(src_h, w, src_w).clamp(1, h))
            } else {
                (scale_axis(src_w, h, src_h).clamp(1, w), h)
            }
        }
    }
}

/// Smallest size that covers the box, aspect ratio preserved.
///
/// One dimension matches the target exactly, the other may exceed it.
fn plan_fill(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    match target {
        (0, 0) => source,
        (w, 0) => (w, scale_axis(src_h, w, src_w).max(1)),
        (0, h) => (scale_axis(src_w, h, src_h).max(1), h),
        (w, h) => {
            // w / src_w >= h / src_h: source is taller, width matches
            if u64::from(w) * u64::from(src_h) >= u64::from(h) * u64::from(src_w) {
                (w, scale_axis(src_h, w, src_w).max(h))
            } else {
                (scale_axis(src_w, h, src_h).max(w), h)
            }
        }
    }
}

fn plan_exact(target: (u32, u32)) -> Result<(u32, u32), PlanError> {
    match target {
        (w, h) if w > 0 && h > 0 => Ok((w, h)),
        (width, height) => Err(PlanError::ExactNeedsBothDimensions { width, height }),
    }
}

/// `round(len * num / den)`, in integers, saturating at `u32::MAX`.
fn scale_axis(len: u32, num: u32, den: u32) -> u32 {
    let den = u64::from(den);
    let scaled = (u64::from(len) * u64::from(num) + den / 2) / den;
    u32::try_from(scaled).unwrap_or(u32::MAX)
}

/// Centered box that trims a `Fill` result down to the requested size.
///
/// Axes left unspecified (0) are not cropped. Returns `None` when there is
/// nothing to trim.
pub fn fill_crop_box(planned: (u32, u32), request: &ResizeRequest) -> Option<CropBox> {
    let (pw, ph) = planned;
    let cw = if request.width == 0 { pw } else { request.width.min(pw) };
    let ch = if request.height == 0 { ph } else { request.height.min(ph) };

    if (cw, ch) == planned {
        return None;
    }

    Some(CropBox {
        x: (pw - cw) / 2,
        y: (ph - ch) / 2,
        width: cw,
        height: ch,
    })
}
