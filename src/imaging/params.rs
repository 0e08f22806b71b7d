//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the [`pipeline`](crate::pipeline) (which decides what to
//! produce) and the codecs and resampler (which do the pixel work).
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`Speed`]: Encoder effort. Raw value; each codec maps it into its own range.
//! - [`ResizeStyle`] / [`ResizeRequest`]: How requested dimensions relate to the source.
//! - [`EncodeSpec`]: Output format plus quality and speed.
//! - [`Filter`] / [`ResampleOptions`]: Interpolation choices for the resampler.

use super::format::FormatTag;
use crate::error::TranscodeError;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest raster the resampler and decoders will allocate, in bytes.
/// Same ceiling as `image::Limits::default().max_alloc`.
pub const DEFAULT_MAX_RASTER_BYTES: u64 = 512 * 1024 * 1024;

/// Quality setting for lossy image encoding (1-100).
///
/// Quality is advisory, so out-of-range values are clamped instead of rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Encoder speed/effort trade-off. Higher is faster with worse compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Speed(pub u8);

impl Speed {
    pub fn value(self) -> u8 {
        self.0
    }

    /// Speed clamped into `[min, max]`, for codecs with a narrower scale.
    pub fn within(self, min: u8, max: u8) -> u8 {
        self.0.clamp(min, max)
    }
}

impl Default for Speed {
    fn default() -> Self {
        Self(6)
    }
}

/// Policy governing how requested dimensions interact with the source aspect ratio.
///
/// The discriminants are the integers used at the C boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeStyle {
    /// Keep the source dimensions.
    #[default]
    Default = 0,
    /// Cover the requested box, preserving aspect ratio.
    Fill = 1,
    /// Fit inside the requested box, preserving aspect ratio.
    Fit = 2,
    /// Use the requested dimensions verbatim.
    Exact = 3,
}

impl ResizeStyle {
    pub fn name(self) -> &'static str {
        match self {
            ResizeStyle::Default => "default",
            ResizeStyle::Fill => "fill",
            ResizeStyle::Fit => "fit",
            ResizeStyle::Exact => "exact",
        }
    }
}

impl TryFrom<i32> for ResizeStyle {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ResizeStyle::Default),
            1 => Ok(ResizeStyle::Fill),
            2 => Ok(ResizeStyle::Fit),
            3 => Ok(ResizeStyle::Exact),
            other => Err(other),
        }
    }
}

/// Case-insensitive style name; anything else is an invalid method.
impl FromStr for ResizeStyle {
    type Err = TranscodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(ResizeStyle::Default),
            "fill" => Ok(ResizeStyle::Fill),
            "fit" => Ok(ResizeStyle::Fit),
            "exact" => Ok(ResizeStyle::Exact),
            _ => Err(TranscodeError::InvalidMethod(format!(
                "unknown resize style '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for ResizeStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A resize request. A width or height of 0 means "unspecified".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResizeRequest {
    pub style: ResizeStyle,
    pub width: u32,
    pub height: u32,
}

impl ResizeRequest {
    pub fn new(style: ResizeStyle, width: u32, height: u32) -> Self {
        Self {
            style,
            width,
            height,
        }
    }

    /// No resize at all.
    pub fn keep() -> Self {
        Self::default()
    }
}

/// Everything an encoder needs besides the pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeSpec {
    pub format: FormatTag,
    pub quality: Quality,
    pub speed: Speed,
}

/// Interpolation filters exposed through configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Filter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl Filter {
    pub fn filter_type(self) -> FilterType {
        match self {
            Filter::Nearest => FilterType::Nearest,
            Filter::Triangle => FilterType::Triangle,
            Filter::CatmullRom => FilterType::CatmullRom,
            Filter::Gaussian => FilterType::Gaussian,
            Filter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Resampling choices that don't change the planned dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResampleOptions {
    /// Filter used when no axis grows.
    pub downscale: Filter,
    /// Filter used when any axis grows.
    pub upscale: Filter,
    /// Center-crop `Fill` results to the requested box.
    pub crop_fill: bool,
    /// Byte ceiling for any raster the pipeline allocates.
    pub max_bytes: u64,
}

impl Default for ResampleOptions {
    fn default() -> Self {
        Self {
            downscale: Filter::Lanczos3,
            upscale: Filter::CatmullRom,
            crop_fill: true,
            max_bytes: DEFAULT_MAX_RASTER_BYTES,
        }
    }
}
