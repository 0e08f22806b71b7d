//! Image processing with no system libraries. Everything is pure Rust except
//! lossy WebP, which links a vendored, statically built libwebp.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Detect format** | magic bytes, then extension |
//! | **Decode / encode** | `image` codecs, one [`Codec`] per format |
//! | **AVIF decode** | `avif-parse` container + `rav1d` AV1 decoder |
//! | **Lossy WebP** | `webp` (libwebp) |
//! | **Plan dimensions** | pure integer math per resize style |
//! | **Resample** | `image::imageops::resize`, filter by scale direction |
//!
//! The module is split into:
//! - **Format**: [`FormatTag`] and the input/output resolution rules
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Codec**: [`Codec`] trait + [`BuiltinCodecs`]
//! - **Avif**: AV1 decode and YUV to RGB conversion
//! - **Resample**: Filtered scaling and center crops

mod avif;
pub mod codec;
mod calculations;
pub mod format;
mod params;
mod resample;

pub use calculations::{CropBox, Plan, PlanError, fill_crop_box, plan};
pub use codec::{BuiltinCodecs, Codec, CodecError, CodecProvider};
pub use format::{FormatTag, from_extension, parse_format, resolve_input, resolve_output, sniff};
pub use params::{
    DEFAULT_MAX_RASTER_BYTES, EncodeSpec, Filter, Quality, ResampleOptions, ResizeRequest,
    ResizeStyle, Speed,
};
pub use resample::{Direction, ResampleError, check_budget, crop_center, direction, resample};
