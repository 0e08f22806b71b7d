//! # picpress
//!
//! Single-image transcoding: read one picture, optionally resize it, and write
//! it back out in another format. Everything runs in-process: pure-Rust codecs
//! plus a statically built libwebp for lossy WebP, so the library links into a
//! host program (or a C caller through [`ffi`]) without system image libraries.
//!
//! # Pipeline
//!
//! ```text
//! input bytes ─► detect format ─► decode ─► plan size ─► resample ─► encode ─► output
//!                (magic, then      (codec)   (resize      (filter by   (codec)   (temp file
//!                 extension)                  style)       direction)             + rename)
//! ```
//!
//! Each run is independent: no global state, no caches. Callers on separate
//! threads with separate paths don't interact.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | The transcode run, `identify`, and the status-code entry point [`compress_img`] |
//! | [`imaging`] | Format detection, dimension planning, resampling, and per-format codecs |
//! | [`error`] | [`TranscodeError`] and the stable [`ErrorKind`] status codes |
//! | [`config`] | Layered `picpress.toml` loading: stock defaults, then the user file |
//! | [`output`] | CLI output formatting for transcode reports and image info |
//! | [`ffi`] | `compress_img_c`, the C ABI over [`compress_img`] |
//!
//! # Design Decisions
//!
//! ## Magic Bytes Over Extensions
//!
//! The input format comes from the file's leading bytes. The extension is only
//! consulted when the bytes are unrecognized, so a mislabeled `photo.png` that
//! is really a JPEG still decodes.
//!
//! ## Stable Status Codes
//!
//! Every failure maps to exactly one [`ErrorKind`], whose integer value is part
//! of the C interface. Richer context (paths, codec messages) travels in
//! [`TranscodeError`] for Rust callers and in `tracing` events for everyone.
//!
//! ## Filter By Direction
//!
//! Shrinking uses Lanczos3 and enlarging uses Catmull-Rom by default. Both are
//! configurable under `[resize]` in `picpress.toml`.
//!
//! ## Bounded Allocation
//!
//! A resize whose rasters would exceed 512 MiB (`[resize] max_bytes`) fails
//! with [`ErrorKind::Image`] before allocating. Decoders use the `image`
//! crate's default limits, which share that ceiling.

pub mod config;
pub mod error;
pub mod ffi;
pub mod imaging;
pub mod output;
pub mod pipeline;

pub use error::{ErrorKind, STATUS_OK, TranscodeError};
pub use pipeline::{
    ImageInfo, TranscodeReport, TranscodeRequest, compress_img, identify, transcode,
};

#[cfg(test)]
pub(crate) mod test_helpers;
