//! The transcoding pipeline: one input file in, one output file out.
//!
//! ```text
//! read → resolve input format → decode → resolve output format
//!      → plan dimensions → resample (+ fill crop) → encode → atomic write
//! ```
//!
//! Every stage maps its failure to a [`TranscodeError`] on the spot, so the
//! caller always gets exactly one error kind (see [`crate::error`]).
//!
//! ## Output atomicity
//!
//! Encoded bytes are written to a temporary file in the destination directory
//! and renamed over `output` only once complete. A failed run leaves any
//! existing file at `output` untouched and never leaves a truncated one. Two
//! runs writing the same `output` at the same time race on the rename; the
//! last one wins.
//!
//! ## Concurrency
//!
//! A run holds no global state. The decoded raster and any resampled copy are
//! owned by the call and dropped when it returns, so runs on separate threads
//! with separate paths don't interact.

use crate::error::{Result, STATUS_OK, TranscodeError};
use crate::imaging::{
    BuiltinCodecs, CodecError, CodecProvider, EncodeSpec, FormatTag, Plan, Quality,
    ResampleOptions, ResizeRequest, ResizeStyle, Speed, check_budget, crop_center,
    fill_crop_box, plan, resample, resolve_input, resolve_output,
};
use image::DynamicImage;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Full description of one transcode.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Explicit output format name. `None` or empty means infer.
    pub format: Option<String>,
    pub quality: Quality,
    pub speed: Speed,
    pub resize: ResizeRequest,
    pub resample: ResampleOptions,
}

impl TranscodeRequest {
    /// Same-size re-encode with default quality and speed.
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            format: None,
            quality: Quality::default(),
            speed: Speed::default(),
            resize: ResizeRequest::keep(),
            resample: ResampleOptions::default(),
        }
    }
}

/// A decoded input, owned by a single run.
#[derive(Debug)]
pub struct ImageSource {
    pub raster: DynamicImage,
    pub format: FormatTag,
}

impl ImageSource {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.raster.width(), self.raster.height())
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscodeReport {
    pub input_format: FormatTag,
    pub output_format: FormatTag,
    pub source_dimensions: (u32, u32),
    pub output_dimensions: (u32, u32),
    pub resampled: bool,
    pub bytes_written: usize,
}

/// Format and size of an image file on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub format: FormatTag,
    pub width: u32,
    pub height: u32,
    pub file_size: u64,
}

/// Run the pipeline with the built-in codecs.
pub fn transcode(request: &TranscodeRequest) -> Result<TranscodeReport> {
    transcode_with(&BuiltinCodecs, request)
}

/// Run the pipeline with the given codecs.
pub fn transcode_with(
    codecs: &impl CodecProvider,
    request: &TranscodeRequest,
) -> Result<TranscodeReport> {
    let data = fs::read(&request.input).map_err(|e| TranscodeError::io(&request.input, e))?;
    let input_format = resolve_input(&request.input, &data)?;
    tracing::debug!(input = %request.input.display(), format = %input_format, "resolved input");

    let source = decode(codecs, &request.input, input_format, &data)?;
    drop(data);
    let source_dimensions = source.dimensions();

    let output_format = resolve_output(
        &request.output,
        request.format.as_deref(),
        input_format,
        |tag| codecs.can_encode(tag),
    )?;

    let plan = plan(source_dimensions, &request.resize)?;
    tracing::debug!(
        style = %request.resize.style,
        from = ?source_dimensions,
        to = ?(plan.width, plan.height),
        needs_resample = plan.needs_resample,
        "planned dimensions"
    );

    let raster = apply_plan(source.raster, &plan, &request.resize, &request.resample)?;
    let output_dimensions = (raster.width(), raster.height());

    let spec = EncodeSpec {
        format: output_format,
        quality: request.quality,
        speed: request.speed,
    };
    let encoded = encode(codecs, &raster, &spec)?;
    drop(raster);

    write_atomic(&request.output, &encoded)?;
    tracing::debug!(
        output = %request.output.display(),
        format = %output_format,
        bytes = encoded.len(),
        "wrote output"
    );

    Ok(TranscodeReport {
        input_format,
        output_format,
        source_dimensions,
        output_dimensions,
        resampled: plan.needs_resample,
        bytes_written: encoded.len(),
    })
}

fn decode(
    codecs: &impl CodecProvider,
    path: &Path,
    format: FormatTag,
    data: &[u8],
) -> Result<ImageSource> {
    let decode_error = |source| TranscodeError::Decode {
        path: path.to_path_buf(),
        source,
    };
    let codec = codecs
        .codec(format)
        .ok_or_else(|| decode_error(CodecError::Unsupported(format!("no codec for {format}"))))?;
    let raster = codec.decode(data).map_err(decode_error)?;
    Ok(ImageSource { raster, format })
}

/// Resample to the plan, then trim `Fill` overflow when cropping is on.
///
/// A plan whose target raster would exceed `options.max_bytes` is rejected
/// before anything is allocated.
fn apply_plan(
    raster: DynamicImage,
    plan: &Plan,
    request: &ResizeRequest,
    options: &ResampleOptions,
) -> Result<DynamicImage> {
    if plan.needs_resample {
        check_budget(&raster, plan.width, plan.height, options.max_bytes)?;
    }
    let mut img = if plan.needs_resample {
        resample(&raster, plan.width, plan.height, options)?
    } else {
        raster
    };

    if request.style == ResizeStyle::Fill && options.crop_fill {
        if let Some(crop) = fill_crop_box((plan.width, plan.height), request) {
            img = crop_center(&img, crop)?;
        }
    }
    Ok(img)
}

fn encode(
    codecs: &impl CodecProvider,
    raster: &DynamicImage,
    spec: &EncodeSpec,
) -> Result<Vec<u8>> {
    let codec = codecs
        .codec(spec.format)
        .ok_or(TranscodeError::NoEncoder(spec.format))?;
    codec
        .encode(raster, spec)
        .map_err(|source| TranscodeError::Encode {
            format: spec.format,
            source,
        })
}

/// Write `bytes` to `path` through a temp file and rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let io_err = |e| TranscodeError::io(path, e);
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".picpress-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;

    // Temp files are created owner-only; give the result the permissions a
    // plain create would, or keep those of the file being replaced.
    let permissions = match fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(_) => default_permissions(),
    };
    if let Some(permissions) = permissions {
        tmp.as_file().set_permissions(permissions).map_err(io_err)?;
    }

    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[cfg(unix)]
fn default_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<fs::Permissions> {
    None
}

/// Read an image's format and dimensions without decoding its pixels.
pub fn identify(path: &Path) -> Result<ImageInfo> {
    identify_with(&BuiltinCodecs, path)
}

pub fn identify_with(codecs: &impl CodecProvider, path: &Path) -> Result<ImageInfo> {
    let data = fs::read(path).map_err(|e| TranscodeError::io(path, e))?;
    let format = resolve_input(path, &data)?;
    let decode_error = |source| TranscodeError::Decode {
        path: path.to_path_buf(),
        source,
    };
    let codec = codecs
        .codec(format)
        .ok_or_else(|| decode_error(CodecError::Unsupported(format!("no codec for {format}"))))?;
    let (width, height) = codec.dimensions(&data).map_err(decode_error)?;
    Ok(ImageInfo {
        path: path.to_path_buf(),
        format,
        width,
        height,
        file_size: data.len() as u64,
    })
}

/// Status-code entry point: `0` on success, a negative
/// [`ErrorKind`](crate::ErrorKind) code on failure.
///
/// `method` is the integer resize style (`0` default, `1` fill, `2` fit,
/// `3` exact). Out-of-range `quality` is clamped.
#[allow(clippy::too_many_arguments)]
pub fn compress_img(
    input: &str,
    output: &str,
    format: Option<&str>,
    quality: u8,
    width: u32,
    height: u32,
    method: i32,
    speed: u8,
) -> i32 {
    let result = ResizeStyle::try_from(method)
        .map_err(|m| TranscodeError::InvalidMethod(format!("unknown resize style {m}")))
        .and_then(|style| {
            let request = TranscodeRequest {
                format: format.map(str::to_string),
                quality: Quality::new(quality),
                speed: Speed(speed),
                resize: ResizeRequest::new(style, width, height),
                ..TranscodeRequest::new(input, output)
            };
            transcode(&request)
        });

    match result {
        Ok(_) => STATUS_OK,
        Err(err) => {
            tracing::debug!(error = %err, code = err.code(), "transcode failed");
            err.code()
        }
    }
}
