//! Format resolution: which encoding a file is in, and which one to write.
//!
//! Input files are identified by content first. Magic bytes are checked before
//! the extension because extensions lie (a `.png` that is really a JPEG decodes
//! fine as a JPEG). The extension is only consulted when sniffing finds nothing.
//!
//! Output formats come from, in order: the explicit `format` argument, the
//! output path's extension, and finally the input format. An explicit name is
//! authoritative: if it isn't in the closed set below, that's an error rather
//! than a fallback.

use crate::error::{Result, TranscodeError};
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Closed set of encodings the pipeline knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatTag {
    Jpeg,
    Png,
    WebP,
    Avif,
    Gif,
    Bmp,
    Tiff,
}

/// Names accepted for an explicit output format, and as file extensions.
const FORMAT_NAMES: &[(&str, FormatTag)] = &[
    ("jpg", FormatTag::Jpeg),
    ("jpeg", FormatTag::Jpeg),
    ("png", FormatTag::Png),
    ("webp", FormatTag::WebP),
    ("avif", FormatTag::Avif),
    ("gif", FormatTag::Gif),
    ("bmp", FormatTag::Bmp),
    ("tif", FormatTag::Tiff),
    ("tiff", FormatTag::Tiff),
];

impl FormatTag {
    pub const ALL: [FormatTag; 7] = [
        FormatTag::Jpeg,
        FormatTag::Png,
        FormatTag::WebP,
        FormatTag::Avif,
        FormatTag::Gif,
        FormatTag::Bmp,
        FormatTag::Tiff,
    ];

    /// Canonical lowercase name, as accepted by [`parse_format`].
    pub fn name(self) -> &'static str {
        match self {
            FormatTag::Jpeg => "jpeg",
            FormatTag::Png => "png",
            FormatTag::WebP => "webp",
            FormatTag::Avif => "avif",
            FormatTag::Gif => "gif",
            FormatTag::Bmp => "bmp",
            FormatTag::Tiff => "tiff",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            FormatTag::Jpeg => "image/jpeg",
            FormatTag::Png => "image/png",
            FormatTag::WebP => "image/webp",
            FormatTag::Avif => "image/avif",
            FormatTag::Gif => "image/gif",
            FormatTag::Bmp => "image/bmp",
            FormatTag::Tiff => "image/tiff",
        }
    }

    /// The `image` crate's identifier for this format.
    pub fn image_format(self) -> image::ImageFormat {
        match self {
            FormatTag::Jpeg => image::ImageFormat::Jpeg,
            FormatTag::Png => image::ImageFormat::Png,
            FormatTag::WebP => image::ImageFormat::WebP,
            FormatTag::Avif => image::ImageFormat::Avif,
            FormatTag::Gif => image::ImageFormat::Gif,
            FormatTag::Bmp => image::ImageFormat::Bmp,
            FormatTag::Tiff => image::ImageFormat::Tiff,
        }
    }

    /// Whether the format can carry an alpha channel.
    pub fn supports_alpha(self) -> bool {
        !matches!(self, FormatTag::Jpeg)
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn lookup_name(name: &str) -> Option<FormatTag> {
    let lower = name.to_ascii_lowercase();
    FORMAT_NAMES
        .iter()
        .find(|(n, _)| *n == lower)
        .map(|(_, tag)| *tag)
}

/// Detect a format from the leading bytes of a file.
///
/// Twelve bytes are enough for every signature checked here. Returns `None`
/// when nothing matches, including when `data` is too short.
pub fn sniff(data: &[u8]) -> Option<FormatTag> {
    // JPEG: FF D8 FF
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(FormatTag::Jpeg);
    }

    // PNG: 89 50 4E 47 0D 0A 1A 0A
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some(FormatTag::Png);
    }

    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return Some(FormatTag::Gif);
    }

    // WebP: RIFF....WEBP
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return Some(FormatTag::WebP);
    }

    // TIFF: II*\0 or MM\0*
    if data.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || data.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
    {
        return Some(FormatTag::Tiff);
    }

    // AVIF: ISO-BMFF ftyp box naming avif/avis as major or compatible brand
    if data.len() >= 12 && &data[4..8] == b"ftyp" && ftyp_has_avif_brand(data) {
        return Some(FormatTag::Avif);
    }

    // BMP: "BM" is short enough to collide with text, so check the reserved
    // header words too (bytes 6..10 are always zero).
    if data.len() >= 14 && data.starts_with(b"BM") && data[6..10] == [0, 0, 0, 0] {
        return Some(FormatTag::Bmp);
    }

    None
}

/// Checks the major brand at 8..12, then the compatible brands from offset 16
/// to the end of the box (as far as `data` reaches).
fn ftyp_has_avif_brand(data: &[u8]) -> bool {
    let is_avif = |brand: &[u8]| brand == b"avif" || brand == b"avis";
    if is_avif(&data[8..12]) {
        return true;
    }
    let box_len = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    let end = box_len.min(data.len());
    data.get(16..end)
        .is_some_and(|brands| brands.chunks_exact(4).any(is_avif))
}

/// Format implied by a path's extension, case-insensitive.
pub fn from_extension(path: &Path) -> Option<FormatTag> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(lookup_name)
}

/// Validate an explicitly requested output format name.
///
/// ```
/// use picpress::imaging::{FormatTag, parse_format};
///
/// assert_eq!(parse_format("JPG").unwrap(), FormatTag::Jpeg);
/// assert!(parse_format("bogus").is_err());
/// ```
pub fn parse_format(name: &str) -> Result<FormatTag> {
    lookup_name(name.trim()).ok_or_else(|| TranscodeError::InvalidFormat(name.to_string()))
}

/// Determine the format of an input file: content first, extension second.
pub fn resolve_input(path: &Path, data: &[u8]) -> Result<FormatTag> {
    if let Some(tag) = sniff(data) {
        return Ok(tag);
    }
    match from_extension(path) {
        Some(tag) => {
            tracing::warn!(
                path = %path.display(),
                format = %tag,
                "content sniffing inconclusive, trusting file extension"
            );
            Ok(tag)
        }
        None => Err(TranscodeError::InferFormat(path.to_path_buf())),
    }
}

/// Determine the format to write.
///
/// `explicit` wins when present and non-empty. Otherwise the output path's
/// extension is used if it names a format with an encoder, and failing that
/// the input format is reused. `can_encode` tells whether a candidate has an
/// encoder; the final candidate must, or the format can't be inferred.
pub fn resolve_output(
    output: &Path,
    explicit: Option<&str>,
    input: FormatTag,
    can_encode: impl Fn(FormatTag) -> bool,
) -> Result<FormatTag> {
    if let Some(name) = explicit.filter(|n| !n.trim().is_empty()) {
        let tag = parse_format(name)?;
        if !can_encode(tag) {
            return Err(TranscodeError::InvalidFormat(name.to_string()));
        }
        return Ok(tag);
    }

    if let Some(tag) = from_extension(output).filter(|t| can_encode(*t)) {
        return Ok(tag);
    }

    tracing::debug!(
        output = %output.display(),
        format = %input,
        "output extension gives no usable format, keeping input format"
    );
    if can_encode(input) {
        Ok(input)
    } else {
        Err(TranscodeError::NoEncoder(input))
    }
}
