//! Codec capability: bytes in, raster out, and back.
//!
//! The [`Codec`] trait defines the three operations every format must support:
//! decode, encode, and a cheap dimensions read. There is one implementation per
//! [`FormatTag`], and a [`CodecProvider`] hands out the right one, so adding a
//! format never touches the pipeline.
//!
//! ## Crate mapping
//!
//! | Format | Decode | Encode |
//! |---|---|---|
//! | JPEG | `image` | `JpegEncoder`, quality 1–100 |
//! | PNG | `image` | `PngEncoder`, speed picks the compression level |
//! | WebP | `image` | `webp` (libwebp) lossy at quality 1–99, `WebPEncoder` lossless at 100 |
//! | AVIF | `avif-parse` + `rav1d` | `AvifEncoder` (rav1e), quality 1–100, speed 1–10 |
//! | GIF, BMP, TIFF | `image` | `DynamicImage::write_to` |
//!
//! Alpha is kept for every format whose [`FormatTag::supports_alpha`] says it
//! can carry it, and dropped (not composited) otherwise. AVIF decoding is in
//! [`super::avif`]; it yields RGB8.

use super::avif;
use super::format::FormatTag;
use super::params::EncodeSpec;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageReader};
use std::borrow::Cow;
use std::io::Cursor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Unsupported: {0}")]
    Unsupported(String),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error("Malformed container: {0}")]
    Container(String),
    #[error("AV1 decode: {0}")]
    Av1(String),
    #[error("WebP encode: {0}")]
    Webp(String),
    #[error("Decoded raster {width}x{height} exceeds the {limit} byte budget")]
    TooLarge { width: u32, height: u32, limit: u64 },
}

/// Encode/decode for a single format.
///
/// Implementations are stateless, so one instance is shared by every
/// invocation on every thread.
pub trait Codec: Send + Sync {
    fn format(&self) -> FormatTag;

    /// Decode a complete file into a raster.
    fn decode(&self, data: &[u8]) -> Result<DynamicImage, CodecError> {
        image::load_from_memory_with_format(data, self.format().image_format())
            .map_err(CodecError::from)
    }

    /// Encode a raster into a complete file.
    fn encode(&self, img: &DynamicImage, spec: &EncodeSpec) -> Result<Vec<u8>, CodecError>;

    /// Read dimensions from headers without decoding pixels.
    fn dimensions(&self, data: &[u8]) -> Result<(u32, u32), CodecError> {
        let mut reader = ImageReader::new(Cursor::new(data));
        reader.set_format(self.format().image_format());
        reader.into_dimensions().map_err(CodecError::from)
    }
}

/// Looks up the codec for a format.
pub trait CodecProvider: Sync {
    fn codec(&self, format: FormatTag) -> Option<&dyn Codec>;

    fn can_encode(&self, format: FormatTag) -> bool {
        self.codec(format).is_some()
    }
}

// ============================================================================
// Color normalization
// ============================================================================

/// Flatten to 8-bit RGB, or RGBA when the image has alpha and `format` can
/// store it.
///
/// Most encoders here only take 8-bit RGB(A). Already-conforming rasters are
/// borrowed, not copied.
fn to_rgb8_or_rgba8(img: &DynamicImage, format: FormatTag) -> Cow<'_, DynamicImage> {
    let keep_alpha = format.supports_alpha();
    match img {
        DynamicImage::ImageRgb8(_) => Cow::Borrowed(img),
        DynamicImage::ImageRgba8(_) if keep_alpha => Cow::Borrowed(img),
        _ if keep_alpha && img.color().has_alpha() => {
            Cow::Owned(DynamicImage::ImageRgba8(img.to_rgba8()))
        }
        _ => Cow::Owned(DynamicImage::ImageRgb8(img.to_rgb8())),
    }
}

fn encode_into(img: &DynamicImage, format: image::ImageFormat) -> Result<Vec<u8>, CodecError> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format)?;
    Ok(buf.into_inner())
}

// ============================================================================
// Per-format codecs
// ============================================================================

pub struct JpegCodec;

impl Codec for JpegCodec {
    fn format(&self) -> FormatTag {
        FormatTag::Jpeg
    }

    fn encode(&self, img: &DynamicImage, spec: &EncodeSpec) -> Result<Vec<u8>, CodecError> {
        let rgb = to_rgb8_or_rgba8(img, self.format());
        let mut buf = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buf, spec.quality.value());
        rgb.write_with_encoder(encoder)?;
        Ok(buf)
    }
}

pub struct PngCodec;

impl PngCodec {
    /// Higher speed means less effort. Lossless, so quality doesn't apply.
    fn compression(speed: u8) -> CompressionType {
        match speed {
            0..=3 => CompressionType::Best,
            4..=7 => CompressionType::Default,
            _ => CompressionType::Fast,
        }
    }
}

impl Codec for PngCodec {
    fn format(&self) -> FormatTag {
        FormatTag::Png
    }

    fn encode(&self, img: &DynamicImage, spec: &EncodeSpec) -> Result<Vec<u8>, CodecError> {
        // PNG stores 8 and 16 bit samples; float rasters are brought down to 8 bit.
        let img = match img {
            DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
                to_rgb8_or_rgba8(img, self.format())
            }
            _ => Cow::Borrowed(img),
        };
        let mut buf = Vec::new();
        let encoder = PngEncoder::new_with_quality(
            &mut buf,
            Self::compression(spec.speed.value()),
            image::codecs::png::FilterType::Adaptive,
        );
        img.write_with_encoder(encoder)?;
        Ok(buf)
    }
}

pub struct WebpCodec;

impl Codec for WebpCodec {
    fn format(&self) -> FormatTag {
        FormatTag::WebP
    }

    /// Lossy through libwebp at the requested quality; quality 100 switches
    /// to the pure Rust lossless encoder.
    fn encode(&self, img: &DynamicImage, spec: &EncodeSpec) -> Result<Vec<u8>, CodecError> {
        let img = to_rgb8_or_rgba8(img, self.format());
        if spec.quality.value() >= 100 {
            let mut buf = Vec::new();
            img.write_with_encoder(WebPEncoder::new_lossless(&mut buf))?;
            return Ok(buf);
        }

        let encoder = match img.as_ref() {
            DynamicImage::ImageRgba8(rgba) => {
                webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height())
            }
            DynamicImage::ImageRgb8(rgb) => {
                webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height())
            }
            other => {
                return Err(CodecError::Webp(format!(
                    "unexpected color type {:?}",
                    other.color()
                )));
            }
        };
        let memory = encoder
            .encode_simple(false, f32::from(spec.quality.value()))
            .map_err(|e| CodecError::Webp(format!("{e:?}")))?;
        Ok(memory.to_vec())
    }
}

pub struct AvifCodec;

impl Codec for AvifCodec {
    fn format(&self) -> FormatTag {
        FormatTag::Avif
    }

    fn decode(&self, data: &[u8]) -> Result<DynamicImage, CodecError> {
        avif::decode(data)
    }

    fn encode(&self, img: &DynamicImage, spec: &EncodeSpec) -> Result<Vec<u8>, CodecError> {
        let img = to_rgb8_or_rgba8(img, self.format());
        let mut buf = Vec::new();
        let encoder = AvifEncoder::new_with_speed_quality(
            &mut buf,
            spec.speed.within(1, 10),
            spec.quality.value(),
        );
        img.write_with_encoder(encoder)?;
        Ok(buf)
    }

    /// Dimensions from the container's primary item, no AV1 decode needed.
    fn dimensions(&self, data: &[u8]) -> Result<(u32, u32), CodecError> {
        let avif = avif_parse::read_avif(&mut Cursor::new(data))
            .map_err(|e| CodecError::Container(format!("{e:?}")))?;
        let meta = avif
            .primary_item_metadata()
            .map_err(|e| CodecError::Container(format!("{e:?}")))?;
        Ok((meta.max_frame_width.get(), meta.max_frame_height.get()))
    }
}

/// GIF, BMP and TIFF: no tunables, encoded through `write_to`.
pub struct PlainCodec(FormatTag);

impl Codec for PlainCodec {
    fn format(&self) -> FormatTag {
        self.0
    }

    fn encode(&self, img: &DynamicImage, _spec: &EncodeSpec) -> Result<Vec<u8>, CodecError> {
        let img = match self.0 {
            // The GIF encoder works on RGBA frames.
            FormatTag::Gif => Cow::Owned(DynamicImage::ImageRgba8(img.to_rgba8())),
            _ => to_rgb8_or_rgba8(img, self.0),
        };
        encode_into(&img, self.0.image_format())
    }
}

// ============================================================================
// Built-in provider
// ============================================================================

static JPEG: JpegCodec = JpegCodec;
static PNG: PngCodec = PngCodec;
static WEBP: WebpCodec = WebpCodec;
static AVIF: AvifCodec = AvifCodec;
static GIF: PlainCodec = PlainCodec(FormatTag::Gif);
static BMP: PlainCodec = PlainCodec(FormatTag::Bmp);
static TIFF: PlainCodec = PlainCodec(FormatTag::Tiff);

/// Codecs backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCodecs;

impl CodecProvider for BuiltinCodecs {
    fn codec(&self, format: FormatTag) -> Option<&dyn Codec> {
        let codec: &dyn Codec = match format {
            FormatTag::Jpeg => &JPEG,
            FormatTag::Png => &PNG,
            FormatTag::WebP => &WEBP,
            FormatTag::Avif => &AVIF,
            FormatTag::Gif => &GIF,
            FormatTag::Bmp => &BMP,
            FormatTag::Tiff => &TIFF,
        };
        Some(codec)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::format::sniff;
    use crate::imaging::params::{Quality, Speed};
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use std::sync::Mutex;

    fn spec(format: FormatTag) -> EncodeSpec {
        EncodeSpec {
            format,
            quality: Quality::new(85),
            speed: Speed(8),
        }
    }

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    #[test]
    fn every_format_has_a_builtin_codec() {
        for tag in FormatTag::ALL {
            let codec = BuiltinCodecs.codec(tag).unwrap();
            assert_eq!(codec.format(), tag);
            assert!(BuiltinCodecs.can_encode(tag));
        }
    }

    #[test]
    fn encoded_bytes_sniff_as_their_format() {
        let img = gradient(32, 24);
        for tag in FormatTag::ALL {
            let bytes = BuiltinCodecs
                .codec(tag)
                .unwrap()
                .encode(&img, &spec(tag))
                .unwrap();
            assert_eq!(sniff(&bytes), Some(tag), "{tag}");
        }
    }

    #[test]
    fn every_format_round_trips_dimensions() {
        let img = gradient(40, 30);
        for tag in FormatTag::ALL {
            let codec = BuiltinCodecs.codec(tag).unwrap();
            let bytes = codec.encode(&img, &spec(tag)).unwrap();
            let decoded = codec.decode(&bytes).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (40, 30), "{tag}");
            assert_eq!(codec.dimensions(&bytes).unwrap(), (40, 30), "{tag}");
        }
    }

    #[test]
    fn avif_dimensions_from_container() {
        let bytes = AVIF.encode(&gradient(64, 48), &spec(FormatTag::Avif)).unwrap();
        assert_eq!(AVIF.dimensions(&bytes).unwrap(), (64, 48));
    }

    #[test]
    fn avif_decodes_to_rgb_close_to_source() {
        let flat = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([200, 60, 30])));
        let spec = EncodeSpec {
            quality: Quality::new(95),
            ..spec(FormatTag::Avif)
        };
        let bytes = AVIF.encode(&flat, &spec).unwrap();
        let decoded = AVIF.decode(&bytes).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
        assert_eq!((decoded.width(), decoded.height()), (32, 32));

        let center = decoded.to_rgb8().get_pixel(16, 16).0;
        for (got, want) in center.iter().zip([200u8, 60, 30]) {
            assert!(got.abs_diff(want) <= 24, "{center:?}");
        }
    }

    #[test]
    fn truncated_avif_fails_to_decode() {
        let bytes = AVIF.encode(&gradient(16, 16), &spec(FormatTag::Avif)).unwrap();
        assert!(AVIF.decode(&bytes[..bytes.len() / 2]).is_err());
    }

    #[test]
    fn jpeg_drops_alpha() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([255, 0, 0, 128])));
        let bytes = JPEG.encode(&rgba, &spec(FormatTag::Jpeg)).unwrap();
        let decoded = JPEG.decode(&bytes).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
    }

    #[test]
    fn webp_keeps_alpha() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([0, 255, 0, 10])));
        for quality in [80, 100] {
            let spec = EncodeSpec {
                quality: Quality::new(quality),
                ..spec(FormatTag::WebP)
            };
            let bytes = WEBP.encode(&rgba, &spec).unwrap();
            let decoded = WEBP.decode(&bytes).unwrap();
            assert!(decoded.color().has_alpha(), "quality {quality}");
        }
    }

    #[test]
    fn alpha_follows_format_support() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::new(4, 4));
        for tag in FormatTag::ALL {
            let flat = to_rgb8_or_rgba8(&rgba, tag);
            assert_eq!(flat.color().has_alpha(), tag.supports_alpha(), "{tag}");
        }
    }

    fn encoded_len(codec: &dyn Codec, img: &DynamicImage, quality: u8) -> usize {
        codec
            .encode(
                img,
                &EncodeSpec {
                    format: codec.format(),
                    quality: Quality::new(quality),
                    speed: Speed::default(),
                },
            )
            .unwrap()
            .len()
    }

    #[test]
    fn jpeg_quality_is_monotonic_in_size() {
        let img = gradient(128, 128);
        assert!(encoded_len(&JPEG, &img, 20) < encoded_len(&JPEG, &img, 95));
    }

    #[test]
    fn webp_quality_is_monotonic_in_size() {
        let img = gradient(128, 128);
        assert!(encoded_len(&WEBP, &img, 20) < encoded_len(&WEBP, &img, 95));
    }

    #[test]
    fn webp_at_full_quality_is_lossless() {
        let img = gradient(24, 16);
        let spec = EncodeSpec {
            quality: Quality::new(100),
            ..spec(FormatTag::WebP)
        };
        let decoded = WEBP.decode(&WEBP.encode(&img, &spec).unwrap()).unwrap();
        assert_eq!(decoded.to_rgb8(), img.to_rgb8());
    }

    #[test]
    fn png_compression_follows_speed() {
        assert!(matches!(PngCodec::compression(0), CompressionType::Best));
        assert!(matches!(PngCodec::compression(6), CompressionType::Default));
        assert!(matches!(PngCodec::compression(255), CompressionType::Fast));
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(PNG.decode(b"\x89PNG\r\n\x1a\nnot really").is_err());
        assert!(JPEG.decode(&[0xFF, 0xD8, 0xFF, 0x00]).is_err());
    }

    #[test]
    fn sixteen_bit_input_encodes_as_jpeg() {
        let img = DynamicImage::ImageRgb16(image::ImageBuffer::from_pixel(
            8,
            8,
            Rgb([1000u16, 2000, 3000]),
        ));
        assert!(JPEG.encode(&img, &spec(FormatTag::Jpeg)).is_ok());
    }

    // =========================================================================
    // Recording mock, shared with pipeline tests
    // =========================================================================

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode(FormatTag),
        Encode {
            format: FormatTag,
            width: u32,
            height: u32,
            quality: u8,
            speed: u8,
        },
    }

    /// Codec that records calls and fabricates results without real coding.
    ///
    /// Decoding yields a flat image of `dims`; encoding yields a tiny byte
    /// string starting with the format's real magic bytes so sniffing works.
    pub struct MockCodec {
        format: FormatTag,
        dims: (u32, u32),
        fail_decode: bool,
        fail_encode: bool,
        ops: Mutex<Vec<RecordedOp>>,
    }

    impl MockCodec {
        fn magic(format: FormatTag) -> &'static [u8] {
            match format {
                FormatTag::Jpeg => &[0xFF, 0xD8, 0xFF, 0xE0],
                FormatTag::Png => &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A],
                FormatTag::WebP => b"RIFF\0\0\0\0WEBP",
                FormatTag::Avif => b"\0\0\0\x1cftypavif",
                FormatTag::Gif => b"GIF89a",
                FormatTag::Bmp => b"BM\0\0\0\0\0\0\0\0\0\0\0\0",
                FormatTag::Tiff => &[0x49, 0x49, 0x2A, 0x00],
            }
        }
    }

    impl Codec for MockCodec {
        fn format(&self) -> FormatTag {
            self.format
        }

        fn decode(&self, _data: &[u8]) -> Result<DynamicImage, CodecError> {
            self.ops.lock().unwrap().push(RecordedOp::Decode(self.format));
            if self.fail_decode {
                return Err(CodecError::Unsupported("mock decode failure".into()));
            }
            Ok(DynamicImage::ImageRgb8(RgbImage::new(self.dims.0, self.dims.1)))
        }

        fn encode(&self, img: &DynamicImage, spec: &EncodeSpec) -> Result<Vec<u8>, CodecError> {
            self.ops.lock().unwrap().push(RecordedOp::Encode {
                format: spec.format,
                width: img.width(),
                height: img.height(),
                quality: spec.quality.value(),
                speed: spec.speed.value(),
            });
            if self.fail_encode {
                return Err(CodecError::Unsupported("mock encode failure".into()));
            }
            Ok(Self::magic(self.format).to_vec())
        }

        fn dimensions(&self, _data: &[u8]) -> Result<(u32, u32), CodecError> {
            Ok(self.dims)
        }
    }

    /// Provider of [`MockCodec`]s, one per format, sharing settings.
    pub struct MockCodecs {
        codecs: Vec<MockCodec>,
    }

    impl MockCodecs {
        pub fn with_dimensions(dims: (u32, u32)) -> Self {
            Self::build(dims, false, false)
        }

        pub fn failing_decode() -> Self {
            Self::build((10, 10), true, false)
        }

        pub fn failing_encode(dims: (u32, u32)) -> Self {
            Self::build(dims, false, true)
        }

        fn build(dims: (u32, u32), fail_decode: bool, fail_encode: bool) -> Self {
            let codecs = FormatTag::ALL
                .into_iter()
                .map(|format| MockCodec {
                    format,
                    dims,
                    fail_decode,
                    fail_encode,
                    ops: Mutex::new(Vec::new()),
                })
                .collect();
            Self { codecs }
        }

        /// All recorded operations, across formats, decode calls first.
        pub fn get_operations(&self) -> Vec<RecordedOp> {
            let mut ops: Vec<RecordedOp> = self
                .codecs
                .iter()
                .flat_map(|c| c.ops.lock().unwrap().clone())
                .collect();
            ops.sort_by_key(|op| !matches!(op, RecordedOp::Decode(_)));
            ops
        }
    }

    impl CodecProvider for MockCodecs {
        fn codec(&self, format: FormatTag) -> Option<&dyn Codec> {
            self.codecs
                .iter()
                .find(|c| c.format == format)
                .map(|c| c as &dyn Codec)
        }
    }

    #[test]
    fn mock_records_decode_and_encode() {
        let codecs = MockCodecs::with_dimensions((800, 600));
        let img = codecs.codec(FormatTag::Png).unwrap().decode(b"").unwrap();
        codecs
            .codec(FormatTag::Jpeg)
            .unwrap()
            .encode(&img, &spec(FormatTag::Jpeg))
            .unwrap();

        let ops = codecs.get_operations();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0], RecordedOp::Decode(FormatTag::Png));
        assert!(matches!(
            &ops[1],
            RecordedOp::Encode {
                format: FormatTag::Jpeg,
                width: 800,
                height: 600,
                quality: 85,
                ..
            }
        ));
    }
}
