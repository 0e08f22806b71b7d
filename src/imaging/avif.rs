//! AVIF decoding: `avif-parse` for the container, `rav1d` for the AV1 payload.
//!
//! The `image` crate's `"avif"` feature only provides the rav1e encoder;
//! its decoder needs the dav1d C library. `rav1d` is the pure Rust port of
//! dav1d, driven here through its C-style API.
//!
//! Only the primary item is decoded, so an alpha plane stored as an
//! auxiliary item is dropped and the result is always RGB8.

use super::codec::CodecError;
use super::params::DEFAULT_MAX_RASTER_BYTES;
use image::{DynamicImage, RgbImage};
use rav1d::include::dav1d::data::Dav1dData;
use rav1d::include::dav1d::dav1d::Dav1dSettings;
use rav1d::include::dav1d::headers::{
    DAV1D_PIXEL_LAYOUT_I400, DAV1D_PIXEL_LAYOUT_I420, DAV1D_PIXEL_LAYOUT_I422,
    DAV1D_PIXEL_LAYOUT_I444,
};
use rav1d::include::dav1d::picture::Dav1dPicture;
use rav1d::src::lib as dav1d;
use std::io::Cursor;
use std::mem::MaybeUninit;
use std::ptr::NonNull;

/// Decode a complete AVIF file into an RGB8 raster.
pub fn decode(data: &[u8]) -> Result<DynamicImage, CodecError> {
    let avif = avif_parse::read_avif(&mut Cursor::new(data))
        .map_err(|e| CodecError::Container(format!("{e:?}")))?;
    let av1: &[u8] = &avif.primary_item;

    let mut settings = MaybeUninit::<Dav1dSettings>::uninit();
    unsafe { dav1d::dav1d_default_settings(NonNull::from(&mut settings).cast()) };
    let mut settings = unsafe { settings.assume_init() };
    settings.n_threads = 1;
    settings.max_frame_delay = 1;
    // Pixel count, so the decoder refuses frames whose RGB8 copy won't fit.
    settings.frame_size_limit = (DEFAULT_MAX_RASTER_BYTES / 3) as _;

    let mut ctx = None;
    let rc = unsafe { dav1d::dav1d_open(NonNull::new(&mut ctx), NonNull::new(&mut settings)) };
    if rc.0 != 0 {
        return Err(av1_error("open", rc.0));
    }

    let mut input = Dav1dData::default();
    let buf = unsafe { dav1d::dav1d_data_create(NonNull::new(&mut input), av1.len()) };
    if buf.is_null() {
        unsafe { dav1d::dav1d_close(NonNull::new(&mut ctx)) };
        return Err(CodecError::Av1("data_create returned no buffer".into()));
    }
    unsafe { std::ptr::copy_nonoverlapping(av1.as_ptr(), buf, av1.len()) };

    let rc = unsafe { dav1d::dav1d_send_data(ctx, NonNull::new(&mut input)) };
    if rc.0 != 0 {
        unsafe {
            dav1d::dav1d_data_unref(NonNull::new(&mut input));
            dav1d::dav1d_close(NonNull::new(&mut ctx));
        }
        return Err(av1_error("send_data", rc.0));
    }

    let mut pic: Dav1dPicture = unsafe { std::mem::zeroed() };
    let rc = unsafe { dav1d::dav1d_get_picture(ctx, NonNull::new(&mut pic)) };
    if rc.0 != 0 {
        unsafe { dav1d::dav1d_close(NonNull::new(&mut ctx)) };
        return Err(av1_error("get_picture", rc.0));
    }

    let converted = picture_to_rgb(&pic);
    unsafe {
        dav1d::dav1d_picture_unref(NonNull::new(&mut pic));
        dav1d::dav1d_close(NonNull::new(&mut ctx));
    }
    let (width, height, rgb) = converted?;

    RgbImage::from_raw(width, height, rgb)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| CodecError::Av1("decoded planes don't fill the frame".into()))
}

fn av1_error(step: &str, code: i32) -> CodecError {
    CodecError::Av1(format!("{step} failed ({code})"))
}

/// Borrow the picture's planes and convert them to interleaved RGB8.
fn picture_to_rgb(pic: &Dav1dPicture) -> Result<(u32, u32, Vec<u8>), CodecError> {
    let (width, height) = (pic.p.w as u32, pic.p.h as u32);
    let bpc = pic.p.bpc as u32;
    let layout = pic.p.layout;
    if width == 0 || height == 0 || !(8..=16).contains(&bpc) {
        return Err(CodecError::Av1(format!(
            "unusable frame {width}x{height} at {bpc} bits"
        )));
    }
    let needed = u64::from(width) * u64::from(height) * 3;
    if needed > DEFAULT_MAX_RASTER_BYTES {
        return Err(CodecError::TooLarge {
            width,
            height,
            limit: DEFAULT_MAX_RASTER_BYTES,
        });
    }

    let (ss_x, ss_y, monochrome) = match layout {
        DAV1D_PIXEL_LAYOUT_I400 => (false, false, true),
        DAV1D_PIXEL_LAYOUT_I420 => (true, true, false),
        DAV1D_PIXEL_LAYOUT_I422 => (true, false, false),
        DAV1D_PIXEL_LAYOUT_I444 => (false, false, false),
        other => return Err(CodecError::Av1(format!("unsupported pixel layout {other}"))),
    };
    let chroma_rows = if ss_y { height.div_ceil(2) } else { height };

    let y = unsafe { plane(pic, 0, pic.stride[0], height)? };
    let (u, v, uv_stride) = if monochrome {
        (y, y, 0)
    } else {
        let uv_stride = pic.stride[1];
        unsafe {
            (
                plane(pic, 1, uv_stride, chroma_rows)?,
                plane(pic, 2, uv_stride, chroma_rows)?,
                uv_stride as usize,
            )
        }
    };

    let planes = YuvPlanes {
        y,
        u,
        v,
        y_stride: pic.stride[0] as usize,
        uv_stride,
        width,
        height,
        bpc,
        ss_x,
        ss_y,
        monochrome,
    };
    Ok((width, height, planes.to_rgb()))
}

/// View plane `index` as a byte slice of `rows` strides.
///
/// # Safety
///
/// `pic` must be a picture returned by `dav1d_get_picture` and not yet unref'd.
unsafe fn plane(
    pic: &Dav1dPicture,
    index: usize,
    stride: isize,
    rows: u32,
) -> Result<&[u8], CodecError> {
    let ptr = pic.data[index]
        .ok_or_else(|| CodecError::Av1(format!("plane {index} is missing")))?;
    if stride <= 0 {
        return Err(CodecError::Av1(format!("plane {index} has stride {stride}")));
    }
    let len = stride as usize * rows as usize;
    Ok(unsafe { std::slice::from_raw_parts(ptr.as_ptr() as *const u8, len) })
}

/// Decoded YUV planes, ready for RGB conversion.
struct YuvPlanes<'a> {
    y: &'a [u8],
    u: &'a [u8],
    v: &'a [u8],
    /// Row pitch in bytes.
    y_stride: usize,
    uv_stride: usize,
    width: u32,
    height: u32,
    bpc: u32,
    /// Chroma subsampling: horizontal, vertical (I420 is both).
    ss_x: bool,
    ss_y: bool,
    monochrome: bool,
}

impl YuvPlanes<'_> {
    /// Convert to interleaved RGB8 using BT.601 coefficients.
    fn to_rgb(&self) -> Vec<u8> {
        let max_val = ((1u32 << self.bpc) - 1) as f32;
        let center = (1u32 << (self.bpc - 1)) as f32;
        let scale = 255.0 / max_val;

        let mut rgb = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for row in 0..self.height {
            for col in 0..self.width {
                let y = read_sample(self.y, self.y_stride, col, row, self.bpc);

                let (r, g, b) = if self.monochrome {
                    let v = (y * scale).clamp(0.0, 255.0);
                    (v, v, v)
                } else {
                    let u_col = if self.ss_x { col / 2 } else { col };
                    let u_row = if self.ss_y { row / 2 } else { row };
                    let cb = read_sample(self.u, self.uv_stride, u_col, u_row, self.bpc) - center;
                    let cr = read_sample(self.v, self.uv_stride, u_col, u_row, self.bpc) - center;
                    (
                        ((y + 1.402 * cr) * scale).clamp(0.0, 255.0),
                        ((y - 0.344136 * cb - 0.714136 * cr) * scale).clamp(0.0, 255.0),
                        ((y + 1.772 * cb) * scale).clamp(0.0, 255.0),
                    )
                };
                rgb.extend_from_slice(&[r.round() as u8, g.round() as u8, b.round() as u8]);
            }
        }
        rgb
    }
}

/// One sample; above 8 bits each sample is a native-endian u16.
#[inline]
fn read_sample(plane: &[u8], stride: usize, x: u32, y: u32, bpc: u32) -> f32 {
    let row = y as usize * stride;
    if bpc <= 8 {
        f32::from(plane[row + x as usize])
    } else {
        let i = row + x as usize * 2;
        f32::from(u16::from_ne_bytes([plane[i], plane[i + 1]]))
    }
}
