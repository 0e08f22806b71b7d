//! C ABI over [`compress_img`](crate::compress_img).
//!
//! ```c
//! int compress_img_c(const char* input, const char* output, const char* format,
//!                    uint8_t quality, uint32_t width, uint32_t height,
//!                    int method, uint8_t speed);
//! ```
//!
//! Returns `0` on success or one of the negative [`ErrorKind`] codes.
//! `format` may be null or empty to infer the output format. A null
//! `input`/`output`, or any non-UTF-8 string, returns [`ErrorKind::Other`].
//! So does a panic inside the pipeline; nothing unwinds across the boundary.

use crate::error::ErrorKind;
use std::ffi::{CStr, c_char, c_int};
use std::panic::{self, AssertUnwindSafe};

/// Transcode `input` to `output`. See the module docs for the contract.
///
/// # Safety
///
/// Every non-null pointer must point to a NUL-terminated string that stays
/// valid and unmodified for the duration of the call.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn compress_img_c(
    input: *const c_char,
    output: *const c_char,
    format: *const c_char,
    quality: u8,
    width: u32,
    height: u32,
    method: c_int,
    speed: u8,
) -> c_int {
    // SAFETY: forwarded from the caller's contract.
    let (input, output, format) = unsafe { (arg(input), arg(output), arg(format)) };
    let (Some(Ok(input)), Some(Ok(output))) = (input, output) else {
        tracing::debug!("compress_img_c: null or non-UTF-8 path argument");
        return ErrorKind::Other.code();
    };
    let format = match format.transpose() {
        Ok(format) => format,
        Err(_) => {
            tracing::debug!("compress_img_c: non-UTF-8 format argument");
            return ErrorKind::Other.code();
        }
    };

    panic::catch_unwind(AssertUnwindSafe(|| {
        crate::compress_img(input, output, format, quality, width, height, method, speed)
    }))
    .unwrap_or_else(|_| {
        tracing::error!("compress_img_c: pipeline panicked");
        ErrorKind::Other.code()
    })
}

/// `None` for a null pointer, otherwise the string's UTF-8 view.
///
/// # Safety
///
/// `ptr` must be null or point to a valid NUL-terminated string.
unsafe fn arg<'a>(ptr: *const c_char) -> Option<Result<&'a str, std::str::Utf8Error>> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract.
    Some(unsafe { CStr::from_ptr(ptr) }.to_str())
}
