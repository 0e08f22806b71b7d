//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Compress
//!
//! ```text
//! photo.png → photo.avif
//!     Format: png → avif
//!     Size: 4032x3024 → 1024x768 (fit)
//!     Wrote 182.4 KiB
//! ```
//!
//! Without a resize the size line reads `Size: 4032x3024 (unchanged)`.
//!
//! ## Identify
//!
//! ```text
//! photo.png
//!     Format: png (image/png)
//!     Size: 4032x3024
//!     File: 11.2 MiB
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::imaging::ResizeStyle;
use crate::pipeline::{ImageInfo, TranscodeReport, TranscodeRequest};

// ============================================================================
// Shared helpers
// ============================================================================

fn dims((width, height): (u32, u32)) -> String {
    format!("{}x{}", width, height)
}

/// Human-readable byte count, binary units, one decimal above bytes.
fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

// ============================================================================
// Compress
// ============================================================================

/// Format the result of one transcode.
pub fn format_transcode_report(request: &TranscodeRequest, report: &TranscodeReport) -> Vec<String> {
    let mut lines = vec![format!(
        "{} \u{2192} {}",
        request.input.display(),
        request.output.display()
    )];

    lines.push(format!(
        "    Format: {} \u{2192} {}",
        report.input_format, report.output_format
    ));

    let style = request.resize.style;
    if style == ResizeStyle::Default || report.source_dimensions == report.output_dimensions {
        lines.push(format!(
            "    Size: {} (unchanged)",
            dims(report.source_dimensions)
        ));
    } else {
        lines.push(format!(
            "    Size: {} \u{2192} {} ({})",
            dims(report.source_dimensions),
            dims(report.output_dimensions),
            style
        ));
    }

    lines.push(format!(
        "    Wrote {}",
        human_bytes(report.bytes_written as u64)
    ));
    lines
}

pub fn print_transcode_report(request: &TranscodeRequest, report: &TranscodeReport) {
    for line in format_transcode_report(request, report) {
        println!("{}", line);
    }
}

// ============================================================================
// Identify
// ============================================================================

/// Format the header-level facts about one image.
pub fn format_identify(info: &ImageInfo) -> Vec<String> {
    vec![
        info.path.display().to_string(),
        format!("    Format: {} ({})", info.format, info.format.mime_type()),
        format!("    Size: {}", dims((info.width, info.height))),
        format!("    File: {}", human_bytes(info.file_size)),
    ]
}

pub fn print_identify(info: &ImageInfo) {
    for line in format_identify(info) {
        println!("{}", line);
    }
}
