//! Configuration module.
//!
//! Handles loading, validating, and merging `picpress.toml`. Stock defaults are
//! the base layer; a user config file overrides any subset of them; command
//! line flags override both.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [encode]
//! quality = 90                     # 1-100, lossy formats only
//! speed = 6                        # encoder effort, AVIF uses 1-10
//!
//! [resize]
//! style = "fit"                    # style used when -r is given without -m
//! crop_fill = true                 # center-crop fill results to the box
//! downscale_filter = "lanczos3"
//! upscale_filter = "catmull-rom"
//! max_bytes = 536870912            # largest raster a resize may allocate
//! ```
//!
//! Config files are sparse; override just the values you want:
//!
//! ```toml
//! [encode]
//! quality = 75
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{Filter, Quality, ResampleOptions, ResizeStyle, Speed};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Tool configuration loaded from `picpress.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Encoder settings.
    pub encode: EncodeConfig,
    /// Resize policy and filters.
    pub resize: ResizeConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.encode.quality) {
            return Err(ConfigError::Validation("encode.quality must be 1-100".into()));
        }
        if self.resize.max_bytes == 0 {
            return Err(ConfigError::Validation("resize.max_bytes must be positive".into()));
        }
        if self.resize.style == ResizeStyle::Default {
            return Err(ConfigError::Validation(
                "resize.style must be fill, fit or exact; default would ignore --resize".into(),
            ));
        }
        Ok(())
    }

    pub fn quality(&self) -> Quality {
        Quality::new(self.encode.quality)
    }

    pub fn speed(&self) -> Speed {
        Speed(self.encode.speed)
    }

    pub fn resample_options(&self) -> ResampleOptions {
        ResampleOptions {
            downscale: self.resize.downscale_filter,
            upscale: self.resize.upscale_filter,
            crop_fill: self.resize.crop_fill,
            max_bytes: self.resize.max_bytes,
        }
    }
}

/// Encoder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodeConfig {
    /// Lossy encoding quality (1 = worst, 100 = best).
    pub quality: u8,
    /// Encoder speed; higher is faster and compresses less.
    pub speed: u8,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            quality: Quality::default().value(),
            speed: Speed::default().value(),
        }
    }
}

/// Resize policy and filter choices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    /// Style applied when dimensions are given without an explicit method.
    pub style: ResizeStyle,
    /// Center-crop `fill` results to exactly the requested box.
    pub crop_fill: bool,
    /// Filter used when shrinking.
    pub downscale_filter: Filter,
    /// Filter used when any axis grows.
    pub upscale_filter: Filter,
    /// Upper bound, in bytes, on the rasters a resize may allocate.
    pub max_bytes: u64,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        let resample = ResampleOptions::default();
        Self {
            style: ResizeStyle::Fit,
            crop_fill: resample.crop_fill,
            downscale_filter: resample.downscale,
            upscale_filter: resample.upscale,
            max_bytes: resample.max_bytes,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(Config::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file doesn't exist.
/// Returns `Err` if it exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults if it's absent.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let overlay = load_raw_config(path)?;
    if overlay.is_some() {
        tracing::debug!(path = %path.display(), "loaded config file");
    }
    resolve_config(stock_defaults_value(), overlay)
}

/// Returns a fully-commented stock `picpress.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# picpress configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Command line flags override them.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Encoding
# ---------------------------------------------------------------------------
[encode]
# Lossy quality for JPEG and AVIF (1 = worst, 100 = best).
# Out-of-range values passed on the command line are clamped.
quality = 90

# Encoder speed. Higher is faster and compresses less.
# AVIF uses 1-10; PNG maps 0-3 to best, 4-7 to default, 8+ to fast compression.
speed = 6

# ---------------------------------------------------------------------------
# Resizing
# ---------------------------------------------------------------------------
[resize]
# Style used when --resize is given without --method: fill, fit or exact.
style = "fit"

# Fill scales the image to cover the box. When true, the overflow is
# center-cropped so the output is exactly the requested size.
crop_fill = true

# Interpolation filters: nearest, triangle, catmull-rom, gaussian, lanczos3.
downscale_filter = "lanczos3"
upscale_filter = "catmull-rom"

# Largest raster, in bytes, a resize may allocate (output plus working
# buffer). Larger targets fail with an image error instead of exhausting
# memory. The default is 512 MiB.
max_bytes = 536870912
"##
}
