//! Error taxonomy for the transcoding pipeline.
//!
//! Internally every failure is a [`TranscodeError`] carrying whatever context
//! is useful for a human (paths, the underlying codec or I/O error). At the
//! boundary it collapses to one of seven flat [`ErrorKind`]s, each with a fixed
//! negative status code:
//!
//! | Code | Kind |
//! |---|---|
//! | -1 | [`ErrorKind::Other`] |
//! | -2 | [`ErrorKind::InvalidFormat`] |
//! | -3 | [`ErrorKind::InferFormat`] |
//! | -4 | [`ErrorKind::InvalidMethod`] |
//! | -5 | [`ErrorKind::Image`] |
//! | -6 | [`ErrorKind::Io`] |
//! | -7 | [`ErrorKind::Compress`] |
//!
//! Success is status `0`.

use crate::imaging::{CodecError, FormatTag, PlanError, ResampleError};
use std::path::PathBuf;
use thiserror::Error;

/// Status code returned for a successful run.
pub const STATUS_OK: i32 = 0;

/// Flat failure kind exposed across the pipeline boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorKind {
    Other = -1,
    InvalidFormat = -2,
    InferFormat = -3,
    InvalidMethod = -4,
    Image = -5,
    Io = -6,
    Compress = -7,
}

impl ErrorKind {
    pub fn code(self) -> i32 {
        self as i32
    }
}

#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("Unsupported output format: {0}")]
    InvalidFormat(String),
    #[error("Cannot infer image format for {}", .0.display())]
    InferFormat(PathBuf),
    #[error("No encoder available for {0}")]
    NoEncoder(FormatTag),
    #[error("Invalid resize method: {0}")]
    InvalidMethod(String),
    #[error("Cannot plan resize: {0}")]
    Plan(#[from] PlanError),
    #[error("Failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: CodecError,
    },
    #[error("Resample failed: {0}")]
    Resample(#[from] ResampleError),
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to compress the picture. format = {format}: {source}")]
    Encode {
        format: FormatTag,
        #[source]
        source: CodecError,
    },
    #[error("{0}")]
    Other(String),
}

impl TranscodeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidFormat(_) => ErrorKind::InvalidFormat,
            Self::InferFormat(_) | Self::NoEncoder(_) => ErrorKind::InferFormat,
            Self::InvalidMethod(_) => ErrorKind::InvalidMethod,
            Self::Plan(PlanError::ExactNeedsBothDimensions { .. }) => ErrorKind::InvalidMethod,
            Self::Plan(PlanError::EmptySource { .. }) => ErrorKind::Image,
            Self::Decode { .. } | Self::Resample(_) => ErrorKind::Image,
            Self::Io { .. } => ErrorKind::Io,
            Self::Encode { .. } => ErrorKind::Compress,
            Self::Other(_) => ErrorKind::Other,
        }
    }

    pub fn code(&self) -> i32 {
        self.kind().code()
    }
}

pub type Result<T> = std::result::Result<T, TranscodeError>;
