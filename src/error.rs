//! Error types.
//!
//! `CompressError` is the only error that leaves the crate. Everything that
//! goes wrong with a single image is a `SkipReason`: it is logged, counted and
//! otherwise absorbed.

use thiserror::Error;

/// Operation-level failure. The run produced no output.
#[derive(Debug, Error)]
pub enum CompressError {
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Failed to load PDF: {0}")]
    Load(#[source] lopdf::Error),

    #[error("Failed to save PDF: {0}")]
    Save(#[source] lopdf::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why an image object was left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("not an image stream")]
    NotAnImage,

    #[error("width/height missing or not numeric")]
    MissingDimensions,

    #[error("{pixels} px is below the {floor} px floor")]
    TooSmall { pixels: u64, floor: u64 },

    #[error("serves as another image's mask")]
    UsedAsMask,

    #[error("carries a soft mask or mask")]
    Masked,

    #[error("stencil mask image")]
    StencilMask,

    #[error("unsupported filter {0}")]
    UnsupportedFilter(String),

    #[error("stream has decode parameters")]
    DecodeParms,

    #[error("unsupported colour model {0}")]
    UnsupportedColorModel(String),

    #[error("unsupported bit depth {0}")]
    UnsupportedBitDepth(i64),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("inflate failed: {0}")]
    Inflate(String),

    #[error("inflated {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("declared size of {bytes} bytes exceeds the {limit} byte limit")]
    TooLarge { bytes: u64, limit: u64 },

    #[error("encode failed: {0}")]
    Encode(String),

    #[error("object is no longer an image stream")]
    TargetVanished,

    #[error("job exceeded its time budget")]
    BudgetExceeded,

    #[error("job panicked")]
    Panicked,
}
