//! Image decoder adapters.
//!
//! Turn a candidate's still-encoded payload into 8-bit pixels. Anything that
//! cannot be interpreted exactly is reported as a `SkipReason`.

use crate::error::SkipReason;
use crate::scanner::{ColorModel, ImageCandidate, SourceFilter};
use flate2::read::ZlibDecoder;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use std::io::Read;

/// Decoded pixels, 8 bits per channel.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    image: DynamicImage,
}

impl DecodedImage {
    fn new(image: DynamicImage) -> Self {
        // Collapse every layout to L8, RGB8 or RGBA8
        let image = match image {
            img @ (DynamicImage::ImageLuma8(_)
            | DynamicImage::ImageRgb8(_)
            | DynamicImage::ImageRgba8(_)) => img,
            other => match other.color().channel_count() {
                1 => DynamicImage::ImageLuma8(other.to_luma8()),
                3 => DynamicImage::ImageRgb8(other.to_rgb8()),
                _ => DynamicImage::ImageRgba8(other.to_rgba8()),
            },
        };
        DecodedImage { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// 1, 3 or 4.
    pub fn channels(&self) -> u8 {
        self.image.color().channel_count()
    }

    pub fn as_image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_image(self) -> DynamicImage {
        self.image
    }
}

/// Pick the adapter for the candidate's filter.
pub fn decode(candidate: &ImageCandidate<'_>) -> Result<DecodedImage, SkipReason> {
    match candidate.filter {
        SourceFilter::Jpeg => decode_jpeg(candidate.payload, &candidate.color),
        SourceFilter::Flate => decode_flate(
            candidate.payload,
            candidate.width,
            candidate.height,
            &candidate.color,
            candidate.bits_per_component,
        ),
    }
}

/// Largest raw sample buffer a Flate image may declare. Matches the
/// `image` crate's default decoding allocation limit.
pub const MAX_RAW_BYTES: u64 = 512 * 1024 * 1024;

/// Byte length of `width * height * channels` 8-bit samples, refused when it
/// overflows or exceeds [`MAX_RAW_BYTES`].
fn raw_len(width: u32, height: u32, channels: u64) -> Result<usize, SkipReason> {
    let bytes = u64::from(width)
        .checked_mul(u64::from(height))
        .and_then(|n| n.checked_mul(channels))
        .unwrap_or(u64::MAX);
    if bytes > MAX_RAW_BYTES {
        return Err(SkipReason::TooLarge {
            bytes,
            limit: MAX_RAW_BYTES,
        });
    }
    usize::try_from(bytes).map_err(|_| SkipReason::TooLarge {
        bytes,
        limit: MAX_RAW_BYTES,
    })
}

/// Decode a `/DCTDecode` payload, which is a complete JPEG file.
pub fn decode_jpeg(payload: &[u8], color: &ColorModel) -> Result<DecodedImage, SkipReason> {
    // Re-encoding CMYK as RGB would disagree with the declared colour space
    if color.components() == Some(4) {
        return Err(SkipReason::UnsupportedColorModel(color.to_string()));
    }

    let img = image::load_from_memory_with_format(payload, ImageFormat::Jpeg)
        .map_err(|e| SkipReason::Decode(e.to_string()))?;
    Ok(DecodedImage::new(img))
}

/// Inflate a `/FlateDecode` payload holding raw 8-bit gray or RGB samples.
pub fn decode_flate(
    payload: &[u8],
    width: u32,
    height: u32,
    color: &ColorModel,
    bits_per_component: Option<i64>,
) -> Result<DecodedImage, SkipReason> {
    let channels: u64 = match color {
        ColorModel::Gray => 1,
        ColorModel::Rgb => 3,
        other => return Err(SkipReason::UnsupportedColorModel(other.to_string())),
    };
    match bits_per_component {
        Some(8) => {}
        other => return Err(SkipReason::UnsupportedBitDepth(other.unwrap_or(0))),
    }

    let expected = raw_len(width, height, channels)?;

    // Read one byte past the expected size so oversized streams are caught
    // without inflating all of them. The buffer grows with the inflated data
    // only; the declared size is never reserved up front.
    let mut samples = Vec::new();
    ZlibDecoder::new(payload)
        .take(expected as u64 + 1)
        .read_to_end(&mut samples)
        .map_err(|e| SkipReason::Inflate(e.to_string()))?;

    if samples.len() != expected {
        return Err(SkipReason::SizeMismatch {
            expected,
            actual: samples.len(),
        });
    }

    let img = if channels == 1 {
        GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8)
    } else {
        RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8)
    };
    img.map(DecodedImage::new).ok_or(SkipReason::SizeMismatch {
        expected,
        actual: 0,
    })
}
