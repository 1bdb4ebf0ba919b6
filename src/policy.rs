//! Recompression policy: resize, re-encode as JPEG, and decide whether the
//! result is worth keeping.

use crate::decode::{self, DecodedImage};
use crate::error::SkipReason;
use crate::scanner::{ImageCandidate, SourceFilter};
use crate::CompressOptions;
use image::{DynamicImage, ImageFormat, ImageReader};
use lopdf::ObjectId;
use std::io::Cursor;
use std::time::{Duration, Instant};

/// A re-encoded payload ready to be written back.
#[derive(Debug, Clone)]
pub struct Replacement {
    pub id: ObjectId,
    pub source: SourceFilter,
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub original_len: usize,
}

/// What the policy decided for one candidate.
#[derive(Debug, Clone)]
pub enum Recompression {
    Replace(Replacement),
    /// The encoded result did not beat the acceptance ratio.
    Unchanged { original_len: usize, encoded_len: usize },
    Skipped(SkipReason),
}

/// Output dimensions for an image whose longer edge must not exceed
/// `max_edge`, or `None` when it already fits. Never upscales.
pub fn fit_within(width: u32, height: u32, max_edge: u32) -> Option<(u32, u32)> {
    if width <= max_edge && height <= max_edge {
        return None;
    }
    let scale = |short: u32, long: u32| -> u32 {
        let scaled = (u64::from(short) * u64::from(max_edge) + u64::from(long) / 2) / u64::from(long);
        (scaled as u32).max(1)
    };
    if width >= height {
        Some((max_edge, scale(height, width)))
    } else {
        Some((scale(width, height), max_edge))
    }
}

/// Encode `img` as a baseline-compatible progressive JPEG with optimized
/// Huffman tables. `components` is 1 (gray) or 3 (RGB); alpha is dropped.
pub fn encode_jpeg(img: &DynamicImage, quality: u8, components: u8) -> Result<Vec<u8>, SkipReason> {
    let (width, height) = (img.width(), img.height());
    let (w16, h16) = match (u16::try_from(width), u16::try_from(height)) {
        (Ok(w), Ok(h)) => (w, h),
        _ => return Err(SkipReason::Encode(format!("{}x{} exceeds JPEG limits", width, height))),
    };

    let mut jpeg_bytes = Vec::new();
    let mut encoder = jpeg_encoder::Encoder::new(&mut jpeg_bytes, quality);
    encoder.set_optimized_huffman_tables(true);
    encoder.set_progressive(true);

    let result = if components == 1 {
        let gray = img.to_luma8();
        encoder.encode(gray.as_raw(), w16, h16, jpeg_encoder::ColorType::Luma)
    } else {
        encoder.set_sampling_factor(jpeg_encoder::SamplingFactor::R_4_2_0);
        let rgb = img.to_rgb8();
        encoder.encode(rgb.as_raw(), w16, h16, jpeg_encoder::ColorType::Rgb)
    };
    result.map_err(|e| SkipReason::Encode(e.to_string()))?;

    Ok(jpeg_bytes)
}

/// Dimensions recorded in an encoded JPEG's frame header.
pub fn encoded_dimensions(jpeg: &[u8]) -> Option<(u32, u32)> {
    ImageReader::with_format(Cursor::new(jpeg), ImageFormat::Jpeg)
        .into_dimensions()
        .ok()
}

/// True when `encoded_len` is strictly below `ratio` of `original_len`.
pub fn accepts(encoded_len: usize, original_len: usize, ratio: f64) -> bool {
    (encoded_len as f64) < ratio * original_len as f64
}

/// Component count of the re-encoded image.
///
/// Raw sources always become RGB because the rewriter declares `/DeviceRGB`.
/// JPEG sources keep their declared colour space, so they keep its component
/// count.
fn output_components(candidate: &ImageCandidate<'_>, decoded: &DecodedImage) -> u8 {
    match candidate.filter {
        SourceFilter::Flate => 3,
        SourceFilter::Jpeg => match candidate.color.components() {
            Some(1) => 1,
            Some(3) => 3,
            _ if decoded.channels() == 1 => 1,
            _ => 3,
        },
    }
}

struct Budget {
    start: Instant,
    limit: Duration,
}

impl Budget {
    fn start(limit: Option<Duration>) -> Option<Budget> {
        limit.map(|limit| Budget {
            start: Instant::now(),
            limit,
        })
    }

    fn check(budget: &Option<Budget>) -> Result<(), SkipReason> {
        match budget {
            Some(b) if b.start.elapsed() >= b.limit => Err(SkipReason::BudgetExceeded),
            _ => Ok(()),
        }
    }
}

/// Run decode, resize, encode and the acceptance gate for one candidate.
pub fn recompress(candidate: &ImageCandidate<'_>, options: &CompressOptions) -> Recompression {
    match try_recompress(candidate, options) {
        Ok(result) => result,
        Err(reason) => Recompression::Skipped(reason),
    }
}

fn try_recompress(
    candidate: &ImageCandidate<'_>,
    options: &CompressOptions,
) -> Result<Recompression, SkipReason> {
    let budget = Budget::start(options.job_budget);

    let decoded = decode::decode(candidate)?;
    Budget::check(&budget)?;

    let components = output_components(candidate, &decoded);
    let img = match fit_within(decoded.width(), decoded.height(), options.max_edge) {
        Some((w, h)) => {
            log::debug!(
                "[Policy] {:?}: resizing {}x{} to {}x{}",
                candidate.id,
                decoded.width(),
                decoded.height(),
                w,
                h
            );
            decoded
                .as_image()
                .resize_exact(w, h, image::imageops::FilterType::Lanczos3)
        }
        None => decoded.into_image(),
    };
    Budget::check(&budget)?;

    let encoded = encode_jpeg(&img, options.quality, components)?;
    drop(img);
    Budget::check(&budget)?;

    let original_len = candidate.payload.len();
    let ratio = match candidate.filter {
        SourceFilter::Jpeg => options.jpeg_accept_ratio,
        SourceFilter::Flate => options.flate_accept_ratio,
    };
    if !accepts(encoded.len(), original_len, ratio) {
        return Ok(Recompression::Unchanged {
            original_len,
            encoded_len: encoded.len(),
        });
    }

    let (width, height) =
        encoded_dimensions(&encoded).unwrap_or((candidate.width, candidate.height));

    Ok(Recompression::Replace(Replacement {
        id: candidate.id,
        source: candidate.filter,
        data: encoded,
        width,
        height,
        original_len,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::ColorModel;
    use image::{GrayImage, RgbImage};

    #[test]
    fn fit_within_leaves_small_images() {
        assert_eq!(fit_within(1500, 1500, 1500), None);
        assert_eq!(fit_within(800, 20, 1500), None);
    }

    #[test]
    fn fit_within_caps_longer_edge_and_keeps_aspect() {
        assert_eq!(fit_within(2000, 2000, 1500), Some((1500, 1500)));
        assert_eq!(fit_within(3000, 1500, 1500), Some((1500, 750)));
        assert_eq!(fit_within(1000, 4000, 1500), Some((375, 1500)));
        assert_eq!(fit_within(2481, 3508, 1500), Some((1061, 1500)));
        assert_eq!(fit_within(100_000, 10, 1500), Some((1500, 1)));
    }

    #[test]
    fn acceptance_requires_a_real_saving() {
        assert!(accepts(919, 1000, 0.92));
        assert!(!accepts(921, 1000, 0.92));
        assert!(!accepts(950, 1000, 0.92));
        assert!(accepts(849, 1000, 0.85));
        assert!(!accepts(851, 1000, 0.85));
        assert!(!accepts(0, 0, 0.85));
    }

    #[test]
    fn encode_reports_its_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(120, 90, |x, y| {
            image::Rgb([x as u8, y as u8, 64])
        }));
        let jpeg = encode_jpeg(&img, 60, 3).unwrap();
        assert_eq!(encoded_dimensions(&jpeg), Some((120, 90)));

        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.color().channel_count(), 3);
    }

    #[test]
    fn encode_gray_stays_single_channel() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_fn(64, 64, |x, _| image::Luma([x as u8])));
        let jpeg = encode_jpeg(&img, 60, 1).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.color().channel_count(), 1);
    }

    #[test]
    fn encoded_dimensions_of_garbage_is_none() {
        assert_eq!(encoded_dimensions(b"nope"), None);
    }

    #[test]
    fn corrupt_jpeg_is_skipped() {
        let payload = vec![0xABu8; 4096];
        let candidate = ImageCandidate {
            id: (3, 0),
            width: 100,
            height: 100,
            filter: SourceFilter::Jpeg,
            color: ColorModel::Rgb,
            bits_per_component: Some(8),
            payload: &payload,
        };
        assert!(matches!(
            recompress(&candidate, &CompressOptions::default()),
            Recompression::Skipped(SkipReason::Decode(_))
        ));
    }

    #[test]
    fn zero_budget_is_exceeded() {
        let pixels: Vec<u8> = (0..100 * 100).map(|i| (i % 251) as u8).collect();
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        std::io::Write::write_all(&mut encoder, &pixels).unwrap();
        let payload = encoder.finish().unwrap();

        let candidate = ImageCandidate {
            id: (4, 0),
            width: 100,
            height: 100,
            filter: SourceFilter::Flate,
            color: ColorModel::Gray,
            bits_per_component: Some(8),
            payload: &payload,
        };
        let options = CompressOptions {
            job_budget: Some(Duration::ZERO),
            ..CompressOptions::default()
        };
        assert!(matches!(
            recompress(&candidate, &options),
            Recompression::Skipped(SkipReason::BudgetExceeded)
        ));
    }
}
