//! Object scanner.
//!
//! Walks the document's indirect objects and picks out the image streams that
//! can be recompressed.

use crate::dict::{name_str, resolve, DictExt, FieldError};
use crate::error::SkipReason;
use crate::CompressOptions;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashSet;

/// How the image payload is currently encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFilter {
    /// `/DCTDecode`: the payload is a complete JPEG file.
    Jpeg,
    /// `/FlateDecode` without predictors: zlib-deflated samples.
    Flate,
}

impl SourceFilter {
    pub fn pdf_name(self) -> &'static str {
        match self {
            SourceFilter::Jpeg => "DCTDecode",
            SourceFilter::Flate => "FlateDecode",
        }
    }
}

/// Declared colour space of an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorModel {
    Gray,
    Rgb,
    Cmyk,
    /// `[/ICCBased stream]` with its `/N`.
    IccBased(u8),
    Other(String),
    Unspecified,
}

impl ColorModel {
    pub fn components(&self) -> Option<u8> {
        match self {
            ColorModel::Gray => Some(1),
            ColorModel::Rgb => Some(3),
            ColorModel::Cmyk => Some(4),
            ColorModel::IccBased(n) => Some(*n),
            ColorModel::Other(_) | ColorModel::Unspecified => None,
        }
    }

    pub fn from_dict(doc: &Document, dict: &Dictionary) -> ColorModel {
        match dict.get(b"ColorSpace").ok().and_then(|cs| resolve(doc, cs)) {
            None => ColorModel::Unspecified,
            Some(Object::Name(n)) => match n.as_slice() {
                b"DeviceGray" => ColorModel::Gray,
                b"DeviceRGB" => ColorModel::Rgb,
                b"DeviceCMYK" => ColorModel::Cmyk,
                other => ColorModel::Other(name_str(other)),
            },
            Some(Object::Array(arr)) => match arr.as_slice() {
                [Object::Name(family), profile] if family.as_slice() == b"ICCBased" => {
                    match resolve(doc, profile) {
                        Some(Object::Stream(icc)) => match icc.dict.number(b"N") {
                            Ok(n) if (1.0..=4.0).contains(&n) => ColorModel::IccBased(n as u8),
                            _ => ColorModel::Other("ICCBased".to_string()),
                        },
                        _ => ColorModel::Other("ICCBased".to_string()),
                    }
                }
                [Object::Name(family), ..] => ColorModel::Other(name_str(family)),
                _ => ColorModel::Other("array".to_string()),
            },
            Some(_) => ColorModel::Other("unknown".to_string()),
        }
    }
}

impl std::fmt::Display for ColorModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorModel::Gray => write!(f, "DeviceGray"),
            ColorModel::Rgb => write!(f, "DeviceRGB"),
            ColorModel::Cmyk => write!(f, "DeviceCMYK"),
            ColorModel::IccBased(n) => write!(f, "ICCBased({})", n),
            ColorModel::Other(name) => write!(f, "{}", name),
            ColorModel::Unspecified => write!(f, "none"),
        }
    }
}

/// One eligible image stream, borrowed from the document for a single run.
#[derive(Debug, Clone)]
pub struct ImageCandidate<'a> {
    pub id: ObjectId,
    pub width: u32,
    pub height: u32,
    pub filter: SourceFilter,
    pub color: ColorModel,
    pub bits_per_component: Option<i64>,
    /// Still-encoded stream content.
    pub payload: &'a [u8],
}

/// Classifies the streams of one document.
pub struct ImageScanner<'a> {
    doc: &'a Document,
    options: &'a CompressOptions,
    /// Images serving as another image's `/SMask` or `/Mask`
    mask_targets: HashSet<ObjectId>,
}

impl<'a> ImageScanner<'a> {
    pub fn new(doc: &'a Document, options: &'a CompressOptions) -> Self {
        ImageScanner {
            doc,
            options,
            mask_targets: mask_targets(doc),
        }
    }

    /// Apply the selection predicate to one stream object.
    pub fn classify(&self, id: ObjectId, stream: &'a Stream) -> Result<ImageCandidate<'a>, SkipReason> {
        let dict = &stream.dict;

        if dict.name(b"Subtype") != Ok(b"Image".as_slice()) {
            return Err(SkipReason::NotAnImage);
        }
        if self.mask_targets.contains(&id) {
            return Err(SkipReason::UsedAsMask);
        }

        let (width, height) = dimensions(dict)?;
        let pixels = u64::from(width) * u64::from(height);
        if pixels < self.options.min_pixels {
            return Err(SkipReason::TooSmall {
                pixels,
                floor: self.options.min_pixels,
            });
        }

        if dict.has(b"SMask") || dict.has(b"Mask") {
            return Err(SkipReason::Masked);
        }
        if dict.flag(b"ImageMask") == Ok(true) {
            return Err(SkipReason::StencilMask);
        }

        let filter = match dict.single_filter() {
            Ok(b"DCTDecode") => SourceFilter::Jpeg,
            Ok(b"FlateDecode") => SourceFilter::Flate,
            Ok(other) => return Err(SkipReason::UnsupportedFilter(name_str(other))),
            Err(FieldError::Absent) => return Err(SkipReason::UnsupportedFilter("none".into())),
            Err(FieldError::WrongType) => {
                return Err(SkipReason::UnsupportedFilter("filter chain".into()))
            }
        };

        if dict.has(b"DecodeParms") {
            return Err(SkipReason::DecodeParms);
        }

        let bits_per_component = dict.number(b"BitsPerComponent").ok().map(|b| b as i64);

        Ok(ImageCandidate {
            id,
            width,
            height,
            filter,
            color: ColorModel::from_dict(self.doc, dict),
            bits_per_component,
            payload: &stream.content,
        })
    }

    /// Consume the scanner, yielding eligible images in object order.
    pub fn candidates(self) -> impl Iterator<Item = ImageCandidate<'a>> + 'a {
        let doc = self.doc;
        doc.objects.iter().filter_map(move |(id, object)| {
            let Object::Stream(stream) = object else {
                return None;
            };
            match self.classify(*id, stream) {
                Ok(candidate) => Some(candidate),
                Err(SkipReason::NotAnImage) => None,
                Err(reason) => {
                    log::debug!("[Scan] {:?}: skipped, {}", id, reason);
                    None
                }
            }
        })
    }
}

/// Enumerate the recompressible image streams of `doc`, in object order.
pub fn scan<'a>(
    doc: &'a Document,
    options: &'a CompressOptions,
) -> impl Iterator<Item = ImageCandidate<'a>> + 'a {
    ImageScanner::new(doc, options).candidates()
}

/// Ids referenced by any image's `/SMask` or `/Mask` entry.
fn mask_targets(doc: &Document) -> HashSet<ObjectId> {
    doc.objects
        .values()
        .filter_map(|object| match object {
            Object::Stream(stream) => Some(&stream.dict),
            _ => None,
        })
        .flat_map(|dict| [dict.reference(b"SMask").ok(), dict.reference(b"Mask").ok()])
        .flatten()
        .collect()
}

fn dimensions(dict: &Dictionary) -> Result<(u32, u32), SkipReason> {
    let w = dict.number(b"Width").map_err(|_| SkipReason::MissingDimensions)?;
    let h = dict.number(b"Height").map_err(|_| SkipReason::MissingDimensions)?;
    let valid = |v: f64| v >= 1.0 && v <= f64::from(u32::MAX) && v.fract() == 0.0;
    if !valid(w) || !valid(h) {
        return Err(SkipReason::MissingDimensions);
    }
    Ok((w as u32, h as u32))
}
