//! Object rewriter.
//!
//! Swaps an image stream's payload and its describing entries in one step.
//! The object keeps its id, so every reference to it stays valid.

use crate::policy::Replacement;
use crate::scanner::SourceFilter;
use lopdf::{Document, Object, Stream};

/// Write `replacement` into `doc`. Returns `false` (leaving the document
/// untouched) when the target is no longer a stream.
pub fn apply(doc: &mut Document, replacement: Replacement) -> bool {
    let Some(Object::Stream(stream)) = doc.objects.get_mut(&replacement.id) else {
        return false;
    };

    let mut dict = stream.dict.clone();
    dict.set("Width", i64::from(replacement.width));
    dict.set("Height", i64::from(replacement.height));
    dict.set("Length", replacement.data.len() as i64);

    if replacement.source == SourceFilter::Flate {
        dict.set("Filter", Object::Name(SourceFilter::Jpeg.pdf_name().as_bytes().to_vec()));
        dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
        dict.set("BitsPerComponent", 8);
        dict.remove(b"DecodeParms");
        // A Decode array sized for the old colour space is invalid for RGB
        dict.remove(b"Decode");
    }

    *stream = Stream::new(dict, replacement.data).with_compression(false);
    true
}
