//! Document finalizer: clear descriptive metadata and serialize.

use crate::error::CompressError;
use lopdf::{Document, Object, SaveOptions};

/// Document information entries removed from every output.
pub const METADATA_KEYS: [&[u8]; 6] = [
    b"Title",
    b"Author",
    b"Subject",
    b"Keywords",
    b"Producer",
    b"Creator",
];

/// Remove the descriptive entries of the trailer's `/Info` dictionary, which
/// may be inline or an indirect object. Returns the number of removed entries.
pub fn strip_metadata(doc: &mut Document) -> usize {
    let info_id = match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    };

    let info = match info_id {
        Some(id) => match doc.get_object_mut(id) {
            Ok(Object::Dictionary(dict)) => dict,
            _ => return 0,
        },
        None => match doc.trailer.get_mut(b"Info") {
            Ok(Object::Dictionary(dict)) => dict,
            _ => return 0,
        },
    };

    METADATA_KEYS
        .iter()
        .filter(|key| info.remove(key).is_some())
        .count()
}

/// Serialize `doc`. With `object_streams` the non-stream objects are packed
/// into compressed object streams behind a cross-reference stream.
pub fn save(doc: &mut Document, object_streams: bool) -> Result<Vec<u8>, CompressError> {
    let mut output = Vec::new();
    if object_streams {
        let options = SaveOptions::builder()
            .use_object_streams(true)
            .use_xref_streams(true)
            .build();
        doc.save_with_options(&mut output, options)
            .map_err(|e| CompressError::Save(e.into()))?;
    } else {
        doc.save_to(&mut output).map_err(|e| CompressError::Save(e.into()))?;
    }
    Ok(output)
}
