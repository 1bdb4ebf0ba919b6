//! Typed access to PDF dictionary entries.
//!
//! Every accessor distinguishes a missing key from a key holding the wrong kind
//! of object, and none of them coerces between types.

use lopdf::{Dictionary, Document, Object, ObjectId};

/// Why a dictionary lookup produced no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    Absent,
    WrongType,
}

pub trait DictExt {
    /// Integer or real value.
    fn number(&self, key: &[u8]) -> Result<f64, FieldError>;

    fn name(&self, key: &[u8]) -> Result<&[u8], FieldError>;

    fn reference(&self, key: &[u8]) -> Result<ObjectId, FieldError>;

    fn flag(&self, key: &[u8]) -> Result<bool, FieldError>;

    /// The single filter applied to a stream, given either as a name or as a
    /// one-element array. Filter chains are reported as `WrongType`.
    fn single_filter(&self) -> Result<&[u8], FieldError>;
}

impl DictExt for Dictionary {
    fn number(&self, key: &[u8]) -> Result<f64, FieldError> {
        match self.get(key) {
            Ok(Object::Integer(n)) => Ok(*n as f64),
            Ok(Object::Real(n)) => Ok(f64::from(*n)),
            Ok(_) => Err(FieldError::WrongType),
            Err(_) => Err(FieldError::Absent),
        }
    }

    fn name(&self, key: &[u8]) -> Result<&[u8], FieldError> {
        match self.get(key) {
            Ok(Object::Name(n)) => Ok(n.as_slice()),
            Ok(_) => Err(FieldError::WrongType),
            Err(_) => Err(FieldError::Absent),
        }
    }

    fn reference(&self, key: &[u8]) -> Result<ObjectId, FieldError> {
        match self.get(key) {
            Ok(Object::Reference(id)) => Ok(*id),
            Ok(_) => Err(FieldError::WrongType),
            Err(_) => Err(FieldError::Absent),
        }
    }

    fn flag(&self, key: &[u8]) -> Result<bool, FieldError> {
        match self.get(key) {
            Ok(Object::Boolean(b)) => Ok(*b),
            Ok(_) => Err(FieldError::WrongType),
            Err(_) => Err(FieldError::Absent),
        }
    }

    fn single_filter(&self) -> Result<&[u8], FieldError> {
        match self.get(b"Filter") {
            Ok(Object::Name(n)) => Ok(n.as_slice()),
            Ok(Object::Array(arr)) => match arr.as_slice() {
                [Object::Name(n)] => Ok(n.as_slice()),
                _ => Err(FieldError::WrongType),
            },
            Ok(_) => Err(FieldError::WrongType),
            Err(_) => Err(FieldError::Absent),
        }
    }
}

/// Follow a reference one level. A dangling reference yields `None`.
pub fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        _ => Some(obj),
    }
}

/// Display form of a name for logs and reports.
pub fn name_str(name: &[u8]) -> String {
    String::from_utf8_lossy(name).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn number_accepts_integer_and_real() {
        let dict = dictionary! { "Width" => 640, "Height" => 12.5 };
        assert_eq!(dict.number(b"Width"), Ok(640.0));
        assert_eq!(dict.number(b"Height"), Ok(12.5));
    }

    #[test]
    fn absent_and_wrong_type_are_distinct() {
        let dict = dictionary! { "Width" => "DeviceRGB" };
        assert_eq!(dict.number(b"Width"), Err(FieldError::WrongType));
        assert_eq!(dict.number(b"Height"), Err(FieldError::Absent));
        assert_eq!(dict.reference(b"SMask"), Err(FieldError::Absent));
    }

    #[test]
    fn name_does_not_coerce_strings() {
        let dict = dictionary! {
            "Subtype" => Object::Name(b"Image".to_vec()),
            "Title" => Object::string_literal("Image"),
        };
        assert_eq!(dict.name(b"Subtype"), Ok(&b"Image"[..]));
        assert_eq!(dict.name(b"Title"), Err(FieldError::WrongType));
    }

    #[test]
    fn single_filter_forms() {
        let plain = dictionary! { "Filter" => Object::Name(b"DCTDecode".to_vec()) };
        assert_eq!(plain.single_filter(), Ok(&b"DCTDecode"[..]));

        let wrapped = dictionary! {
            "Filter" => vec![Object::Name(b"FlateDecode".to_vec())],
        };
        assert_eq!(wrapped.single_filter(), Ok(&b"FlateDecode"[..]));

        let chain = dictionary! {
            "Filter" => vec![
                Object::Name(b"ASCII85Decode".to_vec()),
                Object::Name(b"FlateDecode".to_vec()),
            ],
        };
        assert_eq!(chain.single_filter(), Err(FieldError::WrongType));

        assert_eq!(Dictionary::new().single_filter(), Err(FieldError::Absent));
    }

    #[test]
    fn dangling_reference_resolves_to_none() {
        let doc = Document::with_version("1.5");
        assert!(resolve(&doc, &Object::Reference((99, 0))).is_none());
        assert!(resolve(&doc, &Object::Integer(3)).is_some());
    }
}
