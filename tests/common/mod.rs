//! Helpers for building small PDFs in memory.

#![allow(dead_code)]

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;

/// A one-page document that draws every added image.
pub struct TestPdf {
    doc: Document,
    pages_id: ObjectId,
    xobjects: Dictionary,
    info: Option<Dictionary>,
}

impl TestPdf {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        TestPdf {
            doc,
            pages_id,
            xobjects: Dictionary::new(),
            info: None,
        }
    }

    /// Add an image drawn on the page as `/<name>`.
    pub fn add_image(&mut self, name: &str, dict: Dictionary, content: Vec<u8>) -> ObjectId {
        let id = self.doc.add_object(Stream::new(dict, content));
        self.xobjects.set(name, Object::Reference(id));
        id
    }

    /// Add an object that is not drawn directly (e.g. a soft mask).
    pub fn add_stream(&mut self, dict: Dictionary, content: Vec<u8>) -> ObjectId {
        self.doc.add_object(Stream::new(dict, content))
    }

    pub fn set_info(&mut self, info: Dictionary) {
        self.info = Some(info);
    }

    pub fn build(mut self) -> Vec<u8> {
        let mut ops = String::new();
        for (name, _) in self.xobjects.iter() {
            ops.push_str(&format!(
                "q 200 0 0 200 50 50 cm /{} Do Q\n",
                String::from_utf8_lossy(name)
            ));
        }
        ops.push_str("0 0 1 rg 10 10 100 100 re f\n");

        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), ops.into_bytes()));
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => self.xobjects.clone(),
            },
        });
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        if let Some(info) = self.info.take() {
            let info_id = self.doc.add_object(info);
            self.doc.trailer.set("Info", info_id);
        }

        let mut out = Vec::new();
        self.doc.save_to(&mut out).unwrap();
        out
    }
}

pub fn image_dict(width: u32, height: u32, filter: &str, color_space: &str) -> Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
        "Filter" => filter,
    }
}

/// Smooth gradient with a little deterministic noise, `channels` per pixel.
pub fn textured(width: u32, height: u32, channels: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).max(1);
    let mut out = Vec::with_capacity(width as usize * height as usize * channels);
    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                let base = (x * 255 / width.max(1) + y * 255 / height.max(1)) / 2;
                let v = base as usize + c * 40 + (state % 24) as usize;
                out.push((v % 256) as u8);
            }
        }
    }
    out
}

/// Full-range deterministic noise, 3 channels per pixel.
pub fn noise_rgb(width: u32, height: u32, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_246_822_519).max(1);
    (0..width as usize * height as usize * 3)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 11) as u8
        })
        .collect()
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn jpeg_rgb(width: u32, height: u32, pixels: &[u8], quality: u8) -> Vec<u8> {
    let mut out = Vec::new();
    jpeg_encoder::Encoder::new(&mut out, quality)
        .encode(pixels, width as u16, height as u16, jpeg_encoder::ColorType::Rgb)
        .unwrap();
    out
}

/// The image drawn as `/<name>` on the first page.
pub fn xobject<'a>(doc: &'a Document, name: &str) -> (ObjectId, &'a Stream) {
    let page_id = *doc.get_pages().values().next().unwrap();
    let page = doc.get_dictionary(page_id).unwrap();
    let resources = match page.get(b"Resources").unwrap() {
        Object::Reference(id) => doc.get_dictionary(*id).unwrap(),
        obj => obj.as_dict().unwrap(),
    };
    let xobjects = match resources.get(b"XObject").unwrap() {
        Object::Reference(id) => doc.get_dictionary(*id).unwrap(),
        obj => obj.as_dict().unwrap(),
    };
    let id = xobjects.get(name.as_bytes()).unwrap().as_reference().unwrap();
    (id, doc.get_object(id).unwrap().as_stream().unwrap())
}

pub fn info_dict(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}
