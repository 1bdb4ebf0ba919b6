//! WebAssembly bindings for the PDF Image Recompressor

use crate::{compress_pdf_bytes, inspect_images, CompressSummary, ImageReport};
use wasm_bindgen::prelude::*;

struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Info
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let msg = JsValue::from_str(&format!("{}", record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&msg),
            log::Level::Warn => web_sys::console::warn_1(&msg),
            _ => web_sys::console::log_1(&msg),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Initialize panic hook and console logging
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Info);
    }
}

/// Recompress the images in a PDF
///
/// # Arguments
/// * `pdf_bytes` - The input PDF file as a byte array
///
/// # Returns
/// The compressed PDF as a byte array, or throws if the input is not a
/// loadable PDF
#[wasm_bindgen]
pub fn compress_pdf(pdf_bytes: &[u8]) -> Result<Vec<u8>, JsError> {
    let (output_bytes, _summary) =
        compress_pdf_bytes(pdf_bytes).map_err(|e| JsError::new(&e.to_string()))?;
    Ok(output_bytes)
}

/// Recompress the images in a PDF and report what happened
#[wasm_bindgen]
pub fn compress_pdf_with_info(pdf_bytes: &[u8]) -> Result<CompressResultJs, JsError> {
    let (output_bytes, summary) =
        compress_pdf_bytes(pdf_bytes).map_err(|e| JsError::new(&e.to_string()))?;

    let images = inspect_images(&output_bytes).map_err(|e| JsError::new(&e.to_string()))?;
    let image_info_json =
        serde_json::to_string(&images_to_json(&images)).unwrap_or_else(|_| "[]".to_string());

    Ok(CompressResultJs {
        original_size: pdf_bytes.len(),
        pdf_bytes: output_bytes,
        summary,
        image_info_json,
    })
}

fn images_to_json(images: &[ImageReport]) -> Vec<serde_json::Value> {
    images
        .iter()
        .map(|img| {
            serde_json::json!({
                "objectId": format!("{} {}", img.object_id.0, img.object_id.1),
                "width": img.width,
                "height": img.height,
                "colorSpace": img.color_space,
                "bpc": img.bits_per_component,
                "filter": img.filter,
                "size": img.size_bytes,
                "skip": img.eligibility.as_ref().err().map(|r| r.to_string()),
            })
        })
        .collect()
}

/// Result of PDF compression with statistics
#[wasm_bindgen]
pub struct CompressResultJs {
    pdf_bytes: Vec<u8>,
    original_size: usize,
    summary: CompressSummary,
    image_info_json: String,
}

#[wasm_bindgen]
impl CompressResultJs {
    /// Get the compressed PDF bytes
    #[wasm_bindgen(getter)]
    pub fn pdf_bytes(&self) -> Vec<u8> {
        self.pdf_bytes.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn original_size(&self) -> usize {
        self.original_size
    }

    #[wasm_bindgen(getter)]
    pub fn compressed_size(&self) -> usize {
        self.pdf_bytes.len()
    }

    /// Number of images handed to the recompressor
    #[wasm_bindgen(getter)]
    pub fn candidate_images(&self) -> usize {
        self.summary.candidates
    }

    #[wasm_bindgen(getter)]
    pub fn replaced_images(&self) -> usize {
        self.summary.replaced
    }

    #[wasm_bindgen(getter)]
    pub fn skipped_images(&self) -> usize {
        self.summary.skipped + self.summary.unchanged
    }

    /// Get detailed image information for the output as a JSON string
    #[wasm_bindgen(getter)]
    pub fn image_info_json(&self) -> String {
        self.image_info_json.clone()
    }
}
