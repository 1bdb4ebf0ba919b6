//! PDF Image Recompressor Library
//!
//! Finds the raster images inside a PDF's object graph, re-encodes the ones
//! that can be shrunk as JPEG, and writes the document back with packed object
//! streams. Everything that is not a replaced image is left as it was.
//!
//! The pipeline for one document:
//!
//! 1. **Scanning**: [`scanner::scan`] picks eligible image streams.
//! 2. **Dispatching**: every candidate becomes an independent job on the rayon
//!    pool ([`decode`] then [`policy`]).
//! 3. **AwaitingAll**: all jobs settle before the document is touched.
//! 4. **Finalizing**: accepted results are written by [`rewrite::apply`], then
//!    [`finalize`] clears metadata and serializes.
//!
//! A failing image never fails the run. Only an unreadable input or a failed
//! save is reported as [`CompressError`].

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub mod decode;
pub mod dict;
pub mod error;
pub mod finalize;
pub mod policy;
pub mod rewrite;
pub mod scanner;

pub use error::{CompressError, SkipReason};
pub use policy::{Recompression, Replacement};
pub use scanner::{ColorModel, ImageCandidate, SourceFilter};

use dict::{name_str, DictExt};
use lopdf::{Document, Object, ObjectId};
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

/// Options for PDF image recompression. The defaults are the tuned values
/// used in production and should not normally be changed.
#[derive(Debug, Clone)]
pub struct CompressOptions {
    /// Longest allowed image edge in pixels; larger images are downscaled
    pub max_edge: u32,
    /// JPEG quality (1-100)
    pub quality: u8,
    /// Images with fewer pixels are not worth touching
    pub min_pixels: u64,
    /// A JPEG source is replaced only below this fraction of its size
    pub jpeg_accept_ratio: f64,
    /// A raw deflate source is replaced only below this fraction of its size
    pub flate_accept_ratio: f64,
    /// Clear Title, Author, Subject, Keywords, Producer and Creator
    pub strip_metadata: bool,
    /// Save with object streams and a cross-reference stream
    pub object_streams: bool,
    /// Wall-clock budget per image; an image over budget is skipped
    pub job_budget: Option<Duration>,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            max_edge: 1500,
            quality: 60,
            min_pixels: 2500,
            jpeg_accept_ratio: 0.92,
            flate_accept_ratio: 0.85,
            strip_metadata: true,
            object_streams: true,
            job_budget: None,
        }
    }
}

impl CompressOptions {
    pub fn validate(&self) -> Result<(), CompressError> {
        if self.quality == 0 || self.quality > 100 {
            return Err(CompressError::InvalidOptions(
                "quality must be between 1 and 100".into(),
            ));
        }
        if self.max_edge == 0 || self.max_edge > u32::from(u16::MAX) {
            return Err(CompressError::InvalidOptions(format!(
                "max_edge must be between 1 and {}",
                u16::MAX
            )));
        }
        for (name, ratio) in [
            ("jpeg_accept_ratio", self.jpeg_accept_ratio),
            ("flate_accept_ratio", self.flate_accept_ratio),
        ] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(CompressError::InvalidOptions(format!(
                    "{} must be in (0, 1], got {}",
                    name, ratio
                )));
            }
        }
        Ok(())
    }
}

/// Final state of one candidate image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Replaced {
        before: usize,
        after: usize,
        width: u32,
        height: u32,
    },
    /// Re-encoding did not save enough; the object is byte-identical.
    Unchanged { before: usize, encoded: usize },
    Skipped(SkipReason),
}

/// Result of a compression run
#[derive(Debug, Clone, Default)]
pub struct CompressSummary {
    pub candidates: usize,
    pub replaced: usize,
    pub unchanged: usize,
    pub skipped: usize,
    /// Payload bytes of the replaced images, before and after
    pub bytes_before: usize,
    pub bytes_after: usize,
    pub outcomes: Vec<(ObjectId, Outcome)>,
}

impl CompressSummary {
    fn record(&mut self, id: ObjectId, outcome: Outcome) {
        match &outcome {
            Outcome::Replaced { before, after, .. } => {
                self.replaced += 1;
                self.bytes_before += before;
                self.bytes_after += after;
            }
            Outcome::Unchanged { .. } => self.unchanged += 1,
            Outcome::Skipped(_) => self.skipped += 1,
        }
        self.outcomes.push((id, outcome));
    }

    pub fn outcome(&self, id: ObjectId) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|(oid, _)| *oid == id)
            .map(|(_, outcome)| outcome)
    }

    pub fn bytes_saved(&self) -> usize {
        self.bytes_before.saturating_sub(self.bytes_after)
    }
}

/// Orchestrator stages, in order. There is no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Scanning,
    Dispatching,
    AwaitingAll,
    Finalizing,
    Done,
}

fn enter(stage: Stage) {
    log::trace!("[Compress] {:?}", stage);
}

/// Compress a PDF held in memory with the default options.
pub fn compress_pdf_bytes(input: &[u8]) -> Result<(Vec<u8>, CompressSummary), CompressError> {
    compress_pdf_bytes_with(input, &CompressOptions::default())
}

/// Compress a PDF held in memory.
pub fn compress_pdf_bytes_with(
    input: &[u8],
    options: &CompressOptions,
) -> Result<(Vec<u8>, CompressSummary), CompressError> {
    options.validate()?;

    let mut doc = Document::load_mem(input).map_err(CompressError::Load)?;
    let summary = compress_document(&mut doc, options);
    let output = finalize::save(&mut doc, options.object_streams)?;
    enter(Stage::Done);

    log::info!(
        "Compressed {} -> {} bytes ({} candidates: {} replaced, {} unchanged, {} skipped)",
        input.len(),
        output.len(),
        summary.candidates,
        summary.replaced,
        summary.unchanged,
        summary.skipped
    );

    Ok((output, summary))
}

/// Compress `input`, falling back to the original bytes when the document
/// cannot be loaded or saved.
pub fn compress_or_passthrough(input: &[u8]) -> Vec<u8> {
    match compress_pdf_bytes(input) {
        Ok((output, _)) => output,
        Err(e) => {
            log::warn!("Passing PDF through unchanged: {}", e);
            input.to_vec()
        }
    }
}

/// Recompress the images of an already loaded document and clear its
/// metadata. The document is not serialized.
pub fn compress_document(doc: &mut Document, options: &CompressOptions) -> CompressSummary {
    enter(Stage::Scanning);
    let candidates: Vec<ImageCandidate<'_>> = scanner::scan(doc, options).collect();
    log::debug!("[Compress] Found {} candidate images", candidates.len());

    enter(Stage::Dispatching);
    let settled: Vec<(ObjectId, Recompression)> = candidates
        .par_iter()
        .map(|candidate| {
            let job = || policy::recompress(candidate, options);
            (candidate.id, run_job(job))
        })
        .collect();
    drop(candidates);
    enter(Stage::AwaitingAll);

    let mut summary = CompressSummary {
        candidates: settled.len(),
        ..CompressSummary::default()
    };

    enter(Stage::Finalizing);
    for (id, result) in settled {
        let outcome = commit(doc, id, result);
        summary.record(id, outcome);
    }

    if options.strip_metadata {
        let removed = finalize::strip_metadata(doc);
        log::debug!("[Compress] Removed {} metadata entries", removed);
    }

    summary
}

/// Write one settled job's result into the document.
fn commit(doc: &mut Document, id: ObjectId, result: Recompression) -> Outcome {
    match result {
        Recompression::Replace(replacement) => {
            let outcome = Outcome::Replaced {
                before: replacement.original_len,
                after: replacement.data.len(),
                width: replacement.width,
                height: replacement.height,
            };
            if rewrite::apply(doc, replacement) {
                log::debug!("[Compress] {:?}: replaced, {:?}", id, outcome);
                outcome
            } else {
                log::warn!("[Compress] {:?}: target vanished before rewrite", id);
                Outcome::Skipped(SkipReason::TargetVanished)
            }
        }
        Recompression::Unchanged {
            original_len,
            encoded_len,
        } => {
            log::debug!(
                "[Compress] {:?}: kept, {} -> {} bytes is not enough",
                id,
                original_len,
                encoded_len
            );
            Outcome::Unchanged {
                before: original_len,
                encoded: encoded_len,
            }
        }
        Recompression::Skipped(reason) => {
            log::warn!("[Compress] {:?}: skipped, {}", id, reason);
            Outcome::Skipped(reason)
        }
    }
}

/// Run one candidate's job. Panics from codecs stop here.
fn run_job(job: impl FnOnce() -> Recompression) -> Recompression {
    panic::catch_unwind(AssertUnwindSafe(job))
        .unwrap_or(Recompression::Skipped(SkipReason::Panicked))
}

/// Information about a single image stream in the PDF
#[derive(Debug, Clone, PartialEq)]
pub struct ImageReport {
    pub object_id: (u32, u16),
    pub width: u32,
    pub height: u32,
    pub filter: String,
    pub color_space: String,
    pub bits_per_component: Option<i64>,
    pub size_bytes: usize,
    /// `Ok` when the image would be handed to the recompressor
    pub eligibility: Result<(), SkipReason>,
}

/// List every image stream of a PDF with the scanner's verdict.
pub fn inspect_images(pdf_bytes: &[u8]) -> Result<Vec<ImageReport>, CompressError> {
    let doc = Document::load_mem(pdf_bytes).map_err(CompressError::Load)?;
    let options = CompressOptions::default();
    let image_scanner = scanner::ImageScanner::new(&doc, &options);

    let reports = doc
        .objects
        .iter()
        .filter_map(|(id, object)| match object {
            Object::Stream(stream) if stream.dict.name(b"Subtype") == Ok(b"Image".as_slice()) => {
                Some((*id, stream))
            }
            _ => None,
        })
        .map(|(id, stream)| {
            let dict = &stream.dict;
            let dimension = |key: &[u8]| dict.number(key).map(|n| n as u32).unwrap_or(0);
            let filter = match dict.get(b"Filter") {
                Ok(Object::Name(n)) => name_str(n),
                Ok(Object::Array(arr)) => arr
                    .iter()
                    .filter_map(|f| f.as_name().ok().map(name_str))
                    .collect::<Vec<_>>()
                    .join(" "),
                _ => "raw".to_string(),
            };
            let eligibility = image_scanner.classify(id, stream).map(|_| ());

            ImageReport {
                object_id: id,
                width: dimension(b"Width"),
                height: dimension(b"Height"),
                filter,
                color_space: ColorModel::from_dict(&doc, dict).to_string(),
                bits_per_component: dict.number(b"BitsPerComponent").ok().map(|b| b as i64),
                size_bytes: stream.content.len(),
                eligibility,
            }
        })
        .collect();

    Ok(reports)
}

#[cfg(not(target_arch = "wasm32"))]
pub mod file_ops {
    use super::*;
    use std::path::Path;

    /// Compress a PDF file into another file
    pub fn compress_pdf_file(
        input_path: &Path,
        output_path: &Path,
        options: &CompressOptions,
    ) -> Result<CompressSummary, CompressError> {
        let input = std::fs::read(input_path)?;
        let (output, summary) = compress_pdf_bytes_with(&input, options)?;
        std::fs::write(output_path, output)?;
        Ok(summary)
    }
}
