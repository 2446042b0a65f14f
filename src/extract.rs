//! PDF text-extraction strategies.
//!
//! Each strategy attempts to pull plain text out of one PDF file behind the
//! same contract: a filesystem path in, a [`StrategyOutcome`] out. A
//! strategy never returns an error to its caller and never panics on bad
//! input; whatever goes wrong internally becomes
//! [`StrategyOutcome::Failed`] with the reason preserved for diagnostics.
//!
//! The cascade (see [`crate::cascade`]) runs the strategies in order of
//! increasing cost:
//!
//! 1. [`DirectParse`] — lopdf structure walk, per-page text.
//! 2. [`RepairRetry`] — rewrite the document to a temp copy, re-parse.
//! 3. [`AltParser`] — pdf-extract, an independent implementation.
//! 4. [`OcrFallback`] — rasterize with `pdftoppm`, recognize with
//!    `tesseract`; external tools, most expensive, last resort.

use std::path::{Path, PathBuf};
use std::process::Command;

use lopdf::Document;
use tracing::debug;

use crate::models::StrategyOutcome;

/// A single text-extraction technique with a uniform contract.
pub trait ExtractionStrategy {
    /// Short identifier used in logs and extraction results.
    fn name(&self) -> &'static str;

    /// Attempt extraction. Must not propagate errors.
    fn run(&self, path: &Path) -> StrategyOutcome;
}

/// Collapse extracted text into an outcome: whitespace-only means no text.
fn outcome_from_text(text: String) -> StrategyOutcome {
    if text.trim().is_empty() {
        StrategyOutcome::NoText
    } else {
        StrategyOutcome::Text(text)
    }
}

// ============ Strategy 1: direct structure parse ============

/// Parses the PDF's internal structure with lopdf and concatenates per-page
/// text in page order.
pub struct DirectParse;

impl ExtractionStrategy for DirectParse {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn run(&self, path: &Path) -> StrategyOutcome {
        let doc = match Document::load(path) {
            Ok(d) => d,
            Err(e) => return StrategyOutcome::Failed(format!("load failed: {}", e)),
        };
        extract_with_lopdf(&doc)
    }
}

fn extract_with_lopdf(doc: &Document) -> StrategyOutcome {
    if doc.is_encrypted() {
        return StrategyOutcome::Failed("document is encrypted".to_string());
    }

    let pages = doc.get_pages();
    if pages.is_empty() {
        return StrategyOutcome::Failed("document has no pages".to_string());
    }

    let mut page_numbers: Vec<u32> = pages.keys().copied().collect();
    page_numbers.sort_unstable();

    let mut parts = Vec::new();
    let mut last_err = None;
    for page_num in page_numbers {
        match doc.extract_text(&[page_num]) {
            Ok(text) => parts.push(text),
            Err(e) => {
                debug!(page = page_num, error = %e, "page text extraction failed");
                last_err = Some(e.to_string());
            }
        }
    }

    if parts.is_empty() {
        return StrategyOutcome::Failed(
            last_err.unwrap_or_else(|| "no page yielded text".to_string()),
        );
    }

    outcome_from_text(parts.join("\n"))
}

// ============ Strategy 2: repair, then re-parse ============

/// Rewrites the document into a well-formed temporary copy (normalized
/// xref and object graph) and re-runs the direct parse against it. The
/// temp file is removed on every exit path by its guard.
pub struct RepairRetry;

impl ExtractionStrategy for RepairRetry {
    fn name(&self) -> &'static str {
        "repair"
    }

    fn run(&self, path: &Path) -> StrategyOutcome {
        let mut doc = match Document::load(path) {
            Ok(d) => d,
            Err(e) => return StrategyOutcome::Failed(format!("repair load failed: {}", e)),
        };

        let tmp = match tempfile::Builder::new().suffix(".pdf").tempfile() {
            Ok(t) => t,
            Err(e) => return StrategyOutcome::Failed(format!("temp file: {}", e)),
        };

        if let Err(e) = doc.save(tmp.path()) {
            return StrategyOutcome::Failed(format!("rewrite failed: {}", e));
        }

        DirectParse.run(tmp.path())
    }
}

// ============ Strategy 3: alternative parser ============

/// Extraction through pdf-extract, an independently implemented text
/// extractor, used as a cross-check when lopdf finds nothing.
pub struct AltParser;

impl ExtractionStrategy for AltParser {
    fn name(&self) -> &'static str {
        "alt-parser"
    }

    fn run(&self, path: &Path) -> StrategyOutcome {
        match pdf_extract::extract_text(path) {
            Ok(text) => outcome_from_text(text),
            Err(e) => StrategyOutcome::Failed(e.to_string()),
        }
    }
}

// ============ Strategy 4: OCR fallback ============

/// Rasterizes each page to PNG at a fixed resolution with `pdftoppm`, then
/// recognizes text per page with `tesseract`. Both tools are external
/// collaborators; a missing binary degrades to a recorded failure. Page
/// images live in a scoped temp directory removed on every exit path.
pub struct OcrFallback {
    pub dpi: u32,
}

impl ExtractionStrategy for OcrFallback {
    fn name(&self) -> &'static str {
        "ocr"
    }

    fn run(&self, path: &Path) -> StrategyOutcome {
        let dir = match tempfile::tempdir() {
            Ok(d) => d,
            Err(e) => return StrategyOutcome::Failed(format!("temp dir: {}", e)),
        };

        let images = match rasterize_pages(path, dir.path(), self.dpi) {
            Ok(imgs) => imgs,
            Err(reason) => return StrategyOutcome::Failed(reason),
        };
        if images.is_empty() {
            return StrategyOutcome::Failed("rasterizer produced no pages".to_string());
        }

        let mut parts = Vec::new();
        for image in &images {
            match recognize_page(image) {
                Ok(text) => parts.push(text),
                Err(reason) => return StrategyOutcome::Failed(reason),
            }
        }

        outcome_from_text(parts.join("\n"))
    }
}

/// Render every page of `path` into `dir` as `page-*.png` and return the
/// image paths in page order.
fn rasterize_pages(path: &Path, dir: &Path, dpi: u32) -> Result<Vec<PathBuf>, String> {
    let prefix = dir.join("page");
    let output = Command::new("pdftoppm")
        .args(["-r", &dpi.to_string(), "-png"])
        .arg(path)
        .arg(&prefix)
        .output()
        .map_err(|e| format!("failed to execute 'pdftoppm' (is poppler installed?): {}", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("pdftoppm failed: {}", stderr.trim()));
    }

    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| format!("reading page images: {}", e))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
        .collect();

    // pdftoppm zero-pads page numbers, so lexical order is page order.
    images.sort();
    Ok(images)
}

fn recognize_page(image: &Path) -> Result<String, String> {
    let output = Command::new("tesseract")
        .arg(image)
        .arg("stdout")
        .output()
        .map_err(|e| format!("failed to execute 'tesseract' (is it installed?): {}", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("tesseract failed: {}", stderr.trim()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
