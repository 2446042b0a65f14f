//! Extraction cascade orchestration.
//!
//! Applies the strategies from [`crate::extract`] in fixed order of
//! increasing cost, stopping at the first that yields usable text. Drives
//! the batch `extract` command: scans the input directory, writes one text
//! artifact per successful document, and appends one failure-log line per
//! document that every strategy gave up on. A single failing document
//! never aborts the batch, whatever the reason.

use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::extract::{
    AltParser, DirectParse, ExtractionStrategy, OcrFallback, RepairRetry,
};
use crate::models::{ExtractionResult, StrategyOutcome};

/// Magic marker every well-formed PDF starts with.
const PDF_MAGIC: &[u8] = b"%PDF";

/// Reason recorded when the header sniff rejects a file.
pub const REASON_MISSING_HEADER: &str = "missing %PDF header";
/// Reason recorded when every strategy came up empty.
pub const REASON_ALL_FAILED: &str = "all extract methods failed";

/// The standard cascade, cheapest first.
pub fn default_strategies(ocr_dpi: u32) -> Vec<Box<dyn ExtractionStrategy>> {
    vec![
        Box::new(DirectParse),
        Box::new(RepairRetry),
        Box::new(AltParser),
        Box::new(OcrFallback { dpi: ocr_dpi }),
    ]
}

/// Quick check for the PDF header bytes. Fast reject, not a strategy.
pub fn is_probably_pdf(path: &Path) -> Result<bool> {
    let mut file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut header = [0u8; 5];
    let n = file.read(&mut header)?;
    Ok(header[..n].starts_with(PDF_MAGIC))
}

/// Run the cascade against one file.
///
/// Strategies are only consulted when the header sniff passes; the first
/// strategy whose output trims non-empty wins and later strategies are not
/// invoked. Exhausting all strategies produces an empty-text result with
/// the all-failed marker.
pub fn extract_document(
    path: &Path,
    strategies: &[Box<dyn ExtractionStrategy>],
) -> ExtractionResult {
    let path_str = path.display().to_string();

    match is_probably_pdf(path) {
        Ok(true) => {}
        Ok(false) => {
            return ExtractionResult {
                path: path_str,
                text: String::new(),
                strategy: None,
                reason: Some(REASON_MISSING_HEADER.to_string()),
            }
        }
        Err(e) => {
            return ExtractionResult {
                path: path_str,
                text: String::new(),
                strategy: None,
                reason: Some(format!("unreadable: {}", e)),
            }
        }
    }

    for strategy in strategies {
        match strategy.run(path) {
            StrategyOutcome::Text(text) => {
                info!(path = %path_str, strategy = strategy.name(), "extracted");
                return ExtractionResult {
                    path: path_str,
                    text,
                    strategy: Some(strategy.name()),
                    reason: None,
                };
            }
            StrategyOutcome::NoText => {
                debug!(path = %path_str, strategy = strategy.name(), "no text");
            }
            StrategyOutcome::Failed(reason) => {
                warn!(path = %path_str, strategy = strategy.name(), %reason, "strategy failed");
            }
        }
    }

    ExtractionResult {
        path: path_str,
        text: String::new(),
        strategy: None,
        reason: Some(REASON_ALL_FAILED.to_string()),
    }
}

/// Batch-extract every document in the configured input directory.
///
/// One `.txt` artifact per success (input extension replaced), one
/// failure-log line per failed document per run. The worklist is sorted
/// for deterministic ordering.
pub async fn run_extract(config: &Config, limit: Option<usize>) -> Result<()> {
    std::fs::create_dir_all(&config.ingest.text_dir).with_context(|| {
        format!(
            "Failed to create text directory: {}",
            config.ingest.text_dir.display()
        )
    })?;
    if let Some(parent) = config.ingest.failure_log.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut worklist = scan_documents(config)?;
    if let Some(lim) = limit {
        worklist.truncate(lim);
    }

    let strategies = default_strategies(config.ingest.ocr_dpi);

    let mut extracted = 0usize;
    let mut failed = 0usize;

    for path in &worklist {
        match process_document(config, path, &strategies) {
            Ok(true) => extracted += 1,
            Ok(false) => failed += 1,
            Err(e) => {
                // Orchestration-level error for this document only; the
                // batch keeps going.
                eprintln!("Warning: {}: {}", path.display(), e);
                let reason = format!("unexpected error: {}", e);
                if let Err(log_err) = append_failure(&config.ingest.failure_log, path, &reason) {
                    warn!(error = %log_err, "could not write failure log");
                }
                failed += 1;
            }
        }
    }

    println!("extract");
    println!("  documents found: {}", worklist.len());
    println!("  extracted: {}", extracted);
    println!("  failed: {}", failed);
    println!("ok");

    Ok(())
}

/// Extract one document and write its artifact or failure-log line.
/// Returns Ok(true) on success, Ok(false) on a recorded failure.
fn process_document(
    config: &Config,
    path: &Path,
    strategies: &[Box<dyn ExtractionStrategy>],
) -> Result<bool> {
    let result = extract_document(path, strategies);

    if result.succeeded() {
        let artifact = artifact_path(&config.ingest.text_dir, path);
        std::fs::write(&artifact, &result.text)
            .with_context(|| format!("Failed to write {}", artifact.display()))?;
        return Ok(true);
    }

    let reason = result
        .reason
        .unwrap_or_else(|| REASON_ALL_FAILED.to_string());
    eprintln!("Warning: failed to extract {} ({})", path.display(), reason);
    append_failure(&config.ingest.failure_log, path, &reason)?;
    Ok(false)
}

/// Artifact path: same stem as the input, `.txt` extension, in `text_dir`.
pub fn artifact_path(text_dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    text_dir.join(format!("{}.txt", stem))
}

/// Append one `<path>: <reason>` line to the shared failure log.
fn append_failure(log_path: &Path, doc_path: &Path, reason: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("Failed to open failure log: {}", log_path.display()))?;
    writeln!(file, "{}: {}", doc_path.display(), reason)?;
    Ok(())
}

/// Scan the input directory for documents matching the include globs,
/// sorted for deterministic ordering.
pub fn scan_documents(config: &Config) -> Result<Vec<PathBuf>> {
    let root = &config.ingest.pdf_dir;
    if !root.exists() {
        anyhow::bail!("Input directory does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.ingest.include_globs)?;

    let mut paths = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if !include_set.is_match(relative.to_string_lossy().as_ref()) {
            continue;
        }
        paths.push(path.to_path_buf());
    }

    paths.sort();
    Ok(paths)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    struct FixedStrategy {
        name: &'static str,
        outcome: StrategyOutcome,
    }

    impl ExtractionStrategy for FixedStrategy {
        fn name(&self) -> &'static str {
            self.name
        }
        fn run(&self, _path: &Path) -> StrategyOutcome {
            self.outcome.clone()
        }
    }

    /// A strategy that counts how often the cascade consults it.
    struct Probe(std::rc::Rc<std::cell::Cell<usize>>);

    impl ExtractionStrategy for Probe {
        fn name(&self) -> &'static str {
            "probe"
        }
        fn run(&self, _path: &Path) -> StrategyOutcome {
            self.0.set(self.0.get() + 1);
            StrategyOutcome::NoText
        }
    }

    fn pdf_like_file(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"%PDF-1.4\nstub body\n").unwrap();
        path
    }

    #[test]
    fn header_sniff_accepts_pdf_magic() {
        let tmp = tempfile::tempdir().unwrap();
        let path = pdf_like_file(tmp.path(), "a.pdf");
        assert!(is_probably_pdf(&path).unwrap());
    }

    #[test]
    fn header_sniff_rejects_other_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("not.pdf");
        std::fs::write(&path, b"<html>hello</html>").unwrap();
        assert!(!is_probably_pdf(&path).unwrap());
    }

    #[test]
    fn missing_header_short_circuits_without_invoking_strategies() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("fake.pdf");
        std::fs::write(&path, b"plain text masquerading as pdf").unwrap();

        let calls = std::rc::Rc::new(std::cell::Cell::new(0usize));
        let strategies: Vec<Box<dyn ExtractionStrategy>> =
            vec![Box::new(Probe(std::rc::Rc::clone(&calls)))];

        let result = extract_document(&path, &strategies);
        assert!(!result.succeeded());
        assert_eq!(result.reason.as_deref(), Some(REASON_MISSING_HEADER));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn first_successful_strategy_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let path = pdf_like_file(tmp.path(), "doc.pdf");

        let strategies: Vec<Box<dyn ExtractionStrategy>> = vec![
            Box::new(FixedStrategy {
                name: "first",
                outcome: StrategyOutcome::Failed("boom".to_string()),
            }),
            Box::new(FixedStrategy {
                name: "second",
                outcome: StrategyOutcome::Text("recovered text".to_string()),
            }),
            Box::new(FixedStrategy {
                name: "third",
                outcome: StrategyOutcome::Text("never reached".to_string()),
            }),
        ];

        let result = extract_document(&path, &strategies);
        assert!(result.succeeded());
        assert_eq!(result.strategy, Some("second"));
        assert_eq!(result.text, "recovered text");
    }

    #[test]
    fn exhausted_strategies_produce_all_failed_marker() {
        let tmp = tempfile::tempdir().unwrap();
        let path = pdf_like_file(tmp.path(), "doc.pdf");

        let strategies: Vec<Box<dyn ExtractionStrategy>> = vec![
            Box::new(FixedStrategy {
                name: "a",
                outcome: StrategyOutcome::NoText,
            }),
            Box::new(FixedStrategy {
                name: "b",
                outcome: StrategyOutcome::Failed("nope".to_string()),
            }),
        ];

        let result = extract_document(&path, &strategies);
        assert!(!result.succeeded());
        assert!(result.text.is_empty());
        assert_eq!(result.reason.as_deref(), Some(REASON_ALL_FAILED));
    }

    #[test]
    fn artifact_path_replaces_extension() {
        let out = artifact_path(Path::new("/tmp/texts"), Path::new("/docs/report.v2.pdf"));
        assert_eq!(out, Path::new("/tmp/texts/report.v2.txt"));
    }

    #[test]
    fn append_failure_writes_one_line_per_call() {
        let tmp = tempfile::tempdir().unwrap();
        let log = tmp.path().join("failed.log");
        append_failure(&log, Path::new("a.pdf"), "missing %PDF header").unwrap();
        append_failure(&log, Path::new("b.pdf"), "all extract methods failed").unwrap();

        let contents = std::fs::read_to_string(&log).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "a.pdf: missing %PDF header");
        assert_eq!(lines[1], "b.pdf: all extract methods failed");
    }
}
