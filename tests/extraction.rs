//! Integration tests for the extraction cascade's batch behavior: artifact
//! writing, header-sniff fast rejection, failure logging, and batch
//! continuation past failing documents.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn docq_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("docq");
    path
}

/// Minimal valid PDF containing the text "cascade probe phrase".
/// Builds the body then an xref with correct byte offsets so a real parser
/// can walk it.
fn minimal_pdf_with_phrase() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(b"4 0 obj << /Length 53 >> stream\nBT /F1 12 Tf 100 700 Td (cascade probe phrase) Tj ET\nendstream endobj\n");
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    out.extend_from_slice(format!("{:010} 00000 n \n", o1).as_bytes());
    out.extend_from_slice(format!("{:010} 00000 n \n", o2).as_bytes());
    out.extend_from_slice(format!("{:010} 00000 n \n", o3).as_bytes());
    out.extend_from_slice(format!("{:010} 00000 n \n", o4).as_bytes());
    out.extend_from_slice(format!("{:010} 00000 n \n", o5).as_bytes());
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    fs::create_dir_all(root.join("config")).unwrap();
    fs::create_dir_all(root.join("pdfs")).unwrap();

    let config_content = format!(
        r#"[ingest]
pdf_dir = "{root}/pdfs"
text_dir = "{root}/texts"
failure_log = "{root}/errors/failed_extractions.log"
"#,
        root = root.display()
    );

    let config_path = root.join("config").join("docq.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_docq(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = docq_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run docq binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_extract_writes_artifact_for_wellformed_pdf() {
    let (tmp, config_path) = setup_test_env();
    fs::write(tmp.path().join("pdfs/report.pdf"), minimal_pdf_with_phrase()).unwrap();

    let (stdout, stderr, success) = run_docq(&config_path, &["extract"]);
    assert!(success, "extract failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("documents found: 1"));
    assert!(stdout.contains("extracted: 1"));
    assert!(stdout.contains("failed: 0"));

    // Artifact named by replacing the input extension.
    let artifact = tmp.path().join("texts/report.txt");
    assert!(artifact.exists(), "missing artifact {:?}", artifact);
    let text = fs::read_to_string(&artifact).unwrap();
    assert!(
        text.contains("cascade probe phrase"),
        "artifact text was: {:?}",
        text
    );

    // Nothing went into the failure log.
    assert!(!tmp.path().join("errors/failed_extractions.log").exists());
}

#[test]
fn test_missing_header_fails_fast_with_one_log_line() {
    let (tmp, config_path) = setup_test_env();
    fs::write(
        tmp.path().join("pdfs/fake.pdf"),
        b"<html>not a pdf at all</html>",
    )
    .unwrap();

    let (stdout, _stderr, success) = run_docq(&config_path, &["extract"]);
    assert!(success, "batch must succeed even when a document fails");
    assert!(stdout.contains("extracted: 0"));
    assert!(stdout.contains("failed: 1"));

    assert!(!tmp.path().join("texts/fake.txt").exists());

    let log = fs::read_to_string(tmp.path().join("errors/failed_extractions.log")).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 1, "expected exactly one failure line: {:?}", lines);
    assert!(lines[0].ends_with(": missing %PDF header"));
    assert!(lines[0].contains("fake.pdf"));
}

#[test]
fn test_batch_continues_past_failing_document() {
    let (tmp, config_path) = setup_test_env();
    // Sorted worklist puts the decoy first; the good document must still be
    // processed after it fails.
    fs::write(tmp.path().join("pdfs/aaa-decoy.pdf"), b"plain text").unwrap();
    fs::write(tmp.path().join("pdfs/report.pdf"), minimal_pdf_with_phrase()).unwrap();

    let (stdout, stderr, success) = run_docq(&config_path, &["extract"]);
    assert!(success, "extract failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("documents found: 2"));
    assert!(stdout.contains("extracted: 1"));
    assert!(stdout.contains("failed: 1"));
    assert!(tmp.path().join("texts/report.txt").exists());
}

#[test]
fn test_failure_log_appends_across_runs() {
    let (tmp, config_path) = setup_test_env();
    fs::write(tmp.path().join("pdfs/fake.pdf"), b"still not a pdf").unwrap();

    run_docq(&config_path, &["extract"]);
    run_docq(&config_path, &["extract"]);

    // One line per failed document per run, not deduplicated across runs.
    let log = fs::read_to_string(tmp.path().join("errors/failed_extractions.log")).unwrap();
    assert_eq!(log.lines().count(), 2);
}

#[test]
fn test_extract_limit_truncates_worklist() {
    let (tmp, config_path) = setup_test_env();
    fs::write(tmp.path().join("pdfs/a.pdf"), minimal_pdf_with_phrase()).unwrap();
    fs::write(tmp.path().join("pdfs/b.pdf"), minimal_pdf_with_phrase()).unwrap();

    let (stdout, _stderr, success) = run_docq(&config_path, &["extract", "--limit", "1"]);
    assert!(success);
    assert!(stdout.contains("documents found: 1"));
    assert!(stdout.contains("extracted: 1"));
    // Sorted worklist: a.pdf comes first.
    assert!(tmp.path().join("texts/a.txt").exists());
    assert!(!tmp.path().join("texts/b.txt").exists());
}

#[test]
fn test_non_matching_files_are_ignored() {
    let (tmp, config_path) = setup_test_env();
    fs::write(tmp.path().join("pdfs/notes.txt"), b"not scanned").unwrap();

    let (stdout, _stderr, success) = run_docq(&config_path, &["extract"]);
    assert!(success);
    assert!(stdout.contains("documents found: 0"));
}
