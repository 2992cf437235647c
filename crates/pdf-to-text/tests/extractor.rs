//! End-to-end tests against stub `pdftotext` / `ocrmypdf` scripts
//!
//! The stubs are small shell scripts written into a temp dir, so these tests
//! only run on unix.

#![cfg(unix)]

#[path = "common/stub_tool.rs"]
mod stub_tool;

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use pdf_to_text::{FailureReason, PdfTextError, PdfTextExtractor, ToolConfig};
use pretty_assertions::assert_eq;
use stub_tool::{init_tracing, write_pdf, write_stub};
use tempfile::TempDir;

/// Prints its arguments one per line
const ECHO_ARGS: &str = r#"printf '%s\n' "$@""#;

fn extractor_with(pdftotext: PathBuf, ocrmypdf: PathBuf) -> PdfTextExtractor {
    PdfTextExtractor::with_config(ToolConfig {
        pdftotext_path: pdftotext,
        ocrmypdf_path: ocrmypdf,
        ..ToolConfig::default()
    })
}

#[test]
fn get_text_strips_surrounding_whitespace() {
    let dir = TempDir::new().unwrap();
    let tool = write_stub(dir.path(), "pdftotext", r"printf '  hello world\n'");
    let pdf = write_pdf(dir.path(), "sample.pdf");

    let text = PdfTextExtractor::get_text(&pdf, Some(tool), &[], None).unwrap();
    assert_eq!(text, "hello world");
}

#[test]
fn text_keeps_interior_whitespace() {
    let dir = TempDir::new().unwrap();
    let tool = write_stub(
        dir.path(),
        "pdftotext",
        r"printf '\n\n  line one\n\n\tline two  \n\f\n'",
    );
    let pdf = write_pdf(dir.path(), "sample.pdf");

    let text = PdfTextExtractor::get_text(&pdf, Some(tool), &[], None).unwrap();
    assert_eq!(text, "line one\n\n\tline two");
}

#[test]
fn text_passes_options_then_pdf_then_dash() {
    let dir = TempDir::new().unwrap();
    let tool = write_stub(dir.path(), "pdftotext", ECHO_ARGS);
    let pdf = write_pdf(dir.path(), "sample.pdf");

    let text = extractor_with(tool, PathBuf::from("/usr/bin/ocrmypdf"))
        .set_options(["layout", "-enc UTF-8"])
        .add_options(["-enc Latin1"])
        .set_pdf(&pdf)
        .unwrap()
        .text()
        .unwrap();

    let expected = format!("-layout\n-enc\nLatin1\n{}\n-", pdf.display());
    assert_eq!(text, expected);
}

#[test]
fn get_text_applies_options() {
    let dir = TempDir::new().unwrap();
    let tool = write_stub(dir.path(), "pdftotext", ECHO_ARGS);
    let pdf = write_pdf(dir.path(), "sample.pdf");

    let text = PdfTextExtractor::get_text(&pdf, Some(tool), &["f 1", "l 1"], None).unwrap();
    assert_eq!(text, format!("-f\n1\n-l\n1\n{}\n-", pdf.display()));
}

#[test]
fn text_failure_exposes_exit_code_and_output() {
    let dir = TempDir::new().unwrap();
    let tool = write_stub(
        dir.path(),
        "pdftotext",
        "printf 'partial'; echo 'Syntax Error: broken xref' >&2; exit 1",
    );
    let pdf = write_pdf(dir.path(), "sample.pdf");

    let err = PdfTextExtractor::get_text(&pdf, Some(tool), &[], None).unwrap_err();
    match err {
        PdfTextError::TextExtraction(failure) => {
            assert_eq!(failure.exit_code(), Some(1));
            assert_eq!(failure.reason(), &FailureReason::NonZeroExit);
            assert_eq!(failure.stdout(), "partial");
            assert!(failure.stderr().contains("broken xref"));
            assert!(failure.command().ends_with(" -"));
        }
        other => panic!("Expected TextExtraction error, got {:?}", other),
    }
}

#[test]
fn any_nonzero_exit_is_a_failure() {
    let dir = TempDir::new().unwrap();
    let pdf = write_pdf(dir.path(), "sample.pdf");

    for code in [2, 3, 99, 255] {
        let tool = write_stub(dir.path(), &format!("pdftotext-{}", code), &format!("exit {}", code));
        let err = PdfTextExtractor::get_text(&pdf, Some(tool), &[], None).unwrap_err();
        let failure = err.process_failure().expect("process failure");
        assert_eq!(failure.exit_code(), Some(code));
    }
}

#[test]
fn missing_tool_is_an_extraction_failure() {
    let dir = TempDir::new().unwrap();
    let pdf = write_pdf(dir.path(), "sample.pdf");

    let err = PdfTextExtractor::get_text(
        &pdf,
        Some(dir.path().join("no-such-pdftotext")),
        &[],
        None,
    )
    .unwrap_err();
    match err {
        PdfTextError::TextExtraction(failure) => {
            assert!(matches!(failure.reason(), FailureReason::Spawn(_)));
        }
        other => panic!("Expected TextExtraction error, got {:?}", other),
    }
}

#[test]
fn text_times_out() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let tool = write_stub(dir.path(), "pdftotext", "exec sleep 10");
    let pdf = write_pdf(dir.path(), "sample.pdf");

    let started = Instant::now();
    let err = PdfTextExtractor::get_text(&pdf, Some(tool), &[], Some(Duration::from_secs(1)))
        .unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(8));

    let failure = err.process_failure().expect("process failure");
    assert!(failure.timed_out());
    assert_eq!(
        failure.reason(),
        &FailureReason::TimedOut(Duration::from_secs(1))
    );
}

#[test]
fn zero_timeout_waits_for_completion() {
    let dir = TempDir::new().unwrap();
    let tool = write_stub(dir.path(), "pdftotext", "sleep 1; printf done");
    let pdf = write_pdf(dir.path(), "sample.pdf");

    let text = PdfTextExtractor::get_text(&pdf, Some(tool), &[], Some(Duration::ZERO)).unwrap();
    assert_eq!(text, "done");
}

#[test]
fn scan_runs_ocr_in_place() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("ocrmypdf.log");
    let ocr = write_stub(
        dir.path(),
        "ocrmypdf",
        &format!(
            r#"printf '%s\n' "$@" > '{}'; for last; do :; done; printf 'ocr-layer' >> "$last""#,
            log.display()
        ),
    );
    let pdf = write_pdf(dir.path(), "scanned.pdf");

    extractor_with(PathBuf::from("/usr/bin/pdftotext"), ocr)
        .set_scan_options(["l eng", "--skip-text"])
        .set_pdf(&pdf)
        .unwrap()
        .scan()
        .unwrap();

    let args = fs::read_to_string(&log).unwrap();
    assert_eq!(
        args,
        format!("-l\neng\n--skip-text\n{0}\n{0}\n", pdf.display())
    );
    let contents = fs::read_to_string(&pdf).unwrap();
    assert!(contents.ends_with("ocr-layer"));
}

#[test]
fn scan_failure_is_scan_error() {
    let dir = TempDir::new().unwrap();
    let ocr = write_stub(
        dir.path(),
        "ocrmypdf",
        "echo 'PriorOcrFoundError: page already has text' >&2; exit 6",
    );
    let pdf = write_pdf(dir.path(), "scanned.pdf");

    let extractor = extractor_with(PathBuf::from("/usr/bin/pdftotext"), ocr)
        .set_pdf(&pdf)
        .unwrap();
    match extractor.scan() {
        Err(PdfTextError::Scan(failure)) => {
            assert_eq!(failure.exit_code(), Some(6));
            assert!(failure.stderr().contains("PriorOcrFoundError"));
        }
        Err(other) => panic!("Expected Scan error, got {:?}", other),
        Ok(_) => panic!("Expected Scan error, got success"),
    }
}

#[test]
fn scan_then_text() {
    let dir = TempDir::new().unwrap();
    let ocr = write_stub(dir.path(), "ocrmypdf", r#"printf 'recognized words' > "$2""#);
    let pdftotext = write_stub(dir.path(), "pdftotext", r#"cat "$1"; printf '\n'"#);
    let pdf = write_pdf(dir.path(), "scanned.pdf");

    let text = extractor_with(pdftotext, ocr)
        .set_pdf(&pdf)
        .unwrap()
        .scan()
        .unwrap()
        .text()
        .unwrap();
    assert_eq!(text, "recognized words");
}

#[test]
fn failed_set_pdf_leaves_previous_target() {
    let dir = TempDir::new().unwrap();
    let pdf = write_pdf(dir.path(), "first.pdf");

    let extractor = PdfTextExtractor::new().set_pdf(&pdf).unwrap();
    let err = extractor
        .clone()
        .set_pdf(dir.path().join("missing.pdf"))
        .unwrap_err();

    assert!(matches!(err, PdfTextError::PdfNotFound { .. }));
    assert_eq!(extractor.pdf(), Some(pdf.as_path()));
}

#[test]
fn get_text_rejects_missing_pdf_before_running_tool() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("ran");
    let tool = write_stub(
        dir.path(),
        "pdftotext",
        &format!("touch '{}'", marker.display()),
    );

    let err = PdfTextExtractor::get_text(dir.path().join("missing.pdf"), Some(tool), &[], None)
        .unwrap_err();
    assert!(matches!(err, PdfTextError::PdfNotFound { .. }));
    assert!(!marker.exists());
}

#[tokio::test]
async fn async_variants_run_on_callers_runtime() {
    let dir = TempDir::new().unwrap();
    let tool = write_stub(dir.path(), "pdftotext", r"printf '\t async text \n'");
    let ocr = write_stub(dir.path(), "ocrmypdf", "exit 0");
    let pdf = write_pdf(dir.path(), "sample.pdf");

    let text = PdfTextExtractor::get_text_async(&pdf, Some(tool.clone()), &[], None)
        .await
        .unwrap();
    assert_eq!(text, "async text");

    let extractor = extractor_with(tool, ocr).set_pdf(&pdf).unwrap();
    extractor.scan_async().await.unwrap();
    assert_eq!(extractor.text_async().await.unwrap(), "async text");
}

/// Children of this test process that exited but were never waited on
#[cfg(target_os = "linux")]
fn zombie_children(comm: &str) -> Vec<String> {
    let me = std::process::id().to_string();
    let mut zombies = Vec::new();
    for entry in fs::read_dir("/proc").unwrap().flatten() {
        let Ok(stat) = fs::read_to_string(entry.path().join("stat")) else {
            continue;
        };
        // "pid (comm) state ppid ..."; comm may itself contain spaces
        let (Some(open), Some(close)) = (stat.find('('), stat.rfind(')')) else {
            continue;
        };
        let fields: Vec<&str> = stat[close + 1..].split_whitespace().collect();
        let is_zombie = fields.first() == Some(&"Z");
        let is_ours = fields.get(1) == Some(&me.as_str());
        if &stat[open + 1..close] == comm && is_zombie && is_ours {
            zombies.push(stat.trim().to_string());
        }
    }
    zombies
}

#[cfg(target_os = "linux")]
#[test]
fn timed_out_tool_is_reaped() {
    let dir = TempDir::new().unwrap();
    let tool = write_stub(dir.path(), "slow-pdftotext", "printf 'first page'; sleep 5");
    let pdf = write_pdf(dir.path(), "sample.pdf");

    for _ in 0..3 {
        let err = PdfTextExtractor::get_text(
            &pdf,
            Some(tool.clone()),
            &[],
            Some(Duration::from_millis(300)),
        )
        .unwrap_err();
        let failure = err.process_failure().expect("process failure");
        assert!(failure.timed_out());
        assert_eq!(failure.stdout(), "first page");
    }

    assert_eq!(zombie_children("slow-pdftotext"), Vec::<String>::new());
}

#[test]
fn set_pdf_does_not_block_on_fifo() {
    let dir = TempDir::new().unwrap();
    let fifo = dir.path().join("pipe.pdf");
    let status = std::process::Command::new("mkfifo")
        .arg(&fifo)
        .status()
        .unwrap();
    assert!(status.success());

    let (tx, rx) = std::sync::mpsc::channel();
    let target = fifo.clone();
    std::thread::spawn(move || {
        let _ = tx.send(PdfTextExtractor::new().set_pdf(&target).is_ok());
    });

    let accepted = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("set_pdf blocked on a FIFO without a writer");
    assert!(accepted);
}

#[test]
fn set_pdf_rejects_unreadable_file() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let pdf = write_pdf(dir.path(), "locked.pdf");
    fs::set_permissions(&pdf, fs::Permissions::from_mode(0o000)).unwrap();

    // Permission bits do not apply to root
    if fs::File::open(&pdf).is_ok() {
        return;
    }

    let err = PdfTextExtractor::new().set_pdf(&pdf).unwrap_err();
    match err {
        PdfTextError::PdfNotFound { path } => assert_eq!(path, pdf),
        other => panic!("Expected PdfNotFound error, got {:?}", other),
    }
}
