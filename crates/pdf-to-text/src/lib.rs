//! Text extraction and OCR for PDF files via external tools
//!
//! This crate wraps three command-line programs:
//! - `pdftotext` (poppler-utils) to extract text to stdout
//! - `ocrmypdf` to add a text layer to scanned PDFs, in place
//! - `qpdf`, whose location is configurable but which no operation calls yet
//!
//! All PDF parsing and OCR happens inside those tools. This crate builds
//! their command lines, runs them under a timeout and turns non-zero exits
//! into typed errors carrying the captured output.
//!
//! # Example
//!
//! ```no_run
//! use pdf_to_text::PdfTextExtractor;
//!
//! # fn example() -> Result<(), pdf_to_text::PdfTextError> {
//! // One-shot extraction with default tool paths and a 60s timeout
//! let text = PdfTextExtractor::get_text("book.pdf", None, &[], None)?;
//!
//! // OCR a scanned document, then extract its text
//! let text = PdfTextExtractor::new()
//!     .set_scan_options(["-l eng", "--skip-text"])
//!     .set_options(["layout"])
//!     .set_pdf("scanned.pdf")?
//!     .scan()?
//!     .text()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Async
//!
//! `scan`, `text` and `get_text` block the calling thread. From inside a tokio
//! runtime use `scan_async`, `text_async` and `get_text_async` instead; the
//! blocking versions return [`PdfTextError::NestedRuntime`] there.

pub mod config;
pub mod error;
pub mod extractor;
pub mod options;
pub mod process;

pub use config::{
    ToolConfig, DEFAULT_OCRMYPDF_PATH, DEFAULT_ONE_SHOT_TIMEOUT, DEFAULT_PDFTOTEXT_PATH,
    DEFAULT_QPDF_PATH, DEFAULT_TIMEOUT,
};
pub use error::{FailureReason, PdfTextError, ProcessFailure};
pub use extractor::PdfTextExtractor;
pub use options::{OptionList, ToolOption};
pub use process::{ProcessOutput, ToolCommand};
