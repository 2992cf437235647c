//! The extractor facade
//!
//! [`PdfTextExtractor`] is configured with chainable builder methods and then
//! runs one of two terminal operations:
//!
//! - [`PdfTextExtractor::text`]: `pdftotext [options] <pdf> -`, returning stdout
//! - [`PdfTextExtractor::scan`]: `ocrmypdf [scan options] <pdf> <pdf>`, OCR in place
//!
//! Each terminal operation has an async twin for callers already running on
//! a tokio runtime. The blocking versions drive the async ones on a private
//! current-thread runtime.

use std::fs::OpenOptions;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, instrument};

use crate::config::{ToolConfig, DEFAULT_ONE_SHOT_TIMEOUT};
use crate::error::PdfTextError;
use crate::options::OptionList;
use crate::process::ToolCommand;

/// Characters stripped from both ends of extracted text
const TRIMMED_CHARS: [char; 7] = [' ', '\t', '\n', '\r', '\0', '\x0B', '\x0C'];

/// Wrapper around `pdftotext` and `ocrmypdf`
///
/// # Example
///
/// ```no_run
/// use pdf_to_text::PdfTextExtractor;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), pdf_to_text::PdfTextError> {
/// let text = PdfTextExtractor::new()
///     .set_options(["layout", "-enc UTF-8"])
///     .set_timeout(Duration::from_secs(30))
///     .set_pdf("invoice.pdf")?
///     .text()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct PdfTextExtractor {
    config: ToolConfig,
    pdf: Option<PathBuf>,
    options: OptionList,
    scan_options: OptionList,
}

impl PdfTextExtractor {
    /// Create an extractor using the default tool locations and timeout
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ToolConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Create an extractor overriding any of the tool paths or the timeout
    ///
    /// Every `None` falls back to the corresponding default.
    pub fn with_tools(
        pdftotext_path: Option<PathBuf>,
        ocrmypdf_path: Option<PathBuf>,
        qpdf_path: Option<PathBuf>,
        timeout: Option<Duration>,
    ) -> Self {
        let defaults = ToolConfig::default();
        Self::with_config(ToolConfig {
            pdftotext_path: pdftotext_path.unwrap_or(defaults.pdftotext_path),
            ocrmypdf_path: ocrmypdf_path.unwrap_or(defaults.ocrmypdf_path),
            qpdf_path: qpdf_path.unwrap_or(defaults.qpdf_path),
            timeout: timeout.unwrap_or(defaults.timeout),
        })
    }

    /// Select the PDF to work on
    ///
    /// # Errors
    ///
    /// Returns [`PdfTextError::PdfNotFound`] if the file cannot be opened for
    /// reading. The extractor is consumed either way, so a failed call can
    /// never leave a half-updated target behind.
    pub fn set_pdf(mut self, path: impl AsRef<Path>) -> Result<Self, PdfTextError> {
        let path = path.as_ref();
        if !is_readable(path) {
            return Err(PdfTextError::PdfNotFound {
                path: path.to_path_buf(),
            });
        }

        debug!(pdf = %path.display(), "selected PDF");
        self.pdf = Some(path.to_path_buf());
        Ok(self)
    }

    /// Replace the extraction options
    pub fn set_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.options = OptionList::parse(options);
        self
    }

    /// Merge into the extraction options, later flags winning
    pub fn add_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.options.merge(options);
        self
    }

    /// Replace the OCR options
    pub fn set_scan_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.scan_options = OptionList::parse(options);
        self
    }

    /// Merge into the OCR options, later flags winning
    pub fn add_scan_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.scan_options.merge(options);
        self
    }

    /// Set the timeout for subsequent tool runs. Zero disables it.
    pub fn set_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    pub fn pdf(&self) -> Option<&Path> {
        self.pdf.as_deref()
    }

    pub fn options(&self) -> &OptionList {
        &self.options
    }

    pub fn scan_options(&self) -> &OptionList {
        &self.scan_options
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    fn require_pdf(&self) -> Result<&Path, PdfTextError> {
        self.pdf.as_deref().ok_or(PdfTextError::PdfNotSet)
    }

    fn text_command(&self, pdf: &Path) -> ToolCommand {
        ToolCommand::new(&self.config.pdftotext_path)
            .args(self.options.to_args())
            .arg(pdf.as_os_str())
            .arg("-")
    }

    fn scan_command(&self, pdf: &Path) -> ToolCommand {
        ToolCommand::new(&self.config.ocrmypdf_path)
            .args(self.scan_options.to_args())
            .arg(pdf.as_os_str())
            .arg(pdf.as_os_str())
    }

    /// OCR the selected PDF in place
    pub fn scan(&self) -> Result<&Self, PdfTextError> {
        block_on(self.scan_async())?
    }

    #[instrument(level = "debug", skip(self), fields(pdf = ?self.pdf))]
    pub async fn scan_async(&self) -> Result<&Self, PdfTextError> {
        let pdf = self.require_pdf()?;
        self.scan_command(pdf)
            .run(self.config.timeout)
            .await
            .map_err(PdfTextError::Scan)?;
        Ok(self)
    }

    /// Extract the text of the selected PDF
    ///
    /// Surrounding whitespace (including NUL, vertical tab and form feed) is
    /// stripped; the interior is returned untouched.
    pub fn text(&self) -> Result<String, PdfTextError> {
        block_on(self.text_async())?
    }

    #[instrument(level = "debug", skip(self), fields(pdf = ?self.pdf))]
    pub async fn text_async(&self) -> Result<String, PdfTextError> {
        let pdf = self.require_pdf()?;
        let output = self
            .text_command(pdf)
            .run(self.config.timeout)
            .await
            .map_err(PdfTextError::TextExtraction)?;

        let text = output.stdout_lossy();
        Ok(text.trim_matches(TRIMMED_CHARS).to_string())
    }

    /// One-shot extraction with a shorter default timeout
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pdf_to_text::PdfTextExtractor;
    ///
    /// # fn example() -> Result<(), pdf_to_text::PdfTextError> {
    /// let text = PdfTextExtractor::get_text("sample.pdf", None, &["layout"], None)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn get_text(
        pdf: impl AsRef<Path>,
        pdftotext_path: Option<PathBuf>,
        options: &[&str],
        timeout: Option<Duration>,
    ) -> Result<String, PdfTextError> {
        Self::one_shot(pdf, pdftotext_path, options, timeout)?.text()
    }

    pub async fn get_text_async(
        pdf: impl AsRef<Path>,
        pdftotext_path: Option<PathBuf>,
        options: &[&str],
        timeout: Option<Duration>,
    ) -> Result<String, PdfTextError> {
        Self::one_shot(pdf, pdftotext_path, options, timeout)?
            .text_async()
            .await
    }

    fn one_shot(
        pdf: impl AsRef<Path>,
        pdftotext_path: Option<PathBuf>,
        options: &[&str],
        timeout: Option<Duration>,
    ) -> Result<Self, PdfTextError> {
        Self::with_tools(pdftotext_path, None, None, None)
            .set_options(options)
            .set_timeout(timeout.unwrap_or(DEFAULT_ONE_SHOT_TIMEOUT))
            .set_pdf(pdf)
    }
}

/// Whether `path` can be opened for reading
///
/// Opens non-blocking so a FIFO without a writer is reported readable instead
/// of stalling the caller.
fn is_readable(path: &Path) -> bool {
    let mut options = OpenOptions::new();
    options.read(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.custom_flags(libc::O_NONBLOCK);
    }
    options.open(path).is_ok()
}

/// Drive a future to completion on a private current-thread runtime
fn block_on<F: Future>(future: F) -> Result<F::Output, PdfTextError> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(PdfTextError::NestedRuntime);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}
