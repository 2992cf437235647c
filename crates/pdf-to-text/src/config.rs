//! Tool locations and default timeout
//!
//! Defaults point at the Debian/Ubuntu package locations. A configuration can
//! also be loaded from TOML, where every key is optional:
//!
//! ```toml
//! pdftotext_path = "/opt/poppler/bin/pdftotext"
//! ocrmypdf_path = "/usr/local/bin/ocrmypdf"
//! qpdf_path = "/usr/bin/qpdf"
//! timeout = 120
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::PdfTextError;

pub const DEFAULT_PDFTOTEXT_PATH: &str = "/usr/bin/pdftotext";
pub const DEFAULT_OCRMYPDF_PATH: &str = "/usr/bin/ocrmypdf";
pub const DEFAULT_QPDF_PATH: &str = "/usr/bin/qpdf";

/// Default timeout for extractor instances (5 minutes)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Default timeout for the one-shot `get_text` helper
pub const DEFAULT_ONE_SHOT_TIMEOUT: Duration = Duration::from_secs(60);

/// Paths to the external tools plus the default timeout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Text extraction tool (`pdftotext`)
    pub pdftotext_path: PathBuf,
    /// OCR tool (`ocrmypdf`)
    pub ocrmypdf_path: PathBuf,
    /// Structural repair tool (`qpdf`). Configured but not invoked by any
    /// operation yet.
    pub qpdf_path: PathBuf,
    /// Timeout for each tool run, in whole seconds. Zero disables it.
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            pdftotext_path: PathBuf::from(DEFAULT_PDFTOTEXT_PATH),
            ocrmypdf_path: PathBuf::from(DEFAULT_OCRMYPDF_PATH),
            qpdf_path: PathBuf::from(DEFAULT_QPDF_PATH),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ToolConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns [`PdfTextError::Config`] if the file cannot be read or is not
    /// valid TOML for this structure.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pdf_to_text::ToolConfig;
    ///
    /// # fn example() -> Result<(), pdf_to_text::PdfTextError> {
    /// let config = ToolConfig::from_file("pdf-to-text.toml")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PdfTextError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| PdfTextError::Config {
            path: path.to_path_buf(),
            message: format!("Failed to read config file: {}", e),
        })?;
        Self::parse_toml(&content).map_err(|message| PdfTextError::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parse configuration from a TOML string
    ///
    /// # Example
    ///
    /// ```
    /// use pdf_to_text::ToolConfig;
    /// use std::time::Duration;
    ///
    /// # fn example() -> Result<(), pdf_to_text::PdfTextError> {
    /// let config = ToolConfig::from_str("timeout = 30")?;
    /// assert_eq!(config.timeout, Duration::from_secs(30));
    /// # Ok(())
    /// # }
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, PdfTextError> {
        Self::parse_toml(s).map_err(|message| PdfTextError::Config {
            path: PathBuf::from("<string>"),
            message,
        })
    }

    fn parse_toml(s: &str) -> Result<Self, String> {
        toml::from_str(s).map_err(|e| format!("Failed to parse TOML configuration: {}", e))
    }
}

/// Serde module for serializing/deserializing Duration as whole seconds
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
