//! Configuration types for directory-to-Markdown conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`] or read from the environment with
//! [`ConversionConfig::from_env`]. The CLI takes no flags beyond its two
//! directories, so environment variables are the only tuning surface there.

use crate::error::Doc2MdError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Font size (points) above which a PDF text span is rendered as a heading.
pub const DEFAULT_HEADING_FONT_SIZE: f32 = 12.0;

/// Tesseract language model used for OCR.
pub const DEFAULT_OCR_LANGUAGE: &str = "por";

/// Configuration for a conversion run.
///
/// # Example
/// ```rust
/// use edgequake_doc2md::{ConversionConfig, OcrMode};
///
/// let config = ConversionConfig::builder()
///     .ocr(OcrMode::Disabled)
///     .heading_font_size(14.0)
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 1);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Spans strictly larger than this are promoted to `## ` headings. Default: 12.0.
    pub heading_font_size: f32,

    /// Whether the OCR strategy joins the PDF chain. Default: [`OcrMode::Auto`].
    pub ocr: OcrMode,

    /// Tesseract language code passed as `-l`. Default: `por`.
    pub ocr_language: String,

    /// Rasterisation DPI for OCR pages. Range: 72–400. Default: 200.
    ///
    /// Tesseract accuracy drops sharply below ~150 DPI; 200 matches the
    /// usual scanner output.
    pub ocr_dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 4000.
    ///
    /// Caps memory on oversized pages independently of DPI.
    pub max_rendered_pixels: u32,

    /// Deadline for one tesseract invocation (one page), in seconds. Default: 300.
    pub ocr_timeout_secs: u64,

    /// Number of files converted at once. Default: 1 (sequential).
    pub concurrency: usize,

    /// Record files with unsupported extensions as skipped. Default: true.
    ///
    /// When false they are ignored at discovery and never reach the report.
    pub report_unsupported: bool,

    /// Optional event sink for progress and diagnostics.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            heading_font_size: DEFAULT_HEADING_FONT_SIZE,
            ocr: OcrMode::default(),
            ocr_language: DEFAULT_OCR_LANGUAGE.to_string(),
            ocr_dpi: 200,
            max_rendered_pixels: 4000,
            ocr_timeout_secs: 300,
            concurrency: 1,
            report_unsupported: true,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("heading_font_size", &self.heading_font_size)
            .field("ocr", &self.ocr)
            .field("ocr_language", &self.ocr_language)
            .field("ocr_dpi", &self.ocr_dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("ocr_timeout_secs", &self.ocr_timeout_secs)
            .field("concurrency", &self.concurrency)
            .field("report_unsupported", &self.report_unsupported)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Build a configuration from `DOC2MD_*` environment variables.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `DOC2MD_OCR` | `ocr` (`auto`, `on`, `off`) |
    /// | `DOC2MD_OCR_LANG` | `ocr_language` |
    /// | `DOC2MD_OCR_DPI` | `ocr_dpi` |
    /// | `DOC2MD_OCR_TIMEOUT` | `ocr_timeout_secs` |
    /// | `DOC2MD_CONCURRENCY` | `concurrency` |
    /// | `DOC2MD_HEADING_SIZE` | `heading_font_size` |
    /// | `DOC2MD_REPORT_UNSUPPORTED` | `report_unsupported` (`true`/`false`) |
    pub fn from_env() -> Result<ConversionConfigBuilder, Doc2MdError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<ConversionConfigBuilder, Doc2MdError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(v) = lookup("DOC2MD_OCR") {
            builder = builder.ocr(v.parse()?);
        }
        if let Some(v) = lookup("DOC2MD_OCR_LANG") {
            builder = builder.ocr_language(v);
        }
        if let Some(v) = lookup("DOC2MD_OCR_DPI") {
            builder = builder.ocr_dpi(parse_var("DOC2MD_OCR_DPI", &v)?);
        }
        if let Some(v) = lookup("DOC2MD_OCR_TIMEOUT") {
            builder = builder.ocr_timeout_secs(parse_var("DOC2MD_OCR_TIMEOUT", &v)?);
        }
        if let Some(v) = lookup("DOC2MD_CONCURRENCY") {
            builder = builder.concurrency(parse_var("DOC2MD_CONCURRENCY", &v)?);
        }
        if let Some(v) = lookup("DOC2MD_HEADING_SIZE") {
            builder = builder.heading_font_size(parse_var("DOC2MD_HEADING_SIZE", &v)?);
        }
        if let Some(v) = lookup("DOC2MD_REPORT_UNSUPPORTED") {
            builder = builder.report_unsupported(parse_var("DOC2MD_REPORT_UNSUPPORTED", &v)?);
        }

        Ok(builder)
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T, Doc2MdError> {
    value
        .trim()
        .parse()
        .map_err(|_| Doc2MdError::InvalidConfig(format!("{key}: cannot parse '{value}'")))
}

/// Builder for [`ConversionConfig`].
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl fmt::Debug for ConversionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ConversionConfigBuilder {
    pub fn heading_font_size(mut self, size: f32) -> Self {
        self.config.heading_font_size = size;
        self
    }

    pub fn ocr(mut self, mode: OcrMode) -> Self {
        self.config.ocr = mode;
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn ocr_dpi(mut self, dpi: u32) -> Self {
        self.config.ocr_dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = secs;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn report_unsupported(mut self, v: bool) -> Self {
        self.config.report_unsupported = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Doc2MdError> {
        let c = &self.config;
        if !c.heading_font_size.is_finite() || c.heading_font_size <= 0.0 {
            return Err(Doc2MdError::InvalidConfig(format!(
                "Heading font size must be a positive number, got {}",
                c.heading_font_size
            )));
        }
        if c.ocr_language.trim().is_empty() {
            return Err(Doc2MdError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        if c.ocr_timeout_secs == 0 {
            return Err(Doc2MdError::InvalidConfig(
                "OCR timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Whether the OCR strategy is part of the PDF chain.
///
/// `Auto` probes for a `tesseract` binary once per run; the explicit modes
/// skip the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OcrMode {
    /// Probe `tesseract --version` at run start. (default)
    #[default]
    Auto,
    /// Assume tesseract is installed.
    Enabled,
    /// Never run OCR.
    Disabled,
}

impl FromStr for OcrMode {
    type Err = Doc2MdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(OcrMode::Auto),
            "on" | "true" | "1" | "enabled" => Ok(OcrMode::Enabled),
            "off" | "false" | "0" | "disabled" => Ok(OcrMode::Disabled),
            other => Err(Doc2MdError::InvalidConfig(format!(
                "DOC2MD_OCR must be auto, on or off (got '{other}')"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let c = ConversionConfig::default();
        assert_eq!(c.heading_font_size, 12.0);
        assert_eq!(c.ocr_language, "por");
        assert_eq!(c.ocr, OcrMode::Auto);
        assert_eq!(c.concurrency, 1);
        assert!(c.report_unsupported);
    }

    #[test]
    fn builder_clamps() {
        let c = ConversionConfig::builder()
            .ocr_dpi(10)
            .concurrency(0)
            .build()
            .unwrap();
        assert_eq!(c.ocr_dpi, 72);
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn builder_rejects_bad_heading_size() {
        let err = ConversionConfig::builder()
            .heading_font_size(-1.0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Heading font size"));
    }

    #[test]
    fn from_lookup_reads_vars() {
        let vars: HashMap<&str, &str> = [
            ("DOC2MD_OCR", "off"),
            ("DOC2MD_OCR_LANG", "eng"),
            ("DOC2MD_CONCURRENCY", "4"),
            ("DOC2MD_HEADING_SIZE", "14.5"),
            ("DOC2MD_REPORT_UNSUPPORTED", "false"),
        ]
        .into_iter()
        .collect();

        let c = ConversionConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(c.ocr, OcrMode::Disabled);
        assert_eq!(c.ocr_language, "eng");
        assert_eq!(c.concurrency, 4);
        assert_eq!(c.heading_font_size, 14.5);
        assert!(!c.report_unsupported);
    }

    #[test]
    fn from_lookup_rejects_garbage() {
        let err = ConversionConfig::from_lookup(|k| {
            (k == "DOC2MD_CONCURRENCY").then(|| "many".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("DOC2MD_CONCURRENCY"));
    }

    #[test]
    fn ocr_mode_parse() {
        assert_eq!("ON".parse::<OcrMode>().unwrap(), OcrMode::Enabled);
        assert_eq!("auto".parse::<OcrMode>().unwrap(), OcrMode::Auto);
        assert!("maybe".parse::<OcrMode>().is_err());
    }
}
