//! OCR extraction: rasterise pages with pdfium, recognise with tesseract.
//!
//! Tesseract runs as a subprocess, one invocation per page, each bounded by
//! `ocr_timeout_secs`. A page that exceeds the deadline is killed and the
//! strategy fails with [`StrategyError::Timeout`]; the pipeline reports that
//! as `OcrTimeout` when OCR was the last resort.

use super::render::{bind_pdfium, load_document, ocr_render_config, render_page_png};
use super::ExtractionStrategy;
use crate::config::ConversionConfig;
use crate::error::StrategyError;
use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const TESSERACT_BIN: &str = "tesseract";
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Is a `tesseract` binary on `PATH`?
///
/// Computed once per run by the orchestrator; the answer decides whether
/// [`OcrStrategy`] joins the chain at all.
pub fn probe_tesseract() -> bool {
    let available = Command::new(TESSERACT_BIN)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false);

    if !available {
        debug!("tesseract not found - install tesseract-ocr for OCR support");
    }
    available
}

/// Last strategy in the chain.
pub struct OcrStrategy {
    language: String,
    dpi: u32,
    max_pixels: u32,
    timeout: Duration,
}

impl OcrStrategy {
    pub fn from_config(config: &ConversionConfig) -> Self {
        Self {
            language: config.ocr_language.clone(),
            dpi: config.ocr_dpi,
            max_pixels: config.max_rendered_pixels,
            timeout: Duration::from_secs(config.ocr_timeout_secs),
        }
    }
}

impl ExtractionStrategy for OcrStrategy {
    fn name(&self) -> &'static str {
        "ocr"
    }

    fn extract(&self, path: &Path) -> Result<String, StrategyError> {
        let pdfium = bind_pdfium()?;
        let document = load_document(&pdfium, path)?;
        let render_config = ocr_render_config(self.dpi, self.max_pixels);

        let scratch = tempfile::tempdir()
            .map_err(|e| StrategyError::Failed(format!("could not create scratch dir: {e}")))?;

        info!(
            "Starting OCR for {} (dpi={}, lang={})",
            path.display(),
            self.dpi,
            self.language
        );

        let mut pages = Vec::new();
        let mut last_failure = None;
        for (index, page) in document.pages().iter().enumerate() {
            let page_number = index + 1;
            let image = scratch.path().join(format!("page-{page_number:04}.png"));
            render_page_png(&page, &render_config, page_number, &image)?;

            match run_tesseract(
                &[TESSERACT_BIN],
                &image,
                &self.language,
                self.timeout,
                page_number,
            ) {
                Ok(text) => pages.push(text),
                Err(failure @ StrategyError::Failed(_)) => last_failure = Some(failure),
                Err(other) => return Err(other),
            }
        }

        assemble(pages, last_failure)
    }
}

/// Join recognised pages. A document where no page produced text and at
/// least one tesseract run failed reports that failure instead of "empty".
fn assemble(pages: Vec<String>, last_failure: Option<StrategyError>) -> Result<String, StrategyError> {
    let pages: Vec<&str> = pages
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();
    match last_failure {
        Some(failure) if pages.is_empty() => Err(failure),
        _ => Ok(pages.join("\n\n")),
    }
}

/// Recognise one image, killing tesseract if it outlives `timeout`.
///
/// `launcher` is the command prefix (normally just the tesseract binary).
/// Tesseract writes its text to `<image stem>.txt` next to the image and its
/// diagnostics to `<image stem>.log`.
fn run_tesseract(
    launcher: &[&str],
    image: &Path,
    language: &str,
    timeout: Duration,
    page_number: usize,
) -> Result<String, StrategyError> {
    let (program, prefix) = launcher
        .split_first()
        .ok_or_else(|| StrategyError::Unavailable("no OCR command".into()))?;
    let out_base = image.with_extension("");
    let log_path = out_base.with_extension("log");
    let log = File::create(&log_path)
        .map_err(|e| StrategyError::Failed(format!("creating OCR log for page {page_number}: {e}")))?;

    let mut child = Command::new(program)
        .args(prefix)
        .arg(image)
        .arg(&out_base)
        .arg("-l")
        .arg(language)
        .stdout(Stdio::null())
        .stderr(Stdio::from(log))
        .spawn()
        .map_err(|e| StrategyError::Unavailable(format!("tesseract: {e}")))?;

    // A timeout too large to add to the clock never expires.
    let deadline = Instant::now().checked_add(timeout);
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if deadline.is_some_and(|d| Instant::now() >= d) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(StrategyError::Timeout {
                    page: page_number,
                    secs: timeout.as_secs(),
                });
            }
            Ok(None) => std::thread::sleep(POLL_INTERVAL),
            Err(e) => {
                return Err(StrategyError::Failed(format!(
                    "waiting for tesseract on page {page_number}: {e}"
                )))
            }
        }
    };

    let stderr = std::fs::read(&log_path)
        .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
        .unwrap_or_default();

    if !status.success() {
        warn!(
            "Tesseract exited with {} on page {}: {}",
            status, page_number, stderr
        );
        return Err(StrategyError::Failed(format!(
            "tesseract exited with {status} on page {page_number}: {stderr}"
        )));
    }
    if !stderr.is_empty() {
        debug!("Tesseract on page {}: {}", page_number, stderr);
    }

    let text_path = out_base.with_extension("txt");
    std::fs::read(&text_path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .map_err(|e| StrategyError::Failed(format!("reading OCR output for page {page_number}: {e}")))
}
