//! PDF text extraction: pre-checks plus an ordered strategy chain.
//!
//! A PDF goes through [`PdfPipeline::extract`] in two phases:
//!
//! ```text
//! probe ──▶ structured ──▶ text-layer ──▶ ocr
//! (lopdf)   (pdfium)       (lopdf)        (pdfium + tesseract)
//! ```
//!
//! 1. [`probe`]: open the document once and classify structural defects
//!    (password, corrupt xref, zero pages) before any strategy runs
//! 2. [`structured`]: walk text objects with their font sizes; cheapest and
//!    keeps heading hints
//! 3. [`text_layer`]: plain embedded text stream, page by page
//! 4. [`ocr`]: rasterise each page via [`render`] and hand it to tesseract;
//!    only present when the OCR capability flag is set
//!
//! The chain is a plain `Vec<Box<dyn ExtractionStrategy>>` walked by
//! [`first_non_empty`]: the first strategy whose output is not blank wins,
//! and a strategy that errors counts as empty.

pub mod ocr;
pub mod postprocess;
pub mod probe;
pub mod render;
pub mod structured;
pub mod text_layer;

use crate::config::ConversionConfig;
use crate::error::{FileError, StrategyError};
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

pub use ocr::OcrStrategy;
pub use probe::{DocumentProbe, DocumentSummary, FallbackOpener, LopdfProbe, PdfiumOpener};
pub use structured::StructuredStrategy;
pub use text_layer::TextLayerStrategy;

/// One way of turning a PDF into text.
///
/// Implementations must be side-effect free on failure so the next strategy
/// sees the document untouched.
pub trait ExtractionStrategy: Send + Sync {
    /// Short stable name used in logs and in the exhaustion message.
    fn name(&self) -> &'static str;

    /// Extract the whole document. An `Ok` with blank text means "nothing
    /// found", not an error.
    fn extract(&self, path: &Path) -> Result<String, StrategyError>;
}

/// What a single strategy produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Usable text of the given length (in chars).
    Text { chars: usize },
    /// Ran fine, nothing but whitespace.
    Empty,
    /// Errored; treated like `Empty` by the chain.
    Error(StrategyError),
}

/// One entry in the ordered record of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionAttempt {
    pub strategy: &'static str,
    pub outcome: AttemptOutcome,
}

impl fmt::Display for ExtractionAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            AttemptOutcome::Text { chars } => write!(f, "{}: {} chars", self.strategy, chars),
            AttemptOutcome::Empty => write!(f, "{}: empty", self.strategy),
            AttemptOutcome::Error(e) => write!(f, "{}: failed ({})", self.strategy, e),
        }
    }
}

/// Walk `strategies` in order and return the first non-blank output.
///
/// `observe` sees every attempt as it completes, winners included. On
/// exhaustion the full attempt list is returned.
pub fn first_non_empty<F>(
    strategies: &[Box<dyn ExtractionStrategy>],
    path: &Path,
    mut observe: F,
) -> Result<(&'static str, String), Vec<ExtractionAttempt>>
where
    F: FnMut(&ExtractionAttempt),
{
    let mut attempts = Vec::with_capacity(strategies.len());

    for strategy in strategies {
        let name = strategy.name();
        let (outcome, text) = match strategy.extract(path) {
            Ok(text) if !text.trim().is_empty() => (
                AttemptOutcome::Text {
                    chars: text.chars().count(),
                },
                Some(text),
            ),
            Ok(_) => (AttemptOutcome::Empty, None),
            Err(e) => (AttemptOutcome::Error(e), None),
        };

        let attempt = ExtractionAttempt {
            strategy: name,
            outcome,
        };
        observe(&attempt);

        if let Some(text) = text {
            return Ok((name, text));
        }
        attempts.push(attempt);
    }

    Err(attempts)
}

/// Pre-checks plus strategy chain for one PDF at a time.
pub struct PdfPipeline {
    probe: Box<dyn DocumentProbe>,
    strategies: Vec<Box<dyn ExtractionStrategy>>,
    events: Option<ProgressCallback>,
}

impl PdfPipeline {
    /// Assemble a pipeline from explicit parts.
    pub fn new(probe: Box<dyn DocumentProbe>, strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self {
            probe,
            strategies,
            events: None,
        }
    }

    /// The standard chain: structured → text layer → OCR (when available).
    pub fn from_config(config: &ConversionConfig, ocr_available: bool) -> Self {
        let mut strategies: Vec<Box<dyn ExtractionStrategy>> = vec![
            Box::new(StructuredStrategy::new(config.heading_font_size)),
            Box::new(TextLayerStrategy),
        ];
        if ocr_available {
            strategies.push(Box::new(OcrStrategy::from_config(config)));
        } else {
            debug!("OCR unavailable; chain ends at text layer");
        }

        let mut pipeline = Self::new(Box::new(LopdfProbe::new()), strategies);
        pipeline.events = config.progress_callback.clone();
        pipeline
    }

    /// Attach an event sink for strategy diagnostics.
    pub fn with_events(mut self, events: ProgressCallback) -> Self {
        self.events = Some(events);
        self
    }

    /// Names of the configured strategies, in chain order.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Extract Markdown from the PDF at `path`.
    ///
    /// # Errors
    /// - `PasswordProtected`, `CorruptStructure`, `EmptyDocument` from the
    ///   pre-checks; no strategy runs in that case
    /// - `OcrTimeout` when the last attempt was an OCR page timeout
    /// - `ExtractionExhausted` when every strategy came up empty
    pub fn extract(&self, path: &Path) -> Result<String, FileError> {
        let summary = self.probe.probe(path)?;
        if summary.page_count == 0 {
            return Err(FileError::EmptyDocument);
        }
        debug!(
            "{}: {} pages{}",
            path.display(),
            summary.page_count,
            if summary.encrypted { " (encrypted, empty password accepted)" } else { "" }
        );

        let result = first_non_empty(&self.strategies, path, |attempt| match &attempt.outcome {
            AttemptOutcome::Error(e) => {
                warn!("{}: {} extraction failed: {}", path.display(), attempt.strategy, e);
                if let Some(ref cb) = self.events {
                    cb.on_strategy_failed(path, attempt.strategy, e);
                }
            }
            _ => debug!("{}: {}", path.display(), attempt),
        });

        match result {
            Ok((strategy, text)) => {
                info!("{}: extracted with {} strategy", path.display(), strategy);
                Ok(text)
            }
            Err(attempts) => Err(exhaustion_error(&attempts)),
        }
    }
}

fn exhaustion_error(attempts: &[ExtractionAttempt]) -> FileError {
    if let Some(ExtractionAttempt {
        outcome: AttemptOutcome::Error(StrategyError::Timeout { page, secs }),
        ..
    }) = attempts.last()
    {
        return FileError::OcrTimeout {
            page: *page,
            secs: *secs,
        };
    }

    let detail = if attempts.is_empty() {
        "no strategies configured".to_string()
    } else {
        attempts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    };
    FileError::ExtractionExhausted { attempts: detail }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Strategy returning a fixed result and counting its calls.
    struct Fixed {
        name: &'static str,
        result: Result<String, StrategyError>,
        calls: Arc<AtomicUsize>,
    }

    impl Fixed {
        fn new(name: &'static str, result: Result<&str, StrategyError>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    name,
                    result: result.map(str::to_string),
                    calls: Arc::clone(&calls),
                },
                calls,
            )
        }
    }

    impl ExtractionStrategy for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        fn extract(&self, _path: &Path) -> Result<String, StrategyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    struct StaticProbe(Result<DocumentSummary, FileError>);

    impl DocumentProbe for StaticProbe {
        fn probe(&self, _path: &Path) -> Result<DocumentSummary, FileError> {
            self.0.clone()
        }
    }

    fn pages(n: usize) -> Box<dyn DocumentProbe> {
        Box::new(StaticProbe(Ok(DocumentSummary {
            page_count: n,
            encrypted: false,
        })))
    }

    #[test]
    fn structured_output_short_circuits_chain() {
        let (a, a_calls) = Fixed::new("structured", Ok("## Title\nbody"));
        let (b, b_calls) = Fixed::new("text-layer", Ok("plain"));
        let (c, c_calls) = Fixed::new("ocr", Ok("scanned"));
        let pipeline = PdfPipeline::new(pages(1), vec![Box::new(a), Box::new(b), Box::new(c)]);

        let md = pipeline.extract(Path::new("x.pdf")).unwrap();

        assert_eq!(md, "## Title\nbody");
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 0);
        assert_eq!(c_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn blank_and_failing_strategies_fall_through() {
        let (a, _) = Fixed::new("structured", Err(StrategyError::Unavailable("no pdfium".into())));
        let (b, _) = Fixed::new("text-layer", Ok("  \n\t "));
        let (c, c_calls) = Fixed::new("ocr", Ok("scanned text"));
        let pipeline = PdfPipeline::new(pages(2), vec![Box::new(a), Box::new(b), Box::new(c)]);

        assert_eq!(pipeline.extract(Path::new("x.pdf")).unwrap(), "scanned text");
        assert_eq!(c_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn exhaustion_keeps_every_attempt() {
        let (a, _) = Fixed::new("structured", Ok(""));
        let (b, _) = Fixed::new("text-layer", Err(StrategyError::Failed("bad xref".into())));
        let pipeline = PdfPipeline::new(pages(1), vec![Box::new(a), Box::new(b)]);

        let err = pipeline.extract(Path::new("x.pdf")).unwrap_err();
        match err {
            FileError::ExtractionExhausted { attempts } => {
                assert_eq!(attempts, "structured: empty; text-layer: failed (bad xref)");
            }
            other => panic!("expected ExtractionExhausted, got {other:?}"),
        }
    }

    #[test]
    fn terminal_ocr_timeout_surfaces_as_ocr_timeout() {
        let (a, _) = Fixed::new("structured", Ok(""));
        let (b, _) = Fixed::new("ocr", Err(StrategyError::Timeout { page: 2, secs: 5 }));
        let pipeline = PdfPipeline::new(pages(3), vec![Box::new(a), Box::new(b)]);

        let err = pipeline.extract(Path::new("x.pdf")).unwrap_err();
        assert!(matches!(err, FileError::OcrTimeout { page: 2, secs: 5 }));
    }

    #[test]
    fn password_protected_runs_no_strategy() {
        let (a, a_calls) = Fixed::new("structured", Ok("text"));
        let pipeline = PdfPipeline::new(
            Box::new(StaticProbe(Err(FileError::PasswordProtected))),
            vec![Box::new(a)],
        );

        let err = pipeline.extract(Path::new("locked.pdf")).unwrap_err();
        assert!(matches!(err, FileError::PasswordProtected));
        assert_eq!(a_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn zero_pages_is_empty_document() {
        let (a, a_calls) = Fixed::new("structured", Ok("text"));
        let pipeline = PdfPipeline::new(pages(0), vec![Box::new(a)]);

        let err = pipeline.extract(Path::new("blank.pdf")).unwrap_err();
        assert!(matches!(err, FileError::EmptyDocument));
        assert_eq!(a_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn strategy_failures_reach_event_port() {
        struct Recorder(Mutex<Vec<String>>);
        impl crate::progress::ConversionProgressCallback for Recorder {
            fn on_strategy_failed(&self, _path: &Path, strategy: &str, error: &StrategyError) {
                self.0.lock().unwrap().push(format!("{strategy}: {error}"));
            }
        }

        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let (a, _) = Fixed::new("structured", Err(StrategyError::Failed("garbled".into())));
        let (b, _) = Fixed::new("text-layer", Ok("fine"));
        let pipeline = PdfPipeline::new(pages(1), vec![Box::new(a), Box::new(b)])
            .with_events(recorder.clone());

        assert_eq!(pipeline.extract(Path::new("x.pdf")).unwrap(), "fine");
        assert_eq!(*recorder.0.lock().unwrap(), vec!["structured: garbled".to_string()]);
    }

    #[test]
    fn first_non_empty_observes_winner() {
        let (a, _) = Fixed::new("one", Ok(""));
        let (b, _) = Fixed::new("two", Ok("héllo"));
        let strategies: Vec<Box<dyn ExtractionStrategy>> = vec![Box::new(a), Box::new(b)];
        let mut seen = Vec::new();

        let (name, text) =
            first_non_empty(&strategies, Path::new("x.pdf"), |a| seen.push(a.clone())).unwrap();

        assert_eq!((name, text.as_str()), ("two", "héllo"));
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].outcome, AttemptOutcome::Text { chars: 5 });
    }

    #[test]
    fn from_config_omits_ocr_when_unavailable() {
        let config = ConversionConfig::default();
        assert_eq!(
            PdfPipeline::from_config(&config, false).strategy_names(),
            vec!["structured", "text-layer"]
        );
        assert_eq!(
            PdfPipeline::from_config(&config, true).strategy_names(),
            vec!["structured", "text-layer", "ocr"]
        );
    }
}
