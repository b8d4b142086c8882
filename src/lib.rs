//! # edgequake-doc2md
//!
//! Convert a directory tree of PDF, Word, PowerPoint, plain-text and RTF
//! documents into Markdown for downstream language-model ingestion.
//!
//! ## Why this crate?
//!
//! Document collections are messy: born-digital PDFs with a clean text layer
//! sit next to scanned ones with none, and Office files hide their text in
//! zipped XML. This crate walks the whole tree, picks the cheapest extractor
//! that actually yields text for each file, and records exactly what
//! happened to every file in a run report, so one bad document never stops
//! the batch.
//!
//! ## Pipeline Overview
//!
//! ```text
//! input dir
//!  │
//!  ├─ 1. Discover  recursive, sorted walk; output root excluded
//!  ├─ 2. Classify  extension → pdf / docx / pptx / txt / rtf / unsupported
//!  ├─ 3. Check     missing? zero bytes?
//!  ├─ 4. Convert   PDF: probe → structured → text layer → OCR
//!  │               others: one converter each (spawn_blocking)
//!  ├─ 5. Polish    line endings, invisible chars, blank-line runs
//!  ├─ 6. Write     same relative path, `.md`, atomic rename
//!  └─ 7. Report    conversion_report_<stamp>.txt under the output root
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_doc2md::{run, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let output = run("docs/", "markdown/", &config).await?;
//!     eprintln!(
//!         "{} converted, {} failed, {} skipped → {}",
//!         output.report.successful().len(),
//!         output.report.failed().len(),
//!         output.report.skipped().len(),
//!         output.report_path.display()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2md` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! edgequake-doc2md = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime requirements
//!
//! | Component | Needed for | When missing |
//! |-----------|------------|--------------|
//! | pdfium shared library | structured PDF text, OCR rendering | those strategies fail; text layer still runs |
//! | `tesseract` on `PATH` | OCR of scanned PDFs | OCR left out of the chain |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod formats;
pub mod pipeline;
pub mod progress;
pub mod report;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, OcrMode};
pub use convert::{discover, run, ConversionTask, Orchestrator, RunOutput};
pub use error::{Doc2MdError, FileError, FileErrorKind, StrategyError};
pub use formats::DeclaredFormat;
pub use pipeline::{ExtractionAttempt, ExtractionStrategy, PdfPipeline};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use report::{ConversionOutcome, ConversionReport};
