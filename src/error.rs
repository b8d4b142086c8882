//! Error types for the edgequake-doc2md library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Doc2MdError`] is **fatal**: the run cannot proceed at all (input
//!   directory missing, output directory not creatable, report not
//!   writable). Returned as `Err(Doc2MdError)` from [`crate::convert::run`].
//!
//! * [`FileError`] is **non-fatal**: a single document failed (encrypted PDF,
//!   broken archive, nothing extractable) but every other file is fine.
//!   Stored inside [`crate::report::ConversionOutcome::Failure`] so one bad
//!   document never aborts the batch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-doc2md library.
///
/// Per-file failures use [`FileError`] and are recorded in the
/// [`crate::report::ConversionReport`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Doc2MdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input directory does not exist.
    #[error("Input directory not found: '{path}'")]
    InputNotFound { path: PathBuf },

    /// Input path exists but is not a directory.
    #[error("Input path is not a directory: '{path}'")]
    InputNotADirectory { path: PathBuf },

    /// Walking the input tree failed.
    #[error("Failed to read directory '{path}': {source}")]
    DiscoveryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create the output root.
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not write the run report.
    #[error("Failed to write conversion report '{path}': {source}")]
    ReportWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The classification of a per-file failure, as written to the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileErrorKind {
    FileNotFound,
    EmptyFile,
    PasswordProtected,
    CorruptStructure,
    EmptyDocument,
    ExtractionExhausted,
    OcrTimeout,
    EmptyExtraction,
    ConversionError,
    OutputWriteFailed,
    Internal,
}

impl fmt::Display for FileErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileErrorKind::FileNotFound => "FileNotFound",
            FileErrorKind::EmptyFile => "EmptyFile",
            FileErrorKind::PasswordProtected => "PasswordProtected",
            FileErrorKind::CorruptStructure => "CorruptStructure",
            FileErrorKind::EmptyDocument => "EmptyDocument",
            FileErrorKind::ExtractionExhausted => "ExtractionExhausted",
            FileErrorKind::OcrTimeout => "OcrTimeout",
            FileErrorKind::EmptyExtraction => "EmptyExtraction",
            FileErrorKind::ConversionError => "ConversionError",
            FileErrorKind::OutputWriteFailed => "OutputWriteFailed",
            FileErrorKind::Internal => "Internal",
        };
        f.write_str(name)
    }
}

/// A non-fatal error for a single file.
///
/// Every variant is caught at the file boundary by the orchestrator and
/// turned into a [`crate::report::ConversionOutcome::Failure`].
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum FileError {
    // ── Source file ───────────────────────────────────────────────────────
    /// The file vanished between discovery and processing.
    #[error("File not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// The source file has zero bytes.
    #[error("File is empty")]
    EmptyFile,

    // ── PDF defects ───────────────────────────────────────────────────────
    /// PDF is encrypted and the empty password was rejected.
    #[error("PDF is password protected")]
    PasswordProtected,

    /// PDF header/trailer/xref could not be parsed.
    #[error("PDF is corrupt or has an invalid structure: {detail}")]
    CorruptStructure { detail: String },

    /// PDF parsed fine but contains no pages.
    #[error("PDF has no pages")]
    EmptyDocument,

    /// No strategy in the chain produced usable text.
    #[error("No text could be extracted from the PDF ({attempts})")]
    ExtractionExhausted { attempts: String },

    /// The last OCR attempt hung past its deadline.
    #[error("OCR timed out after {secs}s on page {page}")]
    OcrTimeout { page: usize, secs: u64 },

    // ── Converter results ─────────────────────────────────────────────────
    /// A converter ran but produced only whitespace.
    #[error("No content extracted from file")]
    EmptyExtraction,

    /// A format-specific converter failed on malformed input.
    #[error("Failed to convert {format}: {detail}")]
    ConversionError { format: String, detail: String },

    // ── Output ────────────────────────────────────────────────────────────
    /// The Markdown file could not be written.
    #[error("Failed to write output file '{path}': {detail}")]
    OutputWriteFailed { path: PathBuf, detail: String },

    /// The conversion task panicked or was cancelled.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FileError {
    /// The report classification for this error.
    pub fn kind(&self) -> FileErrorKind {
        match self {
            FileError::FileNotFound { .. } => FileErrorKind::FileNotFound,
            FileError::EmptyFile => FileErrorKind::EmptyFile,
            FileError::PasswordProtected => FileErrorKind::PasswordProtected,
            FileError::CorruptStructure { .. } => FileErrorKind::CorruptStructure,
            FileError::EmptyDocument => FileErrorKind::EmptyDocument,
            FileError::ExtractionExhausted { .. } => FileErrorKind::ExtractionExhausted,
            FileError::OcrTimeout { .. } => FileErrorKind::OcrTimeout,
            FileError::EmptyExtraction => FileErrorKind::EmptyExtraction,
            FileError::ConversionError { .. } => FileErrorKind::ConversionError,
            FileError::OutputWriteFailed { .. } => FileErrorKind::OutputWriteFailed,
            FileError::Internal(_) => FileErrorKind::Internal,
        }
    }

    pub(crate) fn conversion(format: &str, detail: impl fmt::Display) -> Self {
        FileError::ConversionError {
            format: format.to_string(),
            detail: detail.to_string(),
        }
    }
}

/// Failure of a single extraction strategy inside the PDF pipeline.
///
/// Never leaves the pipeline: a failing strategy is logged and the chain
/// moves on to the next one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StrategyError {
    /// A required engine (pdfium, tesseract) could not be loaded or run.
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// The engine ran and reported an error.
    #[error("{0}")]
    Failed(String),

    /// A page-level subprocess exceeded its deadline.
    #[error("page {page} timed out after {secs}s")]
    Timeout { page: usize, secs: u64 },
}
