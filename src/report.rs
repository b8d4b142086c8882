//! Run report: the append-only record of every file's outcome.
//!
//! The orchestrator is the only writer. Each discovered file contributes
//! exactly one [`ConversionOutcome`], so the three groups partition the
//! discovered set. [`ConversionReport::finalize`] writes the textual summary
//! next to the converted files.

use crate::error::{Doc2MdError, FileError, FileErrorKind};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Prefix of the report file name; a `YYYYMMDD_HHMMSS` stamp follows.
pub const REPORT_PREFIX: &str = "conversion_report_";

/// A file that was converted and written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessEntry {
    pub path: PathBuf,
    pub output: PathBuf,
}

/// A file that failed, with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureEntry {
    pub path: PathBuf,
    pub kind: FileErrorKind,
    pub message: String,
}

/// A file that was not converted on purpose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipEntry {
    pub path: PathBuf,
    pub reason: String,
}

/// Terminal classification of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionOutcome {
    Success(SuccessEntry),
    Failure(FailureEntry),
    Skipped(SkipEntry),
}

impl ConversionOutcome {
    pub fn success(path: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        ConversionOutcome::Success(SuccessEntry {
            path: path.into(),
            output: output.into(),
        })
    }

    pub fn failure(path: impl Into<PathBuf>, error: &FileError) -> Self {
        ConversionOutcome::Failure(FailureEntry {
            path: path.into(),
            kind: error.kind(),
            message: error.to_string(),
        })
    }

    pub fn skipped(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ConversionOutcome::Skipped(SkipEntry {
            path: path.into(),
            reason: reason.into(),
        })
    }

    /// The source file this outcome belongs to.
    pub fn path(&self) -> &Path {
        match self {
            ConversionOutcome::Success(e) => &e.path,
            ConversionOutcome::Failure(e) => &e.path,
            ConversionOutcome::Skipped(e) => &e.path,
        }
    }
}

/// Append-only aggregate of per-file outcomes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionReport {
    successful: Vec<SuccessEntry>,
    failed: Vec<FailureEntry>,
    skipped: Vec<SkipEntry>,
}

impl ConversionReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one outcome to its group.
    pub fn record(&mut self, outcome: ConversionOutcome) {
        match outcome {
            ConversionOutcome::Success(e) => self.successful.push(e),
            ConversionOutcome::Failure(e) => self.failed.push(e),
            ConversionOutcome::Skipped(e) => self.skipped.push(e),
        }
    }

    pub fn successful(&self) -> &[SuccessEntry] {
        &self.successful
    }

    pub fn failed(&self) -> &[FailureEntry] {
        &self.failed
    }

    pub fn skipped(&self) -> &[SkipEntry] {
        &self.skipped
    }

    /// Total outcomes recorded across all groups.
    pub fn total(&self) -> usize {
        self.successful.len() + self.failed.len() + self.skipped.len()
    }

    /// Render the deterministic textual summary.
    pub fn to_text(&self) -> String {
        let mut out = String::new();

        out.push_str("=== Conversion Report ===\n\n");
        out.push_str(&format!("Total files processed: {}\n", self.total()));
        out.push_str(&format!("Converted successfully: {}\n", self.successful.len()));
        out.push_str(&format!("Failed: {}\n", self.failed.len()));
        out.push_str(&format!("Skipped: {}\n", self.skipped.len()));

        if !self.successful.is_empty() {
            out.push_str("\n=== Converted Files ===\n");
            for e in &self.successful {
                out.push_str(&format!("✓ {}\n", e.path.display()));
            }
        }

        if !self.failed.is_empty() {
            out.push_str("\n=== Failures ===\n");
            for e in &self.failed {
                out.push_str(&format!(
                    "✗ {}\n  Error [{}]: {}\n\n",
                    e.path.display(),
                    e.kind,
                    e.message
                ));
            }
        }

        if !self.skipped.is_empty() {
            out.push_str("\n=== Skipped Files ===\n");
            for e in &self.skipped {
                out.push_str(&format!("- {}\n  Reason: {}\n\n", e.path.display(), e.reason));
            }
        }

        out
    }

    /// Serialise the report as pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the summary to a timestamped file under `output_root`.
    ///
    /// Never overwrites: when a report with the same stamp already exists a
    /// `_1`, `_2`, … suffix is appended. Calling twice yields two files.
    pub fn finalize(&self, output_root: &Path) -> Result<PathBuf, Doc2MdError> {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        self.finalize_with_stamp(output_root, &stamp)
    }

    fn finalize_with_stamp(&self, output_root: &Path, stamp: &str) -> Result<PathBuf, Doc2MdError> {
        let text = self.to_text();

        for attempt in 0u32.. {
            let name = if attempt == 0 {
                format!("{REPORT_PREFIX}{stamp}.txt")
            } else {
                format!("{REPORT_PREFIX}{stamp}_{attempt}.txt")
            };
            let path = output_root.join(name);

            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(f) => f,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(source) => return Err(Doc2MdError::ReportWriteFailed { path, source }),
            };

            file.write_all(text.as_bytes())
                .map_err(|source| Doc2MdError::ReportWriteFailed {
                    path: path.clone(),
                    source,
                })?;

            info!("Conversion report written to {}", path.display());
            return Ok(path);
        }

        Err(Doc2MdError::Internal(
            "exhausted report file name suffixes".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConversionReport {
        let mut r = ConversionReport::new();
        r.record(ConversionOutcome::success("in/a.pdf", "out/a.md"));
        r.record(ConversionOutcome::failure("in/d.pdf", &FileError::EmptyFile));
        r.record(ConversionOutcome::skipped("in/c.xyz", "unsupported format: xyz"));
        r.record(ConversionOutcome::success("in/b.docx", "out/b.md"));
        r
    }

    #[test]
    fn record_groups_by_tag() {
        let r = sample();
        assert_eq!(r.successful().len(), 2);
        assert_eq!(r.failed().len(), 1);
        assert_eq!(r.skipped().len(), 1);
        assert_eq!(r.total(), 4);
        assert_eq!(r.failed()[0].kind, FileErrorKind::EmptyFile);
        // Insertion order is preserved within a group.
        assert_eq!(r.successful()[1].path, PathBuf::from("in/b.docx"));
    }

    #[test]
    fn text_lists_counts_then_groups() {
        let text = sample().to_text();
        assert!(text.contains("Total files processed: 4"));
        assert!(text.contains("Converted successfully: 2"));
        assert!(text.contains("Failed: 1"));
        assert!(text.contains("Skipped: 1"));
        assert!(text.contains("✗ in/d.pdf\n  Error [EmptyFile]: File is empty"));
        assert!(text.contains("- in/c.xyz\n  Reason: unsupported format: xyz"));

        let conv = text.find("=== Converted Files ===").unwrap();
        let fail = text.find("=== Failures ===").unwrap();
        let skip = text.find("=== Skipped Files ===").unwrap();
        assert!(conv < fail && fail < skip);
    }

    #[test]
    fn text_is_deterministic() {
        assert_eq!(sample().to_text(), sample().to_text());
    }

    #[test]
    fn empty_report_has_only_counts() {
        let text = ConversionReport::new().to_text();
        assert!(text.contains("Total files processed: 0"));
        assert!(!text.contains("=== Converted Files ==="));
        assert!(!text.contains("=== Failures ==="));
        assert!(!text.contains("=== Skipped Files ==="));
    }

    #[test]
    fn finalize_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let r = sample();

        let first = r.finalize_with_stamp(dir.path(), "20240101_120000").unwrap();
        let second = r.finalize_with_stamp(dir.path(), "20240101_120000").unwrap();

        assert_ne!(first, second);
        assert!(first.ends_with("conversion_report_20240101_120000.txt"));
        assert!(second.ends_with("conversion_report_20240101_120000_1.txt"));
        assert_eq!(std::fs::read_to_string(&second).unwrap(), r.to_text());
    }

    #[test]
    fn finalize_uses_timestamped_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = ConversionReport::new().finalize(dir.path()).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(REPORT_PREFIX));
        assert!(name.ends_with(".txt"));
        assert_eq!(path.parent().unwrap(), dir.path());
    }

    #[test]
    fn json_tags_outcome_status() {
        let outcome = ConversionOutcome::skipped("x.bin", "unsupported format: bin");
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"status\":\"skipped\""), "got: {json}");

        let report_json = sample().to_json().unwrap();
        assert!(report_json.contains("EmptyFile"));
    }
}
