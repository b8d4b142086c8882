//! Directory conversion: discovery, per-file dispatch and the run report.
//!
//! ## Flow
//!
//! ```text
//! discover ──▶ [task, task, …] ──buffer_unordered(n)──▶ record ──▶ finalize
//!                  │
//!                  └─ classify → exists? → non-empty? → convert (spawn_blocking) → write
//! ```
//!
//! Every per-file error is caught at the file boundary and becomes a
//! [`ConversionOutcome::Failure`]. Only precondition failures (missing input
//! root, unwritable output root or report) abort the run.
//!
//! ## Why spawn_blocking?
//!
//! pdfium, lopdf, zip and the tesseract subprocess are all blocking. Running
//! each file's conversion on the blocking pool keeps the runtime's worker
//! threads free to drive the other in-flight files when `concurrency > 1`.

use crate::config::{ConversionConfig, OcrMode};
use crate::error::{Doc2MdError, FileError};
use crate::formats::{self, DeclaredFormat};
use crate::pipeline::{ocr, postprocess, PdfPipeline};
use crate::report::{ConversionOutcome, ConversionReport};
use futures::stream::{self, StreamExt};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// One discovered file and where its Markdown goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionTask {
    pub source: PathBuf,
    /// `source` relative to the input root.
    pub relative: PathBuf,
    pub output: PathBuf,
    pub format: DeclaredFormat,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub report: ConversionReport,
    /// Where the textual report was written.
    pub report_path: PathBuf,
}

/// Convert every file under `input_root` into Markdown under `output_root`.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Returns `Err(Doc2MdError)` only for fatal errors:
/// - input root missing or not a directory
/// - output root cannot be created
/// - the report cannot be written
///
/// Per-file failures are recorded in [`RunOutput::report`].
///
/// # Example
/// ```rust,no_run
/// use edgequake_doc2md::{run, ConversionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ConversionConfig::default();
/// let output = run("docs/", "markdown/", &config).await?;
/// println!("{} converted", output.report.successful().len());
/// # Ok(())
/// # }
/// ```
pub async fn run(
    input_root: impl AsRef<Path>,
    output_root: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<RunOutput, Doc2MdError> {
    Orchestrator::new(config.clone())
        .run(input_root.as_ref(), output_root.as_ref())
        .await
}

/// Owns the configuration and the PDF pipeline for a run.
pub struct Orchestrator {
    config: ConversionConfig,
    pipeline: OnceCell<Arc<PdfPipeline>>,
}

impl Orchestrator {
    pub fn new(config: ConversionConfig) -> Self {
        Self {
            config,
            pipeline: OnceCell::new(),
        }
    }

    /// Use an explicit PDF pipeline instead of building one from the config.
    ///
    /// Skips the OCR probe entirely.
    pub fn with_pipeline(self, pipeline: PdfPipeline) -> Self {
        Self {
            config: self.config,
            pipeline: OnceCell::with_value(Arc::new(pipeline)),
        }
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Run the whole batch. See [`run`].
    pub async fn run(&self, input_root: &Path, output_root: &Path) -> Result<RunOutput, Doc2MdError> {
        let start = Instant::now();

        // ── Step 1: Preconditions ────────────────────────────────────────
        if !input_root.exists() {
            return Err(Doc2MdError::InputNotFound {
                path: input_root.to_path_buf(),
            });
        }
        if !input_root.is_dir() {
            return Err(Doc2MdError::InputNotADirectory {
                path: input_root.to_path_buf(),
            });
        }
        tokio::fs::create_dir_all(output_root)
            .await
            .map_err(|source| Doc2MdError::OutputDirFailed {
                path: output_root.to_path_buf(),
                source,
            })?;

        // ── Step 2: Discover ─────────────────────────────────────────────
        let tasks = discover(input_root, output_root, self.config.report_unsupported)?;
        let supported = tasks.iter().filter(|t| t.format.is_supported()).count();
        info!(
            "Discovered {} files under {} ({} supported)",
            tasks.len(),
            input_root.display(),
            supported
        );
        if supported == 0 {
            warn!("No supported files found in {}", input_root.display());
        }
        for (first, later, output) in output_collisions(&tasks) {
            warn!(
                "{} and {} both convert to {}; the later write wins",
                first.display(),
                later.display(),
                output.display()
            );
        }

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_run_start(tasks.len());
        }

        // ── Step 3: Convert ──────────────────────────────────────────────
        let pipeline = self.pipeline().await;
        let mut report = ConversionReport::new();
        let mut outcomes = stream::iter(tasks.into_iter().map(|task| {
            let pipeline = Arc::clone(&pipeline);
            async move { self.convert_with(&task, pipeline).await }
        }))
        .buffer_unordered(self.config.concurrency.max(1));

        // The consuming loop is the report's only writer.
        while let Some(outcome) = outcomes.next().await {
            report.record(outcome);
        }

        // ── Step 4: Report ───────────────────────────────────────────────
        let report_path = report.finalize(output_root)?;

        info!(
            "Run complete: {} converted, {} failed, {} skipped in {}ms",
            report.successful().len(),
            report.failed().len(),
            report.skipped().len(),
            start.elapsed().as_millis()
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_run_complete(
                report.successful().len(),
                report.failed().len(),
                report.skipped().len(),
            );
        }

        Ok(RunOutput {
            report,
            report_path,
        })
    }

    /// Convert one task and classify the result. Never fails.
    pub async fn convert_file(&self, task: &ConversionTask) -> ConversionOutcome {
        let pipeline = self.pipeline().await;
        self.convert_with(task, pipeline).await
    }

    async fn convert_with(&self, task: &ConversionTask, pipeline: Arc<PdfPipeline>) -> ConversionOutcome {
        let cb = self.config.progress_callback.as_ref();

        if let Some(reason) = task.format.skip_reason() {
            debug!("Skipping {}: {}", task.source.display(), reason);
            if let Some(cb) = cb {
                cb.on_file_skipped(&task.source, &reason);
            }
            return ConversionOutcome::skipped(&task.source, reason);
        }

        match self.try_convert(task, pipeline).await {
            Ok(()) => {
                info!("Converted {} → {}", task.source.display(), task.output.display());
                if let Some(cb) = cb {
                    cb.on_file_converted(&task.source, &task.output);
                }
                ConversionOutcome::success(&task.source, &task.output)
            }
            Err(e) => {
                error!("Failed {}: {}", task.source.display(), e);
                if let Some(cb) = cb {
                    cb.on_file_failed(&task.source, &e);
                }
                ConversionOutcome::failure(&task.source, &e)
            }
        }
    }

    async fn try_convert(&self, task: &ConversionTask, pipeline: Arc<PdfPipeline>) -> Result<(), FileError> {
        let not_found = || FileError::FileNotFound {
            path: task.source.clone(),
        };

        let metadata = match tokio::fs::metadata(&task.source).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Err(not_found()),
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(FileError::conversion(&task.format.to_string(), e)),
        };
        if metadata.len() == 0 {
            return Err(FileError::EmptyFile);
        }

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_file_start(&task.source);
        }

        let source = task.source.clone();
        let format = task.format.clone();
        let markdown = tokio::task::spawn_blocking(move || extract(&format, &source, &pipeline))
            .await
            .map_err(|e| FileError::Internal(format!("conversion task panicked: {e}")))??;

        if markdown.trim().is_empty() {
            return Err(FileError::EmptyExtraction);
        }

        write_atomic(&task.output, &markdown)
            .await
            .map_err(|e| FileError::OutputWriteFailed {
                path: task.output.clone(),
                detail: e.to_string(),
            })
    }

    /// The PDF pipeline, built on first use.
    async fn pipeline(&self) -> Arc<PdfPipeline> {
        if let Some(p) = self.pipeline.get() {
            return Arc::clone(p);
        }
        let ocr_available = resolve_ocr(self.config.ocr).await;
        let built = Arc::new(PdfPipeline::from_config(&self.config, ocr_available));
        Arc::clone(self.pipeline.get_or_init(|| built))
    }
}

/// Dispatch to exactly one converter.
fn extract(format: &DeclaredFormat, path: &Path, pipeline: &PdfPipeline) -> Result<String, FileError> {
    let markdown = match format {
        DeclaredFormat::Pdf => pipeline.extract(path)?,
        DeclaredFormat::Docx => formats::docx::convert(path)?,
        DeclaredFormat::Pptx => formats::pptx::convert(path)?,
        DeclaredFormat::Rtf => formats::rtf::convert(path)?,
        DeclaredFormat::Text => return formats::text::convert(path),
        DeclaredFormat::Unsupported(ext) => {
            return Err(FileError::Internal(format!("no converter for '{ext}'")))
        }
    };
    Ok(postprocess::clean_markdown(&markdown))
}

async fn resolve_ocr(mode: OcrMode) -> bool {
    let available = match mode {
        OcrMode::Enabled => true,
        OcrMode::Disabled => false,
        OcrMode::Auto => tokio::task::spawn_blocking(ocr::probe_tesseract)
            .await
            .unwrap_or(false),
    };
    info!("OCR {} ({:?})", if available { "enabled" } else { "disabled" }, mode);
    available
}

/// Write through a sibling temp file and rename, so readers never see a
/// half-written Markdown file.
async fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp_path = path.with_extension("md.tmp");
    if let Err(e) = tokio::fs::write(&tmp_path, contents).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }
    Ok(())
}

// ── Discovery ────────────────────────────────────────────────────────────

/// Recursively list the files under `input_root`, sorted by path.
///
/// The output root's subtree is never descended into. Files with an
/// unsupported extension are included (as `Unsupported` tasks) only when
/// `include_unsupported` is set. Links to files are followed; links to
/// directories are not.
///
/// # Errors
/// Only an unreadable `input_root` is fatal. A subdirectory that cannot be
/// listed is logged and left out.
pub fn discover(
    input_root: &Path,
    output_root: &Path,
    include_unsupported: bool,
) -> Result<Vec<ConversionTask>, Doc2MdError> {
    let entries = list_dir(input_root).map_err(|source| Doc2MdError::DiscoveryFailed {
        path: input_root.to_path_buf(),
        source,
    })?;

    let excluded = std::fs::canonicalize(output_root).ok();
    let mut walker = Walker {
        input_root,
        output_root,
        excluded: excluded.as_deref(),
        include_unsupported,
        tasks: Vec::new(),
    };
    walker.visit(entries);
    Ok(walker.tasks)
}

/// Sorted entries of one directory. Entries that cannot be inspected are
/// logged and dropped.
fn list_dir(dir: &Path) -> std::io::Result<Vec<(PathBuf, std::fs::FileType)>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        match entry.file_type() {
            Ok(file_type) => entries.push((entry.path(), file_type)),
            Err(e) => warn!("Cannot inspect {}: {}", entry.path().display(), e),
        }
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

struct Walker<'a> {
    input_root: &'a Path,
    output_root: &'a Path,
    excluded: Option<&'a Path>,
    include_unsupported: bool,
    tasks: Vec<ConversionTask>,
}

impl Walker<'_> {
    fn visit(&mut self, entries: Vec<(PathBuf, std::fs::FileType)>) {
        for (path, file_type) in entries {
            if file_type.is_dir() {
                self.descend(&path);
            } else if file_type.is_file() {
                self.push(path);
            } else if file_type.is_symlink() {
                match std::fs::metadata(&path) {
                    Ok(target) if target.is_file() => self.push(path),
                    Ok(target) if target.is_dir() => {
                        debug!("Not following directory link {}", path.display());
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Skipping broken link {}: {}", path.display(), e),
                }
            }
        }
    }

    fn descend(&mut self, dir: &Path) {
        let canonical = std::fs::canonicalize(dir).ok();
        if self.excluded.is_some() && canonical.as_deref() == self.excluded {
            debug!("Not descending into output root {}", dir.display());
            return;
        }
        match list_dir(dir) {
            Ok(entries) => self.visit(entries),
            Err(e) => warn!(
                "Cannot read directory {}: {}; its files are left out of this run",
                dir.display(),
                e
            ),
        }
    }

    fn push(&mut self, path: PathBuf) {
        let format = DeclaredFormat::from_path(&path);
        if !format.is_supported() && !self.include_unsupported {
            return;
        }
        let relative = path
            .strip_prefix(self.input_root)
            .unwrap_or(&path)
            .to_path_buf();
        let output = self.output_root.join(&relative).with_extension("md");
        self.tasks.push(ConversionTask {
            source: path,
            relative,
            output,
            format,
        });
    }
}

/// Convertible tasks sharing an output path with an earlier task, as
/// `(earlier source, later source, output)`.
pub(crate) fn output_collisions(tasks: &[ConversionTask]) -> Vec<(PathBuf, PathBuf, PathBuf)> {
    let mut claimed: HashMap<&Path, &Path> = HashMap::new();
    let mut collisions = Vec::new();
    for task in tasks.iter().filter(|t| t.format.is_supported()) {
        match claimed.get(task.output.as_path()) {
            Some(first) => collisions.push((
                first.to_path_buf(),
                task.source.clone(),
                task.output.clone(),
            )),
            None => {
                claimed.insert(&task.output, &task.source);
            }
        }
    }
    collisions
}
