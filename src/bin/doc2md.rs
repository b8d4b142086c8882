//! CLI binary for edgequake-doc2md.
//!
//! A thin shim over the library crate: two positional directories in, a
//! Markdown tree and a conversion report out. Tuning happens through
//! `DOC2MD_*` environment variables only.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_doc2md::{
    run, ConversionConfig, ConversionProgressCallback, FileError, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Run log written under the output root.
const LOG_FILE_NAME: &str = "conversion.log";

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over the discovered files plus a log
/// line per finished file. Works when files finish out of order.
struct CliProgressCallback {
    bar: ProgressBar,
    input_root: PathBuf,
}

impl CliProgressCallback {
    fn new(input_root: &Path) -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_run_start

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Scanning");
        bar.set_message("Looking for documents…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            input_root: input_root.to_path_buf(),
        })
    }

    fn display<'a>(&self, path: &'a Path) -> std::path::Display<'a> {
        path.strip_prefix(&self.input_root).unwrap_or(path).display()
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_files: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>4}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total_files as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Converting");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Found {total_files} files"))
        ));
    }

    fn on_file_start(&self, path: &Path) {
        self.bar.set_message(self.display(path).to_string());
    }

    fn on_file_converted(&self, path: &Path, _output: &Path) {
        self.bar
            .println(format!("  {} {}", green("✓"), self.display(path)));
        self.bar.inc(1);
    }

    fn on_file_failed(&self, path: &Path, error: &FileError) {
        // Truncate very long error messages to keep output tidy.
        let msg = error.to_string();
        let msg = if msg.chars().count() > 80 {
            format!("{}\u{2026}", msg.chars().take(79).collect::<String>())
        } else {
            msg
        };

        self.bar.println(format!(
            "  {} {}  {}",
            red("✗"),
            self.display(path),
            red(&msg)
        ));
        self.bar.inc(1);
    }

    fn on_file_skipped(&self, path: &Path, reason: &str) {
        self.bar
            .println(format!("  {} {}  {}", dim("-"), self.display(path), dim(reason)));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, _successful: usize, _failed: usize, _skipped: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r###"EXAMPLES:
  # Convert every document under ./docs into ./markdown
  doc2md docs/ markdown/

  # Disable OCR and convert four files at a time
  DOC2MD_OCR=off DOC2MD_CONCURRENCY=4 doc2md docs/ markdown/

SUPPORTED FORMATS:
  .pdf    structured text → text layer → OCR (tesseract), first non-empty wins
  .docx   paragraphs; "Heading N" styles become N-level headings
  .pptx   "## Slide N" per slide, shape text, "---" between slides
  .txt    copied as UTF-8 (invalid bytes dropped)
  .rtf    stripped to plain text

ENVIRONMENT VARIABLES:
  DOC2MD_OCR                 auto (default), on, off
  DOC2MD_OCR_LANG            Tesseract language (default: por)
  DOC2MD_OCR_DPI             OCR render DPI, 72–400 (default: 200)
  DOC2MD_OCR_TIMEOUT         Seconds per OCR page (default: 300)
  DOC2MD_CONCURRENCY         Files converted at once (default: 1)
  DOC2MD_HEADING_SIZE        PDF heading font-size threshold (default: 12)
  DOC2MD_REPORT_UNSUPPORTED  Record unsupported files as skipped (default: true)
  PDFIUM_LIB_PATH            Path to an existing libpdfium
  RUST_LOG                   Console log filter (e.g. debug)

OUTPUT:
  <OUTPUT_DIR>/<same relative path>.md        one file per converted document
  <OUTPUT_DIR>/conversion_report_<stamp>.txt  run report
  <OUTPUT_DIR>/conversion.log                 run log
"###;

/// Convert a directory of PDF, DOCX, PPTX, TXT and RTF files to Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "doc2md",
    version,
    about = "Convert a directory of PDF, DOCX, PPTX, TXT and RTF files to Markdown",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory to scan recursively for documents.
    input: PathBuf,

    /// Directory that receives the Markdown tree, report and log.
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if !cli.input.exists() {
        anyhow::bail!("Input directory not found: '{}'", cli.input.display());
    }
    if !cli.input.is_dir() {
        anyhow::bail!("Input path is not a directory: '{}'", cli.input.display());
    }
    std::fs::create_dir_all(&cli.output)
        .with_context(|| format!("Failed to create output directory {:?}", cli.output))?;

    // ── Logging setup ────────────────────────────────────────────────────
    // Keep the console to warnings while the progress bar is drawing; the
    // bar provides all the feedback that matters to the user. The log file
    // always gets the full info-level record.
    let show_progress = io::stderr().is_terminal();
    let console_level = if show_progress { "warn" } else { "info" };
    let console_layer = fmt::layer().with_writer(io::stderr).with_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(console_level)),
    );

    let log_path = cli.output.join(LOG_FILE_NAME);
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .with_filter(LevelFilter::INFO);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new(&cli.input) as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let mut builder = ConversionConfig::from_env().context("Invalid DOC2MD_* environment")?;
    if let Some(cb) = progress_cb {
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    // ── Run conversion ───────────────────────────────────────────────────
    let output = run(&cli.input, &cli.output, &config)
        .await
        .context("Conversion failed")?;

    let report = &output.report;
    if report.successful().is_empty() && report.failed().is_empty() {
        eprintln!("{} No supported files found in {}", cyan("⚠"), cli.input.display());
    }

    let failed = report.failed().len();
    eprintln!(
        "{}  {} converted  /  {} failed  /  {} skipped",
        if failed == 0 { green("✔") } else { cyan("⚠") },
        bold(&report.successful().len().to_string()),
        if failed == 0 {
            failed.to_string()
        } else {
            red(&failed.to_string())
        },
        dim(&report.skipped().len().to_string()),
    );
    eprintln!("   Report: {}", bold(&output.report_path.display().to_string()));
    eprintln!("   Log:    {}", dim(&log_path.display().to_string()));

    Ok(())
}
