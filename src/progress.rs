//! Progress-callback trait for per-file conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the orchestrator walks the tree and as the PDF pipeline moves
//! through its strategy chain.
//!
//! The same port carries diagnostics (a strategy that failed before a later
//! one succeeded) so callers and tests can observe them without installing
//! a global `tracing` subscriber.
//!
//! # Example
//!
//! ```rust
//! use edgequake_doc2md::{ConversionConfig, ConversionProgressCallback};
//! use std::path::Path;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     converted: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_file_converted(&self, path: &Path, _output: &Path) {
//!         self.converted.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("done: {}", path.display());
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { converted: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::{FileError, StrategyError};
use std::path::Path;
use std::sync::Arc;

/// Called by the orchestrator and the PDF pipeline as files are processed.
///
/// Implementations must be `Send + Sync`: strategy events fire from the
/// blocking thread pool, and with `concurrency > 1` file events may arrive
/// from several tasks at once. All methods default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once after discovery, before any file is converted.
    fn on_run_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called when a file is dispatched to its converter.
    fn on_file_start(&self, path: &Path) {
        let _ = path;
    }

    /// Called when a Markdown file has been written.
    fn on_file_converted(&self, path: &Path, output: &Path) {
        let _ = (path, output);
    }

    /// Called when a file is recorded as a failure.
    fn on_file_failed(&self, path: &Path, error: &FileError) {
        let _ = (path, error);
    }

    /// Called when a file is recorded as skipped.
    fn on_file_skipped(&self, path: &Path, reason: &str) {
        let _ = (path, reason);
    }

    /// Called when a PDF extraction strategy errors out. The chain continues
    /// with the next strategy.
    fn on_strategy_failed(&self, path: &Path, strategy: &str, error: &StrategyError) {
        let _ = (path, strategy, error);
    }

    /// Called once after every outcome has been recorded.
    fn on_run_complete(&self, successful: usize, failed: usize, skipped: usize) {
        let _ = (successful, failed, skipped);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
