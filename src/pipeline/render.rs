//! pdfium access: library binding and page rasterisation.
//!
//! Every call here is blocking. The orchestrator already runs each
//! conversion inside `tokio::task::spawn_blocking`, so these functions are
//! plain synchronous code.
//!
//! ## Binding
//!
//! `Pdfium::default()` panics when the shared library is missing. Binding
//! goes through [`bind_pdfium`] instead, which tries `PDFIUM_LIB_PATH`, then
//! the working directory, then the system library path, and reports a
//! missing library as [`StrategyError::Unavailable`].
//!
//! ## Why cap pixels, not only DPI?
//!
//! Page sizes vary wildly: an A0 poster at 200 DPI would produce a
//! 6,600 × 9,400 px image. `max_rendered_pixels` caps the longest edge
//! regardless of physical size, keeping memory bounded per page.

use crate::error::StrategyError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable pointing at an explicit pdfium shared library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind to the pdfium shared library without panicking.
pub fn bind_pdfium() -> Result<Pdfium, StrategyError> {
    if let Ok(explicit) = std::env::var(PDFIUM_LIB_PATH_ENV) {
        if !explicit.is_empty() {
            let bindings = Pdfium::bind_to_library(Path::new(&explicit)).map_err(|e| {
                StrategyError::Unavailable(format!("pdfium at '{explicit}': {e:?}"))
            })?;
            debug!("pdfium bound from {}", explicit);
            return Ok(Pdfium::new(bindings));
        }
    }

    let local = Pdfium::pdfium_platform_library_name_at_path(&PathBuf::from("./"));
    let bindings = Pdfium::bind_to_library(&local)
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| StrategyError::Unavailable(format!("pdfium: {e:?}")))?;
    Ok(Pdfium::new(bindings))
}

/// Open a document with the empty password.
pub fn load_document<'a>(pdfium: &'a Pdfium, path: &Path) -> Result<PdfDocument<'a>, StrategyError> {
    pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| StrategyError::Failed(format!("pdfium could not open document: {e:?}")))
}

/// Render settings for OCR: scale by `dpi / 72`, then cap the longest edge.
pub fn ocr_render_config(dpi: u32, max_pixels: u32) -> PdfRenderConfig {
    PdfRenderConfig::new()
        .scale_page_by_factor(dpi as f32 / 72.0)
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32)
}

/// Rasterise one page into a PNG at `dest`.
///
/// `page_number` is 1-based and only used for error messages.
pub fn render_page_png(
    page: &PdfPage,
    render_config: &PdfRenderConfig,
    page_number: usize,
    dest: &Path,
) -> Result<(), StrategyError> {
    let bitmap = page.render_with_config(render_config).map_err(|e| {
        StrategyError::Failed(format!("could not rasterise page {page_number}: {e:?}"))
    })?;

    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px",
        page_number,
        image.width(),
        image.height()
    );

    image
        .save_with_format(dest, image::ImageFormat::Png)
        .map_err(|e| StrategyError::Failed(format!("could not save page {page_number}: {e}")))
}
