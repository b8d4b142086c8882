//! Plain text-layer extraction, page by page, via `lopdf`.

use super::probe::open_document;
use super::ExtractionStrategy;
use crate::error::StrategyError;
use std::path::Path;
use tracing::debug;

/// Second strategy: the embedded text stream without layout hints.
pub struct TextLayerStrategy;

impl ExtractionStrategy for TextLayerStrategy {
    fn name(&self) -> &'static str {
        "text-layer"
    }

    fn extract(&self, path: &Path) -> Result<String, StrategyError> {
        let document = open_document(path)?;

        let mut pages = Vec::new();
        for page_number in document.get_pages().keys() {
            match document.extract_text(&[*page_number]) {
                Ok(text) => {
                    let text = text.trim();
                    if !text.is_empty() {
                        pages.push(text.to_string());
                    }
                }
                Err(e) => debug!("{}: page {} has no text layer: {}", path.display(), page_number, e),
            }
        }

        Ok(pages.join("\n\n"))
    }
}
