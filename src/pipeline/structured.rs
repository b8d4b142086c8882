//! Structured extraction: text objects with their font sizes.
//!
//! Each text object on a page becomes a [`TextSpan`]. Spans whose size is
//! strictly above the configured threshold are promoted to `## ` headings.
//! [`layout_to_markdown`] holds the Markdown rules and needs no pdfium.

use super::render::{bind_pdfium, load_document};
use super::ExtractionStrategy;
use crate::error::StrategyError;
use pdfium_render::prelude::*;
use std::path::Path;

/// A run of text sharing one font size.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub font_size: f32,
}

/// Spans of one page, in content-stream order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub spans: Vec<TextSpan>,
}

/// Render page layouts as Markdown.
///
/// Blank spans are dropped. Spans on a page are joined by a newline, pages
/// by a blank line. Pages without any text contribute nothing.
pub fn layout_to_markdown(pages: &[PageLayout], heading_font_size: f32) -> String {
    pages
        .iter()
        .map(|page| {
            page.spans
                .iter()
                .filter_map(|span| {
                    let text = span.text.trim();
                    if text.is_empty() {
                        None
                    } else if span.font_size > heading_font_size {
                        Some(format!("## {text}"))
                    } else {
                        Some(text.to_string())
                    }
                })
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// First strategy in the chain; cheapest and keeps heading hints.
pub struct StructuredStrategy {
    heading_font_size: f32,
}

impl StructuredStrategy {
    pub fn new(heading_font_size: f32) -> Self {
        Self { heading_font_size }
    }
}

impl ExtractionStrategy for StructuredStrategy {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn extract(&self, path: &Path) -> Result<String, StrategyError> {
        let pdfium = bind_pdfium()?;
        let document = load_document(&pdfium, path)?;
        let pages = read_layout(&document);
        Ok(layout_to_markdown(&pages, self.heading_font_size))
    }
}

fn read_layout(document: &PdfDocument) -> Vec<PageLayout> {
    document
        .pages()
        .iter()
        .map(|page| {
            let spans = page
                .objects()
                .iter()
                .filter_map(|object| {
                    let text_object = object.as_text_object()?;
                    Some(TextSpan {
                        text: text_object.text(),
                        font_size: text_object.scaled_font_size().value,
                    })
                })
                .collect();
            PageLayout { spans }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, font_size: f32) -> TextSpan {
        TextSpan {
            text: text.to_string(),
            font_size,
        }
    }

    #[test]
    fn large_spans_become_headings() {
        let pages = vec![PageLayout {
            spans: vec![span("Introduction", 18.0), span("Body text here.", 11.0)],
        }];
        assert_eq!(
            layout_to_markdown(&pages, 12.0),
            "## Introduction\nBody text here."
        );
    }

    #[test]
    fn threshold_is_strict() {
        let pages = vec![PageLayout {
            spans: vec![span("Exactly twelve", 12.0), span("Just above", 12.01)],
        }];
        assert_eq!(
            layout_to_markdown(&pages, 12.0),
            "Exactly twelve\n## Just above"
        );
    }

    #[test]
    fn pages_are_separated_by_blank_line() {
        let pages = vec![
            PageLayout {
                spans: vec![span("one", 10.0)],
            },
            PageLayout::default(),
            PageLayout {
                spans: vec![span("  ", 20.0), span("two", 10.0)],
            },
        ];
        assert_eq!(layout_to_markdown(&pages, 12.0), "one\n\ntwo");
    }

    #[test]
    fn no_text_yields_empty_string() {
        let pages = vec![PageLayout::default(), PageLayout::default()];
        assert!(layout_to_markdown(&pages, 12.0).is_empty());
    }
}
