//! Word documents (`.docx`) → Markdown.
//!
//! The archive is parsed with `docx-rs` and walked through its JSON form.
//! A paragraph whose style name is `Heading N` becomes an ATX heading of
//! level N (capped at 6); everything else is emitted as a plain paragraph.
//! Style ids are resolved to display names through the document's styles.

use crate::error::FileError;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Convert the document at `path` to Markdown.
pub fn convert(path: &Path) -> Result<String, FileError> {
    let bytes = std::fs::read(path).map_err(|e| FileError::conversion("docx", e))?;
    let docx = docx_rs::read_docx(&bytes)
        .map_err(|e| FileError::conversion("docx", format!("Word document parsing error: {e}")))?;
    let json: Value = serde_json::from_str(&docx.json())
        .map_err(|e| FileError::conversion("docx", format!("JSON parsing error: {e}")))?;

    let styles = json.get("styles").map(style_names).unwrap_or_default();
    let mut paragraphs = Vec::new();
    if let Some(document) = json.get("document") {
        collect_paragraphs(document, &mut paragraphs);
    }
    Ok(render(&paragraphs, &styles))
}

#[derive(Debug, Default, PartialEq)]
struct Paragraph {
    style_id: Option<String>,
    text: String,
}

/// `styleId` → display name for every style in the document.
fn style_names(styles: &Value) -> HashMap<String, String> {
    let mut names = HashMap::new();
    let entries = styles.get("styles").and_then(Value::as_array);
    for style in entries.into_iter().flatten() {
        let id = style.get("styleId").and_then(Value::as_str);
        let name = style.get("name").and_then(string_or_val);
        if let (Some(id), Some(name)) = (id, name) {
            names.insert(id.to_string(), name);
        }
    }
    names
}

/// Values serialised either bare or wrapped as `{"val": ..}` / `{"name": ..}`.
fn string_or_val(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("val")
            .or_else(|| map.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

/// Every paragraph below `node`, in document order.
fn collect_paragraphs(node: &Value, out: &mut Vec<Paragraph>) {
    match node {
        Value::Object(map) if map.get("type").and_then(Value::as_str) == Some("paragraph") => {
            if let Some(data) = map.get("data") {
                out.push(paragraph(data));
            }
        }
        Value::Object(map) => map.values().for_each(|v| collect_paragraphs(v, out)),
        Value::Array(items) => items.iter().for_each(|v| collect_paragraphs(v, out)),
        _ => {}
    }
}

fn paragraph(data: &Value) -> Paragraph {
    let style_id = data
        .get("property")
        .and_then(|p| p.get("style"))
        .and_then(string_or_val);
    let mut text = String::new();
    if let Some(children) = data.get("children") {
        collect_text(children, &mut text);
    }
    Paragraph { style_id, text }
}

/// Run text inside a paragraph. Tracked deletions are not text.
fn collect_text(node: &Value, out: &mut String) {
    match node {
        Value::Array(items) => items.iter().for_each(|v| collect_text(v, out)),
        Value::Object(map) => match map.get("type").and_then(Value::as_str) {
            Some("text") => {
                if let Some(text) = map.get("data").and_then(|d| d.get("text")).and_then(Value::as_str) {
                    out.push_str(text);
                }
            }
            Some("tab") => out.push('\t'),
            Some("break") => out.push('\n'),
            Some("delete") | Some("deleteText") => {}
            _ => {
                for key in ["data", "children"] {
                    if let Some(child) = map.get(key) {
                        collect_text(child, out);
                    }
                }
            }
        },
        _ => {}
    }
}

fn render(paragraphs: &[Paragraph], styles: &HashMap<String, String>) -> String {
    paragraphs
        .iter()
        .filter_map(|p| {
            let text = p.text.trim();
            if text.is_empty() {
                return None;
            }
            let level = p.style_id.as_ref().and_then(|id| {
                let name = styles.get(id).unwrap_or(id);
                heading_level(name)
            });
            Some(match level {
                Some(n) => format!("{} {}", "#".repeat(n), text),
                None => text.to_string(),
            })
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// `Heading 2` / `heading 2` / `Heading2` → `Some(2)`; capped at 6.
///
/// A heading style without a level number is not a heading.
fn heading_level(style_name: &str) -> Option<usize> {
    let name = style_name.trim().to_lowercase();
    if !name.starts_with("heading") {
        return None;
    }
    let digits: String = name
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    match digits.parse::<usize>() {
        Ok(0) | Err(_) => None,
        Ok(n) => Some(n.min(6)),
    }
}

#[cfg(test)]
mod tests {
    use super::super::ooxml::fixtures::write_zip;
    use super::*;
    use crate::error::FileErrorKind;
    use docx_rs::{BreakType, Docx, Paragraph as DocxParagraph, Run, Style, StyleType};

    fn heading_style(id: &str, name: &str) -> Style {
        Style::new(id, StyleType::Paragraph).name(name)
    }

    fn para(text: &str) -> DocxParagraph {
        DocxParagraph::new().add_run(Run::new().add_text(text))
    }

    fn convert_docx(docx: Docx) -> Result<String, FileError> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.docx");
        let file = std::fs::File::create(&path).unwrap();
        docx.build().pack(file).unwrap();
        convert(&path)
    }

    #[test]
    fn heading_two_becomes_double_hash() {
        let docx = Docx::new()
            .add_style(heading_style("Heading2", "heading 2"))
            .add_paragraph(para("Scope").style("Heading2"))
            .add_paragraph(para("Body text."));
        assert_eq!(convert_docx(docx).unwrap(), "## Scope\n\nBody text.");
    }

    #[test]
    fn localized_style_id_resolves_through_name() {
        let docx = Docx::new()
            .add_style(heading_style("Ttulo3", "Heading 3"))
            .add_paragraph(para("Resumo").style("Ttulo3"));
        assert_eq!(convert_docx(docx).unwrap(), "### Resumo");
    }

    #[test]
    fn unnamed_style_falls_back_to_its_id() {
        let docx = Docx::new()
            .add_paragraph(para("Title").style("Heading1"))
            .add_paragraph(para("text"));
        assert_eq!(convert_docx(docx).unwrap(), "# Title\n\ntext");
    }

    #[test]
    fn runs_tabs_and_breaks_are_joined() {
        let paragraph = DocxParagraph::new()
            .add_run(Run::new().add_text("a").add_tab().add_text("b"))
            .add_run(Run::new().add_break(BreakType::TextWrapping).add_text("c & d"));
        let docx = Docx::new().add_paragraph(paragraph);
        assert_eq!(convert_docx(docx).unwrap(), "a\tb\nc & d");
    }

    #[test]
    fn empty_paragraphs_are_skipped() {
        let docx = Docx::new()
            .add_paragraph(para("one"))
            .add_paragraph(DocxParagraph::new())
            .add_paragraph(para("   "))
            .add_paragraph(para("two"));
        assert_eq!(convert_docx(docx).unwrap(), "one\n\ntwo");
    }

    #[test]
    fn archive_without_document_is_conversion_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.docx");
        write_zip(&path, &[("word/other.xml", "<x/>")]);
        assert_eq!(convert(&path).unwrap_err().kind(), FileErrorKind::ConversionError);
    }

    #[test]
    fn not_a_zip_is_conversion_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.docx");
        std::fs::write(&path, b"PK but not really").unwrap();
        assert_eq!(convert(&path).unwrap_err().kind(), FileErrorKind::ConversionError);
    }

    #[test]
    fn style_values_accept_both_shapes() {
        assert_eq!(string_or_val(&serde_json::json!("Heading1")).as_deref(), Some("Heading1"));
        assert_eq!(
            string_or_val(&serde_json::json!({ "val": "Heading2" })).as_deref(),
            Some("Heading2")
        );
        assert_eq!(string_or_val(&serde_json::json!(3)), None);
    }

    #[test]
    fn deleted_runs_are_not_text() {
        let paragraph = serde_json::json!({
            "property": { "style": "Normal" },
            "children": [
                { "type": "run", "data": { "children": [
                    { "type": "text", "data": { "text": "kept" } }
                ] } },
                { "type": "delete", "data": { "children": [
                    { "type": "run", "data": { "children": [
                        { "type": "deleteText", "data": { "text": "gone" } }
                    ] } }
                ] } }
            ]
        });
        let p = super::paragraph(&paragraph);
        assert_eq!(p.text, "kept");
        assert_eq!(p.style_id.as_deref(), Some("Normal"));
    }

    #[test]
    fn heading_level_parsing() {
        assert_eq!(heading_level("Heading 2"), Some(2));
        assert_eq!(heading_level("heading 1"), Some(1));
        assert_eq!(heading_level("Heading9"), Some(6));
        assert_eq!(heading_level("Heading"), None);
        assert_eq!(heading_level("Title"), None);
        assert_eq!(heading_level("Heading 0"), None);
    }
}
