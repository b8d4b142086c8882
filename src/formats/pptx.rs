//! PowerPoint decks (`.pptx`) → Markdown.
//!
//! Output shape, one block per slide in presentation order:
//!
//! ```text
//! ## Slide 1
//! <shape text>
//! <shape text>
//!
//! ---
//!
//! ## Slide 2
//! ```
//!
//! Presentation order comes from `p:sldIdLst` in `ppt/presentation.xml`
//! resolved through its relationships. Decks missing either part fall back
//! to the numeric order of `ppt/slides/slideN.xml`.

use super::ooxml::{
    open_archive, parse_relationships, prefixed_attr, read_part, xml_error, Archive, OoxmlError,
};
use crate::error::FileError;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::path::Path;
use tracing::debug;

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";

/// Convert the deck at `path` to Markdown.
pub fn convert(path: &Path) -> Result<String, FileError> {
    read_pptx(path).map_err(|e| FileError::conversion("pptx", e))
}

fn read_pptx(path: &Path) -> Result<String, OoxmlError> {
    let mut archive = open_archive(path)?;
    let slide_parts = match ordered_from_presentation(&mut archive)? {
        Some(parts) if !parts.is_empty() => parts,
        _ => {
            debug!("{}: no usable slide list, using file order", path.display());
            ordered_by_file_name(&archive)
        }
    };

    let mut slides = Vec::with_capacity(slide_parts.len());
    for (index, part) in slide_parts.iter().enumerate() {
        let Some(xml) = read_part(&mut archive, part)? else {
            debug!("{}: slide part {} listed but absent", path.display(), part);
            continue;
        };
        let shapes = parse_slide(&xml, part)?;

        let mut block = format!("## Slide {}", index + 1);
        for shape in shapes {
            block.push('\n');
            block.push_str(&shape);
        }
        slides.push(block);
    }

    Ok(slides.join("\n\n---\n\n"))
}

/// Slide part names in `p:sldIdLst` order, or `None` if the deck lacks the
/// presentation part or its relationships.
fn ordered_from_presentation(archive: &mut Archive) -> Result<Option<Vec<String>>, OoxmlError> {
    let Some(presentation) = read_part(archive, PRESENTATION_PART)? else {
        return Ok(None);
    };
    let Some(rels_xml) = read_part(archive, PRESENTATION_RELS)? else {
        return Ok(None);
    };
    let rels = parse_relationships(&rels_xml, PRESENTATION_RELS)?;

    let mut reader = Reader::from_str(&presentation);
    let mut parts = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"sldId" => {
                if let Some(target) = prefixed_attr(e, b"id").and_then(|rid| rels.get(&rid)) {
                    parts.push(resolve_target(target));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(xml_error(PRESENTATION_PART, e)),
        }
    }

    Ok(Some(parts))
}

/// Relationship targets are relative to `ppt/` unless absolute.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("ppt/{}", target.trim_start_matches("./")),
    }
}

fn ordered_by_file_name(archive: &Archive) -> Vec<String> {
    let mut numbered: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let n = name
                .strip_prefix("ppt/slides/slide")?
                .strip_suffix(".xml")?
                .parse::<u32>()
                .ok()?;
            Some((n, name.to_string()))
        })
        .collect();
    numbered.sort();
    numbered.into_iter().map(|(_, name)| name).collect()
}

/// Text of each text-bearing shape (`p:sp` with a `p:txBody`), in document
/// order. Paragraphs inside a shape are joined with `\n`.
fn parse_slide(xml: &str, part: &str) -> Result<Vec<String>, OoxmlError> {
    let mut reader = Reader::from_str(xml);
    let mut shapes = Vec::new();
    let mut body_depth = 0usize;
    let mut paragraphs: Vec<String> = Vec::new();
    let mut paragraph = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"txBody" => {
                    body_depth += 1;
                    if body_depth == 1 {
                        paragraphs.clear();
                    }
                }
                b"p" if body_depth > 0 => paragraph.clear(),
                b"t" if body_depth > 0 => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) if body_depth > 0 => {
                if e.local_name().as_ref() == b"br" {
                    paragraph.push('\n');
                }
            }
            Ok(Event::Text(ref e)) if in_text => {
                let text = e.unescape().map_err(|err| xml_error(part, err))?;
                paragraph.push_str(&text);
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" if body_depth > 0 => paragraphs.push(std::mem::take(&mut paragraph)),
                b"txBody" if body_depth > 0 => {
                    body_depth -= 1;
                    if body_depth == 0 {
                        let text = paragraphs.join("\n");
                        let text = text.trim();
                        if !text.is_empty() {
                            shapes.push(text.to_string());
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(xml_error(part, e)),
        }
    }

    Ok(shapes)
}

#[cfg(test)]
mod tests {
    use super::super::ooxml::fixtures::write_zip;
    use super::*;
    use crate::error::FileErrorKind;

    fn slide(shapes: &[&[&str]]) -> String {
        let body: String = shapes
            .iter()
            .map(|paras| {
                let ps: String = paras
                    .iter()
                    .map(|t| format!("<a:p><a:r><a:t>{t}</a:t></a:r></a:p>"))
                    .collect();
                format!("<p:sp><p:nvSpPr><p:cNvPr id=\"2\" name=\"Box\"/></p:nvSpPr><p:txBody><a:bodyPr/>{ps}</p:txBody></p:sp>")
            })
            .collect();
        format!(
            r#"<?xml version="1.0"?><p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree>{body}</p:spTree></p:cSld></p:sld>"#
        )
    }

    const PRESENTATION: &str = r#"<?xml version="1.0"?>
<p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <p:sldIdLst><p:sldId id="256" r:id="rId3"/><p:sldId id="257" r:id="rId2"/></p:sldIdLst>
</p:presentation>"#;

    const RELS: &str = r#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId2" Type="http://x/slide" Target="slides/slide1.xml"/>
  <Relationship Id="rId3" Type="http://x/slide" Target="slides/slide2.xml"/>
</Relationships>"#;

    fn convert_parts(parts: &[(&str, &str)]) -> Result<String, FileError> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.pptx");
        write_zip(&path, parts);
        convert(&path)
    }

    #[test]
    fn slides_follow_presentation_order() {
        let s1 = slide(&[&["First file"]]);
        let s2 = slide(&[&["Agenda"], &["Item one", "Item two"]]);
        let md = convert_parts(&[
            (PRESENTATION_PART, PRESENTATION),
            (PRESENTATION_RELS, RELS),
            ("ppt/slides/slide1.xml", &s1),
            ("ppt/slides/slide2.xml", &s2),
        ])
        .unwrap();

        assert_eq!(
            md,
            "## Slide 1\nAgenda\nItem one\nItem two\n\n---\n\n## Slide 2\nFirst file"
        );
    }

    #[test]
    fn falls_back_to_numeric_file_order() {
        let md = convert_parts(&[
            ("ppt/slides/slide10.xml", &slide(&[&["ten"]])),
            ("ppt/slides/slide2.xml", &slide(&[&["two"]])),
        ])
        .unwrap();
        assert_eq!(md, "## Slide 1\ntwo\n\n---\n\n## Slide 2\nten");
    }

    #[test]
    fn blank_shapes_are_dropped_but_slide_heading_stays() {
        let md = convert_parts(&[("ppt/slides/slide1.xml", &slide(&[&["  "]]))]).unwrap();
        assert_eq!(md, "## Slide 1");
    }

    #[test]
    fn deck_without_slides_is_blank() {
        let md = convert_parts(&[("[Content_Types].xml", "<Types/>")]).unwrap();
        assert!(md.is_empty());
    }

    #[test]
    fn broken_slide_xml_is_conversion_error() {
        let err = convert_parts(&[("ppt/slides/slide1.xml", "<p:sld><a:t>oops</p:sld>")]).unwrap_err();
        assert_eq!(err.kind(), FileErrorKind::ConversionError);
    }

    #[test]
    fn absolute_targets_resolve_from_root() {
        assert_eq!(resolve_target("/ppt/slides/slide3.xml"), "ppt/slides/slide3.xml");
        assert_eq!(resolve_target("slides/slide3.xml"), "ppt/slides/slide3.xml");
    }
}
