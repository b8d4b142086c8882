//! Zip and XML plumbing for PowerPoint (`.pptx`) archives.

use quick_xml::events::BytesStart;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

#[derive(Debug, Error)]
pub(crate) enum OoxmlError {
    #[error("cannot read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a valid Office archive: {0}")]
    Zip(#[from] ZipError),

    #[error("malformed XML in {part}: {source}")]
    Xml {
        part: String,
        #[source]
        source: quick_xml::Error,
    },
}

pub(crate) type Archive = ZipArchive<File>;

pub(crate) fn open_archive(path: &Path) -> Result<Archive, OoxmlError> {
    let file = File::open(path)?;
    Ok(ZipArchive::new(file)?)
}

/// Read an archive part as UTF-8; `None` when the part does not exist.
pub(crate) fn read_part(archive: &mut Archive, name: &str) -> Result<Option<String>, OoxmlError> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

pub(crate) fn xml_error(part: &str, source: quick_xml::Error) -> OoxmlError {
    OoxmlError::Xml {
        part: part.to_string(),
        source,
    }
}

/// Value of the attribute whose local name is `local`, ignoring prefixes.
pub(crate) fn attr(element: &BytesStart, local: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Value of a prefixed attribute such as `r:id`, matched on its local name.
///
/// Needed where an element carries both `id` and `r:id`.
pub(crate) fn prefixed_attr(element: &BytesStart, local: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.prefix().is_some() && a.key.local_name().as_ref() == local)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Parse a `.rels` part into `Id → Target`.
pub(crate) fn parse_relationships(xml: &str, part: &str) -> Result<HashMap<String, String>, OoxmlError> {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);
    let mut rels = HashMap::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (attr(e, b"Id"), attr(e, b"Target")) {
                    rels.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(xml_error(part, e)),
        }
    }

    Ok(rels)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relationships_map_id_to_target() {
        let xml = r#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://x/slideMaster" Target="slideMasters/slideMaster1.xml"/>
  <Relationship Id="rId2" Type="http://x/slide" Target="slides/slide1.xml"/>
</Relationships>"#;
        let rels = parse_relationships(xml, "rels").unwrap();
        assert_eq!(rels.get("rId2").map(String::as_str), Some("slides/slide1.xml"));
        assert_eq!(rels.len(), 2);
    }

    #[test]
    fn missing_part_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.zip");
        fixtures::write_zip(&path, &[("hello.txt", "hi")]);

        let mut archive = open_archive(&path).unwrap();
        assert_eq!(read_part(&mut archive, "hello.txt").unwrap().as_deref(), Some("hi"));
        assert!(read_part(&mut archive, "nope.xml").unwrap().is_none());
    }

    #[test]
    fn non_zip_is_zip_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.docx");
        std::fs::write(&path, b"definitely not a zip").unwrap();
        assert!(matches!(open_archive(&path), Err(OoxmlError::Zip(_))));
    }
}
