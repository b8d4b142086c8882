//! Non-PDF converters and format classification.
//!
//! The declared format comes from the file extension only. Each supported
//! non-PDF format has a single `convert(path) -> Result<String, FileError>`
//! function; PDFs go through [`crate::pipeline::PdfPipeline`] instead.

pub mod docx;
mod ooxml;
pub mod pptx;
pub mod rtf;
pub mod text;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Extensions accepted by the converter (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "docx", "pptx", "txt", "rtf"];

/// A file's type as declared by its extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclaredFormat {
    Pdf,
    Docx,
    Pptx,
    Text,
    Rtf,
    /// Lower-cased extension, empty when the file has none.
    Unsupported(String),
}

impl DeclaredFormat {
    /// Classify a path by its extension.
    ///
    /// ```
    /// use edgequake_doc2md::DeclaredFormat;
    /// use std::path::Path;
    ///
    /// assert_eq!(DeclaredFormat::from_path(Path::new("Report.PDF")), DeclaredFormat::Pdf);
    /// assert!(!DeclaredFormat::from_path(Path::new("c.xyz")).is_supported());
    /// ```
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => DeclaredFormat::Pdf,
            "docx" => DeclaredFormat::Docx,
            "pptx" => DeclaredFormat::Pptx,
            "txt" => DeclaredFormat::Text,
            "rtf" => DeclaredFormat::Rtf,
            _ => DeclaredFormat::Unsupported(ext),
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, DeclaredFormat::Unsupported(_))
    }

    /// Reason recorded for a skipped file.
    pub fn skip_reason(&self) -> Option<String> {
        match self {
            DeclaredFormat::Unsupported(ext) if ext.is_empty() => {
                Some("unsupported format: (no extension)".to_string())
            }
            DeclaredFormat::Unsupported(ext) => Some(format!("unsupported format: {ext}")),
            _ => None,
        }
    }
}

impl fmt::Display for DeclaredFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclaredFormat::Pdf => f.write_str("pdf"),
            DeclaredFormat::Docx => f.write_str("docx"),
            DeclaredFormat::Pptx => f.write_str("pptx"),
            DeclaredFormat::Text => f.write_str("txt"),
            DeclaredFormat::Rtf => f.write_str("rtf"),
            DeclaredFormat::Unsupported(ext) => write!(f, "unsupported ({ext})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_case_insensitive() {
        assert_eq!(DeclaredFormat::from_path(Path::new("a/B.DocX")), DeclaredFormat::Docx);
        assert_eq!(DeclaredFormat::from_path(Path::new("notes.TXT")), DeclaredFormat::Text);
        assert_eq!(DeclaredFormat::from_path(Path::new("x.Rtf")), DeclaredFormat::Rtf);
        assert_eq!(DeclaredFormat::from_path(Path::new("deck.pptx")), DeclaredFormat::Pptx);
    }

    #[test]
    fn every_supported_extension_maps_to_a_format() {
        for ext in SUPPORTED_EXTENSIONS {
            let path = format!("file.{ext}");
            assert!(DeclaredFormat::from_path(Path::new(&path)).is_supported(), "{ext}");
        }
    }

    #[test]
    fn unsupported_keeps_extension_for_reason() {
        let f = DeclaredFormat::from_path(Path::new("c.XYZ"));
        assert_eq!(f, DeclaredFormat::Unsupported("xyz".into()));
        assert_eq!(f.skip_reason().unwrap(), "unsupported format: xyz");
        assert!(DeclaredFormat::Pdf.skip_reason().is_none());
    }

    #[test]
    fn missing_extension_is_unsupported() {
        let f = DeclaredFormat::from_path(Path::new("Makefile"));
        assert!(!f.is_supported());
        assert_eq!(f.skip_reason().unwrap(), "unsupported format: (no extension)");
    }

    #[test]
    fn doc_is_not_docx() {
        assert!(!DeclaredFormat::from_path(Path::new("legacy.doc")).is_supported());
    }
}
