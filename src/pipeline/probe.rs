//! Document pre-checks: classify structural defects before extraction.
//!
//! `lopdf` reads the document first; it needs no shared library. When it
//! cannot parse the file, or cannot decrypt the scheme in use, pdfium is
//! asked for a second opinion, since it repairs broken xref tables and
//! handles AES. Only when both give up is the file classified as a defect.
//!
//! The same loader backs [`crate::pipeline::text_layer`].

use super::render::bind_pdfium;
use crate::error::{FileError, StrategyError};
use lopdf::encryption::DecryptionError;
use lopdf::Document;
use pdfium_render::prelude::{PdfiumError, PdfiumInternalError};
use std::path::Path;
use tracing::{debug, warn};

/// Facts the pipeline needs before choosing to run any strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentSummary {
    pub page_count: usize,
    /// The file is encrypted but opened with the empty password.
    pub encrypted: bool,
}

/// Opens a document once and classifies it.
pub trait DocumentProbe: Send + Sync {
    /// # Errors
    /// `PasswordProtected` or `CorruptStructure`. A zero page count is
    /// returned as data; the pipeline turns it into `EmptyDocument`.
    fn probe(&self, path: &Path) -> Result<DocumentSummary, FileError>;
}

/// A second parser consulted when lopdf cannot open a document.
pub trait FallbackOpener: Send + Sync {
    /// Page count with the empty password, or the defect found.
    ///
    /// `None` means the backend is not available and has no opinion.
    fn open(&self, path: &Path) -> Option<Result<usize, FileError>>;
}

/// pdfium as the fallback parser.
pub struct PdfiumOpener;

impl FallbackOpener for PdfiumOpener {
    fn open(&self, path: &Path) -> Option<Result<usize, FileError>> {
        let pdfium = match bind_pdfium() {
            Ok(pdfium) => pdfium,
            Err(e) => {
                debug!("No pdfium fallback for {}: {}", path.display(), e);
                return None;
            }
        };

        let verdict = match pdfium.load_pdf_from_file(path, None) {
            Ok(document) => Ok(document.pages().len() as usize),
            Err(PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError)) => {
                Err(FileError::PasswordProtected)
            }
            Err(e) => Err(FileError::CorruptStructure {
                detail: format!("pdfium: {e:?}"),
            }),
        };
        Some(verdict)
    }
}

/// The default probe: lopdf first, pdfium when lopdf gives up.
pub struct LopdfProbe {
    fallback: Option<Box<dyn FallbackOpener>>,
}

impl LopdfProbe {
    pub fn new() -> Self {
        Self::with_fallback(Box::new(PdfiumOpener))
    }

    pub fn with_fallback(fallback: Box<dyn FallbackOpener>) -> Self {
        Self {
            fallback: Some(fallback),
        }
    }

    /// lopdf's verdict is final.
    pub fn lopdf_only() -> Self {
        Self { fallback: None }
    }

    fn second_opinion(&self, path: &Path) -> Option<Result<usize, FileError>> {
        self.fallback.as_ref().and_then(|f| f.open(path))
    }
}

impl Default for LopdfProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentProbe for LopdfProbe {
    fn probe(&self, path: &Path) -> Result<DocumentSummary, FileError> {
        let (document, unlock) = match load_and_unlock(path) {
            Ok(loaded) => loaded,
            Err(e) => {
                let lopdf_detail = e.to_string();
                debug!("lopdf cannot parse {}: {}", path.display(), lopdf_detail);
                return match self.second_opinion(path) {
                    Some(Ok(page_count)) => {
                        warn!("{}: damaged structure, opened by pdfium", path.display());
                        Ok(DocumentSummary {
                            page_count,
                            encrypted: false,
                        })
                    }
                    Some(Err(FileError::CorruptStructure { detail })) => {
                        Err(FileError::CorruptStructure {
                            detail: format!("{lopdf_detail}; {detail}"),
                        })
                    }
                    Some(Err(other)) => Err(other),
                    None => Err(FileError::CorruptStructure {
                        detail: lopdf_detail,
                    }),
                };
            }
        };

        let lopdf_pages = document.get_pages().len();
        match unlock {
            Unlock::NotEncrypted => Ok(DocumentSummary {
                page_count: lopdf_pages,
                encrypted: false,
            }),
            Unlock::EmptyPassword => Ok(DocumentSummary {
                page_count: lopdf_pages,
                encrypted: true,
            }),
            Unlock::Rejected => Err(FileError::PasswordProtected),
            Unlock::Unsupported(detail) => {
                debug!("{}: lopdf cannot decrypt ({}); asking pdfium", path.display(), detail);
                match self.second_opinion(path) {
                    Some(Ok(page_count)) => Ok(DocumentSummary {
                        page_count,
                        encrypted: true,
                    }),
                    Some(Err(e)) => Err(e),
                    // Nobody can check the password; let the strategies try.
                    None => Ok(DocumentSummary {
                        page_count: lopdf_pages,
                        encrypted: true,
                    }),
                }
            }
        }
    }
}

/// How an encrypted document responded to the empty password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Unlock {
    NotEncrypted,
    EmptyPassword,
    Rejected,
    /// lopdf does not implement the scheme; the password was never checked.
    Unsupported(String),
}

/// Load a PDF with lopdf and try the empty password when encrypted.
pub(crate) fn load_and_unlock(path: &Path) -> Result<(Document, Unlock), lopdf::Error> {
    let mut document = Document::load(path)?;
    if !document.is_encrypted() {
        return Ok((document, Unlock::NotEncrypted));
    }

    let unlock = match document.decrypt("") {
        Ok(()) => Unlock::EmptyPassword,
        Err(lopdf::Error::Decryption(DecryptionError::IncorrectPassword)) => Unlock::Rejected,
        Err(e) => Unlock::Unsupported(e.to_string()),
    };
    Ok((document, unlock))
}

/// Open a document for text extraction, readable or not at all.
pub(crate) fn open_document(path: &Path) -> Result<Document, StrategyError> {
    let (document, unlock) =
        load_and_unlock(path).map_err(|e| StrategyError::Failed(e.to_string()))?;
    match unlock {
        Unlock::NotEncrypted | Unlock::EmptyPassword => Ok(document),
        Unlock::Rejected => Err(StrategyError::Failed("password required".to_string())),
        Unlock::Unsupported(detail) => Err(StrategyError::Unavailable(format!(
            "lopdf cannot decrypt: {detail}"
        ))),
    }
}
