//! Input document handle.

use crate::detect::{resolve_kind, DocumentKind};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An input document: raw bytes plus the kind they were recognized as.
///
/// Cloning is cheap; the bytes are shared and never modified.
#[derive(Debug, Clone)]
pub struct Document {
    data: Arc<[u8]>,
    kind: DocumentKind,
    mime_hint: Option<String>,
    source: Option<PathBuf>,
}

impl Document {
    /// Wrap in-memory bytes, using `mime_hint` only when the bytes are not
    /// self-describing.
    pub fn from_bytes(data: impl Into<Vec<u8>>, mime_hint: Option<&str>) -> Result<Self> {
        let data: Vec<u8> = data.into();
        if data.is_empty() {
            return Err(Error::UnknownFormat);
        }
        let kind = resolve_kind(&data, mime_hint)?;
        Ok(Self {
            data: data.into(),
            kind,
            mime_hint: mime_hint.map(str::to_string),
            source: None,
        })
    }

    /// Read a document from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let mut document = Self::from_bytes(data, None)?;
        document.source = Some(path.to_path_buf());
        Ok(document)
    }

    /// Raw document bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Recognized document kind.
    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// MIME type hint supplied by the caller.
    pub fn mime_hint(&self) -> Option<&str> {
        self.mime_hint.as_deref()
    }

    /// Path the document was read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the document holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::ImageFormat;

    #[test]
    fn test_from_bytes_pdf() {
        let doc = Document::from_bytes(b"%PDF-1.4\n%test".to_vec(), None).unwrap();
        assert_eq!(doc.kind(), DocumentKind::Pdf);
        assert_eq!(doc.len(), 14);
        assert!(doc.source().is_none());
    }

    #[test]
    fn test_from_bytes_uses_hint() {
        let doc = Document::from_bytes(b"\0\0\0\0\0".to_vec(), Some("image/png")).unwrap();
        assert_eq!(doc.kind(), DocumentKind::Image(ImageFormat::Png));
        assert_eq!(doc.mime_hint(), Some("image/png"));
    }

    #[test]
    fn test_empty_is_rejected() {
        assert!(matches!(
            Document::from_bytes(Vec::new(), Some("application/pdf")),
            Err(Error::UnknownFormat)
        ));
    }

    #[test]
    fn test_open_missing_file() {
        assert!(matches!(
            Document::open("/definitely/not/here.pdf"),
            Err(Error::Io(_))
        ));
    }
}
