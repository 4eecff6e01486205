//! Input format detection from magic bytes and MIME hints.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Declared kind of an input document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// A PDF file, possibly with several pages.
    Pdf,
    /// A single raster image.
    Image(ImageFormat),
}

/// Raster formats accepted as single-page documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Tiff,
    Bmp,
    Webp,
    Gif,
}

impl ImageFormat {
    /// MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Tiff => "image/tiff",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Gif => "image/gif",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::Pdf => write!(f, "PDF"),
            DocumentKind::Image(format) => write!(f, "image ({})", format.mime_type()),
        }
    }
}

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
const HEADER_LEN: usize = 16;

/// Detect the document kind from a file path.
pub fn detect_kind_from_path<P: AsRef<Path>>(path: P) -> Result<DocumentKind> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut header = Vec::with_capacity(HEADER_LEN);
    reader.take(HEADER_LEN as u64).read_to_end(&mut header)?;
    detect_kind_from_bytes(&header)
}

/// Detect the document kind from the leading bytes of a file.
///
/// Returns `Err(Error::UnknownFormat)` when no known signature matches.
pub fn detect_kind_from_bytes(data: &[u8]) -> Result<DocumentKind> {
    if data.len() < 4 {
        return Err(Error::UnknownFormat);
    }

    if data.starts_with(PDF_MAGIC) {
        return Ok(DocumentKind::Pdf);
    }

    let format = if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        ImageFormat::Png
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        ImageFormat::Jpeg
    } else if data.starts_with(b"II*\0") || data.starts_with(b"MM\0*") {
        ImageFormat::Tiff
    } else if data.starts_with(b"BM") {
        ImageFormat::Bmp
    } else if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        ImageFormat::Webp
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        ImageFormat::Gif
    } else {
        return Err(Error::UnknownFormat);
    };

    Ok(DocumentKind::Image(format))
}

/// Map a MIME type hint to a document kind.
pub fn kind_from_mime(mime: &str) -> Option<DocumentKind> {
    let mime = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    let kind = match mime.as_str() {
        "application/pdf" | "application/x-pdf" => DocumentKind::Pdf,
        "image/png" => DocumentKind::Image(ImageFormat::Png),
        "image/jpeg" | "image/jpg" | "image/pjpeg" => DocumentKind::Image(ImageFormat::Jpeg),
        "image/tiff" | "image/tif" => DocumentKind::Image(ImageFormat::Tiff),
        "image/bmp" | "image/x-ms-bmp" => DocumentKind::Image(ImageFormat::Bmp),
        "image/webp" => DocumentKind::Image(ImageFormat::Webp),
        "image/gif" => DocumentKind::Image(ImageFormat::Gif),
        _ => return None,
    };
    Some(kind)
}

/// Reconcile sniffed bytes with the caller's MIME hint.
///
/// The byte signature wins when both are known and disagree; the hint is
/// only used when the bytes carry no recognizable signature.
pub fn resolve_kind(data: &[u8], mime_hint: Option<&str>) -> Result<DocumentKind> {
    match detect_kind_from_bytes(data) {
        Ok(kind) => {
            if let Some(hinted) = mime_hint.and_then(kind_from_mime) {
                if hinted != kind {
                    log::warn!(
                        "MIME hint says {} but content looks like {}; trusting content",
                        hinted,
                        kind
                    );
                }
            }
            Ok(kind)
        }
        Err(e) => mime_hint.and_then(kind_from_mime).ok_or(e),
    }
}

/// Check if bytes start with a PDF header.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    matches!(detect_kind_from_bytes(data), Ok(DocumentKind::Pdf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_pdf() {
        let data = b"%PDF-1.7\n%\xe2\xe3\xcf\xd3";
        assert_eq!(detect_kind_from_bytes(data).unwrap(), DocumentKind::Pdf);
    }

    #[test]
    fn test_detect_images() {
        assert_eq!(
            detect_kind_from_bytes(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR").unwrap(),
            DocumentKind::Image(ImageFormat::Png)
        );
        assert_eq!(
            detect_kind_from_bytes(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10]).unwrap(),
            DocumentKind::Image(ImageFormat::Jpeg)
        );
        assert_eq!(
            detect_kind_from_bytes(b"RIFF\x24\0\0\0WEBPVP8 ").unwrap(),
            DocumentKind::Image(ImageFormat::Webp)
        );
    }

    #[test]
    fn test_detect_unknown() {
        let result = detect_kind_from_bytes(b"<!DOCTYPE html>");
        assert!(matches!(result, Err(Error::UnknownFormat)));

        let result = detect_kind_from_bytes(b"%PD");
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_kind_from_mime() {
        assert_eq!(kind_from_mime("application/pdf"), Some(DocumentKind::Pdf));
        assert_eq!(
            kind_from_mime("image/JPEG; charset=binary"),
            Some(DocumentKind::Image(ImageFormat::Jpeg))
        );
        assert_eq!(kind_from_mime("text/html"), None);
    }

    #[test]
    fn test_resolve_prefers_content() {
        let kind = resolve_kind(b"%PDF-1.4\n", Some("image/png")).unwrap();
        assert_eq!(kind, DocumentKind::Pdf);
    }

    #[test]
    fn test_resolve_falls_back_to_hint() {
        let kind = resolve_kind(b"\0\0\0\0garbage", Some("application/pdf")).unwrap();
        assert_eq!(kind, DocumentKind::Pdf);
        assert!(resolve_kind(b"\0\0\0\0garbage", None).is_err());
    }

    #[test]
    fn test_is_pdf_bytes() {
        assert!(is_pdf_bytes(b"%PDF-1.4\n"));
        assert!(!is_pdf_bytes(b"Not a PDF"));
    }
}
