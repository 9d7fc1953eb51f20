use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::pipeline::extraction::ExtractionError;

/// Media types accepted for OCR ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupportedMediaType {
    Pdf,
    Png,
    Jpeg,
}

impl SupportedMediaType {
    /// Exact-match lookup of a declared media type. `image/jpg` is accepted
    /// as an alias of `image/jpeg` for non-standard clients.
    pub fn parse(declared: &str) -> Option<Self> {
        match declared {
            "application/pdf" => Some(Self::Pdf),
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// Canonical media type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// Decoder format for single-image types; `None` for PDF.
    pub fn image_format(&self) -> Option<image::ImageFormat> {
        match self {
            Self::Pdf => None,
            Self::Png => Some(image::ImageFormat::Png),
            Self::Jpeg => Some(image::ImageFormat::Jpeg),
        }
    }
}

/// Allow-list check run before any byte of the file is read.
///
/// Pure and synchronous. The declared type is trusted after this check: a
/// declared-vs-actual mismatch surfaces later as a decode failure.
pub fn validate_media_type(declared: &str) -> Result<SupportedMediaType, ExtractionError> {
    SupportedMediaType::parse(declared)
        .ok_or_else(|| ExtractionError::UnsupportedType(declared.to_string()))
}

/// Sanitize a filename: strip path components, limit length
pub fn sanitize_filename(original: &str) -> String {
    let name = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");

    let clean: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .filter(|c| *c != '\0')
        .take(255)
        .collect();

    if clean.is_empty() || clean == "." || clean == ".." {
        "document".to_string()
    } else {
        clean
    }
}
