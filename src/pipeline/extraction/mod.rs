pub mod types;
pub mod confidence;
pub mod ocr;
pub mod pdfium;
pub mod rasterize;
pub mod orchestrator;

pub use types::*;
pub use confidence::*;
pub use ocr::*;
pub use rasterize::*;
pub use orchestrator::*;

use thiserror::Error;

/// Terminal failure of a single document extraction.
///
/// Every variant aborts the whole document: no partial text is returned.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Unsupported media type: {0}")]
    UnsupportedType(String),

    #[error("Document could not be decoded: {detail}")]
    DecodeFailure { page: Option<usize>, detail: String },

    #[error("OCR engine failed on page {page}: {detail}")]
    EngineFailure { page: usize, detail: String },
}

impl ExtractionError {
    pub(crate) fn decode(detail: impl Into<String>) -> Self {
        Self::DecodeFailure {
            page: None,
            detail: detail.into(),
        }
    }

    pub(crate) fn decode_page(page: usize, detail: impl Into<String>) -> Self {
        Self::DecodeFailure {
            page: Some(page),
            detail: detail.into(),
        }
    }

    /// Stable machine-readable kind, used by the API layer and in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedType(_) => "unsupported_type",
            Self::DecodeFailure { .. } => "decode_failure",
            Self::EngineFailure { .. } => "engine_failure",
        }
    }
}
