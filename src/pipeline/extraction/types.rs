use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ExtractionError;
use crate::pipeline::import::format::SupportedMediaType;

/// Result of text extraction from a single document.
///
/// `text` may be empty: an unreadable-but-valid page is a success, and
/// placeholder substitution is left to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub text: String,
    /// Two-stage mean of word confidences (0-100), `None` when no page
    /// produced a usable value.
    pub confidence: Option<f64>,
    pub page_count: usize,
}

/// One rasterized page, PNG-encoded. `page_number` is 1-based.
#[derive(Debug, Clone)]
pub struct RasterPage {
    pub page_number: usize,
    pub png: Vec<u8>,
}

/// Confidence reported by the engine for one recognized word.
///
/// Engines use negative numbers for "no confidence available"; those are
/// carried as `None` and never reach the aggregator as numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WordConfidence(Option<f32>);

impl WordConfidence {
    pub fn unavailable() -> Self {
        Self(None)
    }

    /// Map a raw engine value, treating negatives and non-finite values as
    /// sentinels.
    pub fn from_engine(raw: f32) -> Self {
        if !raw.is_finite() || raw < 0.0 {
            Self::unavailable()
        } else {
            Self(Some(raw))
        }
    }

    pub fn usable(&self) -> Option<f32> {
        self.0
    }
}

/// Raw OCR result for one page. Text and confidences come from the same
/// recognition pass.
#[derive(Debug, Clone, Default)]
pub struct OcrPageResult {
    pub text: String,
    pub word_confidences: Vec<WordConfidence>,
}

/// Ordered, finite, single-consumption sequence of pages.
pub type RasterPages<'a> = Box<dyn Iterator<Item = Result<RasterPage, ExtractionError>> + Send + 'a>;

/// Converts a stored document into page images.
pub trait PageRasterizer {
    fn rasterize<'a>(
        &'a self,
        path: &Path,
        media_type: SupportedMediaType,
    ) -> Result<RasterPages<'a>, ExtractionError>;
}

/// Renders individual PDF pages to PNG. `page_index` is 0-based.
pub trait PdfPageRenderer {
    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError>;

    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_index: usize,
        dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError>;
}

/// OCR engine abstraction (allows swapping engines and mocking for tests).
pub trait OcrEngine {
    fn recognize(&self, page: &RasterPage) -> Result<OcrPageResult, ExtractionError>;
}

/// Main extraction entry point.
pub trait TextExtractor {
    fn extract(&self, path: &Path, declared_type: &str) -> Result<ExtractionResult, ExtractionError>;
}
