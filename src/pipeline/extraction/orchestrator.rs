use std::path::Path;

use super::confidence::aggregate_confidence;
use super::types::{
    ExtractionResult, OcrEngine, PageRasterizer, PdfPageRenderer, TextExtractor, WordConfidence,
};
use super::rasterize::DocumentRasterizer;
use super::ExtractionError;
use crate::pipeline::import::format::validate_media_type;
use crate::pipeline_config::PipelineConfig;

/// Separator placed between consecutive page texts.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Concrete implementation of the text extractor.
/// Uses trait objects for rasterization and OCR, enabling dependency injection.
pub struct DocumentExtractor {
    rasterizer: Box<dyn PageRasterizer + Send + Sync>,
    ocr_engine: Box<dyn OcrEngine + Send + Sync>,
}

impl DocumentExtractor {
    pub fn new(
        rasterizer: Box<dyn PageRasterizer + Send + Sync>,
        ocr_engine: Box<dyn OcrEngine + Send + Sync>,
    ) -> Self {
        Self {
            rasterizer,
            ocr_engine,
        }
    }

    /// Standard wiring: `DocumentRasterizer` over the given PDF renderer.
    pub fn with_pdf_renderer(
        pdf_renderer: Box<dyn PdfPageRenderer + Send + Sync>,
        ocr_engine: Box<dyn OcrEngine + Send + Sync>,
        config: &PipelineConfig,
    ) -> Self {
        Self::new(
            Box::new(DocumentRasterizer::new(pdf_renderer, config)),
            ocr_engine,
        )
    }
}

impl TextExtractor for DocumentExtractor {
    fn extract(
        &self,
        path: &Path,
        declared_type: &str,
    ) -> Result<ExtractionResult, ExtractionError> {
        // Step 1: Type gate, before the file is touched
        let media_type = validate_media_type(declared_type).inspect_err(|_| {
            tracing::warn!(declared_type, "Rejected unsupported media type");
        })?;

        tracing::info!(media_type = media_type.as_str(), "Starting text extraction");

        // Step 2: Rasterize
        let pages = self.rasterizer.rasterize(path, media_type)?;

        // Step 3: OCR page by page, in order. Each raster buffer is dropped
        // as soon as its OCR call returns.
        let mut page_texts: Vec<String> = Vec::new();
        let mut page_confidences: Vec<Vec<WordConfidence>> = Vec::new();

        for page in pages {
            let page = page?;
            let page_number = page.page_number;

            let ocr = self.ocr_engine.recognize(&page).inspect_err(|e| {
                tracing::warn!(page = page_number, error = %e, "OCR failed, aborting document");
            })?;
            drop(page);

            tracing::debug!(
                page = page_number,
                words = ocr.word_confidences.len(),
                "Page recognized"
            );

            page_texts.push(ocr.text);
            page_confidences.push(ocr.word_confidences);
        }

        // Step 4: Join, then trim the whole document once
        let text = page_texts.join(PAGE_SEPARATOR).trim().to_string();

        // Step 5: Two-stage confidence
        let confidence = aggregate_confidence(&page_confidences);
        let page_count = page_texts.len();

        tracing::info!(
            media_type = media_type.as_str(),
            pages = page_count,
            confidence = ?confidence,
            text_length = text.len(),
            "Text extraction complete"
        );

        Ok(ExtractionResult {
            text,
            confidence,
            page_count,
        })
    }
}
