use std::io::Cursor;
use std::path::Path;

use image::ImageOutputFormat;

use super::types::{PageRasterizer, PdfPageRenderer, RasterPage, RasterPages};
use super::ExtractionError;
use crate::pipeline::import::format::SupportedMediaType;
use crate::pipeline_config::PipelineConfig;

/// Turns a stored upload into an ordered sequence of page images.
///
/// Single images yield exactly one page. PDFs are rendered lazily, one page
/// per `next()`, so only the page currently being recognized is held in
/// memory.
pub struct DocumentRasterizer {
    pdf_renderer: Box<dyn PdfPageRenderer + Send + Sync>,
    dpi: u32,
    max_input_bytes: u64,
}

impl DocumentRasterizer {
    pub fn new(pdf_renderer: Box<dyn PdfPageRenderer + Send + Sync>, config: &PipelineConfig) -> Self {
        Self {
            pdf_renderer,
            dpi: config.render_dpi,
            max_input_bytes: config.max_input_bytes,
        }
    }

    fn read_input(&self, path: &Path) -> Result<Vec<u8>, ExtractionError> {
        let size = std::fs::metadata(path)
            .map_err(|e| ExtractionError::decode(format!("Could not read file: {e}")))?
            .len();
        if size > self.max_input_bytes {
            return Err(ExtractionError::decode(format!(
                "File too large: {size} bytes exceeds {} byte limit",
                self.max_input_bytes
            )));
        }
        std::fs::read(path).map_err(|e| ExtractionError::decode(format!("Could not read file: {e}")))
    }
}

impl PageRasterizer for DocumentRasterizer {
    fn rasterize<'a>(
        &'a self,
        path: &Path,
        media_type: SupportedMediaType,
    ) -> Result<RasterPages<'a>, ExtractionError> {
        let bytes = self.read_input(path)?;

        match media_type.image_format() {
            Some(format) => {
                let page = decode_single_image(&bytes, format)?;
                Ok(Box::new(std::iter::once(Ok::<_, ExtractionError>(page))))
            }
            None => {
                let page_count = self.pdf_renderer.page_count(&bytes)?;
                if page_count == 0 {
                    return Err(ExtractionError::decode("PDF has no pages"));
                }
                tracing::debug!(pages = page_count, dpi = self.dpi, "Rasterizing PDF");

                let renderer = &*self.pdf_renderer;
                let dpi = self.dpi;
                Ok(Box::new((0..page_count).map(move |index| {
                    renderer
                        .render_page(&bytes, index, dpi)
                        .map(|png| RasterPage {
                            page_number: index + 1,
                            png,
                        })
                })))
            }
        }
    }
}

/// Decode with the declared format (a signature mismatch fails here) and
/// normalize to PNG for the OCR engine.
fn decode_single_image(
    bytes: &[u8],
    format: image::ImageFormat,
) -> Result<RasterPage, ExtractionError> {
    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ExtractionError::decode_page(1, format!("Failed to decode image: {e}")))?;

    let png = if format == image::ImageFormat::Png {
        bytes.to_vec()
    } else {
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, ImageOutputFormat::Png)
            .map_err(|e| ExtractionError::decode_page(1, format!("PNG encoding failed: {e}")))?;
        cursor.into_inner()
    };

    Ok(RasterPage { page_number: 1, png })
}
