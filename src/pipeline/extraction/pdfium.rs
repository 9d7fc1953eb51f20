//! PDF page rendering via Google PDFium.
//!
//! `PdfiumRenderer` is stateless (`Send + Sync`). Each operation creates
//! a fresh `Pdfium` instance because the upstream type is `!Send`.
//! The OS caches `dlopen`/`LoadLibrary` calls, so repeat loads are near-free.

use std::io::Cursor;

use image::ImageOutputFormat;
use pdfium_render::prelude::*;
use tracing::{debug, warn};

use super::types::PdfPageRenderer;
use super::ExtractionError;
use crate::pipeline_config::DEFAULT_MAX_DIMENSION_PX;

/// PDF points per inch (standard PDF unit).
const POINTS_PER_INCH: f32 = 72.0;

/// Renders PDF pages to PNG images using Google PDFium.
pub struct PdfiumRenderer {
    max_dimension_px: u32,
}

impl Default for PdfiumRenderer {
    fn default() -> Self {
        Self {
            max_dimension_px: DEFAULT_MAX_DIMENSION_PX,
        }
    }
}

impl PdfiumRenderer {
    /// The library is bound lazily on each call; a missing PDFium surfaces
    /// as a decode failure for PDF inputs only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that the PDFium library can be loaded.
    pub fn probe() -> Result<(), ExtractionError> {
        load_pdfium().map(|_| ())
    }

    pub fn with_max_dimension(mut self, max_dimension_px: u32) -> Self {
        self.max_dimension_px = max_dimension_px.max(1);
        self
    }
}

/// Load the PDFium dynamic library.
///
/// Discovery order:
/// 1. `PDFIUM_DYNAMIC_LIB_PATH` env var (explicit path)
/// 2. Alongside the running executable, then `<exe_dir>/pdfium/lib`
/// 3. System library search paths
fn load_pdfium() -> Result<Pdfium, ExtractionError> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        debug!(path = %path, "Loading PDFium from env var");
        let bindings = Pdfium::bind_to_library(&path).map_err(|e| {
            ExtractionError::decode(format!("Failed to load PDFium from {path}: {e}"))
        })?;
        return Ok(Pdfium::new(bindings));
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(exe_dir) = exe.parent() {
            let candidates = [exe_dir.to_path_buf(), exe_dir.join("pdfium").join("lib")];

            for dir in &candidates {
                let lib_path =
                    Pdfium::pdfium_platform_library_name_at_path(dir.to_string_lossy().as_ref());
                if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
                    debug!(dir = %dir.display(), "Loaded PDFium from candidate directory");
                    return Ok(Pdfium::new(bindings));
                }
            }
        }
    }

    let bindings = Pdfium::bind_to_system_library().map_err(|e| {
        ExtractionError::decode(format!(
            "PDFium library not found. Set PDFIUM_DYNAMIC_LIB_PATH or install PDFium: {e}"
        ))
    })?;
    Ok(Pdfium::new(bindings))
}

/// Map PDF load errors; encrypted documents get a readable message.
fn map_load_error(e: PdfiumError) -> ExtractionError {
    let msg = format!("{e}");
    let lower = msg.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") {
        ExtractionError::decode("PDF is password-protected")
    } else {
        ExtractionError::decode(format!("Failed to load PDF: {e}"))
    }
}

/// Compute pixel dimensions for rendering, applying the dimension guard.
///
/// Returns (width_px, height_px), both clamped to [1, max_dim].
/// Preserves aspect ratio when capping.
fn compute_render_dimensions(
    width_points: f32,
    height_points: f32,
    dpi: u32,
    max_dim: u32,
) -> (u32, u32) {
    let scale = dpi as f32 / POINTS_PER_INCH;
    let raw_w = (width_points * scale).max(1.0);
    let raw_h = (height_points * scale).max(1.0);

    let largest = raw_w.max(raw_h);
    if largest > max_dim as f32 {
        let ratio = max_dim as f32 / largest;
        let w = ((raw_w * ratio) as u32).clamp(1, max_dim);
        let h = ((raw_h * ratio) as u32).clamp(1, max_dim);
        (w, h)
    } else {
        (raw_w as u32, raw_h as u32)
    }
}

impl PdfPageRenderer for PdfiumRenderer {
    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
        let pdfium = load_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(map_load_error)?;
        Ok(document.pages().len() as usize)
    }

    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_index: usize,
        dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError> {
        let page_number = page_index + 1;
        let pdfium = load_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(map_load_error)?;

        let pages = document.pages();

        let index = u16::try_from(page_index).map_err(|_| {
            ExtractionError::decode_page(page_number, format!("Page index {page_index} exceeds u16 maximum"))
        })?;

        let page = pages.get(index).map_err(|_| {
            ExtractionError::decode_page(
                page_number,
                format!("Page {page_number} out of range (document has {} pages)", pages.len()),
            )
        })?;

        let width_points = page.width().value;
        let height_points = page.height().value;
        let (target_w, target_h) =
            compute_render_dimensions(width_points, height_points, dpi, self.max_dimension_px);

        let uncapped_w = (width_points * dpi as f32 / POINTS_PER_INCH) as u32;
        let uncapped_h = (height_points * dpi as f32 / POINTS_PER_INCH) as u32;
        if target_w != uncapped_w || target_h != uncapped_h {
            warn!(
                page = page_number,
                raw_width = uncapped_w,
                raw_height = uncapped_h,
                capped_width = target_w,
                capped_height = target_h,
                "Page dimensions capped to {}px",
                self.max_dimension_px,
            );
        }

        let config = PdfRenderConfig::new()
            .set_target_width(target_w as i32)
            .set_maximum_height(target_h as i32);

        let bitmap = page.render_with_config(&config).map_err(|e| {
            ExtractionError::decode_page(page_number, format!("Rendering failed: {e}"))
        })?;

        let mut cursor = Cursor::new(Vec::new());
        bitmap
            .as_image()
            .write_to(&mut cursor, ImageOutputFormat::Png)
            .map_err(|e| ExtractionError::decode_page(page_number, format!("PNG encoding failed: {e}")))?;

        let png_bytes = cursor.into_inner();

        debug!(
            page = page_number,
            width = target_w,
            height = target_h,
            png_size = png_bytes.len(),
            "Rendered PDF page to PNG"
        );

        Ok(png_bytes)
    }
}

// ── Mock for testing ──────────────────────────────────────

/// Mock PDF page renderer returning a small PNG for each valid page.
///
/// Used by rasterizer and orchestrator tests that need a PdfPageRenderer
/// without requiring the actual PDFium binary.
pub struct MockPdfPageRenderer {
    page_count: usize,
}

impl MockPdfPageRenderer {
    pub fn new(page_count: usize) -> Self {
        Self { page_count }
    }
}

impl PdfPageRenderer for MockPdfPageRenderer {
    fn page_count(&self, _pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
        Ok(self.page_count)
    }

    fn render_page(
        &self,
        _pdf_bytes: &[u8],
        page_index: usize,
        _dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError> {
        if page_index >= self.page_count {
            return Err(ExtractionError::decode_page(
                page_index + 1,
                format!("Page {} out of range (mock has {} pages)", page_index + 1, self.page_count),
            ));
        }
        Ok(shaded_png(page_index))
    }
}

/// 8x8 grayscale PNG whose shade encodes the page index.
pub(crate) fn shaded_png(page_index: usize) -> Vec<u8> {
    let shade = (page_index % 256) as u8;
    let img = image::GrayImage::from_pixel(8, 8, image::Luma([shade]));
    let mut cursor = Cursor::new(Vec::new());
    // Encoding an in-memory 8x8 buffer cannot fail
    let _ = image::DynamicImage::ImageLuma8(img).write_to(&mut cursor, ImageOutputFormat::Png);
    cursor.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: u32 = DEFAULT_MAX_DIMENSION_PX;

    #[test]
    fn a4_at_300dpi() {
        let (w, h) = compute_render_dimensions(595.0, 842.0, 300, MAX);
        // 595 * 300/72 ~ 2479, 842 * 300/72 ~ 3508
        assert!(w > 2400 && w < 2550, "A4 width at 300dpi: got {w}");
        assert!(h > 3450 && h < 3600, "A4 height at 300dpi: got {h}");
    }

    #[test]
    fn letter_at_300dpi() {
        // US Letter = 612 x 792 points
        let (w, h) = compute_render_dimensions(612.0, 792.0, 300, MAX);
        assert!((2548..=2550).contains(&w), "Letter width at 300dpi: got {w}");
        assert!((3298..=3300).contains(&h), "Letter height at 300dpi: got {h}");
    }

    #[test]
    fn dimension_guard_caps_oversized() {
        let (w, h) = compute_render_dimensions(5000.0, 7000.0, 300, MAX);
        assert!(w <= MAX && h <= MAX, "Got {w}x{h}");
        assert!(w >= 1 && h >= 1);
    }

    #[test]
    fn dimension_guard_preserves_aspect_ratio() {
        let (w, h) = compute_render_dimensions(5000.0, 10000.0, 300, MAX);
        let ratio = h as f32 / w as f32;
        assert!((ratio - 2.0).abs() < 0.15, "Aspect ratio should be ~2:1, got {ratio}");
    }

    #[test]
    fn zero_points_clamped_to_1() {
        let (w, h) = compute_render_dimensions(0.0, 0.0, 300, MAX);
        assert!(w >= 1 && h >= 1);
    }

    #[test]
    fn custom_cap_respected() {
        let (w, h) = compute_render_dimensions(595.0, 842.0, 300, 1000);
        assert!(w <= 1000 && h <= 1000, "Got {w}x{h}");
    }

    #[test]
    fn with_max_dimension_never_zero() {
        let renderer = PdfiumRenderer::new().with_max_dimension(0);
        assert_eq!(renderer.max_dimension_px, 1);
    }

    #[test]
    fn mock_returns_png_for_valid_page() {
        let mock = MockPdfPageRenderer::new(3);
        let png = mock.render_page(&[], 0, 300).unwrap();
        assert_eq!(&png[..4], &[0x89, 0x50, 0x4E, 0x47]);
    }

    #[test]
    fn mock_errors_for_out_of_range() {
        let mock = MockPdfPageRenderer::new(2);
        let err = mock.render_page(&[], 2, 300).unwrap_err();
        assert!(matches!(err, ExtractionError::DecodeFailure { page: Some(3), .. }));
    }

    #[test]
    fn shaded_png_decodes() {
        let png = shaded_png(7);
        let img = image::load_from_memory(&png).unwrap().to_luma8();
        assert_eq!(img.get_pixel(0, 0)[0], 7);
    }
}
