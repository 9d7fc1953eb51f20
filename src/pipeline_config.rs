//! Extraction pipeline tunables.
//!
//! Resolved from environment variables with defaults. None of these affect
//! correctness: DPI trades fidelity for speed, the dimension cap bounds
//! memory, and the OCR settings select the engine binary and language packs.

use std::path::PathBuf;

use serde::Serialize;

/// Reference rasterization resolution for scanned documents.
pub const DEFAULT_RENDER_DPI: u32 = 300;

/// Maximum width or height for a rendered page, in pixels.
pub const DEFAULT_MAX_DIMENSION_PX: u32 = 4096;

/// Maximum accepted input size before decoding is attempted.
pub const DEFAULT_MAX_INPUT_BYTES: u64 = 50 * 1024 * 1024;

pub const DEFAULT_OCR_LANGUAGES: &str = "eng";
pub const DEFAULT_TESSERACT_CMD: &str = "tesseract";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineConfig {
    /// Rasterization resolution for paginated documents.
    pub render_dpi: u32,
    /// Pixel cap applied to rendered pages (aspect ratio preserved).
    pub max_dimension_px: u32,
    /// Inputs larger than this are rejected as undecodable.
    pub max_input_bytes: u64,
    /// Tesseract language list, e.g. "eng" or "eng+fra".
    pub ocr_languages: String,
    /// Tesseract executable (name on PATH or absolute path).
    pub tesseract_cmd: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            render_dpi: DEFAULT_RENDER_DPI,
            max_dimension_px: DEFAULT_MAX_DIMENSION_PX,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            ocr_languages: DEFAULT_OCR_LANGUAGES.to_string(),
            tesseract_cmd: PathBuf::from(DEFAULT_TESSERACT_CMD),
        }
    }
}

impl PipelineConfig {
    /// Build from `CLINNOTES_*` environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let render_dpi = parse_positive(&lookup, "CLINNOTES_RENDER_DPI", defaults.render_dpi);
        let max_dimension_px = parse_positive(
            &lookup,
            "CLINNOTES_MAX_DIMENSION_PX",
            defaults.max_dimension_px,
        );

        let ocr_languages = lookup("CLINNOTES_OCR_LANG")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.ocr_languages);

        let tesseract_cmd = lookup("CLINNOTES_TESSERACT")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.tesseract_cmd);

        Self {
            render_dpi,
            max_dimension_px,
            max_input_bytes: defaults.max_input_bytes,
            ocr_languages,
            tesseract_cmd,
        }
    }
}

fn parse_positive<F>(lookup: &F, key: &str, default: u32) -> u32
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<u32>() {
            Ok(v) if v > 0 => v,
            _ => {
                tracing::warn!(key, value = %raw, default, "Invalid value, using default");
                default
            }
        },
    }
}
