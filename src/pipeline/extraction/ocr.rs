use std::path::{Path, PathBuf};
use std::process::Command;

use super::types::{OcrEngine, OcrPageResult, RasterPage, WordConfidence};
use super::ExtractionError;
use crate::pipeline_config::PipelineConfig;

/// Tesseract OCR engine driven through its command-line interface.
///
/// Each page is recognized by a single process invocation that writes both
/// the plain-text and the TSV renderer outputs, so text and word
/// confidences always come from the same recognition pass. Calls share no
/// state and may run concurrently.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    command: PathBuf,
    languages: String,
    dpi: u32,
}

impl TesseractEngine {
    pub fn new(command: impl Into<PathBuf>, languages: &str, dpi: u32) -> Self {
        Self {
            command: command.into(),
            languages: languages.to_string(),
            dpi,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(&config.tesseract_cmd, &config.ocr_languages, config.render_dpi)
    }

    pub fn languages(&self) -> &str {
        &self.languages
    }

    /// First line of `tesseract --version`, or `None` if the binary cannot run.
    pub fn version(&self) -> Option<String> {
        let output = Command::new(&self.command).arg("--version").output().ok()?;
        if !output.status.success() {
            return None;
        }
        // Older releases print the banner on stderr
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        stdout
            .lines()
            .chain(stderr.lines())
            .find(|l| !l.trim().is_empty())
            .map(|l| l.trim().to_string())
    }

    fn run(&self, page: &RasterPage, work_dir: &Path) -> Result<OcrPageResult, String> {
        let input = work_dir.join("page.png");
        std::fs::write(&input, &page.png).map_err(|e| format!("Failed to stage page image: {e}"))?;

        let out_base = work_dir.join("out");
        let output = Command::new(&self.command)
            .arg(&input)
            .arg(&out_base)
            .arg("-l")
            .arg(&self.languages)
            .arg("--dpi")
            .arg(self.dpi.to_string())
            .arg("txt")
            .arg("tsv")
            .output()
            .map_err(|e| format!("Failed to run {}: {e}", self.command.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            ));
        }

        let text = std::fs::read_to_string(out_base.with_extension("txt"))
            .map_err(|e| format!("Missing text output: {e}"))?;
        let tsv = std::fs::read_to_string(out_base.with_extension("tsv"))
            .map_err(|e| format!("Missing TSV output: {e}"))?;

        Ok(OcrPageResult {
            text: text.replace('\x0c', ""),
            word_confidences: parse_tsv_word_confidences(&tsv),
        })
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, page: &RasterPage) -> Result<OcrPageResult, ExtractionError> {
        let engine_failure = |detail: String| ExtractionError::EngineFailure {
            page: page.page_number,
            detail,
        };

        let work_dir = tempfile::Builder::new()
            .prefix("clinnotes-ocr-")
            .tempdir()
            .map_err(|e| engine_failure(format!("Failed to create work directory: {e}")))?;

        let result = self.run(page, work_dir.path()).map_err(engine_failure)?;

        tracing::debug!(
            page = page.page_number,
            words = result.word_confidences.len(),
            text_length = result.text.len(),
            "Tesseract page recognized"
        );

        Ok(result)
    }
}

/// Mock OCR engine for unit testing without Tesseract.
/// Returns the same text and confidences for every page.
pub struct MockOcrEngine {
    pub text: String,
    pub confidences: Vec<f32>,
}

impl MockOcrEngine {
    pub fn new(text: &str, confidences: &[f32]) -> Self {
        Self {
            text: text.to_string(),
            confidences: confidences.to_vec(),
        }
    }
}

impl OcrEngine for MockOcrEngine {
    fn recognize(&self, _page: &RasterPage) -> Result<OcrPageResult, ExtractionError> {
        Ok(OcrPageResult {
            text: self.text.clone(),
            word_confidences: self
                .confidences
                .iter()
                .map(|c| WordConfidence::from_engine(*c))
                .collect(),
        })
    }
}

/// Parse Tesseract TSV output into per-word confidences.
/// TSV columns: level page_num block_num par_num line_num word_num left top width height conf text
/// Level 5 = individual word entries. Confidence is 0-100; -1 means unavailable.
fn parse_tsv_word_confidences(tsv: &str) -> Vec<WordConfidence> {
    let mut results = Vec::new();

    for line in tsv.lines().skip(1) {
        // Skip header row
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        // Level 5 = word
        match fields[0].parse::<i32>() {
            Ok(5) => {}
            _ => continue,
        }

        // Tesseract 4+ prints fractional confidences
        let conf: f32 = match fields[10].trim().parse() {
            Ok(c) => c,
            Err(_) => continue,
        };

        if fields[11].trim().is_empty() {
            continue;
        }

        results.push(WordConfidence::from_engine(conf));
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn page() -> RasterPage {
        RasterPage {
            page_number: 2,
            png: vec![0x89, 0x50, 0x4E, 0x47],
        }
    }

    #[test]
    fn mock_ocr_returns_configured_text() {
        let engine = MockOcrEngine::new("Metformin 500mg", &[92.0, 88.0]);
        let result = engine.recognize(&page()).unwrap();
        assert_eq!(result.text, "Metformin 500mg");
        assert_eq!(result.word_confidences.len(), 2);
        assert_eq!(result.word_confidences[0].usable(), Some(92.0));
    }

    #[test]
    fn mock_ocr_maps_sentinels() {
        let engine = MockOcrEngine::new("BP 120/80", &[-1.0, 75.0]);
        let result = engine.recognize(&page()).unwrap();
        assert_eq!(result.word_confidences[0].usable(), None);
        assert_eq!(result.word_confidences[1].usable(), Some(75.0));
    }

    #[test]
    fn tsv_parser_extracts_word_confidences() {
        let tsv = format!(
            "{HEADER}\n\
             1\t1\t0\t0\t0\t0\t0\t0\t600\t800\t-1\t\n\
             5\t1\t1\t1\t1\t1\t10\t20\t80\t30\t95\tMetformin\n\
             5\t1\t1\t1\t1\t2\t100\t20\t60\t30\t88\t500mg\n\
             5\t1\t1\t1\t2\t1\t10\t60\t120\t30\t72\ttwice"
        );
        let result = parse_tsv_word_confidences(&tsv);
        let values: Vec<Option<f32>> = result.iter().map(|w| w.usable()).collect();
        assert_eq!(values, vec![Some(95.0), Some(88.0), Some(72.0)]);
    }

    #[test]
    fn tsv_parser_reads_fractional_confidence() {
        let tsv = format!("{HEADER}\n5\t1\t1\t1\t1\t1\t10\t20\t80\t30\t96.063751\tSystolic");
        let result = parse_tsv_word_confidences(&tsv);
        assert_eq!(result.len(), 1);
        let value = result[0].usable().unwrap();
        assert!((value - 96.063_75).abs() < 1e-3);
    }

    #[test]
    fn tsv_parser_skips_non_word_levels() {
        // Level 1 = page, 2 = block, 3 = paragraph, 4 = line
        let tsv = format!(
            "{HEADER}\n\
             1\t1\t0\t0\t0\t0\t0\t0\t600\t800\t-1\t\n\
             2\t1\t1\t0\t0\t0\t10\t10\t580\t780\t-1\t\n\
             3\t1\t1\t1\t0\t0\t10\t10\t580\t780\t-1\t\n\
             4\t1\t1\t1\t1\t0\t10\t20\t200\t30\t-1\t\n\
             5\t1\t1\t1\t1\t1\t10\t20\t80\t30\t90\tBlood"
        );
        let result = parse_tsv_word_confidences(&tsv);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].usable(), Some(90.0));
    }

    #[test]
    fn tsv_parser_keeps_negative_confidence_as_unavailable() {
        let tsv = format!("{HEADER}\n5\t1\t1\t1\t1\t1\t10\t20\t80\t30\t-1\tgarbled");
        let result = parse_tsv_word_confidences(&tsv);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].usable(), None);
    }

    #[test]
    fn tsv_parser_skips_empty_words() {
        let tsv = format!(
            "{HEADER}\n\
             5\t1\t1\t1\t1\t1\t10\t20\t80\t30\t90\t \n\
             5\t1\t1\t1\t1\t2\t100\t20\t80\t30\t85\tvalid"
        );
        let result = parse_tsv_word_confidences(&tsv);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].usable(), Some(85.0));
    }

    #[test]
    fn tsv_parser_handles_empty_and_header_only() {
        assert!(parse_tsv_word_confidences("").is_empty());
        assert!(parse_tsv_word_confidences(HEADER).is_empty());
    }

    #[test]
    fn tsv_parser_skips_malformed_lines() {
        let tsv = format!(
            "{HEADER}\n\
             too\tfew\tfields\n\
             5\t1\t1\t1\t1\t1\t10\t20\t80\t30\t92\tOK\n\
             notanumber\t1\t1\t1\t1\t1\t10\t20\t80\t30\t50\tbad\n\
             5\t1\t1\t1\t1\t1\t10\t20\t80\t30\tNaNish\tbad"
        );
        let result = parse_tsv_word_confidences(&tsv);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].usable(), Some(92.0));
    }

    #[test]
    fn missing_binary_is_engine_failure_with_page() {
        let engine = TesseractEngine::new("/nonexistent/clinnotes-tesseract", "eng", 300);
        let err = engine.recognize(&page()).unwrap_err();
        assert!(
            matches!(err, ExtractionError::EngineFailure { page: 2, .. }),
            "Expected EngineFailure on page 2, got {err:?}"
        );
    }

    /// Write an executable stand-in for the tesseract CLI into `dir`.
    #[cfg(unix)]
    fn fake_tesseract(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("tesseract");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn cli_run_reads_text_and_tsv_outputs() {
        let tools = tempfile::tempdir().unwrap();
        let args_log = tools.path().join("args.log");
        let script = format!(
            r#"printf '%s\n' "$@" > '{log}'
printf 'Patient: Jane\nBP 120/80\n\f' > "$2.txt"
printf 'level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n' > "$2.tsv"
printf '4\t1\t1\t1\t1\t0\t10\t20\t200\t30\t-1\t\n' >> "$2.tsv"
printf '5\t1\t1\t1\t1\t1\t10\t20\t80\t30\t90\tPatient:\n' >> "$2.tsv"
printf '5\t1\t1\t1\t1\t2\t100\t20\t60\t30\t80\tJane\n' >> "$2.tsv""#,
            log = args_log.display()
        );
        let engine = TesseractEngine::new(fake_tesseract(tools.path(), &script), "eng", 300);

        let result = engine.recognize(&page()).unwrap();

        assert_eq!(result.text, "Patient: Jane\nBP 120/80\n");
        let values: Vec<Option<f32>> = result.word_confidences.iter().map(|w| w.usable()).collect();
        assert_eq!(values, vec![Some(90.0), Some(80.0)]);

        let logged = std::fs::read_to_string(&args_log).unwrap();
        let args: Vec<&str> = logged.lines().collect();
        assert!(args[0].ends_with("page.png"), "input arg: {}", args[0]);
        assert!(args[1].ends_with("out"), "output base arg: {}", args[1]);
        assert_eq!(&args[2..], &["-l", "eng", "--dpi", "300", "txt", "tsv"]);
    }

    #[cfg(unix)]
    #[test]
    fn cli_nonzero_exit_carries_stderr() {
        let tools = tempfile::tempdir().unwrap();
        let engine = TesseractEngine::new(
            fake_tesseract(tools.path(), "echo 'Error: unsupported image' >&2\nexit 1"),
            "eng",
            300,
        );

        let err = engine
            .recognize(&RasterPage {
                page_number: 3,
                png: vec![0x89, 0x50, 0x4E, 0x47],
            })
            .unwrap_err();

        match err {
            ExtractionError::EngineFailure { page, detail } => {
                assert_eq!(page, 3);
                assert!(detail.starts_with("tesseract exited with"), "detail: {detail}");
                assert!(detail.ends_with("Error: unsupported image"), "detail: {detail}");
            }
            other => panic!("Expected EngineFailure, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn cli_missing_output_is_engine_failure() {
        let tools = tempfile::tempdir().unwrap();
        let engine = TesseractEngine::new(fake_tesseract(tools.path(), "exit 0"), "eng", 300);

        let err = engine.recognize(&page()).unwrap_err();
        assert!(
            matches!(&err, ExtractionError::EngineFailure { page: 2, detail } if detail.starts_with("Missing text output")),
            "got {err:?}"
        );
    }

    #[cfg(unix)]
    #[test]
    fn version_reads_first_banner_line() {
        let tools = tempfile::tempdir().unwrap();
        let engine = TesseractEngine::new(
            fake_tesseract(tools.path(), "echo 'tesseract 5.3.0'\necho ' leptonica-1.82.0'"),
            "eng",
            300,
        );
        assert_eq!(engine.version().as_deref(), Some("tesseract 5.3.0"));
    }

    #[test]
    fn missing_binary_has_no_version() {
        let engine = TesseractEngine::new("/nonexistent/clinnotes-tesseract", "eng", 300);
        assert!(engine.version().is_none());
    }

    #[test]
    fn engine_from_config_uses_languages() {
        let config = PipelineConfig {
            ocr_languages: "eng+deu".into(),
            ..PipelineConfig::default()
        };
        let engine = TesseractEngine::from_config(&config);
        assert_eq!(engine.languages(), "eng+deu");
    }
}
