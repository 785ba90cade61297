//! Text recognition for PDF pages.
//!
//! Two recognizers are provided: one that reads the embedded text layer and
//! one that rasterises the page with `pdftoppm` and runs `tesseract` on it.

use std::path::{Path, PathBuf};
use std::process::Command;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::ToolConfig;
use crate::document::PdfDocument;

// `tesseract --psm 0` reports e.g. "Rotate: 90"
static ROTATE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^Rotate:\s*(\d+)").unwrap());

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("'{program}' was not found; install it or point the matching DOCBATCH_* variable at it")]
    ProgramNotFound { program: String },

    #[error("'{program}' failed: {stderr}")]
    CommandFailed { program: String, stderr: String },

    #[error("Failed to read page {page} of {path}: {reason}")]
    Unreadable {
        path: PathBuf,
        page: u32,
        reason: String,
    },

    #[error("I/O error during recognition: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of page text for the match-rename engine
pub trait TextRecognizer: Send + Sync {
    /// Text of one page (0-indexed)
    fn recognize(&self, pdf: &Path, page_index: u32) -> Result<String, OcrError>;

    /// Clockwise rotation that would make the page upright, if detectable
    fn detect_orientation(&self, _pdf: &Path, _page_index: u32) -> Result<Option<i64>, OcrError> {
        Ok(None)
    }
}

/// Reads text already embedded in the PDF
#[derive(Debug, Default, Clone)]
pub struct TextLayerRecognizer;

impl TextRecognizer for TextLayerRecognizer {
    fn recognize(&self, pdf: &Path, page_index: u32) -> Result<String, OcrError> {
        let unreadable = |reason: String| OcrError::Unreadable {
            path: pdf.to_path_buf(),
            page: page_index + 1,
            reason,
        };

        let doc = PdfDocument::open(pdf).map_err(|e| unreadable(e.to_string()))?;
        doc.page_text(page_index).map_err(|e| unreadable(e.to_string()))
    }
}

/// Rasterises with pdftoppm and recognises with tesseract
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    pdftoppm: String,
    tesseract: String,
    language: String,
    dpi: u32,
}

impl TesseractRecognizer {
    pub fn new(config: &ToolConfig) -> Self {
        Self {
            pdftoppm: config.pdftoppm.clone(),
            tesseract: config.tesseract.clone(),
            language: config.ocr_language.clone(),
            dpi: config.ocr_dpi,
        }
    }

    /// Render one page to a PNG inside `dir`
    fn render(&self, pdf: &Path, page_index: u32, dir: &Path) -> Result<PathBuf, OcrError> {
        let page = (page_index + 1).to_string();
        let prefix = dir.join("page");

        let mut command = Command::new(&self.pdftoppm);
        command
            .args(["-png", "-singlefile", "-f", page.as_str(), "-l", page.as_str(), "-r"])
            .arg(self.dpi.to_string())
            .arg(pdf)
            .arg(&prefix);
        run(&self.pdftoppm, &mut command)?;

        let image = prefix.with_extension("png");
        if !image.exists() {
            return Err(OcrError::Unreadable {
                path: pdf.to_path_buf(),
                page: page_index + 1,
                reason: "renderer produced no image".to_string(),
            });
        }

        trace!(image = ?image, "Rendered page");
        Ok(image)
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, pdf: &Path, page_index: u32) -> Result<String, OcrError> {
        let dir = tempfile::tempdir()?;
        let image = self.render(pdf, page_index, dir.path())?;

        let mut command = Command::new(&self.tesseract);
        command
            .arg(&image)
            .arg("stdout")
            .args(["-l", self.language.as_str()]);
        let text = run(&self.tesseract, &mut command)?;

        debug!(path = ?pdf, page = page_index, chars = text.chars().count(), "Recognized page");
        Ok(text)
    }

    fn detect_orientation(&self, pdf: &Path, page_index: u32) -> Result<Option<i64>, OcrError> {
        let dir = tempfile::tempdir()?;
        let image = self.render(pdf, page_index, dir.path())?;

        let mut command = Command::new(&self.tesseract);
        command.arg(&image).arg("stdout").args(["--psm", "0"]);
        let report = run(&self.tesseract, &mut command)?;

        Ok(parse_rotation(&report))
    }
}

/// Extract the `Rotate:` angle from an orientation report
pub fn parse_rotation(report: &str) -> Option<i64> {
    ROTATE_REGEX
        .captures(report)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Run an external program and return its stdout
pub(crate) fn run(program: &str, command: &mut Command) -> Result<String, OcrError> {
    let output = command.output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            OcrError::ProgramNotFound {
                program: program.to_string(),
            }
        } else {
            OcrError::Io(e)
        }
    })?;

    if !output.status.success() {
        return Err(OcrError::CommandFailed {
            program: program.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
