//! Office document to PDF conversion through LibreOffice.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::debug;

use crate::config::ToolConfig;
use crate::ocr::{run, OcrError};

/// Word documents picked up by folder conversion
pub const WORD_EXTENSIONS: [&str; 2] = ["doc", "docx"];
/// Spreadsheets picked up by folder conversion
pub const EXCEL_EXTENSIONS: [&str; 2] = ["xls", "xlsx"];

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Converter unavailable: {0}")]
    Unavailable(String),

    #[error("Conversion of {path} failed: {reason}")]
    Failed { path: PathBuf, reason: String },

    #[error("Converter reported success but {expected} was not produced")]
    MissingOutput { expected: PathBuf },

    #[error("I/O error during conversion: {0}")]
    Io(#[from] std::io::Error),
}

impl From<OcrError> for ConvertError {
    fn from(err: OcrError) -> Self {
        match err {
            OcrError::ProgramNotFound { .. } => ConvertError::Unavailable(err.to_string()),
            OcrError::Io(e) => ConvertError::Io(e),
            other => ConvertError::Failed {
                path: PathBuf::new(),
                reason: other.to_string(),
            },
        }
    }
}

pub trait OfficeConverter: Send + Sync {
    fn convert_to_pdf(&self, source: &Path, output: &Path) -> Result<(), ConvertError>;
}

/// PDF path produced for a converted file: same location, `.pdf` extension
pub fn pdf_target(source: &Path) -> PathBuf {
    source.with_extension("pdf")
}

/// Runs `soffice --headless --convert-to pdf`
#[derive(Debug, Clone)]
pub struct SofficeConverter {
    program: String,
}

impl SofficeConverter {
    pub fn new(config: &ToolConfig) -> Self {
        Self {
            program: config.soffice.clone(),
        }
    }
}

impl OfficeConverter for SofficeConverter {
    fn convert_to_pdf(&self, source: &Path, output: &Path) -> Result<(), ConvertError> {
        let out_dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&out_dir)?;

        let mut command = Command::new(&self.program);
        command
            .args(["--headless", "--convert-to", "pdf", "--outdir"])
            .arg(&out_dir)
            .arg(source);
        run(&self.program, &mut command).map_err(|e| match ConvertError::from(e) {
            ConvertError::Failed { reason, .. } => ConvertError::Failed {
                path: source.to_path_buf(),
                reason,
            },
            other => other,
        })?;

        // soffice always names its output after the source stem
        let produced = out_dir.join(pdf_target(source).file_name().unwrap_or_default());
        if !produced.exists() {
            return Err(ConvertError::MissingOutput { expected: produced });
        }
        if produced != output {
            fs::rename(&produced, output)?;
        }

        debug!(source = ?source, output = ?output, "Converted to PDF");
        Ok(())
    }
}
