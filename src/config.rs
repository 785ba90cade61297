use std::env;

/// Environment variable names for external tool configuration
pub const ENV_PDFTOPPM: &str = "DOCBATCH_PDFTOPPM";
pub const ENV_TESSERACT: &str = "DOCBATCH_TESSERACT";
pub const ENV_OCR_LANG: &str = "DOCBATCH_OCR_LANG";
pub const ENV_OCR_DPI: &str = "DOCBATCH_OCR_DPI";
pub const ENV_SOFFICE: &str = "DOCBATCH_SOFFICE";

const DEFAULT_OCR_DPI: u32 = 300;

/// Programs and settings for the OCR and office-conversion collaborators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    pub pdftoppm: String,
    pub tesseract: String,
    pub ocr_language: String,
    pub ocr_dpi: u32,
    pub soffice: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            pdftoppm: "pdftoppm".to_string(),
            tesseract: "tesseract".to_string(),
            ocr_language: "chi_sim".to_string(),
            ocr_dpi: DEFAULT_OCR_DPI,
            soffice: "soffice".to_string(),
        }
    }
}

impl ToolConfig {
    /// Load configuration from environment variables, falling back to defaults
    ///
    /// These can be set in a `.env` file in the working directory.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |name: &str, default: String| {
            env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(default)
        };

        Self {
            pdftoppm: var(ENV_PDFTOPPM, defaults.pdftoppm),
            tesseract: var(ENV_TESSERACT, defaults.tesseract),
            ocr_language: var(ENV_OCR_LANG, defaults.ocr_language),
            ocr_dpi: env::var(ENV_OCR_DPI)
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .filter(|dpi| *dpi > 0)
                .unwrap_or(defaults.ocr_dpi),
            soffice: var(ENV_SOFFICE, defaults.soffice),
        }
    }
}
