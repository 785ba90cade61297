mod codes;

pub use codes::ExitCode;

use crate::batch::BatchError;
use crate::classify::RuleError;
use crate::range::RangeError;
use crate::relocate::MoveError;
use crate::rename::RenameError;
use crate::scanner::ScannerError;
use crate::template::TemplateError;
use std::path::PathBuf;
use thiserror::Error;

/// Problems with the job description itself; reported before any work starts
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid naming template: {0}")]
    Template(#[from] TemplateError),

    #[error("Invalid page range: {0}")]
    Range(#[from] RangeError),

    #[error("Invalid classification rules: {0}")]
    Rule(RuleError),

    #[error("{0}")]
    Pattern(String),

    #[error("{0}")]
    Selection(String),

    #[error("Missing required {0}")]
    MissingField(&'static str),

    #[error("Failed to read {path}: {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Source not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("No input files found")]
    NoInputFiles {
        sources: Vec<PathBuf>,
        extensions: Vec<String>,
    },

    #[error("Another job is still running")]
    JobBusy,

    #[error("Report error: {message}")]
    Report { path: PathBuf, message: String },

    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            AppError::Config(_) => ExitCode::ConfigError,
            AppError::DirectoryNotFound { .. } => ExitCode::DirectoryNotFound,
            AppError::NotADirectory { .. } => ExitCode::DirectoryNotFound,
            AppError::PermissionDenied { .. } => ExitCode::PermissionError,
            AppError::NoInputFiles { .. } => ExitCode::NoInputFiles,
            AppError::JobBusy => ExitCode::JobBusy,
            AppError::Report { .. } => ExitCode::ReportError,
            AppError::Other(_) => ExitCode::GeneralError,
        }
    }

    pub fn detailed_message(&self) -> String {
        match self {
            AppError::Config(err) => {
                format!(
                    "{}\n\n\
                     The job was not started. Fix the options above and try again.",
                    err
                )
            }

            AppError::DirectoryNotFound { path } => {
                format!(
                    "The specified path does not exist:\n  {}\n\n\
                     Please verify the path and try again.",
                    path.display()
                )
            }

            AppError::NotADirectory { path } => {
                format!(
                    "The specified path is not a directory:\n  {}\n\n\
                     Please provide a valid directory path.",
                    path.display()
                )
            }

            AppError::PermissionDenied { path } => {
                format!(
                    "Permission denied when accessing:\n  {}\n\n\
                     Please check file permissions or run with appropriate privileges.",
                    path.display()
                )
            }

            AppError::NoInputFiles {
                sources,
                extensions,
            } => {
                let mut msg = String::from("No matching files were found in:\n");
                for source in sources.iter().take(10) {
                    msg.push_str(&format!("  - {}\n", source.display()));
                }
                if sources.len() > 10 {
                    msg.push_str(&format!("  ... and {} more\n", sources.len() - 10));
                }
                if !extensions.is_empty() {
                    msg.push_str(&format!("\nLooked for: {}\n", extensions.join(", ")));
                }
                msg
            }

            AppError::JobBusy => "Another job is still running.\n\n\
                 Wait for it to finish before starting a new one."
                .to_string(),

            AppError::Report { path, message } => {
                format!(
                    "Failed to write the job report:\n  {}\n  {}\n\n\
                     The job itself has completed; only the report is missing.",
                    path.display(),
                    message
                )
            }

            AppError::Other(message) => message.clone(),
        }
    }
}

impl From<ScannerError> for AppError {
    fn from(err: ScannerError) -> Self {
        match err {
            ScannerError::PathNotFound(path) => AppError::DirectoryNotFound { path },
            ScannerError::NotADirectory(path) => AppError::NotADirectory { path },
            ScannerError::PermissionDenied(path) => AppError::PermissionDenied { path },
            ScannerError::IoError(e) => AppError::Other(format!("I/O error: {}", e)),
        }
    }
}

impl From<RuleError> for AppError {
    fn from(err: RuleError) -> Self {
        match err {
            RuleError::RootNotFound(path) => AppError::DirectoryNotFound { path },
            other => AppError::Config(ConfigError::Rule(other)),
        }
    }
}

impl From<RenameError> for AppError {
    fn from(err: RenameError) -> Self {
        match err {
            RenameError::InvalidPattern { .. } => {
                AppError::Config(ConfigError::Pattern(err.to_string()))
            }
            RenameError::Template(e) => AppError::Config(ConfigError::Template(e)),
            other => AppError::Other(other.to_string()),
        }
    }
}

impl From<MoveError> for AppError {
    fn from(err: MoveError) -> Self {
        match err {
            MoveError::SelectionMismatch { .. } => {
                AppError::Config(ConfigError::Selection(err.to_string()))
            }
            other => AppError::Other(other.to_string()),
        }
    }
}

impl From<TemplateError> for AppError {
    fn from(err: TemplateError) -> Self {
        AppError::Config(ConfigError::Template(err))
    }
}

impl From<RangeError> for AppError {
    fn from(err: RangeError) -> Self {
        AppError::Config(ConfigError::Range(err))
    }
}

impl From<BatchError> for AppError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::Busy => AppError::JobBusy,
            other => AppError::Other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let err = AppError::DirectoryNotFound {
            path: PathBuf::from("/test"),
        };
        assert_eq!(err.exit_code(), ExitCode::DirectoryNotFound);

        let err = AppError::Config(ConfigError::MissingField("--pattern"));
        assert_eq!(err.exit_code(), ExitCode::ConfigError);

        let err = AppError::PermissionDenied {
            path: PathBuf::from("/test"),
        };
        assert_eq!(err.exit_code(), ExitCode::PermissionError);

        assert_eq!(AppError::JobBusy.exit_code(), ExitCode::JobBusy);
    }

    #[test]
    fn test_detailed_message_includes_context() {
        let err = AppError::NoInputFiles {
            sources: vec![PathBuf::from("dir1"), PathBuf::from("dir2")],
            extensions: vec!["pdf".to_string()],
        };

        let msg = err.detailed_message();
        assert!(msg.contains("dir1"));
        assert!(msg.contains("dir2"));
        assert!(msg.contains("Looked for: pdf"));
    }

    #[test]
    fn test_template_error_is_config_error() {
        let err: AppError = TemplateError::UnbalancedBraces { position: 3 }.into();
        assert_eq!(err.exit_code(), ExitCode::ConfigError);
        assert!(err.detailed_message().contains("not started"));
    }

    #[test]
    fn test_rule_errors_split_between_config_and_fatal() {
        let fatal: AppError = RuleError::RootNotFound(PathBuf::from("/missing")).into();
        assert_eq!(fatal.exit_code(), ExitCode::DirectoryNotFound);

        let config: AppError = RuleError::MissingGlobs {
            line: 1,
            text: "docs".to_string(),
        }
        .into();
        assert_eq!(config.exit_code(), ExitCode::ConfigError);
    }

    #[test]
    fn test_selection_mismatch_is_config_error() {
        let err: AppError = MoveError::SelectionMismatch {
            files: 2,
            destinations: 1,
        }
        .into();
        assert_eq!(err.exit_code(), ExitCode::ConfigError);
    }

    #[test]
    fn test_busy_runner() {
        let err: AppError = BatchError::Busy.into();
        assert_eq!(err.exit_code(), ExitCode::JobBusy);
    }

    #[test]
    fn test_scanner_error_conversion() {
        let scanner_err = ScannerError::PathNotFound(PathBuf::from("/missing"));
        let app_err: AppError = scanner_err.into();
        assert_eq!(app_err.exit_code(), ExitCode::DirectoryNotFound);
    }
}
