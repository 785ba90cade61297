use std::path::PathBuf;

use thiserror::Error;

/// A named destination bucket and the globs that feed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRule {
    pub bucket: String,
    pub globs: Vec<String>,
}

/// A file matched by a rule, with the name it is copied under
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClassifiedFile {
    pub source: PathBuf,
    /// `<parent dir>-<file name>`, so same-named files from different folders stay apart
    pub display_name: String,
}

/// Everything one bucket will receive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketPlan {
    pub bucket: String,
    pub out_path: PathBuf,
    pub files: Vec<ClassifiedFile>,
}

impl BucketPlan {
    pub fn destination(&self, file: &ClassifiedFile) -> PathBuf {
        self.out_path.join(&file.display_name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("Rule on line {line} has no glob patterns: '{text}'")]
    MissingGlobs { line: usize, text: String },

    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidGlob { pattern: String, reason: String },

    #[error("Classification root not found: {0}")]
    RootNotFound(PathBuf),
}
