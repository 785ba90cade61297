use std::path::PathBuf;

use regex::Regex;
use thiserror::Error;

use crate::template::{NamingTemplate, TemplateError};

/// Rows pasted from a spreadsheet: lines split on newlines, cells on tabs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceTable {
    rows: Vec<Vec<String>>,
    skip_header: bool,
}

impl ReferenceTable {
    /// Parse tab-delimited text; blank lines are dropped
    pub fn parse(text: &str, skip_header: bool) -> Self {
        let rows = text
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.split('\t').map(|cell| cell.trim().to_string()).collect())
            .collect();

        Self { rows, skip_header }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn skip_header(&self) -> bool {
        self.skip_header
    }

    /// Rows eligible for matching, in table order
    pub fn candidates(&self) -> &[Vec<String>] {
        if self.skip_header && !self.rows.is_empty() {
            &self.rows[1..]
        } else {
            &self.rows
        }
    }

    /// Widest row, used to validate templates up front
    pub fn width(&self) -> usize {
        self.candidates().iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.candidates().is_empty()
    }
}

/// Regex searched in page text plus the table column tested against the hit
#[derive(Debug, Clone)]
pub struct MatchRule {
    pattern: Regex,
    match_column: usize,
}

impl MatchRule {
    pub fn new(pattern: &str, match_column: usize) -> Result<Self, RenameError> {
        let pattern = Regex::new(pattern).map_err(|e| RenameError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            pattern,
            match_column,
        })
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn match_column(&self) -> usize {
        self.match_column
    }
}

/// Everything one rename job needs besides the files
#[derive(Debug, Clone)]
pub struct RenameConfig {
    pub rule: MatchRule,
    pub table: ReferenceTable,
    pub template: NamingTemplate,
    /// Page (0-indexed) whose text is matched
    pub page: u32,
}

/// Result of looking a page's text up in the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult<'t> {
    Matched {
        row: &'t [String],
        matched_text: String,
    },
    NoMatch(NoMatchReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoMatchReason {
    /// The pattern did not occur in the text
    PatternNotFound,
    /// The pattern matched but no row's cell is contained in the hit
    NoRow { matched_text: String },
}

impl NoMatchReason {
    pub fn describe(&self) -> String {
        match self {
            NoMatchReason::PatternNotFound => {
                "pattern not found in page text, rename manually".to_string()
            }
            NoMatchReason::NoRow { matched_text } => {
                format!("found '{}' but no table row matches, rename manually", matched_text)
            }
        }
    }
}

/// Per-file progress through the match-rename pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameState {
    Pending,
    TextExtracted(String),
    Matched {
        row: Vec<String>,
        matched_text: String,
    },
    Unmatched(String),
    Renamed {
        to: PathBuf,
        backup: Option<PathBuf>,
    },
    /// Preview run: the rename that would happen
    Planned { to: PathBuf },
    RenameFailed(String),
}

impl RenameState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RenameState::Unmatched(_)
                | RenameState::Renamed { .. }
                | RenameState::Planned { .. }
                | RenameState::RenameFailed(_)
        )
    }
}

#[derive(Error, Debug)]
pub enum RenameError {
    #[error("Invalid match pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Rendered name for {path} is empty")]
    EmptyName { path: PathBuf },

    #[error("Failed to rename '{from}' to '{to}': {source}")]
    FilesystemError {
        from: String,
        to: String,
        #[source]
        source: std::io::Error,
    },
}
