use std::path::PathBuf;

use thiserror::Error;

/// A contiguous, inclusive, 0-indexed block of pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    pub fn new(start: u32, end: u32) -> Result<Self, RangeError> {
        if end < start {
            return Err(RangeError::Reversed {
                spec: format!("{}-{}", start + 1, end + 1),
            });
        }
        Ok(Self { start, end })
    }

    /// Number of pages covered
    pub fn page_count(&self) -> u32 {
        self.end - self.start + 1
    }

    /// Pull the end back inside a document of `page_count` pages
    pub fn clamp_to(self, page_count: u32) -> Self {
        Self {
            start: self.start,
            end: self.end.min(page_count.saturating_sub(1)).max(self.start),
        }
    }
}

/// A user range spec before the page count is known (1-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeText {
    Whole,
    Pages { first: u32, last: u32 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("Split step must be at least 1")]
    ZeroStep,

    #[error("Invalid page range '{spec}': expected <start>-<end>, a single page or empty")]
    InvalidSpec { spec: String },

    #[error("Invalid page range '{spec}': pages are numbered from 1")]
    ZeroPage { spec: String },

    #[error("Invalid page range '{spec}': end comes before start")]
    Reversed { spec: String },

    #[error("Page {page} is past the end of the document ({page_count} pages)")]
    StartBeyondEnd { page: u32, page_count: u32 },

    #[error("Document has no pages")]
    EmptyDocument,

    #[error("Failed to write {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },
}
