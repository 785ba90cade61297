use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::convert::{ConvertError, OfficeConverter};
use crate::document::DocumentError;
use crate::ocr::{OcrError, TextRecognizer};
use crate::range::{RangeError, RangeText};
use crate::relocate::MoveError;
use crate::rename::RenameConfig;
use crate::template::{NamingTemplate, TemplateError};

/// Kind of work a job performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Split,
    Merge,
    Rename,
    Move,
    Classify,
    Convert,
    Orient,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Split => "split",
            JobKind::Merge => "merge",
            JobKind::Rename => "rename",
            JobKind::Move => "move",
            JobKind::Classify => "classify",
            JobKind::Convert => "convert",
            JobKind::Orient => "orient",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How one source document is cut into parts
#[derive(Debug, Clone)]
pub enum SplitMode {
    /// Fixed number of pages per part, starting at a 0-indexed page
    Regular { step: u32, start: u32 },
    /// One part per user range
    Irregular(Vec<IrregularPart>),
}

/// A user range with an optional per-range name
#[derive(Debug, Clone)]
pub struct IrregularPart {
    pub range: RangeText,
    pub template: Option<NamingTemplate>,
}

/// One unit of work; its variant matches the kind of the job it belongs to
#[derive(Debug, Clone)]
pub enum WorkItem {
    Split {
        source: PathBuf,
        mode: SplitMode,
        template: Option<NamingTemplate>,
        out_dir: Option<PathBuf>,
    },
    Merge {
        sources: Vec<PathBuf>,
        output: PathBuf,
        delete_sources: bool,
    },
    Rename {
        source: PathBuf,
        config: Arc<RenameConfig>,
    },
    Move {
        source: PathBuf,
        dest_dir: PathBuf,
        override_name: Option<String>,
    },
    Copy {
        bucket: String,
        source: PathBuf,
        destination: PathBuf,
    },
    Convert {
        source: PathBuf,
        output: PathBuf,
    },
    Orient {
        source: PathBuf,
    },
}

impl WorkItem {
    /// Short description shown next to the item's outcome
    pub fn label(&self) -> String {
        match self {
            WorkItem::Split { source, .. }
            | WorkItem::Rename { source, .. }
            | WorkItem::Orient { source } => source.display().to_string(),
            WorkItem::Merge { sources, output, .. } => {
                format!("{} files -> {}", sources.len(), output.display())
            }
            WorkItem::Move {
                source, dest_dir, ..
            } => format!("{} -> {}", source.display(), dest_dir.display()),
            WorkItem::Copy {
                bucket, source, ..
            } => format!("[{}] {}", bucket, source.display()),
            WorkItem::Convert { source, .. } => source.display().to_string(),
        }
    }
}

/// A fully validated job, ready to run
#[derive(Debug, Clone)]
pub struct Job {
    pub kind: JobKind,
    pub items: Vec<WorkItem>,
}

impl Job {
    pub fn new(kind: JobKind, items: Vec<WorkItem>) -> Self {
        Self { kind, items }
    }

    pub fn labels(&self) -> Vec<String> {
        self.items.iter().map(WorkItem::label).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Collaborators and switches shared by every item of a job
pub struct JobContext {
    pub recognizer: Box<dyn TextRecognizer>,
    pub converter: Box<dyn OfficeConverter>,
    /// Plan only: report what would happen without touching the disk
    pub dry_run: bool,
}

/// Failure of a single item; rendered into its outcome, never fatal to the job
#[derive(Error, Debug)]
pub enum ItemError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Range(#[from] RangeError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Move(#[from] MoveError),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error("Failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{written} of {total} parts written; {first_error}")]
    PartialSplit {
        written: usize,
        total: usize,
        first_error: String,
    },

    #[error("No pages to split: start page is past the end ({page_count} pages)")]
    NothingToSplit { page_count: u32 },

    #[error("Item does not belong to a {0} job")]
    WrongKind(JobKind),
}
