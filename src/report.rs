//! JSON record of one job run.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::batch::{JobSummary, Outcome, ProgressEvent};
use crate::job::JobKind;

pub const REPORT_VERSION: &str = "1.0";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    WriteError(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    SerializeError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    /// Schema version for compatibility
    pub version: String,

    /// Tool version that produced this report
    pub tool_version: String,

    pub kind: JobKind,

    /// Whether the job only previewed its operations
    pub dry_run: bool,

    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    pub items: Vec<ReportEntry>,

    pub totals: Option<JobSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    pub index: usize,
    pub label: String,
    pub outcome: Outcome,
}

impl JobReport {
    pub fn new(kind: JobKind, dry_run: bool) -> Self {
        Self {
            version: REPORT_VERSION.to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            kind,
            dry_run,
            started_at: Utc::now(),
            finished_at: None,
            items: Vec::new(),
            totals: None,
        }
    }

    pub fn record(&mut self, event: &ProgressEvent, label: &str) {
        self.items.push(ReportEntry {
            index: event.item_index,
            label: label.to_string(),
            outcome: event.outcome.clone(),
        });
    }

    pub fn finish(&mut self, summary: JobSummary) {
        self.finished_at = Some(Utc::now());
        self.totals = Some(summary);
    }
}

/// Write `report` to `path` through a temporary file and an atomic rename
pub fn write_report(report: &JobReport, path: &Path) -> Result<(), ReportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("json.tmp");
    {
        let file = File::create(&temp_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, report)?;
    }

    fs::rename(&temp_path, path)?;

    info!("Report written to: {:?}", path);
    Ok(())
}
