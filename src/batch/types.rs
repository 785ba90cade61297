use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terminal result of one work item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    Success(String),
    /// Valid terminal state: the item needs manual handling
    NoMatch(String),
    Error(String),
}

impl Outcome {
    pub fn detail(&self) -> &str {
        match self {
            Outcome::Success(d) | Outcome::NoMatch(d) | Outcome::Error(d) => d,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error(_))
    }
}

/// Emitted once per item, in item order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub job_index: usize,
    pub item_index: usize,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Item(ProgressEvent),
    Finished(JobSummary),
}

/// Completed-vs-total counters for one job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_index: usize,
    pub total: usize,
    pub succeeded: usize,
    pub no_match: usize,
    pub failed: usize,
    /// Items never started because the job was stopped
    pub skipped: usize,
    pub stopped: bool,
}

impl JobSummary {
    pub fn new(job_index: usize, total: usize) -> Self {
        Self {
            job_index,
            total,
            ..Default::default()
        }
    }

    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Success(_) => self.succeeded += 1,
            Outcome::NoMatch(_) => self.no_match += 1,
            Outcome::Error(_) => self.failed += 1,
        }
    }

    pub fn completed(&self) -> usize {
        self.succeeded + self.no_match + self.failed
    }
}

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Another job is still running; wait for it to finish")]
    Busy,

    #[error("Failed to start background worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Background worker terminated abnormally")]
    Join,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let mut summary = JobSummary::new(0, 4);
        summary.record(&Outcome::Success("ok".to_string()));
        summary.record(&Outcome::NoMatch("manual".to_string()));
        summary.record(&Outcome::Error("bad".to_string()));

        assert_eq!(summary.completed(), 3);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.no_match, 1);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_string(&Outcome::NoMatch("rename manually".to_string())).unwrap();
        assert_eq!(json, r#"{"status":"no_match","detail":"rename manually"}"#);
    }
}
