//! Background execution of jobs, one item at a time.

mod runner;
mod types;

pub use runner::{BatchRunner, JobHandle};
pub use types::{BatchError, JobEvent, JobSummary, Outcome, ProgressEvent};
