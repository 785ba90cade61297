//! Job descriptions and the work each item performs.

mod handlers;
mod types;

pub use handlers::{handler_for, plan_split, ItemHandler};
pub use types::{IrregularPart, ItemError, Job, JobContext, JobKind, SplitMode, WorkItem};

use tracing::debug;

use crate::batch::{BatchError, BatchRunner, JobHandle};

impl Job {
    /// Hand the job to `runner`; items run on its background thread with `ctx`
    pub fn submit(self, runner: &BatchRunner, ctx: JobContext) -> Result<JobHandle, BatchError> {
        debug!(kind = %self.kind, items = self.items.len(), "Submitting job");
        let handler = handler_for(self.kind);
        runner.submit(self.items, move |_, item| handler(&ctx, item))
    }
}
