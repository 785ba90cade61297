use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::types::{BatchError, JobEvent, JobSummary, Outcome, ProgressEvent};

/// Runs one job at a time on a background thread
///
/// Items are handled strictly in input order and every item produces exactly
/// one [`ProgressEvent`], followed by a single [`JobEvent::Finished`].
#[derive(Debug, Default)]
pub struct BatchRunner {
    busy: Arc<AtomicBool>,
    next_job: AtomicUsize,
    item_delay: Duration,
}

/// Clears the busy flag when the worker is done, even if it unwinds
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl BatchRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pause between items so progress output stays readable
    pub fn with_item_delay(mut self, delay: Duration) -> Self {
        self.item_delay = delay;
        self
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Start a job, or fail with [`BatchError::Busy`] while one is in flight
    pub fn submit<T, F>(&self, items: Vec<T>, mut handler: F) -> Result<JobHandle, BatchError>
    where
        T: Send + 'static,
        F: FnMut(usize, T) -> Outcome + Send + 'static,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Rejected job: another job is running");
            return Err(BatchError::Busy);
        }
        let guard = BusyGuard(Arc::clone(&self.busy));

        let job_index = self.next_job.fetch_add(1, Ordering::SeqCst);
        let total = items.len();
        let delay = self.item_delay;
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let (tx, rx) = mpsc::channel();

        info!(job = job_index, items = total, "Starting job");

        let thread = thread::Builder::new()
            .name(format!("docbatch-job-{}", job_index))
            .spawn(move || {
                let mut summary = JobSummary::new(job_index, total);

                for (item_index, item) in items.into_iter().enumerate() {
                    if stop_flag.load(Ordering::SeqCst) {
                        summary.stopped = true;
                        summary.skipped = total - item_index;
                        debug!(job = job_index, skipped = summary.skipped, "Job stopped");
                        break;
                    }
                    if item_index > 0 && !delay.is_zero() {
                        thread::sleep(delay);
                    }

                    let outcome =
                        panic::catch_unwind(AssertUnwindSafe(|| handler(item_index, item)))
                            .unwrap_or_else(|payload| Outcome::Error(panic_message(payload)));

                    summary.record(&outcome);
                    // The receiver may be gone; the job still runs to completion
                    let _ = tx.send(JobEvent::Item(ProgressEvent {
                        job_index,
                        item_index,
                        outcome,
                    }));
                }

                drop(guard);
                info!(
                    job = job_index,
                    completed = summary.completed(),
                    total = summary.total,
                    "Job finished"
                );
                let _ = tx.send(JobEvent::Finished(summary));
            })
            .map_err(BatchError::Spawn)?;

        Ok(JobHandle {
            job_index,
            total,
            events: rx,
            stop,
            thread: Some(thread),
        })
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    let reason = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("internal error: {}", reason)
}

/// Consumer side of a running job
#[derive(Debug)]
pub struct JobHandle {
    job_index: usize,
    total: usize,
    events: Receiver<JobEvent>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl JobHandle {
    pub fn job_index(&self) -> usize {
        self.job_index
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Blocking iterator over events; ends after [`JobEvent::Finished`]
    pub fn events(&self) -> mpsc::Iter<'_, JobEvent> {
        self.events.iter()
    }

    /// Ask the worker not to start any further items
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Drain remaining events and join the worker
    pub fn wait(self) -> Result<JobSummary, BatchError> {
        let mut summary = None;
        for event in self.events.iter() {
            if let JobEvent::Finished(s) = event {
                summary = Some(s);
            }
        }

        self.join()?;
        summary.ok_or(BatchError::Join)
    }

    /// Join the worker once its events have been consumed
    pub fn join(mut self) -> Result<(), BatchError> {
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| BatchError::Join),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn collect(handle: &JobHandle) -> (Vec<ProgressEvent>, Option<JobSummary>) {
        let mut items = Vec::new();
        let mut summary = None;
        for event in handle.events() {
            match event {
                JobEvent::Item(e) => items.push(e),
                JobEvent::Finished(s) => summary = Some(s),
            }
        }
        (items, summary)
    }

    #[test]
    fn test_items_processed_in_order() {
        let runner = BatchRunner::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_job = Arc::clone(&seen);

        let handle = runner
            .submit(vec![10, 20, 30], move |index, value: i32| {
                seen_in_job.lock().unwrap().push(value);
                if value == 20 {
                    Outcome::NoMatch(format!("item {}", index))
                } else {
                    Outcome::Success(value.to_string())
                }
            })
            .unwrap();

        let (items, summary) = collect(&handle);
        let summary = summary.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![10, 20, 30]);
        assert_eq!(
            items.iter().map(|e| e.item_index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(items[1].outcome, Outcome::NoMatch("item 1".to_string()));
        assert_eq!(summary.completed(), 3);
        assert_eq!(summary.no_match, 1);
        assert!(!summary.stopped);
    }

    #[test]
    fn test_rejects_second_job_while_busy() {
        let runner = BatchRunner::new();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let first = runner
            .submit(vec![()], move |_, _| {
                release_rx.recv().ok();
                Outcome::Success("done".to_string())
            })
            .unwrap();

        assert!(runner.is_busy());
        let second = runner.submit(vec![()], |_, _| Outcome::Success(String::new()));
        assert!(matches!(second, Err(BatchError::Busy)));

        release_tx.send(()).unwrap();
        let summary = first.wait().unwrap();
        assert_eq!(summary.succeeded, 1);

        assert!(!runner.is_busy());
        let third = runner
            .submit(vec![()], |_, _| Outcome::Success(String::new()))
            .unwrap();
        assert_eq!(third.job_index(), 1);
        third.wait().unwrap();
    }

    #[test]
    fn test_item_error_does_not_abort_job() {
        let runner = BatchRunner::new();
        let handle = runner
            .submit(vec!["a", "bad", "c"], |_, item| {
                if item == "bad" {
                    Outcome::Error("write failed".to_string())
                } else {
                    Outcome::Success(item.to_string())
                }
            })
            .unwrap();

        let summary = handle.wait().unwrap();
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn test_panicking_item_becomes_error() {
        let runner = BatchRunner::new();
        let handle = runner
            .submit(vec![1, 2], |_, item: i32| {
                if item == 1 {
                    panic!("boom");
                }
                Outcome::Success(item.to_string())
            })
            .unwrap();

        let (items, summary) = collect(&handle);
        assert_eq!(items[0].outcome, Outcome::Error("internal error: boom".to_string()));
        assert_eq!(items[1].outcome, Outcome::Success("2".to_string()));
        assert_eq!(summary.unwrap().failed, 1);
        assert!(!runner.is_busy());
    }

    #[test]
    fn test_stop_skips_remaining_items() {
        let runner = BatchRunner::new();
        let (started_tx, started_rx) = mpsc::channel::<()>();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let handle = runner
            .submit(vec![0, 1, 2, 3], move |index, _: i32| {
                if index == 0 {
                    started_tx.send(()).ok();
                    release_rx.recv().ok();
                }
                Outcome::Success(String::new())
            })
            .unwrap();

        started_rx.recv().unwrap();
        handle.stop();
        release_tx.send(()).unwrap();

        let summary = handle.wait().unwrap();
        assert!(summary.stopped);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.skipped, 3);
    }

    #[test]
    fn test_empty_job_finishes() {
        let runner = BatchRunner::new().with_item_delay(Duration::from_millis(1));
        let handle = runner
            .submit(Vec::<()>::new(), |_, _| Outcome::Success(String::new()))
            .unwrap();

        let summary = handle.wait().unwrap();
        assert_eq!(summary.total, 0);
        assert_eq!(summary.completed(), 0);
    }
}
