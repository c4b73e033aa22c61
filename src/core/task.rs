//! Task representation and the failure boundary around task execution.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};

use parking_lot::Mutex;

use super::WorkerId;

/// A unit of work: a zero-argument closure run exactly once on a worker thread.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A task that panicked while running on a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    /// Worker that was running the task.
    pub worker_id: WorkerId,
    /// Panic payload rendered as text.
    pub message: String,
}

/// Receives task failures caught by the pool.
///
/// Called on the worker thread that caught the panic, so implementations
/// should return quickly.
pub trait FailureHandler: Send + Sync {
    /// Handle one failure.
    fn on_failure(&self, failure: TaskFailure);
}

impl<F> FailureHandler for F
where
    F: Fn(TaskFailure) + Send + Sync,
{
    fn on_failure(&self, failure: TaskFailure) {
        self(failure);
    }
}

/// Bounded in-memory failure log for testing and dev.
pub struct InMemoryFailureSink {
    failures: Mutex<VecDeque<TaskFailure>>,
    max_failures: usize,
}

impl InMemoryFailureSink {
    /// Create a sink that keeps the most recent `max_failures` entries.
    #[must_use]
    pub fn new(max_failures: usize) -> Self {
        Self {
            failures: Mutex::new(VecDeque::with_capacity(max_failures)),
            max_failures,
        }
    }

    /// Snapshot of stored failures, oldest first.
    pub fn failures(&self) -> Vec<TaskFailure> {
        self.failures.lock().iter().cloned().collect()
    }
}

impl FailureHandler for InMemoryFailureSink {
    fn on_failure(&self, failure: TaskFailure) {
        let mut failures = self.failures.lock();
        if failures.len() >= self.max_failures {
            failures.pop_front();
        }
        failures.push_back(failure);
    }
}

/// Run `job`, converting a panic into its message.
pub(crate) fn run_guarded(job: Job) -> Result<(), String> {
    panic::catch_unwind(AssertUnwindSafe(job)).map_err(|payload| panic_message(&*payload))
}

/// Deliver `failure` to `handler`, converting a panic in the handler into its message.
pub(crate) fn notify_guarded(
    handler: &dyn FailureHandler,
    failure: TaskFailure,
) -> Result<(), String> {
    panic::catch_unwind(AssertUnwindSafe(|| handler.on_failure(failure)))
        .map_err(|payload| panic_message(&*payload))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_run_guarded_ok() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        assert!(run_guarded(Box::new(move || flag.store(true, Ordering::SeqCst))).is_ok());
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_run_guarded_captures_panic_message() {
        let err = run_guarded(Box::new(|| panic!("boom"))).unwrap_err();
        assert_eq!(err, "boom");

        let code = 7;
        let err = run_guarded(Box::new(move || panic!("code {code}"))).unwrap_err();
        assert_eq!(err, "code 7");
    }

    #[test]
    fn test_notify_guarded_contains_handler_panic() {
        let handler = |_: TaskFailure| panic!("handler broke");
        let failure = TaskFailure {
            worker_id: WorkerId(4),
            message: "task".into(),
        };
        assert_eq!(notify_guarded(&handler, failure).unwrap_err(), "handler broke");
    }

    #[test]
    fn test_in_memory_sink_overflow() {
        let sink = InMemoryFailureSink::new(2);
        for i in 0..3 {
            sink.on_failure(TaskFailure {
                worker_id: WorkerId(i),
                message: format!("fail-{i}"),
            });
        }
        let failures = sink.failures();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].message, "fail-1");
        assert_eq!(failures[1].worker_id, WorkerId(2));
    }
}
