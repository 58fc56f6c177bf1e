// finalize.rs — The finalization protocol around Executing.
//
// However execution ends, the same two steps run in the same order:
//
//   1. close the run tracker (final outcome, duration, report URL, flush)
//   2. terminate background workers, if requested
//
// FinalizeGuard is armed when execution starts. The normal path hands it an
// ExecutionOutcome through `finalize`; if the guard is dropped while still
// armed (a panic unwinding, an early return) `Drop` runs the same steps.
// Failures in either step are logged and never replace the run's own
// result.

use std::sync::Arc;

use tack_tracker::{RunTracker, WorkUnitOutcome};

use crate::cleanup::BackgroundCleanup;
use crate::error::{EngineError, RunError};

/// How the Executing phase ended.
#[derive(Debug)]
pub enum ExecutionOutcome {
    Success,
    /// The engine (or unknown-goal validation) reported a non-zero status.
    EngineFailure(i32),
    Interrupted,
    InternalError(RunError),
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success)
    }
}

impl From<Result<i32, EngineError>> for ExecutionOutcome {
    fn from(result: Result<i32, EngineError>) -> Self {
        match result {
            Ok(0) => ExecutionOutcome::Success,
            Ok(code) => ExecutionOutcome::EngineFailure(code),
            Err(EngineError::Interrupted) => ExecutionOutcome::Interrupted,
            Err(e) => ExecutionOutcome::InternalError(e.into()),
        }
    }
}

pub struct FinalizeGuard {
    tracker: Arc<RunTracker>,
    cleanup: Arc<dyn BackgroundCleanup>,
    kill_workers: bool,
    armed: bool,
}

impl FinalizeGuard {
    pub fn new(
        tracker: Arc<RunTracker>,
        cleanup: Arc<dyn BackgroundCleanup>,
        kill_workers: bool,
    ) -> Self {
        Self {
            tracker,
            cleanup,
            kill_workers,
            armed: true,
        }
    }

    /// Record `outcome`, finalize, and turn the outcome into the run result.
    ///
    /// An interrupt always terminates workers and comes back as
    /// `RunError::Interrupted`; an internal error comes back unchanged.
    pub fn finalize(mut self, outcome: ExecutionOutcome) -> Result<i32, RunError> {
        match &outcome {
            ExecutionOutcome::Success => {}
            ExecutionOutcome::EngineFailure(code) => {
                tracing::debug!(code, "engine reported failure");
                self.tracker.set_root_outcome(WorkUnitOutcome::Failure);
            }
            ExecutionOutcome::Interrupted => {
                self.tracker.set_root_outcome(WorkUnitOutcome::Failure);
                self.kill_workers = true;
            }
            ExecutionOutcome::InternalError(e) => {
                tracing::debug!("run failed: {}", e);
                self.tracker.set_root_outcome(WorkUnitOutcome::Failure);
            }
        }

        self.release();

        match outcome {
            ExecutionOutcome::Success => Ok(0),
            ExecutionOutcome::EngineFailure(code) => Ok(code),
            ExecutionOutcome::Interrupted => Err(RunError::Interrupted),
            ExecutionOutcome::InternalError(e) => Err(e),
        }
    }

    fn release(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        close(&self.tracker, self.cleanup.as_ref(), self.kill_workers);
    }
}

/// The hook a forced shutdown (second Ctrl-C) runs while a task may still
/// be executing: the run fails, the tracker is closed, workers are always
/// terminated.
pub fn shutdown_hook(
    tracker: Arc<RunTracker>,
    cleanup: Arc<dyn BackgroundCleanup>,
) -> impl FnOnce() + Send + 'static {
    move || {
        tracing::error!("forced shutdown; finalizing run {}", tracker.run_id());
        tracker.set_root_outcome(WorkUnitOutcome::Failure);
        close(&tracker, cleanup.as_ref(), true);
    }
}

/// Tracker first, then workers. Failures are logged.
fn close(tracker: &RunTracker, cleanup: &dyn BackgroundCleanup, kill_workers: bool) {
    if let Err(e) = tracker.end() {
        tracing::error!("failed to close run tracker: {}", e);
    }

    if kill_workers {
        match cleanup.kill_all() {
            Ok(0) => {}
            Ok(n) => tracing::info!("terminated {} background worker(s)", n),
            Err(e) => tracing::error!("background worker cleanup failed: {}", e),
        }
    }
}

impl Drop for FinalizeGuard {
    fn drop(&mut self) {
        if self.armed {
            if std::thread::panicking() {
                tracing::error!("run panicked; finalizing");
            }
            self.tracker.set_root_outcome(WorkUnitOutcome::Failure);
            self.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CleanupError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tack_tracker::Report;
    use tempfile::tempdir;

    #[derive(Default)]
    struct CountingCleanup(AtomicUsize);

    impl BackgroundCleanup for CountingCleanup {
        fn kill_all(&self) -> Result<usize, CleanupError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        }
    }

    fn tracker(dir: &std::path::Path) -> Arc<RunTracker> {
        let tracker = Arc::new(RunTracker::new(dir, None));
        tracker.start(Report::new()).unwrap();
        tracker
    }

    #[test]
    fn engine_status_is_data() {
        assert!(ExecutionOutcome::from(Ok(0)).is_success());
        assert!(matches!(
            ExecutionOutcome::from(Ok(3)),
            ExecutionOutcome::EngineFailure(3)
        ));
        assert!(matches!(
            ExecutionOutcome::from(Err(EngineError::Interrupted)),
            ExecutionOutcome::Interrupted
        ));
        assert!(matches!(
            ExecutionOutcome::from(Err(EngineError::Internal("x".to_string()))),
            ExecutionOutcome::InternalError(RunError::Internal(_))
        ));
    }

    #[test]
    fn success_keeps_cleanup_flag() {
        let dir = tempdir().unwrap();
        let tracker = tracker(dir.path());
        let cleanup = Arc::new(CountingCleanup::default());
        let guard = FinalizeGuard::new(Arc::clone(&tracker), cleanup.clone(), false);

        assert_eq!(guard.finalize(ExecutionOutcome::Success).unwrap(), 0);
        assert!(tracker.is_ended());
        assert_eq!(tracker.outcome(), WorkUnitOutcome::Success);
        assert_eq!(cleanup.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn interrupt_forces_cleanup() {
        let dir = tempdir().unwrap();
        let tracker = tracker(dir.path());
        let cleanup = Arc::new(CountingCleanup::default());
        let guard = FinalizeGuard::new(Arc::clone(&tracker), cleanup.clone(), false);

        let result = guard.finalize(ExecutionOutcome::Interrupted);
        assert!(matches!(result, Err(RunError::Interrupted)));
        assert_eq!(tracker.outcome(), WorkUnitOutcome::Failure);
        assert_eq!(cleanup.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropped_guard_still_finalizes_once() {
        let dir = tempdir().unwrap();
        let tracker = tracker(dir.path());
        let cleanup = Arc::new(CountingCleanup::default());
        drop(FinalizeGuard::new(Arc::clone(&tracker), cleanup.clone(), true));

        assert!(tracker.is_ended());
        assert_eq!(tracker.outcome(), WorkUnitOutcome::Failure);
        assert_eq!(cleanup.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn shutdown_hook_closes_tracker_and_always_cleans_up() {
        let dir = tempdir().unwrap();
        let tracker = tracker(dir.path());
        let cleanup = Arc::new(CountingCleanup::default());

        let hook = shutdown_hook(Arc::clone(&tracker), cleanup.clone());
        hook();
        assert!(tracker.is_ended());
        assert_eq!(tracker.outcome(), WorkUnitOutcome::Failure);
        assert_eq!(cleanup.0.load(Ordering::SeqCst), 1);

        // The guard of the still-running execution finds the tracker closed.
        let guard = FinalizeGuard::new(Arc::clone(&tracker), cleanup.clone(), false);
        assert!(guard.finalize(ExecutionOutcome::Interrupted).is_err());
        assert_eq!(tracker.outcome(), WorkUnitOutcome::Failure);
    }
}
