// tracker.rs — Start, work units, outcome and end of a single run.
//
// A RunTracker is shared (Arc) between the runner, the engine and tasks.
// Interior state lives behind a Mutex; events are emitted with the lock
// released so sinks and work unit bodies may call back into the tracker.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::TrackerError;
use crate::outcome::{LogLevel, WorkUnitLabel, WorkUnitOutcome};
use crate::report::{Report, TrackerEvent};
use crate::run_info::RunInfo;

pub const EVENTS_FILE_NAME: &str = "events.jsonl";

struct TrackerState {
    report: Option<Arc<Report>>,
    info: RunInfo,
    started: Option<Instant>,
    root_outcome: WorkUnitOutcome,
    ended: bool,
}

pub struct RunTracker {
    run_id: String,
    run_dir: PathBuf,
    report_url: Option<String>,
    state: Mutex<TrackerState>,
}

impl RunTracker {
    /// Allocate a run id and run directory under `run_root`.
    ///
    /// Nothing is written until [`RunTracker::start`].
    pub fn new(run_root: impl AsRef<Path>, report_url_base: Option<&str>) -> Self {
        let run_id = new_run_id(Utc::now());
        let run_dir = run_root.as_ref().join(&run_id);
        let report_url = report_url_base
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), run_id));
        Self {
            state: Mutex::new(TrackerState {
                report: None,
                info: RunInfo::new(&run_dir),
                started: None,
                root_outcome: WorkUnitOutcome::Success,
                ended: false,
            }),
            run_id,
            run_dir,
            report_url,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Where a [`crate::JsonlReport`] for this run should write.
    pub fn events_path(&self) -> PathBuf {
        self.run_dir.join(EVENTS_FILE_NAME)
    }

    pub fn report_url(&self) -> Option<&str> {
        self.report_url.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn emit(&self, event: TrackerEvent) {
        let report = self.lock().report.clone();
        if let Some(report) = report {
            report.emit(&event);
        }
    }

    pub fn start(&self, report: Report) -> Result<(), TrackerError> {
        let now = Utc::now();
        {
            let mut state = self.lock();
            if state.started.is_some() {
                return Err(TrackerError::AlreadyStarted(self.run_id.clone()));
            }
            state.started = Some(Instant::now());
            state.report = Some(Arc::new(report));
            state.info.add_info("id", self.run_id.clone());
            state.info.add_info("timestamp", now.to_rfc3339());
            if let Some(url) = &self.report_url {
                state.info.add_info("report_url", url.clone());
            }
            state.info.save()?;
        }
        tracing::debug!(run_id = %self.run_id, run_dir = %self.run_dir.display(), "run started");
        self.emit(TrackerEvent::RunStarted {
            run_id: self.run_id.clone(),
            timestamp: now,
        });
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.lock().started.is_some()
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.emit(TrackerEvent::Log {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        });
    }

    /// Run `f` as a named work unit.
    ///
    /// An `Err` from `f` records the unit as failed and lowers the root
    /// outcome to failure; the error is returned unchanged.
    pub fn with_workunit<T, E>(
        &self,
        name: &str,
        labels: &[WorkUnitLabel],
        f: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        self.emit(TrackerEvent::WorkUnitStarted {
            name: name.to_string(),
            labels: labels.to_vec(),
            timestamp: Utc::now(),
        });
        let start = Instant::now();
        let result = f();
        let outcome = if result.is_ok() {
            WorkUnitOutcome::Success
        } else {
            self.set_root_outcome(WorkUnitOutcome::Failure);
            WorkUnitOutcome::Failure
        };
        self.emit(TrackerEvent::WorkUnitEnded {
            name: name.to_string(),
            outcome,
            duration_ms: start.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        });
        result
    }

    /// Lower the root outcome. An outcome better than the current one is
    /// ignored.
    pub fn set_root_outcome(&self, outcome: WorkUnitOutcome) {
        let mut state = self.lock();
        state.root_outcome = state.root_outcome.min(outcome);
    }

    pub fn outcome(&self) -> WorkUnitOutcome {
        self.lock().root_outcome
    }

    /// Silence console reporting (except errors) for quiet runs.
    pub fn update_reporting(&self, quiet: bool) {
        if let Some(report) = &self.lock().report {
            report.set_quiet(quiet);
        }
    }

    pub fn add_info(&self, key: impl Into<String>, value: impl Into<String>) {
        self.lock().info.add_info(key, value);
    }

    pub fn get_info(&self, key: &str) -> Option<String> {
        self.lock().info.get_info(key).map(str::to_string)
    }

    pub fn add_scm_info(&self, build_root: &Path) -> Result<(), TrackerError> {
        let mut state = self.lock();
        state.info.add_scm_info(build_root);
        if state.started.is_some() {
            state.info.save()?;
        }
        Ok(())
    }

    pub fn is_ended(&self) -> bool {
        self.lock().ended
    }

    /// Close the run: record outcome and duration, emit `RunEnded`, flush.
    ///
    /// Only the first call does anything. Every step is attempted even if
    /// an earlier one failed; the first failure is returned.
    pub fn end(&self) -> Result<(), TrackerError> {
        let (report, outcome, duration_ms, save_result) = {
            let mut state = self.lock();
            if state.ended {
                return Ok(());
            }
            state.ended = true;
            let Some(started) = state.started else {
                return Ok(());
            };
            let duration_ms = started.elapsed().as_millis() as u64;
            let outcome = state.root_outcome;
            state.info.add_info("outcome", outcome.to_string());
            state.info.add_info("duration_ms", duration_ms.to_string());
            let save_result = state.info.save();
            (state.report.clone(), outcome, duration_ms, save_result)
        };

        let Some(report) = report else {
            return save_result;
        };
        report.emit(&TrackerEvent::RunEnded {
            run_id: self.run_id.clone(),
            outcome,
            duration_ms,
            report_url: self.report_url.clone(),
            timestamp: Utc::now(),
        });
        let flush_result = report.flush();
        save_result.and(flush_result)
    }
}

fn new_run_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "tack_run_{}_{}",
        now.format("%Y_%m_%d_%H_%M_%S_%3f"),
        &suffix[..8]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{JsonlReport, ReportSink};
    use std::fs;
    use tempfile::tempdir;

    struct Recording(Arc<Mutex<Vec<String>>>);

    impl ReportSink for Recording {
        fn handle(&self, event: &TrackerEvent) -> Result<(), TrackerError> {
            self.0.lock().unwrap().push(event.event_type().to_string());
            Ok(())
        }
    }

    fn started(dir: &Path) -> (RunTracker, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let tracker = RunTracker::new(dir, Some("http://localhost:9000/run/"));
        tracker
            .start(Report::new().with_sink(Box::new(Recording(Arc::clone(&seen)))))
            .unwrap();
        (tracker, seen)
    }

    #[test]
    fn run_id_format() {
        let dir = tempdir().unwrap();
        let tracker = RunTracker::new(dir.path(), None);
        assert!(tracker.run_id().starts_with("tack_run_"));
        assert_eq!(tracker.run_dir(), dir.path().join(tracker.run_id()));
        assert!(tracker.report_url().is_none());
    }

    #[test]
    fn start_writes_info_and_rejects_restart() {
        let dir = tempdir().unwrap();
        let (tracker, _) = started(dir.path());
        let info = RunInfo::load(&tracker.run_dir().join("info.json")).unwrap();
        assert_eq!(info.get_info("id"), Some(tracker.run_id()));
        let expected = format!("http://localhost:9000/run/{}", tracker.run_id());
        assert_eq!(tracker.get_info("report_url"), Some(expected));

        let err = tracker.start(Report::new()).unwrap_err();
        assert!(matches!(err, TrackerError::AlreadyStarted(_)));
    }

    #[test]
    fn root_outcome_only_decreases() {
        let dir = tempdir().unwrap();
        let (tracker, _) = started(dir.path());
        tracker.set_root_outcome(WorkUnitOutcome::Failure);
        tracker.set_root_outcome(WorkUnitOutcome::Success);
        assert_eq!(tracker.outcome(), WorkUnitOutcome::Failure);
    }

    #[test]
    fn failed_workunit_marks_run_failed() {
        let dir = tempdir().unwrap();
        let (tracker, seen) = started(dir.path());
        let result: Result<(), &str> =
            tracker.with_workunit("compile.javac", &[WorkUnitLabel::Task], || Err("boom"));
        assert_eq!(result, Err("boom"));
        assert_eq!(tracker.outcome(), WorkUnitOutcome::Failure);
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["run_started", "work_unit_started", "work_unit_ended"]
        );
    }

    #[test]
    fn end_is_idempotent_and_records_outcome() {
        let dir = tempdir().unwrap();
        let (tracker, seen) = started(dir.path());
        tracker.log(LogLevel::Info, "working");
        tracker.end().unwrap();
        tracker.end().unwrap();
        assert!(tracker.is_ended());

        let events = seen.lock().unwrap();
        assert_eq!(events.iter().filter(|e| *e == "run_ended").count(), 1);
        assert_eq!(tracker.get_info("outcome").as_deref(), Some("SUCCESS"));
        assert!(tracker.get_info("duration_ms").is_some());
    }

    #[test]
    fn jsonl_events_are_flushed_on_end() {
        let dir = tempdir().unwrap();
        let tracker = RunTracker::new(dir.path(), None);
        let sink = JsonlReport::open(tracker.events_path()).unwrap();
        tracker.start(Report::new().with_sink(Box::new(sink))).unwrap();
        tracker.end().unwrap();

        let content = fs::read_to_string(tracker.events_path()).unwrap();
        let last = content.lines().last().unwrap();
        assert!(last.contains("\"event_type\":\"run_ended\""));
    }

    #[test]
    fn end_before_start_is_a_no_op() {
        let dir = tempdir().unwrap();
        let tracker = RunTracker::new(dir.path(), None);
        tracker.end().unwrap();
        assert!(tracker.is_ended());
        assert!(!tracker.run_dir().exists());
    }
}
