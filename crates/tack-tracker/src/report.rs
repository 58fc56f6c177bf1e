// report.rs — Tracker events and the sinks that report them.
//
// The run tracker emits a TrackerEvent at every lifecycle point: run start,
// log lines, work unit start/end, run end. A Report fans each event out to
// its sinks. Sink errors are logged and never stop the run; only `flush`
// surfaces an error, because `RunTracker::end` must know whether the final
// record reached disk.
//
// Console sinks can be silenced for quiet tasks (`tack goals`) and
// `--explain`; error-level log lines still get through.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TrackerError;
use crate::outcome::{LogLevel, WorkUnitLabel, WorkUnitOutcome};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum TrackerEvent {
    RunStarted {
        run_id: String,
        timestamp: DateTime<Utc>,
    },

    Log {
        level: LogLevel,
        message: String,
        timestamp: DateTime<Utc>,
    },

    WorkUnitStarted {
        name: String,
        labels: Vec<WorkUnitLabel>,
        timestamp: DateTime<Utc>,
    },

    WorkUnitEnded {
        name: String,
        outcome: WorkUnitOutcome,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    RunEnded {
        run_id: String,
        outcome: WorkUnitOutcome,
        duration_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        report_url: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl TrackerEvent {
    pub fn event_type(&self) -> &str {
        match self {
            TrackerEvent::RunStarted { .. } => "run_started",
            TrackerEvent::Log { .. } => "log",
            TrackerEvent::WorkUnitStarted { .. } => "work_unit_started",
            TrackerEvent::WorkUnitEnded { .. } => "work_unit_ended",
            TrackerEvent::RunEnded { .. } => "run_ended",
        }
    }

    fn is_error(&self) -> bool {
        matches!(
            self,
            TrackerEvent::Log {
                level: LogLevel::Error,
                ..
            }
        )
    }
}

/// Receives tracker events.
pub trait ReportSink: Send + Sync {
    fn handle(&self, event: &TrackerEvent) -> Result<(), TrackerError>;

    fn flush(&self) -> Result<(), TrackerError> {
        Ok(())
    }

    /// Console sinks are silenced by quiet reporting.
    fn is_console(&self) -> bool {
        false
    }
}

/// Writes events to the terminal through `tracing`.
#[derive(Debug, Default)]
pub struct ConsoleReport;

impl ReportSink for ConsoleReport {
    fn handle(&self, event: &TrackerEvent) -> Result<(), TrackerError> {
        match event {
            TrackerEvent::RunStarted { run_id, .. } => {
                tracing::info!("Executing tasks in run {}", run_id);
            }
            TrackerEvent::Log { level, message, .. } => match level {
                LogLevel::Debug => tracing::debug!("{}", message),
                LogLevel::Info => tracing::info!("{}", message),
                LogLevel::Warn => tracing::warn!("{}", message),
                LogLevel::Error => tracing::error!("{}", message),
            },
            TrackerEvent::WorkUnitStarted { name, .. } => tracing::info!("[{}]", name),
            TrackerEvent::WorkUnitEnded {
                name,
                outcome,
                duration_ms,
                ..
            } => {
                if *outcome < WorkUnitOutcome::Warning {
                    tracing::warn!("[{}] {} after {}ms", name, outcome, duration_ms);
                } else {
                    tracing::debug!("[{}] {} after {}ms", name, outcome, duration_ms);
                }
            }
            TrackerEvent::RunEnded {
                outcome,
                duration_ms,
                ..
            } => {
                tracing::info!(
                    "{} ({:.1}s)",
                    outcome,
                    *duration_ms as f64 / 1000.0
                );
            }
        }
        Ok(())
    }

    fn is_console(&self) -> bool {
        true
    }
}

/// Appends events as JSON lines to a file in the run directory.
pub struct JsonlReport {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonlReport {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TrackerError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| TrackerError::IoError {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| TrackerError::IoError {
                path: path.clone(),
                source,
            })?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for JsonlReport {
    fn handle(&self, event: &TrackerEvent) -> Result<(), TrackerError> {
        let json = serde_json::to_string(event)?;
        let mut writer = self.writer.lock().unwrap_or_else(|p| p.into_inner());
        writeln!(writer, "{}", json).map_err(|source| TrackerError::IoError {
            path: self.path.clone(),
            source,
        })
    }

    fn flush(&self) -> Result<(), TrackerError> {
        let mut writer = self.writer.lock().unwrap_or_else(|p| p.into_inner());
        writer.flush().map_err(|source| TrackerError::IoError {
            path: self.path.clone(),
            source,
        })
    }
}

/// Dispatches events to multiple sinks.
#[derive(Default)]
pub struct Report {
    sinks: Vec<Box<dyn ReportSink>>,
    quiet: AtomicBool,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sink(&mut self, sink: Box<dyn ReportSink>) {
        self.sinks.push(sink);
    }

    pub fn with_sink(mut self, sink: Box<dyn ReportSink>) -> Self {
        self.add_sink(sink);
        self
    }

    pub fn set_quiet(&self, quiet: bool) {
        self.quiet.store(quiet, Ordering::SeqCst);
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet.load(Ordering::SeqCst)
    }

    pub fn emit(&self, event: &TrackerEvent) {
        let quiet = self.is_quiet();
        for sink in &self.sinks {
            if quiet && sink.is_console() && !event.is_error() {
                continue;
            }
            if let Err(e) = sink.handle(event) {
                tracing::warn!("report sink error: {}", e);
            }
        }
    }

    /// Flush every sink, returning the first failure.
    pub fn flush(&self) -> Result<(), TrackerError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.flush() {
                tracing::warn!("report flush error: {}", e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    struct Collecting {
        console: bool,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl ReportSink for Collecting {
        fn handle(&self, event: &TrackerEvent) -> Result<(), TrackerError> {
            self.seen.lock().unwrap().push(event.event_type().to_string());
            Ok(())
        }

        fn is_console(&self) -> bool {
            self.console
        }
    }

    fn log(level: LogLevel) -> TrackerEvent {
        TrackerEvent::Log {
            level,
            message: "hello".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn jsonl_report_appends_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/events.jsonl");
        let sink = JsonlReport::open(&path).unwrap();
        sink.handle(&log(LogLevel::Info)).unwrap();
        sink.handle(&log(LogLevel::Warn)).unwrap();
        sink.flush().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"event_type\":\"log\""));
        assert!(lines[1].contains("\"level\":\"warn\""));
    }

    #[test]
    fn quiet_silences_console_but_not_errors_or_files() {
        let console_seen = Arc::new(Mutex::new(Vec::new()));
        let file_seen = Arc::new(Mutex::new(Vec::new()));
        let report = Report::new()
            .with_sink(Box::new(Collecting {
                console: true,
                seen: Arc::clone(&console_seen),
            }))
            .with_sink(Box::new(Collecting {
                console: false,
                seen: Arc::clone(&file_seen),
            }));

        report.set_quiet(true);
        report.emit(&log(LogLevel::Info));
        report.emit(&log(LogLevel::Error));

        assert_eq!(console_seen.lock().unwrap().len(), 1);
        assert_eq!(file_seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn event_round_trip_keeps_type() {
        let event = TrackerEvent::RunEnded {
            run_id: "r".to_string(),
            outcome: WorkUnitOutcome::Failure,
            duration_ms: 12,
            report_url: None,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("report_url"));
        let restored: TrackerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.event_type(), "run_ended");
    }
}
