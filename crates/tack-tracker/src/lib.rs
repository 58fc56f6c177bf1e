//! # tack-tracker
//!
//! Records timing, status and reporting metadata for a single tack run.
//!
//! ## Key components
//!
//! - [`RunTracker`] — start/end of a run, work units, the root outcome
//! - [`RunInfo`] — key/value facts about the run persisted as `info.json`
//! - [`Report`] — fans [`TrackerEvent`]s out to [`ReportSink`]s
//!   ([`ConsoleReport`], [`JsonlReport`])
//! - [`WorkUnitOutcome`] — ordered outcomes; the root outcome only decreases

pub mod error;
pub mod outcome;
pub mod report;
pub mod run_info;
pub mod tracker;

pub use error::TrackerError;
pub use outcome::{LogLevel, WorkUnitLabel, WorkUnitOutcome};
pub use report::{ConsoleReport, JsonlReport, Report, ReportSink, TrackerEvent};
pub use run_info::RunInfo;
pub use tracker::RunTracker;
