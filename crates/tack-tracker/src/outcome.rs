// outcome.rs — Work unit outcomes, labels and report log levels.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of a work unit or of the whole run.
///
/// Variants are declared worst first, so `min` picks the worse outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkUnitOutcome {
    Aborted,
    Failure,
    Warning,
    Success,
}

impl fmt::Display for WorkUnitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkUnitOutcome::Aborted => write!(f, "ABORTED"),
            WorkUnitOutcome::Failure => write!(f, "FAILURE"),
            WorkUnitOutcome::Warning => write!(f, "WARNING"),
            WorkUnitOutcome::Success => write!(f, "SUCCESS"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkUnitLabel {
    Setup,
    Goal,
    Task,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_is_worse_than_success() {
        assert!(WorkUnitOutcome::Failure < WorkUnitOutcome::Success);
        assert_eq!(
            WorkUnitOutcome::Success.min(WorkUnitOutcome::Warning),
            WorkUnitOutcome::Warning
        );
        assert_eq!(
            WorkUnitOutcome::Failure.min(WorkUnitOutcome::Success),
            WorkUnitOutcome::Failure
        );
    }

    #[test]
    fn outcome_serializes_uppercase() {
        let json = serde_json::to_string(&WorkUnitOutcome::Failure).unwrap();
        assert_eq!(json, "\"FAILURE\"");
        assert_eq!(WorkUnitOutcome::Success.to_string(), "SUCCESS");
    }
}
