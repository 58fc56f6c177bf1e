// error.rs — Error types for configuration, options, execution and the run.

use std::path::PathBuf;

use tack_goal::{GoalError, OptionKind};
use tack_graph::{GraphError, SpecError};
use tack_tracker::TrackerError;
use thiserror::Error;

use crate::phase::RunPhase;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The config file is not valid TOML.
    #[error("failed to parse config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// A key exists but holds the wrong type.
    #[error("config value [{section}] {key} must be {expected}")]
    WrongType {
        section: String,
        key: String,
        expected: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("unknown option --{name} in scope '{scope}'")]
    UnknownOption { scope: String, name: String },

    #[error("invalid value '{value}' for --{name} in scope '{scope}': expected {expected}")]
    InvalidValue {
        scope: String,
        name: String,
        value: String,
        expected: OptionKind,
    },

    /// A scoped flag appeared before any goal or scope token.
    #[error("flag '{0}' must follow a goal or scope")]
    FlagOutsideScope(String),

    /// A non-boolean flag was given without a value.
    #[error("option --{name} in scope '{scope}' requires a value")]
    MissingValue { scope: String, name: String },

    #[error("invalid log level '{0}' (expected trace, debug, info, warn or error)")]
    InvalidLevel(String),

    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Option registration failed.
    #[error(transparent)]
    Schema(#[from] GoalError),
}

/// Why a task did not complete.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("{0}")]
    Failed(String),

    /// The task noticed the interrupt flag and stopped early.
    #[error("interrupted")]
    Interrupted,

    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Errors that abort the engine. Task failures are not among them; they
/// come back as a non-zero status.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("interrupted by user")]
    Interrupted,

    #[error("internal engine error: {0}")]
    Internal(String),
}

#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid pid file {path}: {content:?}")]
    InvalidPid { path: PathBuf, content: String },

    #[error("failed to signal worker {pid}: {source}")]
    Signal { pid: i32, source: std::io::Error },
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Options(#[from] OptionsError),

    #[error(transparent)]
    Goal(#[from] GoalError),

    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Tracker(#[from] TrackerError),

    /// A configured plugin or backend is not compiled into this binary.
    #[error("unknown backend '{name}' (available: {})", .available.join(", "))]
    UnknownBackend {
        name: String,
        available: Vec<String>,
    },

    /// A `[goals] bootstrap_buildfiles` entry could not be parsed.
    #[error("failed to parse bootstrap build file {path}: {source}")]
    BootstrapBuildFile {
        path: String,
        #[source]
        source: GraphError,
    },

    #[error("invalid run phase transition from {from} to {to}")]
    InvalidTransition { from: RunPhase, to: RunPhase },

    /// The engine failed for a reason other than a task failure.
    #[error("{0}")]
    Internal(String),

    /// The user interrupted the run. Finalization has already happened.
    #[error("interrupted by user")]
    Interrupted,
}

impl From<EngineError> for RunError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Interrupted => RunError::Interrupted,
            EngineError::Internal(message) => RunError::Internal(message),
        }
    }
}
