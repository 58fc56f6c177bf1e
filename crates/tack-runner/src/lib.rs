//! # tack-runner
//!
//! The run lifecycle controller of the tack build tool.
//!
//! A [`GoalRunner`] turns a command line into resolved targets and goals,
//! hands them to an [`Engine`], and always finalizes the run the same way:
//! the [`RunTracker`](tack_tracker::RunTracker) is closed first, then
//! background workers are terminated if requested (always, on interrupt).
//!
//! ```text
//! Idle → Bootstrapping → Resolving → Executing → Finalizing → Done | Failed
//! ```
//!
//! ## Key components
//!
//! - [`GoalRunner`] / [`GoalRunnerBuilder`] — bootstrap, resolve, run
//! - [`Config`] — `tack.toml`
//! - [`Options`] / [`GlobalOptions`] — command-line splitting and option values
//! - [`BackendLoader`] / [`Backend`] — compiled-in goal and task providers
//! - [`RoundEngine`] — default engine: one round per goal, tasks in order
//! - [`FinalizeGuard`] — the tracker-then-cleanup protocol, panic safe
//! - [`WorkerReaper`] — terminates workers recorded as pid files

pub mod backend;
pub mod cleanup;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod finalize;
pub mod interrupt;
pub mod logging;
pub mod options;
pub mod phase;
pub mod runner;

pub use backend::{Backend, BackendLoader, BuildConfiguration, TaskRegistry};
pub use cleanup::{BackgroundCleanup, WorkerReaper};
pub use config::{Config, CONFIG_FILE_NAME};
pub use context::RunContext;
pub use engine::{Engine, RoundEngine, Task};
pub use error::{CleanupError, ConfigError, EngineError, OptionsError, RunError, TaskError};
pub use finalize::{ExecutionOutcome, FinalizeGuard};
pub use interrupt::InterruptFlag;
pub use options::{GlobalOptions, GlobalOverrides, Options};
pub use phase::RunPhase;
pub use runner::{GoalRunner, GoalRunnerBuilder, WORKDIR_NAME};
