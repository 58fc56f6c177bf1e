// context.rs — RunContext: everything a run resolved, handed to the engine.
//
// Built exactly once per run, after goal and spec resolution, and only read
// afterwards.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tack_goal::{Goal, GoalCatalog};
use tack_graph::{Target, TargetGraph};
use tack_tracker::{LogLevel, RunTracker};

use crate::config::Config;
use crate::interrupt::InterruptFlag;
use crate::options::Options;

pub struct RunContext {
    pub(crate) build_root: PathBuf,
    pub(crate) config: Arc<Config>,
    pub(crate) options: Arc<Options>,
    pub(crate) catalog: Arc<GoalCatalog>,
    pub(crate) target_roots: Vec<Arc<Target>>,
    pub(crate) requested_goals: Vec<String>,
    pub(crate) goals: Vec<Goal>,
    pub(crate) graph: Arc<TargetGraph>,
    pub(crate) tracker: Arc<RunTracker>,
    pub(crate) interrupt: InterruptFlag,
}

impl RunContext {
    pub fn build_root(&self) -> &Path {
        &self.build_root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn catalog(&self) -> &GoalCatalog {
        &self.catalog
    }

    /// Targets named on the command line, in spec order. A target named by
    /// two overlapping specs appears twice.
    pub fn target_roots(&self) -> &[Arc<Target>] {
        &self.target_roots
    }

    /// Goal names as requested, including unknown ones.
    pub fn requested_goals(&self) -> &[String] {
        &self.requested_goals
    }

    /// The resolved (known) goals, in request order.
    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn graph(&self) -> &TargetGraph {
        &self.graph
    }

    pub fn tracker(&self) -> &Arc<RunTracker> {
        &self.tracker
    }

    pub fn spec_excludes(&self) -> &[String] {
        &self.options.global().spec_excludes
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupt.is_interrupted()
    }

    /// Log through the run tracker so the message lands in every report.
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.tracker.log(level, message);
    }
}
