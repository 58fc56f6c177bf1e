// engine.rs — Task and Engine traits, and the default RoundEngine.
//
// The runner makes one blocking call, Engine::execute, and gets back a
// status: 0 for success, non-zero when a task failed. Only interruption
// and internal faults come back as errors.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use tack_goal::Goal;
use tack_tracker::{LogLevel, WorkUnitLabel};

use crate::backend::TaskRegistry;
use crate::context::RunContext;
use crate::error::{EngineError, TaskError};

/// One unit of work a backend installs into a goal.
pub trait Task: Send + Sync {
    fn execute(&self, context: &RunContext) -> Result<(), TaskError>;
}

pub trait Engine {
    fn execute(&self, context: &RunContext, goals: &[Goal]) -> Result<i32, EngineError>;
}

/// Runs one round per goal, in request order, and each goal's tasks in
/// installation order. Stops at the first failing task.
pub struct RoundEngine {
    tasks: Arc<TaskRegistry>,
    explain_out: Mutex<Box<dyn Write + Send>>,
}

impl RoundEngine {
    /// `--explain` plans go to stdout.
    pub fn new(tasks: Arc<TaskRegistry>) -> Self {
        Self {
            tasks,
            explain_out: Mutex::new(Box::new(io::stdout())),
        }
    }

    /// Send `--explain` plans to `out` instead of stdout.
    pub fn with_explain_output(mut self, out: Box<dyn Write + Send>) -> Self {
        self.explain_out = Mutex::new(out);
        self
    }

    fn run_goal(&self, context: &RunContext, goal: &Goal) -> Result<i32, EngineError> {
        let tracker = context.tracker();
        for info in goal.tasks() {
            if context.is_interrupted() {
                return Err(EngineError::Interrupted);
            }

            let scope = goal.task_scope(&info.name);
            let task = self.tasks.get(goal.name(), &info.name).ok_or_else(|| {
                EngineError::Internal(format!("no implementation registered for task {}", scope))
            })?;

            let result =
                tracker.with_workunit(&scope, &[WorkUnitLabel::Task], || task.execute(context));
            match result {
                Ok(()) => {}
                Err(TaskError::Interrupted) => return Err(EngineError::Interrupted),
                Err(e) => {
                    tracker.log(LogLevel::Error, format!("{} failed: {}", scope, e));
                    return Ok(1);
                }
            }
        }
        Ok(0)
    }

    /// `--explain`: print the plan, run nothing.
    fn explain(&self, goals: &[Goal]) -> Result<(), EngineError> {
        let mut out = self
            .explain_out
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let write_failed = |e: io::Error| EngineError::Internal(format!("failed to write plan: {}", e));
        for goal in goals {
            writeln!(out, "Goal {}: {}", goal.name(), goal.ordered_task_names().join(", "))
                .map_err(write_failed)?;
        }
        out.flush().map_err(write_failed)
    }
}

impl Engine for RoundEngine {
    fn execute(&self, context: &RunContext, goals: &[Goal]) -> Result<i32, EngineError> {
        if context.options().global().explain {
            self.explain(goals)?;
            return Ok(0);
        }

        let tracker = context.tracker();
        for goal in goals {
            let code =
                tracker.with_workunit(goal.name(), &[WorkUnitLabel::Goal], || self.run_goal(context, goal))?;
            if code != 0 {
                return Ok(code);
            }
        }
        Ok(0)
    }
}
