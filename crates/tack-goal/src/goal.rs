// goal.rs — Goal: a named, ordered sequence of tasks.
//
// Goals carry only static metadata (task names, quiet flags, option
// declarations). Task implementations live with the execution engine so that
// this crate stays free of run-time types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GoalError;
use crate::options::OptionDecl;

/// Static metadata for one task installed into a goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    /// Task name, unique within its goal.
    pub name: String,

    /// Whether the task suppresses console reporting while it runs.
    #[serde(default)]
    pub quiet: bool,

    /// Options the task reads, registered under `<goal>.<task>`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionDecl>,
}

impl TaskInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quiet: false,
            options: Vec::new(),
        }
    }

    /// Mark the task as one that silences console reporting.
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    pub fn with_option(mut self, decl: OptionDecl) -> Self {
        self.options.push(decl);
        self
    }
}

/// A named goal and its ordered tasks.
///
/// Identity is the name. Goals are built by [`crate::GoalCatalogBuilder`]
/// and are never mutated once the catalog is frozen.
#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    name: String,
    description: String,
    tasks: Vec<TaskInfo>,
}

impl Goal {
    pub(crate) fn new(name: impl Into<String>) -> Result<Self, GoalError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            description: String::new(),
            tasks: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub(crate) fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn tasks(&self) -> &[TaskInfo] {
        &self.tasks
    }

    /// Task names in installation order.
    pub fn ordered_task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn task(&self, name: &str) -> Option<&TaskInfo> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// True if any task of this goal suppresses console reporting.
    pub fn has_quiet_task(&self) -> bool {
        self.tasks.iter().any(|t| t.quiet)
    }

    /// The option scope of one of this goal's tasks.
    pub fn task_scope(&self, task: &str) -> String {
        format!("{}.{}", self.name, task)
    }

    /// Scopes this goal introduces: the goal scope first, then one scope per
    /// task, so that enclosing scopes always precede the scopes they enclose.
    pub fn known_scopes(&self) -> Vec<String> {
        let mut scopes = Vec::with_capacity(self.tasks.len() + 1);
        scopes.push(self.name.clone());
        scopes.extend(self.tasks.iter().map(|t| self.task_scope(&t.name)));
        scopes
    }

    pub(crate) fn install(&mut self, task: TaskInfo) -> Result<(), GoalError> {
        validate_name(&task.name)?;
        if self.task(&task.name).is_some() {
            return Err(GoalError::DuplicateTask {
                goal: self.name.clone(),
                task: task.name,
            });
        }
        self.tasks.push(task);
        Ok(())
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Goal and task names become option scopes and command-line tokens, so they
/// may not contain scope or address separators.
fn validate_name(name: &str) -> Result<(), GoalError> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.starts_with('-') {
        "name starts with '-'"
    } else if name.contains(['.', '/', ':']) || name.chars().any(char::is_whitespace) {
        "name contains '.', '/', ':' or whitespace"
    } else {
        return Ok(());
    };
    Err(GoalError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    })
}
