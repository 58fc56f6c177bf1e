// catalog.rs — GoalCatalog: the registered goals of one process.
//
// Backends install tasks into a GoalCatalogBuilder while they load. Once
// loading finishes the builder is frozen into a GoalCatalog, which is
// threaded explicitly through bootstrap, option parsing and execution.
// Catalog order is first-registration order.

use std::collections::HashMap;

use crate::error::GoalError;
use crate::goal::{Goal, TaskInfo};
use crate::options::OptionSchemaBuilder;

/// Mutable catalog used only during backend loading.
#[derive(Debug, Default)]
pub struct GoalCatalogBuilder {
    goals: Vec<Goal>,
}

impl GoalCatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a task into a goal, creating the goal on first use.
    pub fn install(&mut self, goal: &str, task: TaskInfo) -> Result<(), GoalError> {
        self.goal_mut(goal)?.install(task)
    }

    /// Set the one-line description shown by `tack goals`.
    pub fn describe(&mut self, goal: &str, description: &str) -> Result<(), GoalError> {
        self.goal_mut(goal)?.set_description(description);
        Ok(())
    }

    fn goal_mut(&mut self, name: &str) -> Result<&mut Goal, GoalError> {
        let index = match self.goals.iter().position(|g| g.name() == name) {
            Some(index) => index,
            None => {
                self.goals.push(Goal::new(name)?);
                self.goals.len() - 1
            }
        };
        Ok(&mut self.goals[index])
    }

    pub fn build(self) -> GoalCatalog {
        let index = self
            .goals
            .iter()
            .enumerate()
            .map(|(i, g)| (g.name().to_string(), i))
            .collect();
        GoalCatalog {
            goals: self.goals,
            index,
        }
    }
}

/// Immutable, ordered collection of goals.
#[derive(Debug, Clone, Default)]
pub struct GoalCatalog {
    goals: Vec<Goal>,
    index: HashMap<String, usize>,
}

impl GoalCatalog {
    /// All goals in catalog order.
    pub fn all(&self) -> impl Iterator<Item = &Goal> {
        self.goals.iter()
    }

    pub fn by_name(&self, name: &str) -> Option<&Goal> {
        self.index.get(name).map(|&i| &self.goals[i])
    }

    /// A goal counts as known only if it has at least one task.
    pub fn is_known_goal(&self, name: &str) -> bool {
        self.by_name(name).is_some_and(|g| !g.tasks().is_empty())
    }

    /// Whether `scope` is a goal scope (`compile`) or a task scope
    /// (`compile.java`) of this catalog.
    pub fn is_scope(&self, scope: &str) -> bool {
        match scope.split_once('.') {
            Some((goal, task)) => self
                .by_name(goal)
                .is_some_and(|g| g.task(task).is_some()),
            None => self.by_name(scope).is_some(),
        }
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }

    /// Register every task's option declarations under its task scope,
    /// goal by goal in catalog order.
    pub fn register_options(&self, schema: &mut OptionSchemaBuilder) -> Result<(), GoalError> {
        for goal in &self.goals {
            for task in goal.tasks() {
                let scope = goal.task_scope(&task.name);
                for decl in &task.options {
                    schema.register(&scope, decl.clone())?;
                }
            }
            tracing::debug!(goal = goal.name(), "registered goal options");
        }
        Ok(())
    }
}
