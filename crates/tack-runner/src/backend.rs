// backend.rs — Compiled-in backends and the loader that installs them.
//
// A backend registers goals and tasks: static task metadata into the goal
// catalog builder, task implementations into the task registry. The loader
// knows every backend compiled into the binary by name and installs the
// ones tack.toml asks for.

use std::collections::HashMap;
use std::sync::Arc;

use tack_goal::{GoalCatalog, GoalCatalogBuilder, GoalError, TaskInfo};

use crate::engine::Task;
use crate::error::RunError;

/// Task implementations keyed by goal and task name.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: HashMap<(String, String), Arc<dyn Task>>,
}

impl TaskRegistry {
    pub fn get(&self, goal: &str, task: &str) -> Option<Arc<dyn Task>> {
        self.tasks
            .get(&(goal.to_string(), task.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// What backends register into while loading.
#[derive(Default)]
pub struct BuildConfiguration {
    catalog: GoalCatalogBuilder,
    tasks: TaskRegistry,
    loaded: Vec<String>,
}

impl BuildConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `task` into `goal`, creating the goal on first use.
    pub fn register_task(
        &mut self,
        goal: &str,
        info: TaskInfo,
        task: Arc<dyn Task>,
    ) -> Result<(), GoalError> {
        let key = (goal.to_string(), info.name.clone());
        self.catalog.install(goal, info)?;
        self.tasks.tasks.insert(key, task);
        Ok(())
    }

    pub fn describe_goal(&mut self, goal: &str, description: &str) -> Result<(), GoalError> {
        self.catalog.describe(goal, description)
    }

    /// Names of the backends loaded so far, in load order.
    pub fn loaded(&self) -> &[String] {
        &self.loaded
    }

    /// Freeze the catalog.
    pub fn finish(self) -> (GoalCatalog, TaskRegistry) {
        (self.catalog.build(), self.tasks)
    }
}

pub trait Backend: Send + Sync {
    fn name(&self) -> &str;

    fn register(&self, build_config: &mut BuildConfiguration) -> Result<(), GoalError>;
}

/// Registry of compiled-in backends.
#[derive(Default)]
pub struct BackendLoader {
    available: Vec<Box<dyn Backend>>,
}

impl BackendLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a backend. A later backend with the same name replaces an
    /// earlier one.
    pub fn add(&mut self, backend: Box<dyn Backend>) {
        self.available.retain(|b| b.name() != backend.name());
        self.available.push(backend);
    }

    pub fn with(mut self, backend: Box<dyn Backend>) -> Self {
        self.add(backend);
        self
    }

    pub fn available(&self) -> Vec<String> {
        self.available.iter().map(|b| b.name().to_string()).collect()
    }

    /// Load `plugins` then `backend_packages`, in order, each name once.
    pub fn load(
        &self,
        plugins: &[String],
        backend_packages: &[String],
    ) -> Result<BuildConfiguration, RunError> {
        let mut build_config = BuildConfiguration::new();
        for name in plugins.iter().chain(backend_packages) {
            if build_config.loaded.iter().any(|loaded| loaded == name) {
                continue;
            }
            let backend = self
                .available
                .iter()
                .find(|b| b.name() == name)
                .ok_or_else(|| RunError::UnknownBackend {
                    name: name.clone(),
                    available: self.available(),
                })?;
            backend.register(&mut build_config)?;
            tracing::debug!(backend = %name, "loaded backend");
            build_config.loaded.push(name.clone());
        }
        Ok(build_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunContext;
    use crate::error::TaskError;

    struct Noop;

    impl Task for Noop {
        fn execute(&self, _context: &RunContext) -> Result<(), TaskError> {
            Ok(())
        }
    }

    struct Fixed {
        name: &'static str,
        goal: &'static str,
        task: &'static str,
    }

    impl Backend for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn register(&self, build_config: &mut BuildConfiguration) -> Result<(), GoalError> {
            build_config.register_task(self.goal, TaskInfo::new(self.task), Arc::new(Noop))
        }
    }

    fn loader() -> BackendLoader {
        BackendLoader::new()
            .with(Box::new(Fixed {
                name: "jvm",
                goal: "compile",
                task: "java",
            }))
            .with(Box::new(Fixed {
                name: "lint",
                goal: "lint",
                task: "checkstyle",
            }))
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn plugins_load_before_backends_and_once() {
        let build_config = loader()
            .load(&names(&["lint"]), &names(&["jvm", "lint"]))
            .unwrap();
        assert_eq!(build_config.loaded(), ["lint", "jvm"]);

        let (catalog, tasks) = build_config.finish();
        let goals: Vec<&str> = catalog.all().map(|g| g.name()).collect();
        assert_eq!(goals, vec!["lint", "compile"]);
        assert!(tasks.get("compile", "java").is_some());
        assert_eq!(tasks.len(), 2);
    }

    #[test]
    fn unknown_backend() {
        let err = loader().load(&[], &names(&["python"])).err().unwrap();
        assert!(matches!(err, RunError::UnknownBackend { ref name, .. } if name == "python"));
    }
}
