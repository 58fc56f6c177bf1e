// builtin.rs — The `core` backend compiled into tack.
//
// Goals:
//   goals   list the registered goals and their tasks (quiet)
//   list    print the addresses named by the target specs
//   deps    print the transitive dependency closure of those targets

use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use tack_goal::{GoalError, OptionDecl, TaskInfo};
use tack_graph::Target;
use tack_runner::{Backend, BuildConfiguration, RunContext, Task, TaskError};

pub const CORE_BACKEND: &str = "core";

/// Where builtin goals print their results.
pub type Output = Arc<Mutex<Box<dyn Write + Send>>>;

pub struct CoreBackend {
    out: Output,
}

impl CoreBackend {
    pub fn new(out: Output) -> Self {
        Self { out }
    }

    pub fn stdout() -> Self {
        Self::new(Arc::new(Mutex::new(Box::new(io::stdout()))))
    }
}

impl Backend for CoreBackend {
    fn name(&self) -> &str {
        CORE_BACKEND
    }

    fn register(&self, build_config: &mut BuildConfiguration) -> Result<(), GoalError> {
        build_config.register_task(
            "goals",
            TaskInfo::new("goals").quiet(),
            Arc::new(GoalsTask(Arc::clone(&self.out))),
        )?;
        build_config.describe_goal("goals", "List all installed goals.")?;

        build_config.register_task(
            "list",
            TaskInfo::new("list").with_option(OptionDecl::string(
                "sep",
                "\n",
                "Separator printed between addresses.",
            )),
            Arc::new(ListTask(Arc::clone(&self.out))),
        )?;
        build_config.describe_goal("list", "List the targets named on the command line.")?;

        build_config.register_task(
            "deps",
            TaskInfo::new("deps").with_option(OptionDecl::bool(
                "include-roots",
                true,
                "Also print the targets named on the command line.",
            )),
            Arc::new(DepsTask(Arc::clone(&self.out))),
        )?;
        build_config.describe_goal("deps", "Print the transitive dependencies of targets.")?;
        Ok(())
    }
}

fn write_lines(out: &Output, lines: &[String], sep: &str) -> Result<(), TaskError> {
    let mut out = out.lock().unwrap_or_else(|p| p.into_inner());
    let write_failed = |e: io::Error| TaskError::Failed(format!("failed to write output: {}", e));
    for line in lines {
        write!(out, "{}{}", line, sep).map_err(write_failed)?;
    }
    out.flush().map_err(write_failed)
}

/// Each target once, in first-seen order.
fn unique(targets: &[Arc<Target>]) -> Vec<String> {
    let mut seen = HashSet::new();
    targets
        .iter()
        .map(|t| t.address.to_string())
        .filter(|a| seen.insert(a.clone()))
        .collect()
}

struct GoalsTask(Output);

impl Task for GoalsTask {
    fn execute(&self, context: &RunContext) -> Result<(), TaskError> {
        let mut lines = vec!["Installed goals:".to_string()];
        for goal in context.catalog().all() {
            if goal.tasks().is_empty() {
                continue;
            }
            lines.push(format!("  {}: {}", goal.name(), goal.description()));
            lines.push(format!("      tasks: {}", goal.ordered_task_names().join(", ")));
        }
        write_lines(&self.0, &lines, "\n")
    }
}

struct ListTask(Output);

impl Task for ListTask {
    fn execute(&self, context: &RunContext) -> Result<(), TaskError> {
        let sep = context
            .options()
            .get("list.list", "sep")
            .and_then(|v| v.as_str())
            .unwrap_or("\n")
            .replace("\\n", "\n");
        write_lines(&self.0, &unique(context.target_roots()), &sep)
    }
}

struct DepsTask(Output);

impl Task for DepsTask {
    fn execute(&self, context: &RunContext) -> Result<(), TaskError> {
        let include_roots = context
            .options()
            .get("deps.deps", "include-roots")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);
        let roots: HashSet<String> = unique(context.target_roots()).into_iter().collect();
        let closure = context.graph().closure(context.target_roots());
        let lines: Vec<String> = unique(&closure)
            .into_iter()
            .filter(|address| include_roots || !roots.contains(address))
            .collect();
        write_lines(&self.0, &lines, "\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tack_graph::{AddressMapper, InMemoryAddressMapper};
    use tack_runner::GoalRunner;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Buffer {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn mapper() -> Arc<dyn AddressMapper> {
        let mut mapper = InMemoryAddressMapper::new();
        mapper.declare("src/app:app", &["src/lib:lib"]).unwrap();
        mapper.declare("src/lib:lib", &["3rdparty:serde"]).unwrap();
        mapper.declare("3rdparty:serde", &[]).unwrap();
        Arc::new(mapper)
    }

    fn run(args: &[&str]) -> (i32, String) {
        let root = tempfile::tempdir().unwrap();
        let buffer = Buffer::default();
        let out: Output = Arc::new(Mutex::new(Box::new(buffer.clone())));
        let code = GoalRunner::builder(root.path())
            .args(args.iter().copied())
            .backend(Box::new(CoreBackend::new(out)))
            .default_backends([CORE_BACKEND])
            .mapper(mapper())
            .console(false)
            .setup()
            .unwrap()
            .run()
            .unwrap();
        (code, buffer.text())
    }

    #[test]
    fn list_prints_each_target_once() {
        let (code, out) = run(&["list", "src/app", "3rdparty:serde", "src/app:app"]);
        assert_eq!(code, 0);
        assert_eq!(out, "src/app:app\n3rdparty:serde\n");
    }

    #[test]
    fn list_separator_option() {
        let (_, out) = run(&["list", "--sep=,", "src/app", "src/lib"]);
        assert_eq!(out, "src/app:app,src/lib:lib,");
    }

    #[test]
    fn deps_prints_closure_dependencies_first() {
        let (_, out) = run(&["deps", "src/app"]);
        assert_eq!(out, "3rdparty:serde\nsrc/lib:lib\nsrc/app:app\n");

        let (_, out) = run(&["deps", "--no-include-roots", "src/app"]);
        assert_eq!(out, "3rdparty:serde\nsrc/lib:lib\n");
    }

    #[test]
    fn goals_lists_the_catalog() {
        let (code, out) = run(&["goals"]);
        assert_eq!(code, 0);
        assert!(out.starts_with("Installed goals:\n"));
        assert!(out.contains("  list: List the targets named on the command line.\n"));
        assert!(out.contains("      tasks: deps\n"));
    }
}
