// runner.rs — GoalRunner: one tack run from command line to exit status.
//
// `GoalRunner::builder(..).setup()` covers Bootstrapping and Resolving:
//
//   1. load tack.toml
//   2. load plugins, then backends; freeze the goal catalog
//   3. compute the known option scopes
//   4. build the option schema and parse the command line
//   5. set up logging
//   6. start the run tracker and its report
//   7. parse the bootstrap build files
//   8. record SCM info
//   9. expand goals and specs into the target graph
//
// `run()` covers Executing and Finalizing. Execution is wrapped in a
// FinalizeGuard, so the tracker is closed before workers are terminated on
// every exit path, panics included. From tracker start until the run is
// finalized the interrupt flag carries a shutdown hook doing the same, for
// a forced shutdown that cannot wait for the running task.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tack_goal::{known_scopes, Goal, GoalCatalog, OptionDecl, OptionSchemaBuilder, RUN_TRACKER_SCOPE};
use tack_graph::{AddressMapper, BuildFileMapper, CmdLineSpecParser, Target, TargetGraph, BUILD_FILE_NAME};
use tack_tracker::{ConsoleReport, JsonlReport, LogLevel, Report, ReportSink, RunTracker, WorkUnitLabel, WorkUnitOutcome};

use crate::backend::BackendLoader;
use crate::cleanup::{BackgroundCleanup, WorkerReaper};
use crate::config::{Config, CONFIG_FILE_NAME};
use crate::context::RunContext;
use crate::engine::{Engine, RoundEngine};
use crate::error::RunError;
use crate::finalize::{shutdown_hook, ExecutionOutcome, FinalizeGuard};
use crate::interrupt::InterruptFlag;
use crate::logging;
use crate::options::{GlobalOptions, GlobalOverrides, Options};
use crate::phase::RunPhase;

/// Per-build-root scratch directory: run reports and worker pid files.
pub const WORKDIR_NAME: &str = ".tack.d";

const REPORT_URL_BASE: &str = "report-url-base";

pub struct GoalRunnerBuilder {
    build_root: PathBuf,
    config_path: Option<PathBuf>,
    args: Vec<String>,
    overrides: GlobalOverrides,
    loader: BackendLoader,
    default_backends: Vec<String>,
    engine: Option<Box<dyn Engine>>,
    explain_output: Option<Box<dyn Write + Send>>,
    cleanup: Option<Arc<dyn BackgroundCleanup>>,
    mapper: Option<Arc<dyn AddressMapper>>,
    interrupt: InterruptFlag,
    report_sinks: Vec<Box<dyn ReportSink>>,
    console: bool,
}

impl GoalRunnerBuilder {
    /// Path to the config file. Defaults to `<build_root>/tack.toml`.
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Goals, target specs and scoped flags, as typed after the global flags.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn overrides(mut self, overrides: GlobalOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Make a compiled-in backend available for loading by name.
    pub fn backend(mut self, backend: Box<dyn crate::backend::Backend>) -> Self {
        self.loader.add(backend);
        self
    }

    /// Backends loaded when `[backends] packages` is not configured.
    pub fn default_backends<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_backends = names.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the default RoundEngine.
    pub fn engine(mut self, engine: Box<dyn Engine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Where the default RoundEngine prints `--explain` plans (stdout
    /// otherwise).
    pub fn explain_output(mut self, out: Box<dyn Write + Send>) -> Self {
        self.explain_output = Some(out);
        self
    }

    /// Replace the default WorkerReaper.
    pub fn cleanup(mut self, cleanup: Arc<dyn BackgroundCleanup>) -> Self {
        self.cleanup = Some(cleanup);
        self
    }

    /// Replace the default BUILD.toml mapper.
    pub fn mapper(mut self, mapper: Arc<dyn AddressMapper>) -> Self {
        self.mapper = Some(mapper);
        self
    }

    pub fn interrupt_flag(mut self, interrupt: InterruptFlag) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Add a sink to the run's report, next to the console and JSONL sinks.
    pub fn report_sink(mut self, sink: Box<dyn ReportSink>) -> Self {
        self.report_sinks.push(sink);
        self
    }

    /// Whether to report to the console (default true).
    pub fn console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    /// Bootstrap and resolve. Errors here are fatal to the run; if the
    /// tracker had already started it is closed with a failed outcome.
    pub fn setup(self) -> Result<GoalRunner, RunError> {
        let mut phase = RunPhase::Idle;
        advance(&mut phase, RunPhase::Bootstrapping)?;

        let build_root = self.build_root.clone();
        let config_path = self
            .config_path
            .clone()
            .unwrap_or_else(|| build_root.join(CONFIG_FILE_NAME));
        let config = Config::load(&config_path)?;

        let plugins = config.get_list("backends", "plugins", &[])?;
        let defaults: Vec<&str> = self.default_backends.iter().map(String::as_str).collect();
        let packages = config.get_list("backends", "packages", &defaults)?;
        let (catalog, tasks) = self.loader.load(&plugins, &packages)?.finish();

        let scopes = known_scopes(&catalog);
        let mut schema = OptionSchemaBuilder::new(&scopes);
        register_tracker_options(&mut schema)?;
        catalog.register_options(&mut schema)?;
        let global = GlobalOptions::resolve(&config, &self.overrides)?;
        let options = Options::parse(&self.args, schema.build(), &catalog, &config, global)?;

        logging::setup_logging(
            &options.global().level,
            options.global().quiet,
            options.global().logdir.as_deref(),
        )?;

        let workdir = build_root.join(WORKDIR_NAME);
        let report_url_base = options
            .get(RUN_TRACKER_SCOPE, REPORT_URL_BASE)
            .and_then(|v| v.as_str())
            .filter(|base| !base.is_empty())
            .map(str::to_string);
        let tracker = Arc::new(RunTracker::new(workdir.join("runs"), report_url_base.as_deref()));
        let mut report = Report::new();
        if self.console {
            report.add_sink(Box::new(ConsoleReport));
        }
        report.add_sink(Box::new(JsonlReport::open(tracker.events_path())?));
        for sink in self.report_sinks {
            report.add_sink(sink);
        }
        tracker.start(report)?;
        match tracker.report_url() {
            Some(url) => tracker.log(LogLevel::Info, format!("See a report at: {}", url)),
            None => tracker.log(
                LogLevel::Debug,
                "(To see a run report, set report_url_base under [run-tracker] in tack.toml)",
            ),
        }

        let mapper = self
            .mapper
            .unwrap_or_else(|| Arc::new(BuildFileMapper::new(&build_root)));

        let mut runner = GoalRunner {
            build_root,
            config: Arc::new(config),
            options: Arc::new(options),
            catalog: Arc::new(catalog),
            tracker: Arc::clone(&tracker),
            mapper: Arc::clone(&mapper),
            graph: TargetGraph::new(mapper),
            targets: Vec::new(),
            engine: match self.engine {
                Some(engine) => engine,
                None => {
                    let engine = RoundEngine::new(Arc::new(tasks));
                    match self.explain_output {
                        Some(out) => Box::new(engine.with_explain_output(out)),
                        None => Box::new(engine),
                    }
                }
            },
            cleanup: self
                .cleanup
                .unwrap_or_else(|| Arc::new(WorkerReaper::new(&workdir))),
            interrupt: self.interrupt,
            phase,
        };

        runner.interrupt.set_shutdown_hook(shutdown_hook(
            Arc::clone(&tracker),
            Arc::clone(&runner.cleanup),
        ));

        if let Err(e) = runner.finish_setup() {
            runner.interrupt.clear_shutdown_hook();
            runner.phase = RunPhase::Failed;
            tracker.log(LogLevel::Error, e.to_string());
            tracker.set_root_outcome(WorkUnitOutcome::Failure);
            if let Err(end_err) = tracker.end() {
                tracing::error!("failed to close run tracker: {}", end_err);
            }
            return Err(e);
        }
        Ok(runner)
    }
}

fn advance(phase: &mut RunPhase, next: RunPhase) -> Result<(), RunError> {
    if !phase.can_transition_to(next) {
        return Err(RunError::InvalidTransition {
            from: *phase,
            to: next,
        });
    }
    tracing::trace!(from = %phase, to = %next, "run phase");
    *phase = next;
    Ok(())
}

fn register_tracker_options(schema: &mut OptionSchemaBuilder) -> Result<(), RunError> {
    schema.register(
        RUN_TRACKER_SCOPE,
        OptionDecl::string(
            REPORT_URL_BASE,
            "",
            "Base URL under which run reports are served.",
        ),
    )?;
    Ok(())
}

/// The run lifecycle controller.
pub struct GoalRunner {
    build_root: PathBuf,
    config: Arc<Config>,
    options: Arc<Options>,
    catalog: Arc<GoalCatalog>,
    tracker: Arc<RunTracker>,
    mapper: Arc<dyn AddressMapper>,
    graph: TargetGraph,
    targets: Vec<Arc<Target>>,
    engine: Box<dyn Engine>,
    cleanup: Arc<dyn BackgroundCleanup>,
    interrupt: InterruptFlag,
    phase: RunPhase,
}

impl GoalRunner {
    pub fn builder(build_root: impl Into<PathBuf>) -> GoalRunnerBuilder {
        GoalRunnerBuilder {
            build_root: build_root.into(),
            config_path: None,
            args: Vec::new(),
            overrides: GlobalOverrides::default(),
            loader: BackendLoader::new(),
            default_backends: Vec::new(),
            engine: None,
            explain_output: None,
            cleanup: None,
            mapper: None,
            interrupt: InterruptFlag::new(),
            report_sinks: Vec::new(),
            console: true,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn build_root(&self) -> &Path {
        &self.build_root
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn catalog(&self) -> &GoalCatalog {
        &self.catalog
    }

    pub fn tracker(&self) -> &Arc<RunTracker> {
        &self.tracker
    }

    /// Targets resolved from the command-line specs, in spec order.
    pub fn targets(&self) -> &[Arc<Target>] {
        &self.targets
    }

    pub fn graph(&self) -> &TargetGraph {
        &self.graph
    }

    /// Bootstrap steps 7 to 9.
    fn finish_setup(&mut self) -> Result<(), RunError> {
        let tracker = Arc::clone(&self.tracker);
        tracker.with_workunit("bootstrap", &[WorkUnitLabel::Setup], || {
            self.parse_bootstrap_buildfiles()
        })?;

        if let Err(e) = tracker.add_scm_info(&self.build_root) {
            tracing::warn!("could not record scm info: {}", e);
        }

        advance(&mut self.phase, RunPhase::Resolving)?;
        tracker.with_workunit("setup", &[WorkUnitLabel::Setup], || {
            tracker.with_workunit("parse", &[WorkUnitLabel::Setup], || {
                self.expand_goals_and_specs()
            })
        })
    }

    fn parse_bootstrap_buildfiles(&self) -> Result<(), RunError> {
        let paths = self.config.get_list("goals", "bootstrap_buildfiles", &[])?;
        for path in paths {
            let dir = bootstrap_dir(&self.build_root, &path);
            let addresses = self
                .mapper
                .addresses_in(&dir)
                .map_err(|source| RunError::BootstrapBuildFile {
                    path: path.clone(),
                    source,
                })?;
            tracing::debug!(path = %path, targets = addresses.len(), "parsed bootstrap build file");
        }
        Ok(())
    }

    fn expand_goals_and_specs(&mut self) -> Result<(), RunError> {
        for goal in self.options.goals() {
            if self.mapper.has_build_file(goal) {
                self.tracker.log(
                    LogLevel::Warn,
                    format!(
                        "Command-line argument '{}' is ambiguous and was assumed to be a goal. \
                         If this is incorrect, disambiguate it with the './' prefix.",
                        goal
                    ),
                );
            }
        }

        let global = self.options.global();
        let mut parser = CmdLineSpecParser::new(
            &self.build_root,
            Arc::clone(&self.mapper),
            &global.spec_excludes,
            &global.exclude_target_regexp,
        )?;
        for spec in self.options.target_specs() {
            for address in parser.parse_addresses(spec, global.fail_fast)? {
                let target = self.graph.inject_address_closure(&address)?;
                self.targets.push(target);
            }
        }

        let errors = parser.take_errors();
        if !errors.is_empty() {
            self.tracker.add_info("spec_errors", errors.len().to_string());
        }
        tracing::debug!(
            targets = self.targets.len(),
            graph = self.graph.len(),
            "resolved target specs"
        );
        Ok(())
    }

    /// Execute and finalize. Returns the exit status (0 on success), or
    /// re-raises an interrupt or internal error once finalization is done.
    pub fn run(mut self) -> Result<i32, RunError> {
        advance(&mut self.phase, RunPhase::Executing)?;
        let guard = FinalizeGuard::new(
            Arc::clone(&self.tracker),
            Arc::clone(&self.cleanup),
            self.options.global().kill_workers,
        );

        let outcome = self.do_run();

        self.phase = RunPhase::Finalizing;
        let result = guard.finalize(outcome);
        self.interrupt.clear_shutdown_hook();
        self.phase = if matches!(result, Ok(0)) {
            RunPhase::Done
        } else {
            RunPhase::Failed
        };
        tracing::debug!(phase = %self.phase, "run finished");
        result
    }

    fn do_run(&mut self) -> ExecutionOutcome {
        let (goals, unknown) = resolve_goals(&self.catalog, self.options.goals());

        let quiet = self.options.global().explain || goals.iter().any(Goal::has_quiet_task);
        self.tracker.update_reporting(quiet);

        let context = RunContext {
            build_root: self.build_root.clone(),
            config: Arc::clone(&self.config),
            options: Arc::clone(&self.options),
            catalog: Arc::clone(&self.catalog),
            target_roots: self.targets.clone(),
            requested_goals: self.options.goals().to_vec(),
            goals,
            graph: Arc::new(std::mem::replace(
                &mut self.graph,
                TargetGraph::new(Arc::clone(&self.mapper)),
            )),
            tracker: Arc::clone(&self.tracker),
            interrupt: self.interrupt.clone(),
        };

        if !unknown.is_empty() {
            self.tracker.log(
                LogLevel::Error,
                format!("Unknown goal(s): {}", unknown.join(" ")),
            );
            return ExecutionOutcome::EngineFailure(1);
        }

        if context.is_interrupted() {
            return ExecutionOutcome::Interrupted;
        }

        self.engine.execute(&context, context.goals()).into()
    }
}

/// Split requested goal names into known goals and unknown names, both in
/// request order.
fn resolve_goals(catalog: &GoalCatalog, requested: &[String]) -> (Vec<Goal>, Vec<String>) {
    let mut goals = Vec::new();
    let mut unknown = Vec::new();
    for name in requested {
        match catalog.by_name(name) {
            Some(goal) if catalog.is_known_goal(name) => goals.push(goal.clone()),
            _ => unknown.push(name.clone()),
        }
    }
    (goals, unknown)
}

/// Bootstrap entries may name a BUILD.toml or its directory, relative to
/// the build root or absolute beneath it.
fn bootstrap_dir(build_root: &Path, path: &str) -> String {
    let path = Path::new(path);
    let relative = path.strip_prefix(build_root).unwrap_or(path);
    let relative = if relative.file_name().is_some_and(|name| name == BUILD_FILE_NAME) {
        relative.parent().unwrap_or(Path::new(""))
    } else {
        relative
    };
    relative
        .to_string_lossy()
        .trim_start_matches("./")
        .trim_end_matches('/')
        .to_string()
}
