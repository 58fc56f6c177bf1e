// main.rs — tack: run build goals over targets.
//
//   tack [global flags] <goal|scope|spec|--flag>... [-- <spec>...]
//
// Exit status: 0 on success, the engine's status (1 for unknown goals) on
// failure, 130 when interrupted with Ctrl-C.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tack_runner::{GlobalOverrides, GoalRunner, InterruptFlag, RunError};

mod builtin;

const INTERRUPTED_EXIT: u8 = 130;

#[derive(Parser)]
#[command(name = "tack", version, about = "Run build goals over targets")]
struct Cli {
    /// Build root (defaults to the current directory).
    #[arg(long, default_value = ".")]
    build_root: PathBuf,

    /// Config file (defaults to <build-root>/tack.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Abort on the first target spec that fails to resolve.
    #[arg(long)]
    fail_fast: bool,

    /// Only log errors.
    #[arg(long, short)]
    quiet: bool,

    /// Log level: trace, debug, info, warn or error.
    #[arg(long, short)]
    level: Option<String>,

    /// Also write detailed logs to <LOGDIR>/tack.log.
    #[arg(long)]
    logdir: Option<PathBuf>,

    /// Terminate background workers when the run ends.
    #[arg(long)]
    kill_workers: bool,

    /// Print the execution plan without running it.
    #[arg(long)]
    explain: bool,

    /// Exclude addresses matching this regex from wildcard specs (repeatable).
    #[arg(long, value_name = "REGEX")]
    exclude_target_regexp: Vec<String>,

    /// Exclude this directory or glob from wildcard specs (repeatable).
    #[arg(long, value_name = "PATH")]
    spec_excludes: Vec<String>,

    /// Goals, target specs and scoped flags.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

impl Cli {
    /// Only flags actually given override tack.toml.
    fn overrides(&self) -> GlobalOverrides {
        GlobalOverrides {
            fail_fast: self.fail_fast.then_some(true),
            quiet: self.quiet.then_some(true),
            level: self.level.clone(),
            logdir: self.logdir.clone(),
            kill_workers: self.kill_workers.then_some(true),
            explain: self.explain.then_some(true),
            exclude_target_regexp: non_empty(&self.exclude_target_regexp),
            spec_excludes: non_empty(&self.spec_excludes),
        }
    }
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    (!values.is_empty()).then(|| values.to_vec())
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let interrupt = InterruptFlag::new();
    let handler_flag = interrupt.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        if handler_flag.is_interrupted() {
            // Second Ctrl-C: finalize the run now instead of waiting for
            // the current task, then leave.
            handler_flag.force_shutdown();
            std::process::exit(i32::from(INTERRUPTED_EXIT));
        }
        eprintln!();
        handler_flag.interrupt();
    }) {
        eprintln!("warning: could not install Ctrl-C handler: {}", e);
    }

    run(cli, interrupt)
}

fn run(cli: Cli, interrupt: InterruptFlag) -> Result<ExitCode> {
    let build_root = cli
        .build_root
        .canonicalize()
        .with_context(|| format!("build root {} does not exist", cli.build_root.display()))?;

    // Bare `tack` lists what it can do.
    let args = if cli.args.is_empty() {
        vec!["goals".to_string()]
    } else {
        cli.args.clone()
    };

    let mut builder = GoalRunner::builder(&build_root)
        .args(args)
        .overrides(cli.overrides())
        .backend(Box::new(builtin::CoreBackend::stdout()))
        .default_backends([builtin::CORE_BACKEND])
        .interrupt_flag(interrupt);
    if let Some(config) = &cli.config {
        builder = builder.config_path(config);
    }

    match builder.setup().and_then(GoalRunner::run) {
        Ok(code) => {
            tracing::debug!(code, "tack finished");
            Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
        }
        Err(RunError::Interrupted) => {
            eprintln!("Interrupted by user.");
            Ok(ExitCode::from(INTERRUPTED_EXIT))
        }
        Err(e) => Err(e).context("tack run failed"),
    }
}
