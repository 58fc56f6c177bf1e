// options.rs — Global options and the command-line splitter for goals,
// target specs and scoped flags.
//
// Global options come from three layers: command-line flags (parsed by the
// binary and handed over as GlobalOverrides), the [global] section of
// tack.toml, and built-in defaults. Everything after the global flags is
// split here:
//
//   tack compile --jobs=4 compile.java --no-debug test src/app:: -- ./odd:spec
//
// Scoped flags are validated against the OptionSchema built from the goal
// catalog, and fall back to [<scope>] config values, then declared defaults.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tack_goal::{GoalCatalog, OptionDecl, OptionKind, OptionSchema, OptionValue, GLOBAL_SCOPE};
use toml::Value;

use crate::config::Config;
use crate::error::{ConfigError, OptionsError};

/// Options that apply to the whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalOptions {
    /// Abort on the first spec resolution error.
    pub fail_fast: bool,

    /// Only log errors.
    pub quiet: bool,

    /// Log level: trace, debug, info, warn or error.
    pub level: String,

    /// Directory for the full-detail log file.
    pub logdir: Option<PathBuf>,

    /// Terminate background workers when the run ends.
    pub kill_workers: bool,

    /// Print the execution plan instead of running tasks.
    pub explain: bool,

    /// Regexes that exclude addresses from wildcard specs.
    pub exclude_target_regexp: Vec<String>,

    /// Directories (prefixes or globs) excluded from wildcard specs.
    pub spec_excludes: Vec<String>,
}

impl Default for GlobalOptions {
    fn default() -> Self {
        Self {
            fail_fast: false,
            quiet: false,
            level: "info".to_string(),
            logdir: None,
            kill_workers: false,
            explain: false,
            exclude_target_regexp: Vec::new(),
            spec_excludes: Vec::new(),
        }
    }
}

impl GlobalOptions {
    /// Defaults overlaid with the `[global]` config section.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let Some(section) = config.section("global") else {
            return Ok(Self::default());
        };
        Value::Table(section.clone())
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse {
                path: config
                    .path()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|| PathBuf::from(crate::config::CONFIG_FILE_NAME)),
                message: format!("[global]: {}", e),
            })
    }

    /// Resolve with command-line flags taking precedence over config.
    pub fn resolve(config: &Config, overrides: &GlobalOverrides) -> Result<Self, OptionsError> {
        let mut options = Self::from_config(config)?;
        overrides.apply_to(&mut options);
        Ok(options)
    }
}

/// Global option values given on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct GlobalOverrides {
    pub fail_fast: Option<bool>,
    pub quiet: Option<bool>,
    pub level: Option<String>,
    pub logdir: Option<PathBuf>,
    pub kill_workers: Option<bool>,
    pub explain: Option<bool>,
    pub exclude_target_regexp: Option<Vec<String>>,
    pub spec_excludes: Option<Vec<String>>,
}

impl GlobalOverrides {
    fn apply_to(&self, options: &mut GlobalOptions) {
        if let Some(v) = self.fail_fast {
            options.fail_fast = v;
        }
        if let Some(v) = self.quiet {
            options.quiet = v;
        }
        if let Some(v) = &self.level {
            options.level = v.clone();
        }
        if let Some(v) = &self.logdir {
            options.logdir = Some(v.clone());
        }
        if let Some(v) = self.kill_workers {
            options.kill_workers = v;
        }
        if let Some(v) = self.explain {
            options.explain = v;
        }
        if let Some(v) = &self.exclude_target_regexp {
            options.exclude_target_regexp = v.clone();
        }
        if let Some(v) = &self.spec_excludes {
            options.spec_excludes = v.clone();
        }
    }
}

/// Fully parsed options for one run.
#[derive(Debug, Clone)]
pub struct Options {
    global: GlobalOptions,
    goals: Vec<String>,
    target_specs: Vec<String>,
    schema: OptionSchema,
    /// Explicit values (config or flag) keyed by scope, then option name.
    values: BTreeMap<String, BTreeMap<String, OptionValue>>,
}

enum CurrentScope {
    None,
    Known(String),
    UnknownGoal(String),
}

impl Options {
    /// Split `args` into goals, target specs and scoped flags.
    pub fn parse(
        args: &[String],
        schema: OptionSchema,
        catalog: &GoalCatalog,
        config: &Config,
        global: GlobalOptions,
    ) -> Result<Self, OptionsError> {
        let mut options = Self {
            global,
            goals: Vec::new(),
            target_specs: Vec::new(),
            values: config_values(&schema, config)?,
            schema,
        };

        let mut current = CurrentScope::None;
        let mut args = args.iter();
        while let Some(arg) = args.next() {
            if arg == "--" {
                options.target_specs.extend(args.by_ref().cloned());
                break;
            }

            if let Some(flag) = arg.strip_prefix("--") {
                match &current {
                    CurrentScope::None => return Err(OptionsError::FlagOutsideScope(arg.clone())),
                    CurrentScope::UnknownGoal(goal) => {
                        tracing::debug!(goal = %goal, flag = %arg, "ignoring flag of unknown goal");
                    }
                    CurrentScope::Known(scope) => {
                        let scope = scope.clone();
                        options.set_flag(&scope, flag, &mut args)?;
                    }
                }
                continue;
            }

            if arg.starts_with('-') {
                return Err(OptionsError::UnknownOption {
                    scope: current_name(&current).to_string(),
                    name: arg.trim_start_matches('-').to_string(),
                });
            }

            if is_target_spec(arg) {
                options.target_specs.push(arg.clone());
            } else if arg != GLOBAL_SCOPE && options.schema.is_known_scope(arg) {
                let goal = arg.split('.').next().unwrap_or(arg);
                if catalog.by_name(goal).is_some() {
                    options.add_goal(goal);
                }
                current = CurrentScope::Known(arg.clone());
            } else {
                options.add_goal(arg);
                current = CurrentScope::UnknownGoal(arg.clone());
            }
        }

        Ok(options)
    }

    fn add_goal(&mut self, goal: &str) {
        if !self.goals.iter().any(|g| g == goal) {
            self.goals.push(goal.to_string());
        }
    }

    /// Set a flag given under `scope`. Under a goal scope the flag applies
    /// to every task of that goal declaring it.
    fn set_flag<'a>(
        &mut self,
        scope: &str,
        flag: &str,
        rest: &mut impl Iterator<Item = &'a String>,
    ) -> Result<(), OptionsError> {
        let (name, raw) = match flag.split_once('=') {
            Some((name, raw)) => (name, Some(raw.to_string())),
            None => (flag, None),
        };

        let decls = self.declarations(scope, name);
        if !decls.is_empty() {
            let raw = match raw {
                Some(raw) => Some(raw),
                None if decls.iter().all(|(_, d)| d.kind == OptionKind::Bool) => None,
                None => Some(
                    rest.next()
                        .cloned()
                        .ok_or_else(|| OptionsError::MissingValue {
                            scope: scope.to_string(),
                            name: name.to_string(),
                        })?,
                ),
            };
            for (owner, decl) in decls {
                let value = match &raw {
                    Some(raw) => parse_value(&owner, &decl, decl.kind, raw)?,
                    None => OptionValue::Bool(true),
                };
                self.insert_value(owner, decl.name, value);
            }
            return Ok(());
        }

        let negated: Vec<(String, OptionDecl)> = match name.strip_prefix("no-") {
            Some(positive) if raw.is_none() => self
                .declarations(scope, positive)
                .into_iter()
                .filter(|(_, decl)| decl.kind == OptionKind::Bool)
                .collect(),
            _ => Vec::new(),
        };
        if negated.is_empty() {
            return Err(OptionsError::UnknownOption {
                scope: scope.to_string(),
                name: name.to_string(),
            });
        }
        for (owner, decl) in negated {
            self.insert_value(owner, decl.name, OptionValue::Bool(false));
        }
        Ok(())
    }

    /// Declarations a flag named `name` under `scope` refers to, with the
    /// scope each one lives in: the scope itself if it declares the option,
    /// otherwise the task scopes `<scope>.<task>` that do.
    fn declarations(&self, scope: &str, name: &str) -> Vec<(String, OptionDecl)> {
        if let Some(decl) = self.schema.lookup(scope, name) {
            return vec![(scope.to_string(), decl.clone())];
        }
        self.schema
            .known_scopes()
            .iter()
            .filter(|known| is_task_scope_of(known, scope))
            .filter_map(|known| {
                self.schema
                    .lookup(known, name)
                    .map(|decl| (known.clone(), decl.clone()))
            })
            .collect()
    }

    fn insert_value(&mut self, scope: String, name: String, value: OptionValue) {
        self.values.entry(scope).or_default().insert(name, value);
    }

    pub fn global(&self) -> &GlobalOptions {
        &self.global
    }

    /// Requested goals in command-line order, each once.
    pub fn goals(&self) -> &[String] {
        &self.goals
    }

    /// Target specs in command-line order.
    pub fn target_specs(&self) -> &[String] {
        &self.target_specs
    }

    pub fn schema(&self) -> &OptionSchema {
        &self.schema
    }

    /// Value of a scoped option: flag, then config, then declared default.
    pub fn get(&self, scope: &str, name: &str) -> Option<&OptionValue> {
        self.values
            .get(scope)
            .and_then(|values| values.get(name))
            .or_else(|| self.schema.lookup(scope, name).map(|decl| &decl.default))
    }
}

/// Whether `scope` is `<goal>.<task>` for the given goal scope.
fn is_task_scope_of(scope: &str, goal: &str) -> bool {
    scope
        .strip_prefix(goal)
        .and_then(|rest| rest.strip_prefix('.'))
        .is_some_and(|task| !task.is_empty() && !task.contains('.'))
}

/// Tokens that name targets rather than goals.
fn is_target_spec(arg: &str) -> bool {
    arg.contains('/') || arg.contains(':') || arg.starts_with('.')
}

fn current_name(current: &CurrentScope) -> &str {
    match current {
        CurrentScope::None => GLOBAL_SCOPE,
        CurrentScope::Known(scope) | CurrentScope::UnknownGoal(scope) => scope,
    }
}

fn parse_value(
    scope: &str,
    decl: &OptionDecl,
    kind: OptionKind,
    raw: &str,
) -> Result<OptionValue, OptionsError> {
    OptionValue::parse(&decl.name, kind, raw).map_err(|_| OptionsError::InvalidValue {
        scope: scope.to_string(),
        name: decl.name.clone(),
        value: raw.to_string(),
        expected: kind,
    })
}

/// Collect `[<scope>]` config values for every declared scoped option.
fn config_values(
    schema: &OptionSchema,
    config: &Config,
) -> Result<BTreeMap<String, BTreeMap<String, OptionValue>>, OptionsError> {
    let mut values: BTreeMap<String, BTreeMap<String, OptionValue>> = BTreeMap::new();
    for scope in schema.known_scopes() {
        if scope == GLOBAL_SCOPE {
            continue;
        }
        for decl in schema.options_in(scope) {
            let Some(raw) = config.get(scope, &decl.name) else {
                continue;
            };
            let value = match (decl.kind, raw) {
                (OptionKind::Bool, Value::Boolean(b)) => OptionValue::Bool(*b),
                (OptionKind::Int, Value::Integer(i)) => OptionValue::Int(*i),
                (OptionKind::Str, Value::String(s)) => OptionValue::Str(s.clone()),
                (OptionKind::List, Value::String(s)) => parse_value(scope, decl, decl.kind, s)?,
                (OptionKind::List, Value::Array(items)) if items.iter().all(Value::is_str) => {
                    OptionValue::List(
                        items
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect(),
                    )
                }
                (kind, other) => {
                    return Err(OptionsError::InvalidValue {
                        scope: scope.clone(),
                        name: decl.name.clone(),
                        value: other.to_string(),
                        expected: kind,
                    })
                }
            };
            values
                .entry(scope.clone())
                .or_default()
                .insert(decl.name.clone(), value);
        }
    }
    Ok(values)
}
