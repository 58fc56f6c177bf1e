// options.rs — Typed option declarations and the per-scope option schema.
//
// Components declare options through OptionSchemaBuilder::register; the
// builder checks that the scope exists, the name is free in that scope, and
// the default matches the declared kind. The frozen OptionSchema is what the
// command-line parser validates scoped flags against.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GoalError;

/// The value type of an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    Bool,
    Int,
    Str,
    List,
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionKind::Bool => write!(f, "bool"),
            OptionKind::Int => write!(f, "int"),
            OptionKind::Str => write!(f, "string"),
            OptionKind::List => write!(f, "list"),
        }
    }
}

/// A concrete option value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<String>),
}

impl OptionValue {
    pub fn kind(&self) -> OptionKind {
        match self {
            OptionValue::Bool(_) => OptionKind::Bool,
            OptionValue::Int(_) => OptionKind::Int,
            OptionValue::Str(_) => OptionKind::Str,
            OptionValue::List(_) => OptionKind::List,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptionValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            OptionValue::List(l) => Some(l),
            _ => None,
        }
    }

    /// Parse a raw command-line or config string into a value of `kind`.
    ///
    /// Lists are comma separated; surrounding whitespace and empty items are
    /// dropped.
    pub fn parse(name: &str, kind: OptionKind, raw: &str) -> Result<Self, GoalError> {
        let invalid = || GoalError::InvalidValue {
            name: name.to_string(),
            value: raw.to_string(),
            expected: kind,
        };
        match kind {
            OptionKind::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(OptionValue::Bool(true)),
                "false" | "no" | "0" => Ok(OptionValue::Bool(false)),
                _ => Err(invalid()),
            },
            OptionKind::Int => raw
                .trim()
                .parse()
                .map(OptionValue::Int)
                .map_err(|_| invalid()),
            OptionKind::Str => Ok(OptionValue::Str(raw.to_string())),
            OptionKind::List => Ok(OptionValue::List(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
        }
    }
}

/// One declared option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionDecl {
    /// Flag name without leading dashes (e.g., `warnings`).
    pub name: String,
    pub kind: OptionKind,
    pub default: OptionValue,
    #[serde(default)]
    pub help: String,
}

impl OptionDecl {
    pub fn bool(name: &str, default: bool, help: &str) -> Self {
        Self::new(name, OptionKind::Bool, OptionValue::Bool(default), help)
    }

    pub fn int(name: &str, default: i64, help: &str) -> Self {
        Self::new(name, OptionKind::Int, OptionValue::Int(default), help)
    }

    pub fn string(name: &str, default: &str, help: &str) -> Self {
        Self::new(name, OptionKind::Str, OptionValue::Str(default.to_string()), help)
    }

    pub fn list(name: &str, default: &[&str], help: &str) -> Self {
        let default = default.iter().map(|s| s.to_string()).collect();
        Self::new(name, OptionKind::List, OptionValue::List(default), help)
    }

    fn new(name: &str, kind: OptionKind, default: OptionValue, help: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            default,
            help: help.to_string(),
        }
    }
}

/// Collects option declarations for a fixed set of scopes.
#[derive(Debug)]
pub struct OptionSchemaBuilder {
    scopes: BTreeMap<String, Vec<OptionDecl>>,
    order: Vec<String>,
}

impl OptionSchemaBuilder {
    pub fn new(known_scopes: &[String]) -> Self {
        Self {
            scopes: known_scopes
                .iter()
                .map(|s| (s.clone(), Vec::new()))
                .collect(),
            order: known_scopes.to_vec(),
        }
    }

    pub fn register(&mut self, scope: &str, decl: OptionDecl) -> Result<(), GoalError> {
        let decls = self
            .scopes
            .get_mut(scope)
            .ok_or_else(|| GoalError::UnknownScope(scope.to_string()))?;

        if decl.name.is_empty() || decl.name.starts_with('-') || decl.name.starts_with("no-") {
            return Err(GoalError::InvalidName {
                name: decl.name,
                reason: "option names must be non-empty and not start with '-' or 'no-'"
                    .to_string(),
            });
        }
        if decl.default.kind() != decl.kind {
            return Err(GoalError::DefaultKindMismatch {
                name: decl.name,
                expected: decl.kind,
                found: decl.default.kind(),
            });
        }
        if decls.iter().any(|d| d.name == decl.name) {
            return Err(GoalError::DuplicateOption {
                scope: scope.to_string(),
                name: decl.name,
            });
        }
        decls.push(decl);
        Ok(())
    }

    pub fn build(self) -> OptionSchema {
        OptionSchema {
            scopes: self.scopes,
            order: self.order,
        }
    }
}

/// Validated, frozen option declarations keyed by scope.
#[derive(Debug, Clone, Default)]
pub struct OptionSchema {
    scopes: BTreeMap<String, Vec<OptionDecl>>,
    order: Vec<String>,
}

impl OptionSchema {
    /// Scopes in known-scope order.
    pub fn known_scopes(&self) -> &[String] {
        &self.order
    }

    pub fn is_known_scope(&self, scope: &str) -> bool {
        self.scopes.contains_key(scope)
    }

    pub fn lookup(&self, scope: &str, name: &str) -> Option<&OptionDecl> {
        self.scopes.get(scope)?.iter().find(|d| d.name == name)
    }

    pub fn options_in(&self, scope: &str) -> &[OptionDecl] {
        self.scopes.get(scope).map(Vec::as_slice).unwrap_or(&[])
    }
}
