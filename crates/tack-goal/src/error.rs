// error.rs — Error types for goal registration and option declaration.

use thiserror::Error;

use crate::options::OptionKind;

/// Errors raised while building the goal catalog or the option schema.
#[derive(Debug, Error)]
pub enum GoalError {
    /// A goal or task name that cannot be used as a scope.
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// The same task was installed into a goal twice.
    #[error("task '{task}' is already installed in goal '{goal}'")]
    DuplicateTask { goal: String, task: String },

    /// An option was registered against a scope nobody declared.
    #[error("unknown option scope '{0}'")]
    UnknownScope(String),

    /// An option name was registered twice in the same scope.
    #[error("option '--{name}' registered twice in scope '{scope}'")]
    DuplicateOption { scope: String, name: String },

    /// An option's default value does not match its declared kind.
    #[error("option '--{name}' is declared as {expected} but its default is {found}")]
    DefaultKindMismatch {
        name: String,
        expected: OptionKind,
        found: OptionKind,
    },

    /// A raw value could not be converted to the option's kind.
    #[error("invalid value '{value}' for option '--{name}' (expected {expected})")]
    InvalidValue {
        name: String,
        value: String,
        expected: OptionKind,
    },
}
