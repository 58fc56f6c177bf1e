//! # tack-goal
//!
//! Goals, the goal catalog, and the option scopes they introduce.
//!
//! A [`Goal`] is a named, ordered sequence of tasks that a run can request
//! (`tack compile test src/app::`). Goals are registered once, while backends
//! load, into a [`GoalCatalogBuilder`]; the resulting [`GoalCatalog`] is
//! immutable for the remainder of the run and is passed explicitly to every
//! component that needs it.
//!
//! ## Key components
//!
//! - [`Goal`] / [`TaskInfo`] — a goal and the static metadata of its tasks
//! - [`GoalCatalog`] — ordered lookup by name, used to detect unknown goals
//! - [`known_scopes`] — the option scopes that exist once backends are loaded
//! - [`OptionSchemaBuilder`] — typed option declarations, validated per scope

pub mod catalog;
pub mod error;
pub mod goal;
pub mod options;
pub mod scope;

pub use catalog::{GoalCatalog, GoalCatalogBuilder};
pub use error::GoalError;
pub use goal::{Goal, TaskInfo};
pub use options::{OptionDecl, OptionKind, OptionSchema, OptionSchemaBuilder, OptionValue};
pub use scope::{known_scopes, GLOBAL_SCOPE, RUN_TRACKER_SCOPE};
