// error.rs — Error types for address mapping, graph building and spec parsing.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while looking up declarations or building the target graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// No build file exists in the directory.
    #[error("no build file in '{dir}'")]
    BuildFileNotFound { dir: String },

    /// The build file exists but does not declare the target.
    #[error("target '{address}' not found (declared in that directory: {})", .available.join(", "))]
    TargetNotFound {
        address: String,
        available: Vec<String>,
    },

    /// A build file could not be parsed.
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// A target depends on an address nobody declares.
    #[error("'{target}' depends on '{dependency}', which does not exist")]
    MissingDependency { target: String, dependency: String },

    /// The dependency closure contains a cycle.
    #[error("dependency cycle: {}", .path.join(" -> "))]
    Cycle { path: Vec<String> },
}

/// Errors raised while turning command-line specs into addresses.
#[derive(Debug, Error)]
pub enum SpecError {
    /// The spec is syntactically invalid.
    #[error("invalid spec '{spec}': {reason}")]
    InvalidSpec { spec: String, reason: String },

    /// An --exclude-target-regexp or --spec-excludes entry failed to compile.
    #[error("invalid exclude pattern '{pattern}': {message}")]
    InvalidExcludePattern { pattern: String, message: String },

    /// The spec is well formed but does not resolve.
    #[error("failed to resolve '{spec}': {source}")]
    Resolution {
        spec: String,
        #[source]
        source: GraphError,
    },
}
