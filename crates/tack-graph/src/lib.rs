//! # tack-graph
//!
//! Turns command-line target specs into addresses and addresses into a
//! dependency-closed target graph.
//!
//! ## Key components
//!
//! - [`Address`] — a fully-qualified target identifier (`src/app:bin`)
//! - [`AddressMapper`] — where target declarations come from; implemented by
//!   [`InMemoryAddressMapper`] and the `BUILD.toml` backed [`BuildFileMapper`]
//! - [`CmdLineSpecParser`] — expands `path:name`, `path:` and `path::` specs,
//!   honouring exclusion regexes and excluded paths
//! - [`TargetGraph`] — injects transitive closures idempotently and owns the
//!   materialized [`Target`]s

pub mod address;
pub mod build_file;
pub mod error;
pub mod graph;
pub mod mapper;
pub mod spec_parser;

pub use address::Address;
pub use build_file::{BuildFileMapper, BUILD_FILE_NAME};
pub use error::{GraphError, SpecError};
pub use graph::{Target, TargetGraph};
pub use mapper::{AddressMapper, InMemoryAddressMapper, TargetDecl};
pub use spec_parser::{CmdLineSpecParser, Spec};
