// mapper.rs — AddressMapper: where target declarations come from.
//
// The orchestrator never parses build files itself. It asks a mapper for
// the declaration behind an address, for all addresses declared in a
// directory, and for the directories that contain build files. Two
// implementations ship: an in-memory mapper (tests, embedding) and the
// BUILD.toml file mapper.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::address::{normalize_path, Address};
use crate::error::{GraphError, SpecError};

/// One target as declared in a build file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDecl {
    pub address: Address,
    /// Free-form target type (e.g., `rust_library`).
    pub kind: String,
    pub dependencies: Vec<Address>,
}

/// Source of target declarations.
pub trait AddressMapper: Send + Sync {
    /// Look up the declaration for a single address.
    fn resolve(&self, address: &Address) -> Result<TargetDecl, GraphError>;

    /// All addresses declared in `dir`'s build file, in declaration order.
    fn addresses_in(&self, dir: &str) -> Result<Vec<Address>, GraphError>;

    /// Directories at or below `dir` that contain a build file, sorted.
    fn build_dirs_under(&self, dir: &str) -> Result<Vec<String>, GraphError>;

    /// Whether `dir` contains a build file.
    fn has_build_file(&self, dir: &str) -> bool;
}

/// Find `address` among `decls`, producing the lookup errors shared by all
/// mapper implementations.
pub(crate) fn find_decl(decls: &[TargetDecl], address: &Address) -> Result<TargetDecl, GraphError> {
    decls
        .iter()
        .find(|d| d.address == *address)
        .cloned()
        .ok_or_else(|| GraphError::TargetNotFound {
            address: address.to_string(),
            available: decls
                .iter()
                .map(|d| d.address.target_name().to_string())
                .collect(),
        })
}

/// Whether `dir` is `root` or lies beneath it.
pub(crate) fn is_under(dir: &str, root: &str) -> bool {
    root.is_empty()
        || dir == root
        || (dir.starts_with(root) && dir.as_bytes().get(root.len()) == Some(&b'/'))
}

/// Mapper backed by declarations registered in code.
#[derive(Debug, Default)]
pub struct InMemoryAddressMapper {
    dirs: BTreeMap<String, Vec<TargetDecl>>,
}

impl InMemoryAddressMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a target. Dependencies may be written relative to the
    /// target's directory (`:sibling`).
    pub fn declare(&mut self, address: &str, dependencies: &[&str]) -> Result<Address, SpecError> {
        let address = Address::parse(address, "")?;
        let dependencies = dependencies
            .iter()
            .map(|d| Address::parse(d, address.spec_path()))
            .collect::<Result<Vec<_>, _>>()?;
        self.insert(TargetDecl {
            address: address.clone(),
            kind: "target".to_string(),
            dependencies,
        });
        Ok(address)
    }

    /// Insert a declaration, replacing any previous one for the same address.
    pub fn insert(&mut self, decl: TargetDecl) {
        let decls = self
            .dirs
            .entry(decl.address.spec_path().to_string())
            .or_default();
        decls.retain(|d| d.address != decl.address);
        decls.push(decl);
    }
}

impl AddressMapper for InMemoryAddressMapper {
    fn resolve(&self, address: &Address) -> Result<TargetDecl, GraphError> {
        let decls = self
            .dirs
            .get(address.spec_path())
            .ok_or_else(|| GraphError::BuildFileNotFound {
                dir: address.spec_path().to_string(),
            })?;
        find_decl(decls, address)
    }

    fn addresses_in(&self, dir: &str) -> Result<Vec<Address>, GraphError> {
        self.dirs
            .get(dir)
            .map(|decls| decls.iter().map(|d| d.address.clone()).collect())
            .ok_or_else(|| GraphError::BuildFileNotFound {
                dir: dir.to_string(),
            })
    }

    fn build_dirs_under(&self, dir: &str) -> Result<Vec<String>, GraphError> {
        Ok(self
            .dirs
            .keys()
            .filter(|d| is_under(d, dir))
            .cloned()
            .collect())
    }

    fn has_build_file(&self, dir: &str) -> bool {
        normalize_path(dir, dir).is_ok_and(|dir| self.dirs.contains_key(&dir))
    }
}
