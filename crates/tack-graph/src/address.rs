// address.rs — Address: the fully-qualified identifier of a target.
//
// An address is a directory relative to the build root (the "spec path",
// empty for the root itself) plus a target name declared in that
// directory's build file. Addresses render as `src/app:bin`, or `//:name`
// for targets declared at the root.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SpecError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address {
    spec_path: String,
    target_name: String,
}

impl Address {
    /// Build an address from an already-normalized path and a name.
    pub fn new(spec_path: impl Into<String>, target_name: impl Into<String>) -> Self {
        Self {
            spec_path: spec_path.into(),
            target_name: target_name.into(),
        }
    }

    /// Parse a single-address spec.
    ///
    /// `:name` is resolved against `relative_to`; a bare path `a/b` means
    /// `a/b:b`. Wildcard forms (`a:` / `a::`) are not addresses and are
    /// rejected here; see [`crate::Spec`].
    pub fn parse(spec: &str, relative_to: &str) -> Result<Self, SpecError> {
        let invalid = |reason: &str| SpecError::InvalidSpec {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        match spec.rsplit_once(':') {
            Some((path, name)) => {
                if name.is_empty() {
                    return Err(invalid("wildcard specs do not name a single address"));
                }
                if name.contains('/') {
                    return Err(invalid("target names cannot contain '/'"));
                }
                let spec_path = if path.is_empty() {
                    relative_to.to_string()
                } else {
                    normalize_path(spec, path)?
                };
                Ok(Self::new(spec_path, name))
            }
            None => {
                let spec_path = normalize_path(spec, spec)?;
                let name = match spec_path.rsplit('/').next() {
                    Some(last) if !last.is_empty() => last.to_string(),
                    _ => return Err(invalid("the build root needs an explicit target name")),
                };
                Ok(Self::new(spec_path, name))
            }
        }
    }

    /// Directory of the declaring build file, relative to the build root.
    pub fn spec_path(&self) -> &str {
        &self.spec_path
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// The canonical string form, as accepted back by [`Address::parse`].
    pub fn spec(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.spec_path.is_empty() {
            write!(f, "//:{}", self.target_name)
        } else {
            write!(f, "{}:{}", self.spec_path, self.target_name)
        }
    }
}

/// Normalize a spec path relative to the build root.
///
/// Strips a leading `//` and `./` prefixes and trailing slashes, drops `.`
/// segments, and rejects absolute paths and `..` segments.
pub fn normalize_path(spec: &str, path: &str) -> Result<String, SpecError> {
    let invalid = |reason: &str| SpecError::InvalidSpec {
        spec: spec.to_string(),
        reason: reason.to_string(),
    };

    let path = path.strip_prefix("//").unwrap_or(path);
    if path.starts_with('/') {
        return Err(invalid("absolute paths are not allowed; use a path relative to the build root"));
    }

    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(invalid("'..' segments are not allowed")),
            s => segments.push(s),
        }
    }
    Ok(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_fully_qualified() {
        let addr = Address::parse("src/app:bin", "").unwrap();
        assert_eq!(addr.spec_path(), "src/app");
        assert_eq!(addr.target_name(), "bin");
        assert_eq!(addr.to_string(), "src/app:bin");
    }

    #[test]
    fn bare_path_uses_directory_name() {
        let addr = Address::parse("./src/util/", "").unwrap();
        assert_eq!(addr, Address::new("src/util", "util"));
    }

    #[test]
    fn root_relative_forms() {
        assert_eq!(Address::parse("//src:lib", "").unwrap(), Address::new("src", "lib"));
        assert_eq!(Address::parse(":lib", "src").unwrap(), Address::new("src", "lib"));
        assert_eq!(Address::parse("//:tools", "").unwrap().to_string(), "//:tools");
    }

    #[test]
    fn invalid_forms() {
        for bad in ["src:", "//", ".", "/abs/path:x", "../up:x", "a:b/c"] {
            assert!(
                matches!(Address::parse(bad, ""), Err(SpecError::InvalidSpec { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn display_round_trips() {
        for spec in ["a/b:c", "//:root"] {
            let addr = Address::parse(spec, "").unwrap();
            assert_eq!(Address::parse(&addr.spec(), "").unwrap(), addr);
        }
    }
}
