// build_file.rs — BuildFileMapper: target declarations read from BUILD.toml.
//
// Each directory under the build root may hold a BUILD.toml:
//
//   [[target]]
//   name = "lib"
//   kind = "rust_library"
//   dependencies = [":util", "3rdparty:serde"]
//
// Parsed files are cached for the life of the mapper, so repeated lookups
// during closure injection read each file once.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::Deserialize;

use crate::address::{normalize_path, Address};
use crate::error::GraphError;
use crate::mapper::{find_decl, AddressMapper, TargetDecl};

pub const BUILD_FILE_NAME: &str = "BUILD.toml";

#[derive(Debug, Deserialize)]
struct RawBuildFile {
    #[serde(default)]
    target: Vec<RawTarget>,
}

#[derive(Debug, Deserialize)]
struct RawTarget {
    name: String,
    #[serde(default = "default_kind")]
    kind: String,
    #[serde(default)]
    dependencies: Vec<String>,
}

fn default_kind() -> String {
    "target".to_string()
}

/// Address mapper over `BUILD.toml` files beneath a build root.
pub struct BuildFileMapper {
    root: PathBuf,
    cache: Mutex<HashMap<String, Arc<Vec<TargetDecl>>>>,
}

impl BuildFileMapper {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn build_file_path(&self, dir: &str) -> PathBuf {
        self.root.join(dir).join(BUILD_FILE_NAME)
    }

    /// Load (or fetch from cache) the declarations of one directory.
    fn load(&self, dir: &str) -> Result<Arc<Vec<TargetDecl>>, GraphError> {
        if let Some(decls) = self.lock_cache().get(dir) {
            return Ok(Arc::clone(decls));
        }

        let path = self.build_file_path(dir);
        if !path.is_file() {
            return Err(GraphError::BuildFileNotFound {
                dir: dir.to_string(),
            });
        }
        let content = fs::read_to_string(&path).map_err(|source| GraphError::IoError {
            path: path.clone(),
            source,
        })?;
        let decls = Arc::new(parse_build_file(&path, dir, &content)?);
        tracing::debug!(dir, targets = decls.len(), "parsed build file");

        self.lock_cache().insert(dir.to_string(), Arc::clone(&decls));
        Ok(decls)
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Vec<TargetDecl>>>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn collect_dirs(&self, rel: &str, out: &mut Vec<String>) -> Result<(), GraphError> {
        let abs = self.root.join(rel);
        if abs.join(BUILD_FILE_NAME).is_file() {
            out.push(rel.to_string());
        }
        let entries = fs::read_dir(&abs).map_err(|source| GraphError::IoError {
            path: abs.clone(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| GraphError::IoError {
                path: abs.clone(),
                source,
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            // Hidden directories (.git, .tack) never hold build files.
            if name.starts_with('.') || !entry.path().is_dir() {
                continue;
            }
            let child = if rel.is_empty() {
                name
            } else {
                format!("{rel}/{name}")
            };
            self.collect_dirs(&child, out)?;
        }
        Ok(())
    }
}

fn parse_build_file(path: &Path, dir: &str, content: &str) -> Result<Vec<TargetDecl>, GraphError> {
    let parse_err = |message: String| GraphError::Parse {
        path: path.to_path_buf(),
        message,
    };

    let raw: RawBuildFile = toml::from_str(content).map_err(|e| parse_err(e.to_string()))?;
    let mut decls: Vec<TargetDecl> = Vec::with_capacity(raw.target.len());
    for target in raw.target {
        if decls.iter().any(|d| d.address.target_name() == target.name) {
            return Err(parse_err(format!("target '{}' declared twice", target.name)));
        }
        let address = Address::parse(&format!(":{}", target.name), dir)
            .map_err(|e| parse_err(e.to_string()))?;
        let dependencies = target
            .dependencies
            .iter()
            .map(|d| Address::parse(d, dir))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| parse_err(e.to_string()))?;
        decls.push(TargetDecl {
            address,
            kind: target.kind,
            dependencies,
        });
    }
    Ok(decls)
}

impl AddressMapper for BuildFileMapper {
    fn resolve(&self, address: &Address) -> Result<TargetDecl, GraphError> {
        let decls = self.load(address.spec_path())?;
        find_decl(&decls, address)
    }

    fn addresses_in(&self, dir: &str) -> Result<Vec<Address>, GraphError> {
        let decls = self.load(dir)?;
        Ok(decls.iter().map(|d| d.address.clone()).collect())
    }

    fn build_dirs_under(&self, dir: &str) -> Result<Vec<String>, GraphError> {
        let mut dirs = Vec::new();
        if self.root.join(dir).is_dir() {
            self.collect_dirs(dir, &mut dirs)?;
        }
        dirs.sort();
        Ok(dirs)
    }

    fn has_build_file(&self, dir: &str) -> bool {
        normalize_path(dir, dir).is_ok_and(|dir| self.build_file_path(&dir).is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_build(root: &Path, dir: &str, content: &str) {
        let path = root.join(dir);
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join(BUILD_FILE_NAME), content).unwrap();
    }

    #[test]
    fn resolves_declarations_with_relative_dependencies() {
        let root = tempdir().unwrap();
        write_build(
            root.path(),
            "src/app",
            r#"
[[target]]
name = "bin"
kind = "binary"
dependencies = [":lib", "src/util"]

[[target]]
name = "lib"
"#,
        );
        let mapper = BuildFileMapper::new(root.path());
        let decl = mapper.resolve(&Address::new("src/app", "bin")).unwrap();
        assert_eq!(decl.kind, "binary");
        assert_eq!(
            decl.dependencies,
            vec![Address::new("src/app", "lib"), Address::new("src/util", "util")]
        );
        assert_eq!(mapper.addresses_in("src/app").unwrap().len(), 2);
    }

    #[test]
    fn walks_build_dirs_and_skips_hidden() {
        let root = tempdir().unwrap();
        write_build(root.path(), "", "[[target]]\nname = \"root\"\n");
        write_build(root.path(), "a", "");
        write_build(root.path(), "a/b", "");
        write_build(root.path(), ".tack/cache", "");
        fs::create_dir_all(root.path().join("empty")).unwrap();

        let mapper = BuildFileMapper::new(root.path());
        assert_eq!(mapper.build_dirs_under("").unwrap(), vec!["", "a", "a/b"]);
        assert_eq!(mapper.build_dirs_under("a").unwrap(), vec!["a", "a/b"]);
        assert!(mapper.build_dirs_under("nope").unwrap().is_empty());
        assert!(mapper.has_build_file("a/b"));
        assert!(!mapper.has_build_file("empty"));
    }

    #[test]
    fn duplicate_names_are_a_parse_error() {
        let root = tempdir().unwrap();
        write_build(root.path(), "x", "[[target]]\nname = \"a\"\n[[target]]\nname = \"a\"\n");
        let mapper = BuildFileMapper::new(root.path());
        assert!(matches!(
            mapper.addresses_in("x"),
            Err(GraphError::Parse { .. })
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let root = tempdir().unwrap();
        write_build(root.path(), "x", "[[target]\nname = ");
        let mapper = BuildFileMapper::new(root.path());
        assert!(matches!(
            mapper.resolve(&Address::new("x", "x")),
            Err(GraphError::Parse { .. })
        ));
    }
}
