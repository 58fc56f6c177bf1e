// config.rs — tack.toml: sectioned build configuration.
//
// Sections used by the runner:
//
//   [backends]   packages, plugins
//   [goals]      bootstrap_buildfiles
//   [global]     defaults for every global option
//   [run-tracker] report_url_base
//   [<scope>]    defaults for scoped options, e.g. [compile.java]
//
// A missing file is an empty configuration.

use std::fs;
use std::path::{Path, PathBuf};

use toml::{Table, Value};

use crate::error::ConfigError;

pub const CONFIG_FILE_NAME: &str = "tack.toml";

#[derive(Debug, Clone, Default)]
pub struct Config {
    path: Option<PathBuf>,
    table: Table,
}

impl Config {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load `path`, treating a missing file as empty.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::empty());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&content, path)?;
        config.path = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, Path::new("<inline>"))
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let table = content.parse::<Table>().map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Self { path: None, table })
    }

    /// The file this config was read from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Look up a section. Dotted section names (`compile.java`) address
    /// nested TOML tables.
    pub fn section(&self, section: &str) -> Option<&Table> {
        let mut table = &self.table;
        for part in section.split('.') {
            table = table.get(part)?.as_table()?;
        }
        Some(table)
    }

    /// Raw value lookup. A key written with `-` also matches its `_` spelling.
    pub fn get(&self, section: &str, key: &str) -> Option<&Value> {
        let table = self.section(section)?;
        table
            .get(key)
            .or_else(|| table.get(&key.replace('-', "_")))
    }

    /// An ordered list of strings. A single string is promoted to a
    /// one-element list.
    pub fn get_list(
        &self,
        section: &str,
        key: &str,
        default: &[&str],
    ) -> Result<Vec<String>, ConfigError> {
        let wrong_type = || ConfigError::WrongType {
            section: section.to_string(),
            key: key.to_string(),
            expected: "a string or a list of strings",
        };
        match self.get(section, key) {
            None => Ok(default.iter().map(|s| s.to_string()).collect()),
            Some(Value::String(s)) => Ok(vec![s.clone()]),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string).ok_or_else(wrong_type))
                .collect(),
            Some(_) => Err(wrong_type()),
        }
    }

    pub fn get_str(&self, section: &str, key: &str) -> Result<Option<String>, ConfigError> {
        match self.get(section, key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(ConfigError::WrongType {
                section: section.to_string(),
                key: key.to_string(),
                expected: "a string",
            }),
        }
    }

    pub fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>, ConfigError> {
        match self.get(section, key) {
            None => Ok(None),
            Some(Value::Boolean(b)) => Ok(Some(*b)),
            Some(_) => Err(ConfigError::WrongType {
                section: section.to_string(),
                key: key.to_string(),
                expected: "a boolean",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"
[backends]
packages = ["core", "jvm"]
plugins = "lint"

[goals]
bootstrap_buildfiles = []

[global]
fail_fast = true
level = 3

[compile.java]
jobs = 8
"#;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let config = Config::load(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert!(config.path().is_none());
        assert_eq!(
            config.get_list("backends", "packages", &["core"]).unwrap(),
            vec!["core"]
        );
    }

    #[test]
    fn lists_and_promotion() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(
            config.get_list("backends", "packages", &[]).unwrap(),
            vec!["core", "jvm"]
        );
        assert_eq!(config.get_list("backends", "plugins", &[]).unwrap(), vec!["lint"]);
        assert!(config
            .get_list("goals", "bootstrap_buildfiles", &["x"])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn wrong_types_are_reported() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        assert!(matches!(
            config.get_str("global", "level"),
            Err(ConfigError::WrongType { .. })
        ));
        assert!(matches!(
            config.get_list("global", "fail_fast", &[]),
            Err(ConfigError::WrongType { .. })
        ));
        assert_eq!(config.get_bool("global", "fail_fast").unwrap(), Some(true));
        assert_eq!(config.get_bool("global", "quiet").unwrap(), None);
    }

    #[test]
    fn dotted_sections_and_dashed_keys() {
        let config = Config::from_toml_str(
            "[compile.java]\njobs = 8\n[run-tracker]\nreport_url_base = \"http://ci\"\n",
        )
        .unwrap();
        assert_eq!(
            config.get("compile.java", "jobs").and_then(Value::as_integer),
            Some(8)
        );
        assert_eq!(
            config.get_str("run-tracker", "report-url-base").unwrap().as_deref(),
            Some("http://ci")
        );
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[backends\npackages = 1").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }
}
