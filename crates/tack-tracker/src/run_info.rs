// run_info.rs — Key/value facts about a run, persisted as info.json.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::TrackerError;

pub const INFO_FILE_NAME: &str = "info.json";

/// Run metadata: id, timestamp, report URL, outcome, SCM revision.
///
/// Values are plain strings so the file stays readable by other tools.
#[derive(Debug, Clone)]
pub struct RunInfo {
    path: PathBuf,
    info: BTreeMap<String, String>,
}

impl RunInfo {
    pub fn new(run_dir: &Path) -> Self {
        Self {
            path: run_dir.join(INFO_FILE_NAME),
            info: BTreeMap::new(),
        }
    }

    /// Load a previously saved info file.
    pub fn load(path: &Path) -> Result<Self, TrackerError> {
        let content = fs::read_to_string(path).map_err(|source| TrackerError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        let info = serde_json::from_str(&content)?;
        Ok(Self {
            path: path.to_path_buf(),
            info,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn add_info(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.info.insert(key.into(), value.into());
    }

    pub fn get_info(&self, key: &str) -> Option<&str> {
        self.info.get(key).map(String::as_str)
    }

    pub fn save(&self) -> Result<(), TrackerError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| TrackerError::IoError {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(&self.info)?;
        fs::write(&self.path, json).map_err(|source| TrackerError::IoError {
            path: self.path.clone(),
            source,
        })
    }

    /// Record the git revision and branch of `build_root`, if it is a checkout.
    ///
    /// Best effort: a missing `git` binary or a non-repository leaves the
    /// info untouched.
    pub fn add_scm_info(&mut self, build_root: &Path) {
        if let Some(revision) = git_output(build_root, &["rev-parse", "HEAD"]) {
            self.add_info("revision", revision);
        }
        if let Some(branch) = git_output(build_root, &["rev-parse", "--abbrev-ref", "HEAD"]) {
            self.add_info("branch", branch);
        }
    }
}

fn git_output(dir: &Path, args: &[&str]) -> Option<String> {
    let output = match Command::new("git").args(args).current_dir(dir).output() {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!("git unavailable for scm info: {}", e);
            return None;
        }
    };
    if !output.status.success() {
        return None;
    }
    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!value.is_empty()).then_some(value)
}
