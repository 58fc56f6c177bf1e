// cleanup.rs — Termination of background worker processes.
//
// Long-lived workers (compile daemons and the like) announce themselves by
// writing their pid to <workdir>/workers/<name>.pid. WorkerReaper sends each
// of them SIGTERM and removes the pid file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::CleanupError;

pub const WORKERS_DIR: &str = "workers";

pub trait BackgroundCleanup: Send + Sync {
    /// Terminate all background workers. Returns how many were signalled.
    fn kill_all(&self) -> Result<usize, CleanupError>;
}

/// Reaps workers recorded as pid files under a work directory.
#[derive(Debug, Clone)]
pub struct WorkerReaper {
    workers_dir: PathBuf,
}

impl WorkerReaper {
    pub fn new(workdir: impl AsRef<Path>) -> Self {
        Self {
            workers_dir: workdir.as_ref().join(WORKERS_DIR),
        }
    }

    pub fn workers_dir(&self) -> &Path {
        &self.workers_dir
    }

    fn pid_files(&self) -> Result<Vec<PathBuf>, CleanupError> {
        let entries = match fs::read_dir(&self.workers_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(CleanupError::IoError {
                    path: self.workers_dir.clone(),
                    source,
                })
            }
        };
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "pid"))
            .collect();
        files.sort();
        Ok(files)
    }

    fn reap(&self, path: &Path) -> Result<(), CleanupError> {
        let content = fs::read_to_string(path).map_err(|source| CleanupError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        let pid = content
            .trim()
            .parse::<i32>()
            .ok()
            .filter(|pid| *pid > 0)
            .ok_or_else(|| CleanupError::InvalidPid {
                path: path.to_path_buf(),
                content: content.trim().to_string(),
            })?;

        terminate(pid).map_err(|source| CleanupError::Signal { pid, source })?;
        tracing::info!(pid, "terminated background worker");

        fs::remove_file(path).map_err(|source| CleanupError::IoError {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl BackgroundCleanup for WorkerReaper {
    /// Every pid file is attempted; the first failure is returned after all
    /// of them have been processed.
    fn kill_all(&self) -> Result<usize, CleanupError> {
        let mut killed = 0;
        let mut first_error = None;
        for path in self.pid_files()? {
            match self.reap(&path) {
                Ok(()) => killed += 1,
                Err(e) => {
                    tracing::warn!("worker cleanup failed: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(killed), Err)
    }
}

/// A worker that already exited counts as terminated.
#[cfg(unix)]
fn terminate(pid: i32) -> io::Result<()> {
    // Safety: kill(2) only sends a signal; pid is positive so it never
    // targets a process group.
    let ret = unsafe { libc::kill(pid, libc::SIGTERM) };
    if ret == 0 {
        return Ok(());
    }
    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        Ok(())
    } else {
        Err(err)
    }
}

#[cfg(not(unix))]
fn terminate(_pid: i32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "worker termination is only supported on unix",
    ))
}
