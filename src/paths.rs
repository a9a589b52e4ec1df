//! Data directory layout.
//!
//! Everything the orchestrator persists lives under a single root
//! (`~/.openspace` by default):
//!
//! ```text
//! ~/.openspace/
//!   config.json         full config document
//!   data/
//!     sessions.json     {sessionId: Session, ...}
//! ```
//!
//! The root is injectable so tests can run against a temp directory.

use std::path::{Path, PathBuf};

/// Resolved locations of the config and session files.
#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    /// Layout rooted at `~/.openspace`.
    pub fn default_home() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            root: home.join(".openspace"),
        }
    }

    /// Layout rooted at an explicit directory (tests, portable installs).
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn sessions_file(&self) -> PathBuf {
        self.data_dir().join("sessions.json")
    }

    /// Create the data directory if it does not exist yet.
    ///
    /// Called once at startup. A failure is reported but the process keeps
    /// going — the stores warn on every failed save anyway.
    pub fn ensure(&self) {
        if let Err(e) = std::fs::create_dir_all(self.data_dir()) {
            tracing::warn!(dir = %self.data_dir().display(), error = %e, "failed to create data directory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_under_root() {
        let paths = DataPaths::at("/tmp/os-test");
        assert_eq!(paths.config_file(), PathBuf::from("/tmp/os-test/config.json"));
        assert_eq!(
            paths.sessions_file(),
            PathBuf::from("/tmp/os-test/data/sessions.json")
        );
    }

    #[test]
    fn test_ensure_creates_data_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = DataPaths::at(tmp.path().join("nested"));
        paths.ensure();
        assert!(paths.data_dir().is_dir());
    }
}
