//! Workspace file operations.
//!
//! Directory listing, file read/save, and the recursive name search used
//! by the `search_files` tool. All paths resolve against the workspace
//! root so tests can point the whole stack at a temp directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::errors::WorkspaceError;

/// Directory names never shown in listings or searched.
const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    ".vscode",
    "coverage",
    ".next",
    "target",
    "bin",
    "obj",
    "vendor",
    "tmp",
];

/// One entry of a directory listing.
#[derive(Debug, Clone, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: u64,
    pub mtime: i64,
}

/// File operations rooted at a workspace directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Workspace rooted at the process working directory.
    pub fn current_dir() -> Self {
        Self::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a possibly-relative path against the workspace root.
    fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }

    // ─── Listing ────────────────────────────────────────────────────────

    /// List a directory, honoring the fixed ignore set plus a best-effort
    /// `.gitignore` read (directory entries and exact names only; glob
    /// patterns are out of scope here).
    pub fn list_dir(&self, path: &str) -> Result<Vec<FileEntry>, WorkspaceError> {
        let dir = if path.is_empty() {
            self.root.clone()
        } else {
            self.resolve(path)
        };

        let mut ignored: HashSet<String> =
            IGNORED_DIRS.iter().map(|s| s.to_string()).collect();
        if let Ok(content) = std::fs::read_to_string(dir.join(".gitignore")) {
            for line in content.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some(name) = line.strip_suffix('/') {
                    ignored.insert(name.to_string());
                } else if !line.contains('*') {
                    ignored.insert(line.to_string());
                }
            }
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let Ok(entry) = entry else { continue };
            let name = entry.file_name().to_string_lossy().to_string();
            let Ok(meta) = entry.metadata() else { continue };

            if meta.is_dir() && ignored.contains(&name) {
                continue;
            }

            let mtime = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);

            files.push(FileEntry {
                path: dir.join(&name).to_string_lossy().to_string(),
                kind: if meta.is_dir() { "directory" } else { "file" }.to_string(),
                size: meta.len(),
                mtime,
                name,
            });
        }

        Ok(files)
    }

    // ─── Read / Save ────────────────────────────────────────────────────

    pub fn read_file(&self, path: &str) -> Result<String, WorkspaceError> {
        if path.is_empty() {
            return Err(WorkspaceError::MissingPath);
        }
        Ok(std::fs::read_to_string(self.resolve(path))?)
    }

    /// Write a file, creating parent directories as needed.
    pub fn save_file(&self, path: &str, content: &str) -> Result<(), WorkspaceError> {
        if path.is_empty() {
            return Err(WorkspaceError::MissingPath);
        }
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(full, content)?;
        Ok(())
    }

    // ─── Name Search ────────────────────────────────────────────────────

    /// Recursive case-insensitive filename search.
    ///
    /// Skips hidden directories, `node_modules`, and `.git`. Returns
    /// root-relative paths, at most `limit` (0 = unlimited). The walk
    /// checks the cancellation token between directories.
    pub fn find_files_by_name(
        &self,
        query: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, WorkspaceError> {
        if query.is_empty() {
            return Err(WorkspaceError::MissingQuery);
        }

        let needle = query.to_lowercase();
        let mut results = Vec::new();
        let mut stack = vec![self.root.clone()];

        while let Some(dir) = stack.pop() {
            if cancel.is_cancelled() {
                return Err(WorkspaceError::Cancelled);
            }
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().to_string();
                let Ok(meta) = entry.metadata() else { continue };

                if meta.is_dir() {
                    if name.starts_with('.') || name == "node_modules" {
                        continue;
                    }
                    stack.push(entry.path());
                } else if name.to_lowercase().contains(&needle) {
                    let rel = entry
                        .path()
                        .strip_prefix(&self.root)
                        .map(|p| p.to_string_lossy().to_string())
                        .unwrap_or_else(|_| entry.path().to_string_lossy().to_string());
                    results.push(rel);
                    if limit > 0 && results.len() >= limit {
                        return Ok(results);
                    }
                }
            }
        }

        Ok(results)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
