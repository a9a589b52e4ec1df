//! Workspace access: file operations and the command-runner seam.

pub mod command;
pub mod errors;
pub mod files;

pub use command::{CommandOutput, CommandRunner, ShellRunner};
pub use errors::WorkspaceError;
pub use files::{FileEntry, Workspace};
