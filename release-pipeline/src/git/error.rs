//! Git client error types.

use thiserror::Error;

/// Errors surfaced by git subprocess invocations.
///
/// A non-zero exit always carries both captured output streams so that the
/// failure can be reported verbatim in attempt errors and status comments.
#[derive(Debug, Error)]
pub enum GitError {
    /// The git binary could not be executed at all.
    #[error("failed to execute '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// git exited non-zero.
    #[error("'{command}' failed: {stdout} {stderr}")]
    CommandFailed {
        command: String,
        stdout: String,
        stderr: String,
    },

    /// The requested worktree directory is unusable.
    #[error("repository directory '{path}': {message}")]
    BadRepoDir { path: String, message: String },

    /// Failed to create a temporary worktree directory.
    #[error("failed to create temporary repository directory: {0}")]
    TempDir(#[source] std::io::Error),
}
