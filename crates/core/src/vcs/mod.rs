//! Version control working copies.

mod git;

pub use git::{GitCli, GitConfig};

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::TempDir;
use thiserror::Error;

/// Errors from version control operations.
#[derive(Debug, Error)]
pub enum VcsError {
    #[error("git executable not found: {0}")]
    GitNotFound(PathBuf),

    #[error("git {command} failed: {message}")]
    CommandFailed { command: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A checked-out repository in a temporary directory.
///
/// The directory is removed when the working copy is dropped, on every
/// exit path.
#[derive(Debug)]
pub struct WorkingCopy {
    dir: TempDir,
}

impl WorkingCopy {
    pub fn new(dir: TempDir) -> Self {
        Self { dir }
    }

    /// Root of the checkout.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of a repository-relative path.
    pub fn join(&self, relative: &Path) -> PathBuf {
        self.dir.path().join(relative)
    }
}

/// Commit author identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

/// Mutable working copy operations used to publish a change.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Clone `url` into a fresh temporary directory.
    async fn clone_repo(&self, url: &str) -> Result<WorkingCopy, VcsError>;

    /// Create and check out a new branch.
    async fn create_branch(&self, copy: &WorkingCopy, branch: &str) -> Result<(), VcsError>;

    /// Stage a repository-relative path.
    async fn add(&self, copy: &WorkingCopy, path: &Path) -> Result<(), VcsError>;

    /// Commit staged changes.
    async fn commit(
        &self,
        copy: &WorkingCopy,
        message: &str,
        author: &CommitAuthor,
    ) -> Result<(), VcsError>;

    /// Push a branch to the clone's origin.
    async fn push(&self, copy: &WorkingCopy, branch: &str) -> Result<(), VcsError>;
}
