//! Mock version control for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::vcs::{CommitAuthor, VcsError, VersionControl, WorkingCopy};

/// One recorded working copy operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsOperation {
    Clone { url: String },
    Branch { name: String },
    /// Content is the file as it was when staged.
    Add { path: PathBuf, content: Option<String> },
    Commit { message: String, author: CommitAuthor },
    Push { branch: String },
}

impl VcsOperation {
    fn label(&self) -> &'static str {
        match self {
            VcsOperation::Clone { .. } => "clone",
            VcsOperation::Branch { .. } => "branch",
            VcsOperation::Add { .. } => "add",
            VcsOperation::Commit { .. } => "commit",
            VcsOperation::Push { .. } => "push",
        }
    }
}

/// Mock implementation of the VersionControl trait.
///
/// Clones produce empty temporary directories, so files written into a
/// working copy exist until it is dropped.
#[derive(Debug, Default)]
pub struct MockVersionControl {
    operations: Arc<RwLock<Vec<VcsOperation>>>,
    /// Roots of every working copy handed out.
    roots: Arc<RwLock<Vec<PathBuf>>>,
    /// Operation label ("clone", "push", ...) that fails.
    fail_on: Arc<RwLock<Option<String>>>,
}

impl MockVersionControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation with this label fail.
    pub async fn set_fail_on(&self, label: &str) {
        *self.fail_on.write().await = Some(label.to_string());
    }

    /// Operations performed so far, in order.
    pub async fn operations(&self) -> Vec<VcsOperation> {
        self.operations.read().await.clone()
    }

    /// Working copy roots handed out so far.
    pub async fn roots(&self) -> Vec<PathBuf> {
        self.roots.read().await.clone()
    }

    async fn record(&self, operation: VcsOperation) -> Result<(), VcsError> {
        let label = operation.label();
        self.operations.write().await.push(operation);
        if self.fail_on.read().await.as_deref() == Some(label) {
            return Err(VcsError::CommandFailed {
                command: label.to_string(),
                message: "simulated failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VersionControl for MockVersionControl {
    fn name(&self) -> &str {
        "mock"
    }

    async fn clone_repo(&self, url: &str) -> Result<WorkingCopy, VcsError> {
        self.record(VcsOperation::Clone {
            url: url.to_string(),
        })
        .await?;
        let dir = tempfile::tempdir()?;
        self.roots.write().await.push(dir.path().to_path_buf());
        Ok(WorkingCopy::new(dir))
    }

    async fn create_branch(&self, _copy: &WorkingCopy, branch: &str) -> Result<(), VcsError> {
        self.record(VcsOperation::Branch {
            name: branch.to_string(),
        })
        .await
    }

    async fn add(&self, copy: &WorkingCopy, path: &Path) -> Result<(), VcsError> {
        let content = std::fs::read_to_string(copy.join(path)).ok();
        self.record(VcsOperation::Add {
            path: path.to_path_buf(),
            content,
        })
        .await
    }

    async fn commit(
        &self,
        _copy: &WorkingCopy,
        message: &str,
        author: &CommitAuthor,
    ) -> Result<(), VcsError> {
        self.record(VcsOperation::Commit {
            message: message.to_string(),
            author: author.clone(),
        })
        .await
    }

    async fn push(&self, _copy: &WorkingCopy, branch: &str) -> Result<(), VcsError> {
        self.record(VcsOperation::Push {
            branch: branch.to_string(),
        })
        .await
    }
}
