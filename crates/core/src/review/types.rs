//! Change review types and trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from a change review backend.
#[derive(Debug, Clone, Error)]
pub enum ChangeReviewError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Change not found: {0}")]
    NotFound(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

/// A submitted change request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    /// Browser link, when the backend reports one.
    #[serde(default)]
    pub html_url: Option<String>,
}

impl std::fmt::Display for ChangeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

/// Parameters of a change request to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewChange {
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: String,
}

/// A change request as currently observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatus {
    pub number: u64,
    /// Raw state label ("open", "closed").
    pub state: String,
    pub merged: bool,
    /// Commit at the head of the change branch.
    pub head_sha: String,
    /// Branch the change merges into.
    pub base_ref: String,
    pub merged_at: Option<DateTime<Utc>>,
}

/// Where a change request stands in review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeState {
    Open,
    Merged,
    /// Terminal without a merge, carrying the observed label.
    ClosedUnmerged(String),
}

impl ChangeStatus {
    pub fn review_state(&self) -> ChangeState {
        if self.state == "open" {
            ChangeState::Open
        } else if self.merged {
            ChangeState::Merged
        } else {
            ChangeState::ClosedUnmerged(self.state.clone())
        }
    }
}

/// Change review system (pull requests).
#[async_trait]
pub trait ChangeReview: Send + Sync {
    /// Backend name for logs and metrics.
    fn name(&self) -> &str;

    /// Fetch the current state of a change.
    async fn get(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<ChangeStatus, ChangeReviewError>;

    /// Open a change request.
    async fn create(
        &self,
        owner: &str,
        repo: &str,
        change: &NewChange,
    ) -> Result<ChangeRef, ChangeReviewError>;

    /// Ask teams to review a change.
    async fn request_reviewers(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        teams: &[String],
    ) -> Result<(), ChangeReviewError>;
}
