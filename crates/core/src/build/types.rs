//! Build query types and trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from a build query backend.
#[derive(Debug, Clone, Error)]
pub enum BuildQueryError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Build not found: {0}")]
    NotFound(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

/// A CI project, addressed by account (organization) and repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectRef {
    pub account: String,
    pub repo: String,
}

impl ProjectRef {
    pub fn new(account: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            repo: repo.into(),
        }
    }
}

impl std::fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.account, self.repo)
    }
}

/// Lifecycle of a CI build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Queued,
    Scheduled,
    NotRun,
    NotRunning,
    Running,
    Finished,
    #[serde(other)]
    Unknown,
}

impl Lifecycle {
    pub fn is_finished(self) -> bool {
        self == Lifecycle::Finished
    }
}

/// One CI build as listed or fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSummary {
    pub build_num: u64,
    pub job_name: String,
    /// Commit the build ran against.
    pub commit: Option<String>,
    /// Unset until the build leaves the queue.
    pub start_time: Option<DateTime<Utc>>,
    pub lifecycle: Lifecycle,
    /// Backend status label ("success", "failed", "running", ...).
    pub status: String,
    /// Outcome flag, meaningful once finished.
    pub failed: bool,
}

/// Status labels of a finished build that passed.
pub const SUCCESS_STATUSES: [&str; 3] = ["success", "fixed", "no_tests"];

/// Whether `status` names a passing outcome.
pub fn is_success_status(status: &str) -> bool {
    SUCCESS_STATUSES.contains(&status)
}

impl BuildSummary {
    /// Finished, not flagged as failed, and with a passing status.
    ///
    /// Canceled, timed out or infrastructure failures never count as success.
    pub fn succeeded(&self) -> bool {
        self.lifecycle.is_finished() && !self.failed && is_success_status(&self.status)
    }

    /// Whether this build ran against `commit` and started after `after`.
    pub fn belongs_to(&self, commit: &str, after: DateTime<Utc>) -> bool {
        self.commit.as_deref() == Some(commit) && self.start_time.is_some_and(|t| t > after)
    }
}

/// Build status query interface (CI system).
#[async_trait]
pub trait BuildQuery: Send + Sync {
    /// Backend name for logs and metrics.
    fn name(&self) -> &str;

    /// Most recent builds of a branch, newest first.
    async fn list_recent(
        &self,
        project: &ProjectRef,
        branch: &str,
        limit: u32,
    ) -> Result<Vec<BuildSummary>, BuildQueryError>;

    /// One build by number.
    async fn get_build(
        &self,
        project: &ProjectRef,
        build_num: u64,
    ) -> Result<BuildSummary, BuildQueryError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn build(commit: &str, start: Option<DateTime<Utc>>) -> BuildSummary {
        BuildSummary {
            build_num: 1,
            job_name: "plan_terraform".into(),
            commit: Some(commit.into()),
            start_time: start,
            lifecycle: Lifecycle::Running,
            status: "running".into(),
            failed: false,
        }
    }

    #[test]
    fn test_belongs_to() {
        let merged = Utc.with_ymd_and_hms(2020, 3, 1, 12, 0, 0).unwrap();
        let later = merged + chrono::Duration::seconds(5);
        assert!(build("abc", Some(later)).belongs_to("abc", merged));
        assert!(!build("abc", Some(merged)).belongs_to("abc", merged));
        assert!(!build("abc", None).belongs_to("abc", merged));
        assert!(!build("def", Some(later)).belongs_to("abc", merged));
    }

    #[test]
    fn test_succeeded_requires_passing_status() {
        let mut b = build("abc", None);
        assert!(!b.succeeded());

        b.lifecycle = Lifecycle::Finished;
        for status in ["success", "fixed", "no_tests"] {
            b.status = status.into();
            assert!(b.succeeded(), "{status}");
        }
        for status in ["canceled", "infrastructure_fail", "timedout", "failed"] {
            b.status = status.into();
            assert!(!b.succeeded(), "{status}");
        }

        b.status = "success".into();
        b.failed = true;
        assert!(!b.succeeded());
    }

    #[test]
    fn test_lifecycle_parse() {
        let l: Lifecycle = serde_json::from_str("\"not_running\"").unwrap();
        assert_eq!(l, Lifecycle::NotRunning);
        let l: Lifecycle = serde_json::from_str("\"something_new\"").unwrap();
        assert_eq!(l, Lifecycle::Unknown);
        assert!(Lifecycle::Finished.is_finished());
    }
}
