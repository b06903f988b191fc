//! GitHub pull request backend.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::GitHubConfig;
use crate::metrics;

use super::{ChangeRef, ChangeReview, ChangeReviewError, ChangeStatus, NewChange};

const USER_AGENT: &str = concat!("rds-provisioner/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct PullRequest {
    number: u64,
    state: String,
    #[serde(default)]
    merged: bool,
    merged_at: Option<DateTime<Utc>>,
    html_url: Option<String>,
    head: GitRef,
    base: GitRef,
}

#[derive(Debug, Deserialize)]
struct GitRef {
    #[serde(rename = "ref")]
    ref_name: String,
    sha: String,
}

#[derive(Debug, Serialize)]
struct ReviewersRequest<'a> {
    team_reviewers: &'a [String],
}

/// Change review backed by the GitHub REST API.
pub struct GitHubChangeReview {
    client: Client,
    config: GitHubConfig,
}

impl GitHubChangeReview {
    /// Create a new GitHub client.
    pub fn new(config: GitHubConfig) -> Result<Self, ChangeReviewError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                ChangeReviewError::ConnectionFailed(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    fn pulls_url(&self, owner: &str, repo: &str) -> String {
        format!(
            "{}/repos/{}/{}/pulls",
            self.config.api_url.trim_end_matches('/'),
            urlencoding::encode(owner),
            urlencoding::encode(repo)
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.config.token)
            .header("Accept", "application/vnd.github+json")
    }

    async fn send(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<Response, ChangeReviewError> {
        let response = self.authorized(request).send().await.map_err(|e| {
            metrics::record_request("github", operation, false);
            if e.is_timeout() {
                ChangeReviewError::Timeout
            } else if e.is_connect() {
                ChangeReviewError::ConnectionFailed(e.to_string())
            } else {
                ChangeReviewError::ApiError(e.to_string())
            }
        })?;

        let status = response.status();
        metrics::record_request("github", operation, status.is_success());
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ChangeReviewError::NotFound(response.url().path().to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChangeReviewError::ApiError(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }
        Ok(response)
    }
}

impl From<PullRequest> for ChangeStatus {
    fn from(pr: PullRequest) -> Self {
        Self {
            number: pr.number,
            state: pr.state,
            merged: pr.merged,
            head_sha: pr.head.sha,
            base_ref: pr.base.ref_name,
            merged_at: pr.merged_at,
        }
    }
}

#[async_trait]
impl ChangeReview for GitHubChangeReview {
    fn name(&self) -> &str {
        "github"
    }

    async fn get(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<ChangeStatus, ChangeReviewError> {
        let url = format!("{}/{}", self.pulls_url(owner, repo), number);
        let response = self.send("get_change", self.client.get(&url)).await?;
        let pr: PullRequest = response
            .json()
            .await
            .map_err(|e| ChangeReviewError::ParseError(e.to_string()))?;
        debug!(number = pr.number, state = %pr.state, merged = pr.merged, "Fetched pull request");
        Ok(pr.into())
    }

    async fn create(
        &self,
        owner: &str,
        repo: &str,
        change: &NewChange,
    ) -> Result<ChangeRef, ChangeReviewError> {
        let url = self.pulls_url(owner, repo);
        let response = self
            .send("create_change", self.client.post(&url).json(change))
            .await?;
        let pr: PullRequest = response
            .json()
            .await
            .map_err(|e| ChangeReviewError::ParseError(e.to_string()))?;
        info!(number = pr.number, head = %change.head, base = %change.base, "Created pull request");
        Ok(ChangeRef {
            owner: owner.to_string(),
            repo: repo.to_string(),
            number: pr.number,
            html_url: pr.html_url,
        })
    }

    async fn request_reviewers(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        teams: &[String],
    ) -> Result<(), ChangeReviewError> {
        if teams.is_empty() {
            return Ok(());
        }
        let url = format!(
            "{}/{}/requested_reviewers",
            self.pulls_url(owner, repo),
            number
        );
        let body = ReviewersRequest {
            team_reviewers: teams,
        };
        self.send("request_reviewers", self.client.post(&url).json(&body))
            .await?;
        info!(number = number, teams = ?teams, "Requested reviewers");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review() -> GitHubChangeReview {
        GitHubChangeReview::new(GitHubConfig {
            api_url: "https://api.github.com/".to_string(),
            token: "t".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_pulls_url() {
        assert_eq!(
            review().pulls_url("GSA", "grace-paas-rds"),
            "https://api.github.com/repos/GSA/grace-paas-rds/pulls"
        );
    }

    #[test]
    fn test_parse_pull_request() {
        let json = r#"{
            "number": 12,
            "state": "closed",
            "merged": true,
            "merged_at": "2020-03-01T12:00:00Z",
            "html_url": "https://github.com/GSA/repo/pull/12",
            "head": {"ref": "RITM0001001", "sha": "deadbeef"},
            "base": {"ref": "master", "sha": "cafe"}
        }"#;
        let pr: PullRequest = serde_json::from_str(json).unwrap();
        let status = ChangeStatus::from(pr);
        assert_eq!(status.number, 12);
        assert!(status.merged);
        assert_eq!(status.head_sha, "deadbeef");
        assert_eq!(status.base_ref, "master");
        assert_eq!(
            status.merged_at.map(|t| t.to_rfc3339()),
            Some("2020-03-01T12:00:00+00:00".to_string())
        );
    }

    #[test]
    fn test_parse_open_pull_request_without_merge_fields() {
        let json = r#"{
            "number": 3,
            "state": "open",
            "merged_at": null,
            "html_url": null,
            "head": {"ref": "x", "sha": "1"},
            "base": {"ref": "master", "sha": "2"}
        }"#;
        let pr: PullRequest = serde_json::from_str(json).unwrap();
        assert!(!pr.merged);
        assert!(pr.merged_at.is_none());
    }
}
