//! CircleCI v1.1 API backend.
//!
//! Provides build listing for the deployment tracker and project
//! environment variables for secret storage.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::CircleCiConfig;
use crate::metrics;
use crate::secrets::{SecretStore, SecretStoreError};

use super::{is_success_status, BuildQuery, BuildQueryError, BuildSummary, Lifecycle, ProjectRef};

#[derive(Debug, Deserialize)]
struct CircleBuild {
    build_num: u64,
    #[serde(default)]
    lifecycle: Option<Lifecycle>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    failed: Option<bool>,
    #[serde(default)]
    start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    vcs_revision: Option<String>,
    #[serde(default)]
    all_commit_details: Vec<CommitDetail>,
    #[serde(default)]
    build_parameters: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    workflows: Option<WorkflowInfo>,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    commit: String,
}

#[derive(Debug, Deserialize)]
struct WorkflowInfo {
    job_name: Option<String>,
}

impl From<CircleBuild> for BuildSummary {
    fn from(build: CircleBuild) -> Self {
        let job_name = build
            .build_parameters
            .as_ref()
            .and_then(|p| p.get("CIRCLE_JOB"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| build.workflows.and_then(|w| w.job_name))
            .unwrap_or_default();
        let commit = build
            .all_commit_details
            .into_iter()
            .next()
            .map(|c| c.commit)
            .or(build.vcs_revision);

        let lifecycle = build.lifecycle.unwrap_or(Lifecycle::Unknown);
        let status = build.status.unwrap_or_default();
        // Canceled and infrastructure failures finish with a null flag.
        let failed = build
            .failed
            .unwrap_or_else(|| lifecycle.is_finished() && !is_success_status(&status));

        Self {
            build_num: build.build_num,
            job_name,
            commit,
            start_time: build.start_time,
            lifecycle,
            status,
            failed,
        }
    }
}

#[derive(Debug, Serialize)]
struct EnvVar<'a> {
    name: &'a str,
    value: &'a str,
}

/// CircleCI API client.
pub struct CircleCiClient {
    client: Client,
    config: CircleCiConfig,
}

impl CircleCiClient {
    /// Create a new CircleCI client.
    pub fn new(config: CircleCiConfig) -> Result<Self, BuildQueryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| {
                BuildQueryError::ConnectionFailed(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    fn project_url(&self, project: &ProjectRef) -> String {
        format!(
            "{}/project/{}/{}/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.vcs_type,
            urlencoding::encode(&project.account),
            urlencoding::encode(&project.repo)
        )
    }

    async fn send(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<Response, BuildQueryError> {
        let response = request
            .header("Circle-Token", &self.config.token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                metrics::record_request("circleci", operation, false);
                if e.is_timeout() {
                    BuildQueryError::Timeout
                } else if e.is_connect() {
                    BuildQueryError::ConnectionFailed(e.to_string())
                } else {
                    BuildQueryError::ApiError(e.to_string())
                }
            })?;

        let status = response.status();
        metrics::record_request("circleci", operation, status.is_success());
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BuildQueryError::NotFound(response.url().path().to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BuildQueryError::ApiError(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl BuildQuery for CircleCiClient {
    fn name(&self) -> &str {
        "circleci"
    }

    async fn list_recent(
        &self,
        project: &ProjectRef,
        branch: &str,
        limit: u32,
    ) -> Result<Vec<BuildSummary>, BuildQueryError> {
        let url = format!(
            "{}/tree/{}?limit={}&offset=0",
            self.project_url(project),
            urlencoding::encode(branch),
            limit
        );
        let builds: Vec<CircleBuild> = self
            .send("list_builds", self.client.get(&url))
            .await?
            .json()
            .await
            .map_err(|e| BuildQueryError::ParseError(e.to_string()))?;
        debug!(project = %project, branch = branch, count = builds.len(), "Listed recent builds");
        Ok(builds.into_iter().map(BuildSummary::from).collect())
    }

    async fn get_build(
        &self,
        project: &ProjectRef,
        build_num: u64,
    ) -> Result<BuildSummary, BuildQueryError> {
        let url = format!("{}/{}", self.project_url(project), build_num);
        let build: CircleBuild = self
            .send("get_build", self.client.get(&url))
            .await?
            .json()
            .await
            .map_err(|e| BuildQueryError::ParseError(e.to_string()))?;
        Ok(build.into())
    }
}

#[async_trait]
impl SecretStore for CircleCiClient {
    fn name(&self) -> &str {
        "circleci"
    }

    async fn put_secret(
        &self,
        project: &ProjectRef,
        name: &str,
        value: &str,
    ) -> Result<(), SecretStoreError> {
        info!(project = %project, name = name, "Creating CircleCI environment variable");
        let url = format!("{}/envvar", self.project_url(project));
        self.send(
            "put_envvar",
            self.client.post(&url).json(&EnvVar { name, value }),
        )
        .await
        .map_err(|e| SecretStoreError::Store(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_url() {
        let client = CircleCiClient::new(CircleCiConfig::default()).unwrap();
        assert_eq!(
            client.project_url(&ProjectRef::new("GSA", "grace-paas-rds")),
            "https://circleci.com/api/v1.1/project/github/GSA/grace-paas-rds"
        );
    }

    #[test]
    fn test_parse_listed_build() {
        let json = r#"{
            "build_num": 118,
            "lifecycle": "finished",
            "status": "success",
            "outcome": "success",
            "failed": false,
            "start_time": "2020-03-01T12:01:00.000Z",
            "vcs_revision": "deadbeef",
            "all_commit_details": [{"commit": "deadbeef"}],
            "build_parameters": {"CIRCLE_JOB": "apply_terraform"},
            "username": "GSA",
            "reponame": "grace-paas-rds"
        }"#;
        let build: BuildSummary = serde_json::from_str::<CircleBuild>(json).unwrap().into();
        assert_eq!(build.build_num, 118);
        assert_eq!(build.job_name, "apply_terraform");
        assert_eq!(build.commit.as_deref(), Some("deadbeef"));
        assert!(build.lifecycle.is_finished());
        assert!(!build.failed);
        assert!(build.start_time.is_some());
    }

    #[test]
    fn test_parse_canceled_build_is_failed() {
        let json = r#"{
            "build_num": 120,
            "lifecycle": "finished",
            "status": "canceled",
            "outcome": "canceled",
            "failed": null,
            "start_time": "2020-03-01T12:01:00.000Z",
            "vcs_revision": "deadbeef",
            "build_parameters": {"CIRCLE_JOB": "apply_terraform"}
        }"#;
        let build: BuildSummary = serde_json::from_str::<CircleBuild>(json).unwrap().into();
        assert!(build.lifecycle.is_finished());
        assert!(build.failed);
        assert!(!build.succeeded());

        let json = json.replace("canceled", "infrastructure_fail");
        let build: BuildSummary = serde_json::from_str::<CircleBuild>(&json).unwrap().into();
        assert!(build.failed);
    }

    fn client_for(server: &mockito::Server) -> CircleCiClient {
        CircleCiClient::new(CircleCiConfig {
            api_url: server.url(),
            token: "t".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_build_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/project/github/GSA/infra/42")
            .with_status(404)
            .with_body(r#"{"message": "Build not found"}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .get_build(&ProjectRef::new("GSA", "infra"), 42)
            .await
            .unwrap_err();
        assert!(
            matches!(err, BuildQueryError::NotFound(ref path) if path.ends_with("/infra/42")),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn test_get_build_server_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/project/github/GSA/infra/42")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let err = client_for(&server)
            .get_build(&ProjectRef::new("GSA", "infra"), 42)
            .await
            .unwrap_err();
        assert!(matches!(err, BuildQueryError::ApiError(ref msg) if msg.contains("boom")));
    }

    #[tokio::test]
    async fn test_get_canceled_build() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/project/github/GSA/infra/120")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"build_num": 120, "lifecycle": "finished", "status": "canceled",
                    "failed": null, "build_parameters": {"CIRCLE_JOB": "apply_terraform"}}"#,
            )
            .create_async()
            .await;

        let build = client_for(&server)
            .get_build(&ProjectRef::new("GSA", "infra"), 120)
            .await
            .unwrap();
        assert_eq!(build.status, "canceled");
        assert!(build.failed);
    }

    #[test]
    fn test_parse_queued_build() {
        let json = r#"{
            "build_num": 119,
            "lifecycle": "queued",
            "status": "queued",
            "failed": null,
            "start_time": null,
            "vcs_revision": "cafe",
            "all_commit_details": [],
            "build_parameters": null,
            "workflows": {"job_name": "plan_terraform"}
        }"#;
        let build: BuildSummary = serde_json::from_str::<CircleBuild>(json).unwrap().into();
        assert_eq!(build.job_name, "plan_terraform");
        assert_eq!(build.commit.as_deref(), Some("cafe"));
        assert_eq!(build.lifecycle, Lifecycle::Queued);
        assert!(build.start_time.is_none());
        assert!(!build.failed);
    }
}
