use serde::{Deserialize, Serialize};

use crate::generator::GeneratorConfig;
use crate::workflow::WorkflowConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub circleci: CircleCiConfig,
    #[serde(default)]
    pub servicenow: ServiceNowConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
}

/// What a run is going to do. Decides which settings are mandatory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Write a flat request summary, no external calls.
    Json,
    /// Write the Terraform document, no external calls.
    Generate,
    /// Publish the document and track it through review and deployment.
    Terraform,
}

/// GitHub configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitHubConfig {
    /// REST API base URL
    #[serde(default = "default_github_api_url")]
    pub api_url: String,
    /// Base URL repositories are cloned from (defaults to https://github.com/<owner>/)
    #[serde(default)]
    pub clone_base_url: String,
    /// Organization owning the infrastructure repository
    #[serde(default)]
    pub owner: String,
    /// Branch the change request targets
    #[serde(default = "default_base_branch")]
    pub base_branch: String,
    /// Teams asked to review the change
    #[serde(default)]
    pub reviewer_teams: Vec<String>,
    /// Access token (GITHUB_TOKEN)
    #[serde(default)]
    pub token: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_api_url(),
            clone_base_url: String::new(),
            owner: String::new(),
            base_branch: default_base_branch(),
            reviewer_teams: Vec::new(),
            token: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

impl GitHubConfig {
    /// Clone URL of a repository.
    pub fn clone_url(&self, repo: &str) -> String {
        if self.clone_base_url.is_empty() {
            format!("https://github.com/{}/{}", self.owner, repo)
        } else {
            format!("{}/{}", self.clone_base_url.trim_end_matches('/'), repo)
        }
    }
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_base_branch() -> String {
    "master".to_string()
}

fn default_timeout() -> u32 {
    30
}

/// CircleCI configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CircleCiConfig {
    /// v1.1 API base URL
    #[serde(default = "default_circleci_api_url")]
    pub api_url: String,
    /// VCS type segment of project paths
    #[serde(default = "default_vcs_type")]
    pub vcs_type: String,
    /// API token (CIRCLE_TOKEN)
    #[serde(default)]
    pub token: String,
    /// Job whose completion means the database was deployed
    #[serde(default = "default_target_job")]
    pub target_job: String,
    /// Number of recent builds fetched per listing
    #[serde(default = "default_list_limit")]
    pub list_limit: u32,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for CircleCiConfig {
    fn default() -> Self {
        Self {
            api_url: default_circleci_api_url(),
            vcs_type: default_vcs_type(),
            token: String::new(),
            target_job: default_target_job(),
            list_limit: default_list_limit(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_circleci_api_url() -> String {
    "https://circleci.com/api/v1.1".to_string()
}

fn default_vcs_type() -> String {
    "github".to_string()
}

fn default_target_job() -> String {
    "apply_terraform".to_string()
}

fn default_list_limit() -> u32 {
    4 // jobs in the workflow
}

/// ServiceNow configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceNowConfig {
    /// Instance host name or URL (SN_INSTANCE)
    #[serde(default)]
    pub instance: String,
    /// API user (SN_USER)
    #[serde(default)]
    pub username: String,
    /// API password (SN_PASSWORD)
    #[serde(default)]
    pub password: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for ServiceNowConfig {
    fn default() -> Self {
        Self {
            instance: String::new(),
            username: String::new(),
            password: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

impl ServiceNowConfig {
    /// Browser link to a requested item, used in change request bodies.
    pub fn record_link(&self, sys_id: &str) -> String {
        let instance = self.instance.trim_end_matches('/');
        let base = if instance.starts_with("http://") || instance.starts_with("https://") {
            instance.to_string()
        } else {
            format!("https://{}", instance)
        };
        format!("{}/nav_to.do?uri=sc_req_item.do%3Fsys_id%3D{}", base, sys_id)
    }
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub github: SanitizedGitHubConfig,
    pub circleci: SanitizedCircleCiConfig,
    pub servicenow: SanitizedServiceNowConfig,
    pub workflow: WorkflowConfig,
    pub generator: GeneratorConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedGitHubConfig {
    pub api_url: String,
    pub owner: String,
    pub base_branch: String,
    pub reviewer_teams: Vec<String>,
    pub token_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCircleCiConfig {
    pub api_url: String,
    pub target_job: String,
    pub list_limit: u32,
    pub token_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedServiceNowConfig {
    pub instance: String,
    pub username: String,
    pub password_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            github: SanitizedGitHubConfig {
                api_url: config.github.api_url.clone(),
                owner: config.github.owner.clone(),
                base_branch: config.github.base_branch.clone(),
                reviewer_teams: config.github.reviewer_teams.clone(),
                token_configured: !config.github.token.is_empty(),
            },
            circleci: SanitizedCircleCiConfig {
                api_url: config.circleci.api_url.clone(),
                target_job: config.circleci.target_job.clone(),
                list_limit: config.circleci.list_limit,
                token_configured: !config.circleci.token.is_empty(),
            },
            servicenow: SanitizedServiceNowConfig {
                instance: config.servicenow.instance.clone(),
                username: config.servicenow.username.clone(),
                password_configured: !config.servicenow.password.is_empty(),
            },
            workflow: config.workflow.clone(),
            generator: config.generator.clone(),
        }
    }
}
