//! Workflow configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the provisioning workflow and its trackers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// How often to poll the change request (seconds).
    #[serde(default = "default_review_interval")]
    pub review_poll_interval_secs: u64,

    /// How often to poll build listings and single builds (seconds).
    #[serde(default = "default_build_interval")]
    pub build_poll_interval_secs: u64,

    /// Budget for any observed CI job other than the deploy job (seconds).
    #[serde(default = "default_job_timeout")]
    pub job_timeout_secs: u64,

    /// Budget for the deploy job (seconds).
    #[serde(default = "default_deploy_timeout")]
    pub deploy_timeout_secs: u64,

    /// Budget for the deploy job to show up in a build listing (seconds).
    /// 0 waits forever.
    #[serde(default = "default_deploy_search_timeout")]
    pub deploy_search_timeout_secs: u64,

    /// Directory inside the repository the document is written to.
    #[serde(default = "default_terraform_dir")]
    pub terraform_dir: PathBuf,

    /// Commit author email.
    #[serde(default = "default_commit_email")]
    pub commit_email: String,

    /// Parent of the temporary working copy (system temp dir when unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_root: Option<PathBuf>,
}

fn default_review_interval() -> u64 {
    10
}

fn default_build_interval() -> u64 {
    5
}

fn default_job_timeout() -> u64 {
    300 // 5 minutes
}

fn default_deploy_timeout() -> u64 {
    1800 // 30 minutes
}

fn default_deploy_search_timeout() -> u64 {
    7200 // 2 hours
}

fn default_terraform_dir() -> PathBuf {
    PathBuf::from("terraform")
}

fn default_commit_email() -> String {
    "rds-provisioner@users.noreply.github.com".to_string()
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            review_poll_interval_secs: default_review_interval(),
            build_poll_interval_secs: default_build_interval(),
            job_timeout_secs: default_job_timeout(),
            deploy_timeout_secs: default_deploy_timeout(),
            deploy_search_timeout_secs: default_deploy_search_timeout(),
            terraform_dir: default_terraform_dir(),
            commit_email: default_commit_email(),
            work_root: None,
        }
    }
}

impl WorkflowConfig {
    pub fn review_poll_interval(&self) -> Duration {
        Duration::from_secs(self.review_poll_interval_secs)
    }

    pub fn build_poll_interval(&self) -> Duration {
        Duration::from_secs(self.build_poll_interval_secs)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    pub fn deploy_timeout(&self) -> Duration {
        Duration::from_secs(self.deploy_timeout_secs)
    }

    /// `None` when the deploy job search is unbounded.
    pub fn deploy_search_timeout(&self) -> Option<Duration> {
        (self.deploy_search_timeout_secs > 0)
            .then(|| Duration::from_secs(self.deploy_search_timeout_secs))
    }

    /// Repository relative path of the document for a ticket.
    pub fn document_path(&self, ticket_number: &str) -> PathBuf {
        self.terraform_dir
            .join(format!("rds_{}.tf.json", ticket_number))
    }
}
