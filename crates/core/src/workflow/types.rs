//! Workflow errors and outcome.

use serde::Serialize;
use thiserror::Error;

use crate::build::{BuildQueryError, BuildSummary};
use crate::catalog::CatalogError;
use crate::generator::GenerateError;
use crate::review::{ChangeRef, ChangeReviewError};
use crate::secrets::SecretStoreError;
use crate::ticket::TicketError;
use crate::tracking::TrackerError;
use crate::vcs::VcsError;

/// Why a provisioning run stopped.
///
/// No step is retried; the first error aborts the remaining steps.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The request could not be turned into a document (unknown engine or
    /// size tier, unusable schedule). Raised before any external call.
    #[error(transparent)]
    Generate(#[from] GenerateError),

    /// Publishing the change failed (working copy, secret or change request).
    #[error("publish failed during {step}: {message}")]
    PublishFailure { step: &'static str, message: String },

    /// The change was closed without being merged.
    #[error("pull request {state} but not merged")]
    NotMerged { state: String },

    /// A CI job of the merged commit failed.
    #[error("{job} {status} (build {build_num})")]
    JobFailed {
        job: String,
        status: String,
        build_num: u64,
    },

    /// A wait exceeded its budget.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Querying the CI system failed while waiting for the deployment.
    #[error("build query failed: {0}")]
    BuildQuery(#[from] BuildQueryError),

    /// Shutdown was requested.
    #[error("provisioning cancelled")]
    Cancelled,

    /// The final status could not be written back to the ticket.
    #[error("failed to report status to ticket: {0}")]
    TicketStore(#[from] TicketError),
}

impl WorkflowError {
    pub(crate) fn publish(step: &'static str, error: impl std::fmt::Display) -> Self {
        WorkflowError::PublishFailure {
            step,
            message: error.to_string(),
        }
    }

    /// Label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowError::Generate(GenerateError::Catalog(CatalogError::UnknownEngine(_))) => {
                "unknown_engine"
            }
            WorkflowError::Generate(GenerateError::Catalog(
                CatalogError::UnknownSizeTier { .. },
            )) => "unknown_size_tier",
            WorkflowError::Generate(_) => "generate",
            WorkflowError::PublishFailure { .. } => "publish_failure",
            WorkflowError::NotMerged { .. } => "not_merged",
            WorkflowError::JobFailed { .. } => "job_failed",
            WorkflowError::Timeout(_) => "timeout",
            WorkflowError::BuildQuery(_) => "build_query",
            WorkflowError::Cancelled => "cancelled",
            WorkflowError::TicketStore(_) => "ticket_store",
        }
    }
}

impl From<TrackerError> for WorkflowError {
    fn from(error: TrackerError) -> Self {
        match error {
            TrackerError::NotMerged { state } => WorkflowError::NotMerged { state },
            TrackerError::JobFailed {
                job,
                status,
                build_num,
            } => WorkflowError::JobFailed {
                job,
                status,
                build_num,
            },
            e @ (TrackerError::JobTimeout { .. } | TrackerError::DeploymentNotFound { .. }) => {
                WorkflowError::Timeout(e.to_string())
            }
            TrackerError::Cancelled => WorkflowError::Cancelled,
            TrackerError::Review(e) => WorkflowError::publish("review tracking", e),
            TrackerError::Build(e) => WorkflowError::BuildQuery(e),
        }
    }
}

impl From<VcsError> for WorkflowError {
    fn from(error: VcsError) -> Self {
        WorkflowError::publish("version control", error)
    }
}

impl From<ChangeReviewError> for WorkflowError {
    fn from(error: ChangeReviewError) -> Self {
        WorkflowError::publish("change request", error)
    }
}

impl From<SecretStoreError> for WorkflowError {
    fn from(error: SecretStoreError) -> Self {
        WorkflowError::publish("secret storage", error)
    }
}

/// Result of a completed provisioning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowOutcome {
    pub ticket_number: String,
    pub change: ChangeRef,
    /// Head commit of the merged change.
    pub commit: String,
    /// The finished deploy job.
    pub deployment: BuildSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_errors_map_to_taxonomy() {
        let err: WorkflowError = TrackerError::NotMerged {
            state: "closed".into(),
        }
        .into();
        assert!(matches!(err, WorkflowError::NotMerged { .. }));
        assert_eq!(err.kind(), "not_merged");

        let err: WorkflowError = TrackerError::JobTimeout {
            job: "apply_terraform".into(),
            build_num: 9,
        }
        .into();
        assert!(matches!(err, WorkflowError::Timeout(ref m) if m.contains("[9]")));

        let err: WorkflowError = TrackerError::DeploymentNotFound {
            job: "apply_terraform".into(),
            waited_secs: 60,
        }
        .into();
        assert_eq!(err.kind(), "timeout");

        let err: WorkflowError = TrackerError::Cancelled.into();
        assert_eq!(err.kind(), "cancelled");
    }

    #[test]
    fn test_catalog_errors_keep_their_kind() {
        let err: WorkflowError =
            GenerateError::Catalog(CatalogError::UnknownEngine("oracle".into())).into();
        assert_eq!(err.kind(), "unknown_engine");
        assert!(err.to_string().contains("oracle"));
    }

    #[test]
    fn test_publish_failure_message() {
        let err: WorkflowError = VcsError::CommandFailed {
            command: "push".into(),
            message: "rejected".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "publish failed during version control: git push failed: rejected"
        );
    }
}
