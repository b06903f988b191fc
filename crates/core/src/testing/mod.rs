//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of every collaborator trait,
//! so the whole workflow can be driven without GitHub, CircleCI, ServiceNow
//! or a git remote.
//!
//! # Example
//!
//! ```rust,ignore
//! use provisioner_core::testing::{MockBuildQuery, MockChangeReview};
//!
//! let review = MockChangeReview::new();
//! review.push_states(1, &[("open", false), ("closed", true)]).await;
//!
//! let builds = MockBuildQuery::new();
//! builds.push_listing(vec![/* builds */]).await;
//! ```

mod mock_build_query;
mod mock_change_review;
mod mock_secret_store;
mod mock_ticket_store;
mod mock_version_control;

pub use mock_build_query::MockBuildQuery;
pub use mock_change_review::{MockChangeReview, RecordedChange};
pub use mock_secret_store::{MockSecretStore, RecordedSecret};
pub use mock_ticket_store::MockTicketStore;
pub use mock_version_control::{MockVersionControl, VcsOperation};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{DateTime, Utc};

    use crate::build::{BuildSummary, Lifecycle};
    use crate::ticket::Ticket;

    /// An exported requested-item record for a small single-AZ MySQL 8.0
    /// database.
    pub const SAMPLE_TICKET_JSON: &str = r#"{
        "account": "grace-paas-development",
        "cat_item_name": "RDS Provisioning Request",
        "comments": "",
        "engine": "mysql8.0",
        "identifier": "test-rds",
        "development_count": "1",
        "development_multi_az": "false",
        "development_size": "small",
        "production_count": "1",
        "production_multi_az": "false",
        "production_size": "small",
        "test_count": "1",
        "test_multi_az": "false",
        "test_size": "small",
        "multi_az": "No",
        "name": "TestDB",
        "number": "RITM0001001",
        "opened_by": "by@example.com",
        "requested_for": "for@example.com",
        "size": "small",
        "supervisor": "supervisor@example.com",
        "sys_id": "99aa00000aa9aa00a9a99999a99aaa99",
        "username": "TestUser"
    }"#;

    /// Parsed [`SAMPLE_TICKET_JSON`].
    pub fn sample_ticket() -> Ticket {
        Ticket::from_json(SAMPLE_TICKET_JSON).expect("sample ticket parses")
    }

    /// A passing build of `commit` in the given lifecycle.
    pub fn build_summary(
        build_num: u64,
        job_name: &str,
        commit: &str,
        start_time: DateTime<Utc>,
        lifecycle: Lifecycle,
    ) -> BuildSummary {
        let status = if lifecycle.is_finished() {
            "success"
        } else {
            "running"
        };
        BuildSummary {
            build_num,
            job_name: job_name.to_string(),
            commit: Some(commit.to_string()),
            start_time: Some(start_time),
            lifecycle,
            status: status.to_string(),
            failed: false,
        }
    }

    /// `build` after it finished with the given outcome.
    pub fn finished(build: &BuildSummary, failed: bool) -> BuildSummary {
        BuildSummary {
            lifecycle: Lifecycle::Finished,
            status: if failed { "failed" } else { "success" }.to_string(),
            failed,
            ..build.clone()
        }
    }
}
