//! The provisioning workflow: generate, publish, wait for review, wait for
//! deployment, report.

use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::build::{BuildQuery, BuildTracker, BuildTrackerSettings, DeploymentTarget, ProjectRef};
use crate::catalog::Catalog;
use crate::config::Config;
use crate::generator::{generate, ConfigDocument};
use crate::metrics;
use crate::review::{ChangeReview, ChangeReviewTracker};
use crate::secrets::{generate_password, SecretStore};
use crate::shutdown::ShutdownSignal;
use crate::ticket::{Ticket, TicketStore, TicketUpdate};
use crate::vcs::VersionControl;

use super::publish::Publisher;
use super::{WorkflowError, WorkflowOutcome};

/// External systems the workflow talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub vcs: Arc<dyn VersionControl>,
    pub review: Arc<dyn ChangeReview>,
    pub builds: Arc<dyn BuildQuery>,
    pub secrets: Arc<dyn SecretStore>,
    pub tickets: Arc<dyn TicketStore>,
}

/// Runs one provisioning request end to end.
///
/// Steps run strictly in sequence; the random source is the only state
/// shared across runs.
pub struct ProvisioningWorkflow {
    config: Config,
    catalog: Catalog,
    services: Collaborators,
    rng: Mutex<StdRng>,
}

impl ProvisioningWorkflow {
    pub fn new(config: Config, catalog: Catalog, services: Collaborators, rng: StdRng) -> Self {
        Self {
            config,
            catalog,
            services,
            rng: Mutex::new(rng),
        }
    }

    /// Generate the document and the master password.
    async fn prepare(&self, ticket: &Ticket) -> Result<(ConfigDocument, String), WorkflowError> {
        let mut rng = self.rng.lock().await;
        let document = generate(ticket, &self.catalog, &self.config.generator, &mut *rng)?;
        let password = generate_password(&mut *rng);
        Ok((document, password))
    }

    /// Run the workflow without reporting to the ticket.
    pub async fn run(
        &self,
        ticket: &Ticket,
        repo: &str,
        shutdown: &mut ShutdownSignal,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        info!(ticket = %ticket.number, engine = %ticket.engine, size = %ticket.size, "Provisioning RDS");
        let (document, password) = self.prepare(ticket).await?;

        let publisher = Publisher {
            vcs: self.services.vcs.as_ref(),
            review: self.services.review.as_ref(),
            secrets: self.services.secrets.as_ref(),
            config: &self.config,
        };
        let change = publisher.publish(ticket, repo, &document, &password).await?;
        info!(ticket = %ticket.number, change = %change, "Change request opened");

        let review_tracker = ChangeReviewTracker::new(
            self.services.review.clone(),
            self.config.workflow.review_poll_interval(),
        );
        let merged = review_tracker.await_resolution(&change, shutdown).await?;

        let merged_at = merged.merged_at.unwrap_or_else(|| {
            warn!(change = %change, "Merged change has no merge time, using now");
            Utc::now()
        });
        let branch = if merged.base_ref.is_empty() {
            self.config.github.base_branch.clone()
        } else {
            merged.base_ref.clone()
        };
        let target = DeploymentTarget {
            project: ProjectRef::new(&change.owner, &change.repo),
            branch,
            commit: merged.head_sha.clone(),
            merged_at,
            job_name: self.config.circleci.target_job.clone(),
        };

        let workflow = &self.config.workflow;
        let build_tracker = BuildTracker::new(
            self.services.builds.clone(),
            BuildTrackerSettings {
                poll_interval: workflow.build_poll_interval(),
                job_timeout: workflow.job_timeout(),
                deploy_timeout: workflow.deploy_timeout(),
                search_timeout: workflow.deploy_search_timeout(),
                list_limit: self.config.circleci.list_limit,
            },
        );
        let deployment = build_tracker.await_deployment(&target, shutdown).await?;

        Ok(WorkflowOutcome {
            ticket_number: ticket.number.clone(),
            change,
            commit: merged.head_sha,
            deployment,
        })
    }

    /// Run the workflow and write the result back to the ticket.
    ///
    /// On failure the ticket is reopened with the error as comment and the
    /// workflow error is returned, even when the report itself fails.
    pub async fn run_and_report(
        &self,
        ticket: &Ticket,
        repo: &str,
        shutdown: &mut ShutdownSignal,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let started = Instant::now();
        let result = self.run(ticket, repo, shutdown).await;
        let tickets = &self.services.tickets;

        let result = match result {
            Ok(outcome) => match tickets
                .update(&ticket.sys_id, &TicketUpdate::provisioned())
                .await
            {
                Ok(()) => {
                    info!(ticket = %ticket.number, build = outcome.deployment.build_num, "Processing complete");
                    Ok(outcome)
                }
                Err(e) => {
                    error!(ticket = %ticket.number, error = %e, "Failed to report success to ticket");
                    Err(WorkflowError::TicketStore(e))
                }
            },
            Err(e) => {
                error!(ticket = %ticket.number, error = %e, "Provisioning failed");
                if let Err(report_err) = tickets.update(&ticket.sys_id, &TicketUpdate::failed(&e)).await {
                    error!(ticket = %ticket.number, error = %report_err, "Failed to report error to ticket");
                }
                Err(e)
            }
        };

        let label = match &result {
            Ok(_) => "provisioned",
            Err(e) => e.kind(),
        };
        metrics::WORKFLOW_RUNS.with_label_values(&[label]).inc();
        metrics::WORKFLOW_DURATION
            .with_label_values(&[label])
            .observe(started.elapsed().as_secs_f64());
        result
    }
}
