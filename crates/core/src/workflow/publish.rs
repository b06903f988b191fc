//! Publishing a generated document as a change request.

use tracing::info;

use crate::build::ProjectRef;
use crate::config::Config;
use crate::generator::{ConfigDocument, ResourceName};
use crate::review::{ChangeRef, ChangeReview, NewChange};
use crate::secrets::{terraform_variable_name, SecretStore};
use crate::ticket::Ticket;
use crate::vcs::{CommitAuthor, VersionControl};

use super::WorkflowError;

/// Collaborators a change is published through.
pub(crate) struct Publisher<'a> {
    pub vcs: &'a dyn VersionControl,
    pub review: &'a dyn ChangeReview,
    pub secrets: &'a dyn SecretStore,
    pub config: &'a Config,
}

/// Body of the change request: a link to the ticket and a one-line summary.
pub fn change_body(ticket: &Ticket, config: &Config) -> String {
    format!(
        "[{}]({})\n- {} {} RDS in {} account",
        ticket.number,
        config.servicenow.record_link(&ticket.sys_id),
        ticket.size,
        ticket.engine,
        ticket.account
    )
}

impl Publisher<'_> {
    /// Commit the document on a branch named after the ticket, store the
    /// master password for the pipeline, and open a change request.
    ///
    /// The working copy is removed before the change request is opened,
    /// and on every error path.
    pub async fn publish(
        &self,
        ticket: &Ticket,
        repo: &str,
        document: &ConfigDocument,
        password: &str,
    ) -> Result<ChangeRef, WorkflowError> {
        let github = &self.config.github;
        let branch = ticket.number.as_str();
        let relative = self.config.workflow.document_path(&ticket.number);

        {
            let copy = self.vcs.clone_repo(&github.clone_url(repo)).await?;
            self.vcs.create_branch(&copy, branch).await?;

            info!(path = %relative.display(), "Writing terraform document");
            document
                .write_to(&copy.join(&relative))
                .map_err(|e| WorkflowError::publish("document", e))?;

            let variable = terraform_variable_name(
                &ResourceName::new(&ticket.identifier).variable("db_password"),
            );
            self.secrets
                .put_secret(&ProjectRef::new(&github.owner, repo), &variable, password)
                .await?;

            self.vcs.add(&copy, &relative).await?;
            let author = CommitAuthor {
                name: ticket.number.clone(),
                email: self.config.workflow.commit_email.clone(),
            };
            self.vcs.commit(&copy, &ticket.number, &author).await?;
            self.vcs.push(&copy, branch).await?;
        }

        let change = self
            .review
            .create(
                &github.owner,
                repo,
                &NewChange {
                    title: ticket.number.clone(),
                    head: branch.to_string(),
                    base: github.base_branch.clone(),
                    body: change_body(ticket, self.config),
                },
            )
            .await?;
        self.review
            .request_reviewers(&github.owner, repo, change.number, &github.reviewer_teams)
            .await?;

        Ok(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::sample_ticket;

    #[test]
    fn test_change_body() {
        let mut config = Config::default();
        config.servicenow.instance = "example.service-now.com".into();
        let ticket = sample_ticket();
        let body = change_body(&ticket, &config);
        assert_eq!(
            body,
            format!(
                "[{}](https://example.service-now.com/nav_to.do?uri=sc_req_item.do%3Fsys_id%3D{})\n- small mysql8.0 RDS in {} account",
                ticket.number, ticket.sys_id, ticket.account
            )
        );
    }
}
