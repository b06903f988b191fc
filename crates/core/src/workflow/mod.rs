//! Provisioning workflow orchestration.

mod config;
mod publish;
mod runner;
mod types;

pub use config::WorkflowConfig;
pub use publish::change_body;
pub use runner::{Collaborators, ProvisioningWorkflow};
pub use types::{WorkflowError, WorkflowOutcome};
