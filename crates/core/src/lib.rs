//! Core of the RDS provisioner.
//!
//! A service-desk request ([`ticket::Ticket`]) is turned into a Terraform
//! JSON document ([`generator`]), published as a reviewed change
//! ([`review`], [`vcs`], [`secrets`]), and tracked through review and CI
//! deployment ([`build`]) before its status is written back to the ticket
//! ([`workflow`]).

pub mod build;
pub mod catalog;
pub mod config;
pub mod generator;
pub mod metrics;
pub mod review;
pub mod secrets;
pub mod shutdown;
pub mod testing;
pub mod ticket;
pub mod tracking;
pub mod vcs;
pub mod workflow;

pub use catalog::{Catalog, CatalogError};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, RunMode,
    SanitizedConfig,
};
pub use generator::{generate, request_summary, ConfigDocument, GenerateError};
pub use shutdown::ShutdownSignal;
pub use ticket::{Ticket, TicketError};
pub use tracking::TrackerError;
pub use workflow::{Collaborators, ProvisioningWorkflow, WorkflowError, WorkflowOutcome};
