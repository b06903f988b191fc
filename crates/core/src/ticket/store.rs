//! Ticket store trait and status update types.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error type for ticket operations.
#[derive(Debug)]
pub enum TicketError {
    /// The exported record could not be read.
    Read(String),
    /// The exported record is not valid.
    Parse(String),
    /// A required field is empty.
    MissingField(String),
    /// The ticket store rejected or failed the request.
    Store(String),
}

impl fmt::Display for TicketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketError::Read(msg) => write!(f, "Failed to read ticket: {}", msg),
            TicketError::Parse(msg) => write!(f, "Failed to parse ticket: {}", msg),
            TicketError::MissingField(field) => {
                write!(f, "Ticket field '{}' must be set", field)
            }
            TicketError::Store(msg) => write!(f, "Ticket store error: {}", msg),
        }
    }
}

impl std::error::Error for TicketError {}

/// Ticket states the workflow reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketState {
    /// Provisioned and handed back to the requester.
    WorkInProgress,
    /// Provisioning failed, needs attention from a human.
    Reopened,
}

impl TicketState {
    /// Numeric state code used by the service desk.
    pub fn code(&self) -> u8 {
        match self {
            TicketState::WorkInProgress => 2,
            TicketState::Reopened => 8,
        }
    }
}

/// A state change plus a comment for the requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketUpdate {
    pub state: TicketState,
    pub comment: String,
}

impl TicketUpdate {
    /// Update for a completed run.
    pub fn provisioned() -> Self {
        Self {
            state: TicketState::WorkInProgress,
            comment: "RDS Provisioned via CI/CD Pipeline".to_string(),
        }
    }

    /// Update for a failed run.
    pub fn failed(error: &dyn std::error::Error) -> Self {
        Self {
            state: TicketState::Reopened,
            comment: format!("Error provisioning RDS: {}", error),
        }
    }
}

/// Trait for ticket store backends.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Apply a status update to the ticket record identified by `sys_id`.
    async fn update(&self, sys_id: &str, update: &TicketUpdate) -> Result<(), TicketError>;
}
