//! Infrastructure document generation.
//!
//! Turns a [`Ticket`](crate::ticket::Ticket) and an engine
//! [`Catalog`](crate::catalog::Catalog) into a Terraform JSON document.
//! All randomness (port, backup window) comes from a caller supplied
//! [`rand::Rng`].

mod config;
mod document;
mod naming;
mod schedule;
mod security_group;
mod summary;
mod terraform;

pub use config::{GeneratorConfig, ModuleDefaults};
pub use document::{ConfigDocument, DocumentError, Node, Reference};
pub use naming::{normalize_identifier, ResourceName, DIGIT_PREFIX, TOKEN_SEPARATOR};
pub use schedule::{
    format_backup_window, format_maintenance_window, random_backup_start, ScheduleError,
    ScheduleWindow, MAINTENANCE_BUFFER_MINUTES,
};
pub use summary::request_summary;
pub use terraform::{generate, random_port, GenerateError};
