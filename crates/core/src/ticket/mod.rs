//! Service-desk tickets: intake from an exported record and status reporting.

mod servicenow;
mod store;
mod types;

pub use servicenow::ServiceNowTicketStore;
pub use store::{TicketError, TicketState, TicketStore, TicketUpdate};
pub use types::Ticket;
