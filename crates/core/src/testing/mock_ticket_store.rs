//! Mock ticket store for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::ticket::{TicketError, TicketStore, TicketUpdate};

/// Mock implementation of the TicketStore trait.
///
/// Records every update by `sys_id`.
#[derive(Debug, Default)]
pub struct MockTicketStore {
    updates: Arc<RwLock<Vec<(String, TicketUpdate)>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<TicketError>>>,
}

impl MockTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates applied so far.
    pub async fn updates(&self) -> Vec<(String, TicketUpdate)> {
        self.updates.read().await.clone()
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: TicketError) {
        *self.next_error.write().await = Some(error);
    }
}

#[async_trait]
impl TicketStore for MockTicketStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn update(&self, sys_id: &str, update: &TicketUpdate) -> Result<(), TicketError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        self.updates
            .write()
            .await
            .push((sys_id.to_string(), update.clone()));
        Ok(())
    }
}
