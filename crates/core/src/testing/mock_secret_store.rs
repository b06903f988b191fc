//! Mock secret store for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::build::ProjectRef;
use crate::secrets::{SecretStore, SecretStoreError};

/// A recorded secret for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSecret {
    pub project: ProjectRef,
    pub name: String,
    pub value: String,
}

/// Mock implementation of the SecretStore trait.
#[derive(Debug, Default)]
pub struct MockSecretStore {
    secrets: Arc<RwLock<Vec<RecordedSecret>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<SecretStoreError>>>,
}

impl MockSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Secrets stored so far.
    pub async fn secrets(&self) -> Vec<RecordedSecret> {
        self.secrets.read().await.clone()
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: SecretStoreError) {
        *self.next_error.write().await = Some(error);
    }
}

#[async_trait]
impl SecretStore for MockSecretStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn put_secret(
        &self,
        project: &ProjectRef,
        name: &str,
        value: &str,
    ) -> Result<(), SecretStoreError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        self.secrets.write().await.push(RecordedSecret {
            project: project.clone(),
            name: name.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }
}
