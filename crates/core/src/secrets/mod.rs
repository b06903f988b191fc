//! Per-resource secret generation and storage.

mod password;

pub use password::{generate_password, PASSWORD_LENGTH};

use async_trait::async_trait;
use thiserror::Error;

use crate::build::ProjectRef;

/// Errors from a secret store.
#[derive(Debug, Clone, Error)]
pub enum SecretStoreError {
    #[error("Failed to store secret: {0}")]
    Store(String),
}

/// Where generated credentials are kept for the deployment pipeline.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Backend name for logs and metrics.
    fn name(&self) -> &str;

    /// Create or replace a named secret in a project.
    async fn put_secret(
        &self,
        project: &ProjectRef,
        name: &str,
        value: &str,
    ) -> Result<(), SecretStoreError>;
}

/// Name of the pipeline variable Terraform reads `variable` from.
pub fn terraform_variable_name(variable: &str) -> String {
    format!("TF_VAR_{}", variable)
}
