//! ServiceNow table API ticket store.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::ServiceNowConfig;
use crate::metrics;

use super::{TicketError, TicketStore, TicketUpdate};

/// Table holding requested items.
const REQUESTED_ITEM_TABLE: &str = "sc_req_item";

#[derive(Debug, Serialize)]
struct UpdateBody<'a> {
    state: u8,
    comments: &'a str,
}

/// Ticket store backed by the ServiceNow table API.
pub struct ServiceNowTicketStore {
    client: Client,
    config: ServiceNowConfig,
}

impl ServiceNowTicketStore {
    /// Create a new store client.
    pub fn new(config: ServiceNowConfig) -> Result<Self, TicketError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| TicketError::Store(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Base URL of the instance. A bare host name gets an https scheme.
    fn base_url(&self) -> String {
        let instance = self.config.instance.trim_end_matches('/');
        if instance.starts_with("http://") || instance.starts_with("https://") {
            instance.to_string()
        } else {
            format!("https://{}", instance)
        }
    }

    fn record_url(&self, sys_id: &str) -> String {
        format!(
            "{}/api/now/table/{}/{}",
            self.base_url(),
            REQUESTED_ITEM_TABLE,
            urlencoding::encode(sys_id)
        )
    }
}

#[async_trait]
impl TicketStore for ServiceNowTicketStore {
    fn name(&self) -> &str {
        "servicenow"
    }

    async fn update(&self, sys_id: &str, update: &TicketUpdate) -> Result<(), TicketError> {
        info!(sys_id = sys_id, state = ?update.state, "Updating ticket");
        let body = UpdateBody {
            state: update.state.code(),
            comments: &update.comment,
        };

        let response = self
            .client
            .patch(self.record_url(sys_id))
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                metrics::record_request("servicenow", "update", false);
                TicketError::Store(e.to_string())
            })?;

        let status = response.status();
        metrics::record_request("servicenow", "update", status.is_success());
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TicketError::Store(format!(
                "HTTP {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        debug!(sys_id = sys_id, "Ticket updated");
        Ok(())
    }
}
