//! HTTP client for the structural (graph) index service

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::config::GraphIndexConfig;
use crate::wal::Operation;

use super::{ensure_success, IndexBackend, IndexError, Result};

/// Pushes file-level node updates into the code graph service. Parsing the
/// content into entities and relationships is the service's concern.
pub struct GraphIndexClient {
    client: reqwest::Client,
    endpoint: String,
}

impl GraphIndexClient {
    pub fn new(config: &GraphIndexConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| IndexError::Request(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl IndexBackend for GraphIndexClient {
    fn name(&self) -> &'static str {
        "graph-index"
    }

    async fn apply(
        &self,
        user_id: &str,
        path: &str,
        operation: Operation,
        content: Option<&str>,
    ) -> Result<()> {
        match operation {
            Operation::Upsert => {
                let url = format!("{}/graph/files", self.endpoint);
                let body = json!({
                    "user_id": user_id,
                    "files": [{ "path": path, "content": content }],
                });
                debug!(path, user_id, "Updating code graph nodes");
                let response = self.client.post(&url).json(&body).send().await?;
                ensure_success(response).await
            }
            Operation::Delete => {
                let url = format!("{}/graph/files/delete", self.endpoint);
                let body = json!({
                    "user_id": user_id,
                    "paths": [path],
                });
                debug!(path, user_id, "Deleting code graph nodes");
                let response = self.client.post(&url).json(&body).send().await?;
                ensure_success(response).await
            }
        }
    }
}
