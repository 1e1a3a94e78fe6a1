//! HTTP client for the semantic (vector) index service

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::config::VectorIndexConfig;
use crate::wal::Operation;

use super::{ensure_success, IndexBackend, IndexError, Result};

/// Pushes file documents into a collection of the vector index service.
/// Embedding happens inside the service; this client only ships the raw
/// content and identifying metadata.
pub struct VectorIndexClient {
    client: reqwest::Client,
    endpoint: String,
    collection: String,
}

impl VectorIndexClient {
    pub fn new(config: &VectorIndexConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| IndexError::Request(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
        })
    }
}

#[async_trait]
impl IndexBackend for VectorIndexClient {
    fn name(&self) -> &'static str {
        "vector-index"
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
                let url = format!(
                    "{}/collections/{}/documents",
                    self.endpoint, self.collection
                );
                let body = json!({
                    "documents": [{
                        "user_id": user_id,
                        "file": path,
                        "content": content,
                    }]
                });
                debug!(path, user_id, "Upserting document embedding");
                let response = self.client.put(&url).json(&body).send().await?;
                ensure_success(response).await
            }
            Operation::Delete => {
                let url = format!(
                    "{}/collections/{}/documents/delete",
                    self.endpoint, self.collection
                );
                let body = json!({
                    "user_id": user_id,
                    "files": [path],
                });
                debug!(path, user_id, "Deleting document embedding");
                let response = self.client.post(&url).json(&body).send().await?;
                ensure_success(response).await
            }
        }
    }
}
