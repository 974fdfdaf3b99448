//! Hugging Face Hub artifact store.
//!
//! Publishes files through the Hub's commit endpoint: a single POST of
//! newline-delimited JSON carrying a commit header line followed by a
//! base64-encoded file line. One upload = one commit.

use std::path::Path;

use base64::Engine;

use crate::store::{ArtifactStore, StorageError};

/// Production Hub endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";

/// Revision commits are written to.
const COMMIT_REVISION: &str = "main";

/// Artifact store backed by a Hugging Face Hub model repository.
pub struct HfHubStore {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl HfHubStore {
    /// Create a store against the production Hub endpoint.
    pub fn new(token: String) -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT.to_string(), token)
    }

    /// Create a store against a custom endpoint (used by tests and
    /// self-hosted Hub deployments).
    pub fn with_endpoint(endpoint: String, token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            token,
        }
    }

    /// Build the NDJSON commit payload for one file.
    fn commit_body(remote_name: &str, bytes: &[u8]) -> String {
        let header = serde_json::json!({
            "key": "header",
            "value": {
                "summary": format!("Upload {remote_name}"),
                "description": "",
            },
        });
        let file = serde_json::json!({
            "key": "file",
            "value": {
                "path": remote_name,
                "content": base64::engine::general_purpose::STANDARD.encode(bytes),
                "encoding": "base64",
            },
        });

        format!("{header}\n{file}")
    }
}

#[async_trait::async_trait]
impl ArtifactStore for HfHubStore {
    async fn upload(
        &self,
        local_path: &Path,
        remote_name: &str,
        repo_id: &str,
    ) -> Result<(), StorageError> {
        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|source| StorageError::Io {
                path: local_path.to_path_buf(),
                source,
            })?;

        let url = format!(
            "{}/api/models/{}/commit/{}",
            self.endpoint, repo_id, COMMIT_REVISION
        );

        tracing::debug!(
            repo_id,
            remote_name,
            size_bytes = bytes.len(),
            "Uploading artifact to the Hub",
        );

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(Self::commit_body(remote_name, &bytes))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(repo_id, remote_name, "Artifact uploaded to the Hub");
        Ok(())
    }
}
