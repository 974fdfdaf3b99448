//! The artifact store abstraction.

use std::path::{Path, PathBuf};

/// Failures while publishing an artifact to a remote store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The local artifact could not be read.
    #[error("Failed to read artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The upload request itself failed (network, DNS, TLS, etc.).
    #[error("Upload request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The store answered with a non-2xx status code.
    #[error("Store rejected upload ({status}): {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

/// A remote content store that finished artifacts are published to.
///
/// Publishing is idempotent by remote name: re-uploading the same name
/// into the same repository overwrites the existing object. No
/// implementation retries internally -- a failed upload fails the job.
#[async_trait::async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Upload the file at `local_path` into `repo_id` under `remote_name`.
    async fn upload(
        &self,
        local_path: &Path,
        remote_name: &str,
        repo_id: &str,
    ) -> Result<(), StorageError>;
}
