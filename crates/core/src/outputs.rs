//! Output resolution for completed render jobs.
//!
//! The render server's history record maps node ids to per-node
//! outputs; image-producing nodes carry an `images` array of
//! `{ subfolder, filename }` entries. Node enumeration order is
//! unspecified upstream, and the selection policy here is explicitly
//! *last image wins* -- callers must not assume which node supplies
//! the winning image.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

/// Named output selection policy: when several nodes produce images,
/// the last one observed during the scan is the job's artifact.
pub const OUTPUT_SELECTION_POLICY: &str = "last-image-wins";

/// An output image resolved against the local output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    /// Absolute (root-joined) path of the image on local disk.
    pub path: PathBuf,
    /// Bare file name, used as the remote key when publishing.
    pub file_name: String,
}

/// Failures while resolving a completion record to a local file.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// No node in the completion record produced any image.
    #[error("Completion record contains no output images")]
    NoImages,

    /// The resolved image is absent from the output root. Unrecoverable
    /// for this job; never retried.
    #[error("The image does not exist in the output folder at: {}", path.display())]
    ArtifactMissing { path: PathBuf },
}

/// Scan all node outputs and return the relative `subfolder/filename`
/// of the winning image, per [`OUTPUT_SELECTION_POLICY`].
pub fn select_output_image(outputs: &Map<String, Value>) -> Option<(PathBuf, String)> {
    let mut selected = None;

    for node_output in outputs.values() {
        let Some(images) = node_output.get("images").and_then(Value::as_array) else {
            continue;
        };

        for image in images {
            let (Some(subfolder), Some(filename)) = (
                image.get("subfolder").and_then(Value::as_str),
                image.get("filename").and_then(Value::as_str),
            ) else {
                continue;
            };

            // Last write wins, across nodes and within a node's list.
            selected = Some((Path::new(subfolder).join(filename), filename.to_string()));
        }
    }

    selected
}

/// Resolve the winning output image against `output_root` and verify
/// it exists on disk.
pub fn locate_artifact(
    output_root: &Path,
    outputs: &Map<String, Value>,
) -> Result<ResolvedArtifact, OutputError> {
    let (relative, file_name) = select_output_image(outputs).ok_or(OutputError::NoImages)?;

    let path = output_root.join(&relative);
    tracing::debug!(
        path = %path.display(),
        policy = OUTPUT_SELECTION_POLICY,
        "Resolved output image",
    );

    if !path.exists() {
        return Err(OutputError::ArtifactMissing { path });
    }

    Ok(ResolvedArtifact { path, file_name })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
