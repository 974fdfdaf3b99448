//! Artifact publishing for finished render jobs.
//!
//! Defines the [`ArtifactStore`] trait the job handler publishes
//! through, and the Hugging Face Hub implementation used in
//! production.

pub mod hf;
pub mod store;

pub use hf::HfHubStore;
pub use store::{ArtifactStore, StorageError};
