//! HTTP client for the ComfyUI render server.
//!
//! Wraps workflow submission and history retrieval over the server's
//! REST API, and layers the two waiting loops on top: readiness
//! probing before submission and completion polling after it.

pub mod api;
pub mod poll;
pub mod probe;

pub use api::{ComfyUIApi, ComfyUIApiError, SubmitResponse};
