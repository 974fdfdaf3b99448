//! The renderlet worker: job orchestration and its hosting shim.
//!
//! [`handler`] sequences one job from raw input to published artifact;
//! [`service`] exposes the handler over HTTP for the hosting runtime.

pub mod handler;
pub mod service;
