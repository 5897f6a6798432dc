//! Core types shared across agent-rs
//!
//! This crate holds the error type every tool reports through and the
//! artifact store that collects media (charts, images) produced on behalf of
//! an agent.

pub mod artifact;
pub mod error;

pub use artifact::{ArtifactStore, ImageArtifact};
pub use error::{Error, Result};
