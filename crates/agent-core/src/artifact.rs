//! Media artifacts produced on behalf of an agent
//!
//! Tools that generate images (charts, plots) hand them back to the agent by
//! registering an [`ImageArtifact`] on a shared [`ArtifactStore`]. The store is
//! cheap to clone; every clone sees the same artifacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;
use uuid::Uuid;

/// An image attached to an agent's output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageArtifact {
    /// Unique identifier (UUID v4)
    pub id: String,

    /// Location of the image, usually a `data:` URL
    pub url: String,

    /// Description of where the image came from
    pub original_prompt: String,

    /// MIME type of the image
    pub mime_type: String,

    /// When the artifact was registered
    pub created_at: DateTime<Utc>,
}

impl ImageArtifact {
    /// Create an artifact with a freshly generated id
    pub fn new(
        url: impl Into<String>,
        original_prompt: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            url: url.into(),
            original_prompt: original_prompt.into(),
            mime_type: mime_type.into(),
            created_at: Utc::now(),
        }
    }

    /// Build a `data:` URL from base64 content
    pub fn data_url(mime_type: &str, content_base64: &str) -> String {
        format!("data:{mime_type};base64,{content_base64}")
    }
}

/// Shared collection of artifacts registered by tools
#[derive(Debug, Clone, Default)]
pub struct ArtifactStore {
    images: Arc<RwLock<Vec<ImageArtifact>>>,
}

impl ArtifactStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an image artifact, returning its id
    pub fn add_image(&self, artifact: ImageArtifact) -> String {
        let id = artifact.id.clone();
        debug!(artifact_id = %id, mime_type = %artifact.mime_type, "Registering image artifact");
        self.images
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(artifact);
        id
    }

    /// Look up an image by id
    pub fn get(&self, id: &str) -> Option<ImageArtifact> {
        self.images
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|a| a.id == id)
            .cloned()
    }

    /// All images in registration order
    pub fn images(&self) -> Vec<ImageArtifact> {
        self.images
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of registered images
    pub fn len(&self) -> usize {
        self.images
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if no images have been registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
