//! Interfaces of the external collaborators a run talks to
//!
//! The core never touches pixels: the [`TransformEngine`] produces new images,
//! and the optional verification and classification services judge them.

pub mod reference;

pub use reference::MetadataOnlyEngine;

use crate::error::Result;
use crate::transform::TransformPipelineSpec;
use crate::validation::ValidatedSpec;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Immutable handle to an image owned by the engine or storage
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef {
    id: String,
    width: u32,
    height: u32,
}

impl ImageRef {
    pub fn new(id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            width,
            height,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn max_dimension(&self) -> u32 {
        self.width.max(self.height)
    }
}

/// What the engine returns for one application of a pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutput {
    pub image: ImageRef,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Applies a validated pipeline to an image. Must be deterministic per seed.
#[async_trait]
pub trait TransformEngine: Send + Sync {
    fn name(&self) -> &str;

    async fn apply(&self, image: &ImageRef, spec: &ValidatedSpec, seed: u32)
        -> Result<EngineOutput>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Whether the transformed image matches what the prompt asked for
    pub matches_intent: bool,
    pub confidence: f64,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub original_label: String,
    pub transformed_label: String,
    pub consistent: bool,
    pub confidence: f64,
}

/// Compares original and transformed images against the requested pipeline
#[async_trait]
pub trait VerificationService: Send + Sync {
    async fn compare(
        &self,
        original: &ImageRef,
        transformed: &ImageRef,
        spec: &TransformPipelineSpec,
    ) -> Result<VerificationReport>;
}

/// Checks that the transform kept the image's class
#[async_trait]
pub trait ClassificationService: Send + Sync {
    async fn classify_consistency(
        &self,
        original: &ImageRef,
        transformed: &ImageRef,
    ) -> Result<ClassificationReport>;
}
