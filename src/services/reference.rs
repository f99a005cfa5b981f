//! Deterministic engine that tracks geometry and provenance without pixel math

use super::{EngineOutput, ImageRef, TransformEngine};
use crate::error::Result;
use crate::transform::TransformId;
use crate::validation::ValidatedSpec;
use async_trait::async_trait;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Reference engine used by the CLI.
///
/// The output image id is a digest of the input id, the pipeline and the seed,
/// so identical inputs always give identical outputs. Crops shrink the
/// reported dimensions; everything else keeps them.
#[derive(Debug, Clone, Default)]
pub struct MetadataOnlyEngine;

impl MetadataOnlyEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TransformEngine for MetadataOnlyEngine {
    fn name(&self) -> &str {
        "metadata-only"
    }

    async fn apply(
        &self,
        image: &ImageRef,
        spec: &ValidatedSpec,
        seed: u32,
    ) -> Result<EngineOutput> {
        let pipeline = serde_json::to_string(&spec.transforms)?;

        let mut hasher = Sha256::new();
        hasher.update(image.id().as_bytes());
        hasher.update(pipeline.as_bytes());
        hasher.update(seed.to_le_bytes());
        let digest = format!("{:x}", hasher.finalize());

        let (mut width, mut height) = (image.width(), image.height());
        for transform in spec.transforms.iter() {
            if transform.transform_id == TransformId::RandomCrop {
                let crop_w = transform.param_f64("width").unwrap_or(f64::from(width)) as u32;
                let crop_h = transform.param_f64("height").unwrap_or(f64::from(height)) as u32;
                width = width.min(crop_w);
                height = height.min(crop_h);
            }
        }

        let metadata = BTreeMap::from([
            ("engine".to_string(), json!(self.name())),
            ("digest".to_string(), json!(digest)),
            ("applied".to_string(), json!(spec.transform_names())),
        ]);

        Ok(EngineOutput {
            image: ImageRef::new(format!("{}-{}", image.id(), &digest[..12]), width, height),
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{TransformPipelineSpec, TransformSpec};
    use crate::validation::TransformValidator;

    fn validated(transforms: Vec<TransformSpec>) -> ValidatedSpec {
        TransformValidator::default()
            .validate(&TransformPipelineSpec::new("test", transforms))
            .unwrap()
    }

    #[tokio::test]
    async fn test_deterministic_per_seed() {
        let engine = MetadataOnlyEngine::new();
        let spec = validated(vec![TransformSpec::new(TransformId::ToGray, 0)]);
        let image = ImageRef::new("cat", 640, 480);

        let a = engine.apply(&image, &spec, 7).await.unwrap();
        let b = engine.apply(&image, &spec, 7).await.unwrap();
        let c = engine.apply(&image, &spec, 8).await.unwrap();

        assert_eq!(a, b);
        assert_ne!(a.image.id(), c.image.id());
        assert_ne!(a.image.id(), image.id());
    }

    #[tokio::test]
    async fn test_crop_shrinks_dimensions() {
        let engine = MetadataOnlyEngine::new();
        let spec = validated(vec![TransformSpec::new(TransformId::RandomCrop, 0)
            .with_param("width", json!(100))
            .with_param("height", json!(50))]);
        let out = engine
            .apply(&ImageRef::new("cat", 640, 480), &spec, 1)
            .await
            .unwrap();
        assert_eq!((out.image.width(), out.image.height()), (100, 50));
    }
}
