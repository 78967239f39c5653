use std::{io::Cursor, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageFormat};
use serde::Deserialize;

use crate::{
    domain::value_objects::{ObjectKey, StyleName},
    ports::derivation::{DeriveError, DerivedArtifact, Deriver, StyleRegistry},
};

/// How a style fits the source into its box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    /// Fit inside the box, preserving aspect ratio; never upscales
    #[default]
    Scale,
    /// Fill the box exactly, cropping the overflow
    Crop,
}

/// One entry of the styles file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StyleDefinition {
    pub name: StyleName,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(default)]
    pub mode: ResizeMode,
}

impl StyleDefinition {
    /// Target box for a source of the given size
    fn target(&self, orig_width: u32, orig_height: u32) -> (u32, u32) {
        match (self.width, self.height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => {
                let h = (w as f32 * orig_height as f32 / orig_width as f32).round() as u32;
                (w, h.max(1))
            }
            (None, Some(h)) => {
                let w = (h as f32 * orig_width as f32 / orig_height as f32).round() as u32;
                (w.max(1), h)
            }
            (None, None) => (orig_width, orig_height),
        }
    }

    fn apply(&self, img: &DynamicImage) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        let (width, height) = self.target(orig_width, orig_height);

        match self.mode {
            ResizeMode::Crop => img.resize_to_fill(width, height, FilterType::Lanczos3),
            ResizeMode::Scale if width >= orig_width && height >= orig_height => img.clone(),
            ResizeMode::Scale => img.thumbnail(width, height),
        }
    }
}

/// Resizes raster images according to a `StyleDefinition`
#[derive(Debug, Clone)]
pub struct ImageStyleDeriver {
    definition: StyleDefinition,
}

impl ImageStyleDeriver {
    pub fn new(definition: StyleDefinition) -> Self {
        Self { definition }
    }

    fn derive_blocking(
        definition: &StyleDefinition,
        source: &[u8],
    ) -> Result<DerivedArtifact, DeriveError> {
        let format = image::guess_format(source)
            .map_err(|e| DeriveError::UnsupportedFormat(e.to_string()))?;
        let img = image::load_from_memory_with_format(source, format)
            .map_err(|e| DeriveError::Decode(e.to_string()))?;

        let mut resized = definition.apply(&img);
        if format == ImageFormat::Jpeg {
            // JPEG has no alpha channel
            resized = DynamicImage::ImageRgb8(resized.to_rgb8());
        }

        let mut buffer = Cursor::new(Vec::new());
        resized
            .write_to(&mut buffer, format)
            .map_err(|e| DeriveError::Encode(e.to_string()))?;

        Ok(DerivedArtifact {
            data: Bytes::from(buffer.into_inner()),
            content_type: format.to_mime_type().to_string(),
        })
    }
}

#[async_trait]
impl Deriver for ImageStyleDeriver {
    async fn derive(
        &self,
        source: Bytes,
        source_key: &ObjectKey,
    ) -> Result<DerivedArtifact, DeriveError> {
        let definition = self.definition.clone();
        let started = std::time::Instant::now();

        let artifact =
            tokio::task::spawn_blocking(move || Self::derive_blocking(&definition, &source))
                .await
                .map_err(|e| DeriveError::Other(format!("derive task panicked: {}", e)))??;

        tracing::debug!(
            style = %self.definition.name,
            key = %source_key,
            size = artifact.data.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Derived image"
        );
        Ok(artifact)
    }
}

/// Registry with one `ImageStyleDeriver` per definition
pub fn build_registry(definitions: Vec<StyleDefinition>) -> StyleRegistry {
    definitions
        .into_iter()
        .fold(StyleRegistry::new(), |registry, definition| {
            let name = definition.name.clone();
            registry.with_style(name, Arc::new(ImageStyleDeriver::new(definition)))
        })
}
