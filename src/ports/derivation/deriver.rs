use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::domain::value_objects::{ObjectKey, StyleName};

/// Output of a derive operation
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedArtifact {
    pub data: Bytes,
    pub content_type: String,
}

#[derive(Debug, Clone, Error)]
pub enum DeriveError {
    #[error("Unsupported source format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to decode source: {0}")]
    Decode(String),

    #[error("Failed to encode derivative: {0}")]
    Encode(String),

    #[error("{0}")]
    Other(String),
}

/// Port for the opaque `derive(style, source) -> bytes` operation
#[async_trait]
pub trait Deriver: Send + Sync + 'static {
    async fn derive(
        &self,
        source: Bytes,
        source_key: &ObjectKey,
    ) -> Result<DerivedArtifact, DeriveError>;
}

/// Known styles and the deriver implementing each
#[derive(Clone, Default)]
pub struct StyleRegistry {
    styles: HashMap<StyleName, Arc<dyn Deriver>>,
}

impl StyleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_style(mut self, style: StyleName, deriver: Arc<dyn Deriver>) -> Self {
        self.insert(style, deriver);
        self
    }

    pub fn insert(&mut self, style: StyleName, deriver: Arc<dyn Deriver>) {
        self.styles.insert(style, deriver);
    }

    pub fn get(&self, style: &StyleName) -> Option<Arc<dyn Deriver>> {
        self.styles.get(style).cloned()
    }

    pub fn contains(&self, style: &StyleName) -> bool {
        self.styles.contains_key(style)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

impl std::fmt::Debug for StyleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.styles.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        f.debug_struct("StyleRegistry").field("styles", &names).finish()
    }
}
