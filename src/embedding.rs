//! C5 Embedding Provider: text -> fixed-dimensional vector.
//!
//! Treated as an external collaborator per the core's scope: this module owns
//! loading the model and running batched inference, nothing downstream of the
//! vector it returns. Mirrors `semantic.rs`'s `ModelConfig`/`resolve_model`
//! preset convention, but built on the `fastembed`/`ort` pair actually
//! declared in `Cargo.toml` rather than the crate's in-tree (and undeclared)
//! `candle` pipeline.

use std::sync::Mutex;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::info;

use crate::error::{CodeSeekerError, Result};

/// Named embedding presets, analogous to `semantic.rs::resolve_model`'s
/// minilm/codebert/starencoder table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelPreset {
    /// `all-MiniLM-L6-v2`, 384 dimensions. Default: fast, small, good enough
    /// for code-chunk retrieval at local-service scale.
    MiniLm,
    /// `BAAI/bge-small-en-v1.5`, 384 dimensions. Slightly stronger recall,
    /// similar cost.
    BgeSmall,
}

impl ModelPreset {
    pub fn dim(self) -> usize {
        match self {
            ModelPreset::MiniLm => 384,
            ModelPreset::BgeSmall => 384,
        }
    }

    fn fastembed_model(self) -> EmbeddingModel {
        match self {
            ModelPreset::MiniLm => EmbeddingModel::AllMiniLML6V2,
            ModelPreset::BgeSmall => EmbeddingModel::BGESmallENV15,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "minilm" | "all-minilm-l6-v2" => Some(ModelPreset::MiniLm),
            "bge-small" | "bge-small-en-v1.5" => Some(ModelPreset::BgeSmall),
            _ => None,
        }
    }
}

impl Default for ModelPreset {
    fn default() -> Self {
        ModelPreset::MiniLm
    }
}

/// Map text to a fixed-dimensional vector. Implementations must be safe to
/// call from multiple indexing worker threads concurrently.
pub trait EmbeddingProvider: Send + Sync {
    /// Embedding dimensionality this provider always returns.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts, preserving order. Empty input returns empty output.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self
            .embed_batch(std::slice::from_ref(&text.to_string()))?
            .into_iter()
            .next()
            .unwrap_or_default())
    }
}

/// `fastembed`-backed provider. `TextEmbedding::embed` takes `&mut self` in
/// some backend configurations, so the model is held behind a `Mutex` —
/// matching the lock-around-inference shape `semantic.rs` uses for its model.
pub struct FastEmbedProvider {
    model: Mutex<TextEmbedding>,
    dim: usize,
}

impl FastEmbedProvider {
    pub fn new(preset: ModelPreset) -> Result<Self> {
        info!(preset = ?preset, dim = preset.dim(), "loading embedding model");
        let options = InitOptions::new(preset.fastembed_model()).with_show_download_progress(false);
        let model = TextEmbedding::try_new(options).map_err(|e| {
            CodeSeekerError::embedding(format!("failed to load embedding model: {e}"))
        })?;
        Ok(Self {
            model: Mutex::new(model),
            dim: preset.dim(),
        })
    }
}

impl EmbeddingProvider for FastEmbedProvider {
    fn dimension(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let documents: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
        let mut model = self
            .model
            .lock()
            .map_err(|_| CodeSeekerError::embedding("embedding model lock poisoned"))?;
        model
            .embed(documents, None)
            .map_err(|e| CodeSeekerError::embedding(format!("embedding batch failed: {e}")))
    }
}

/// Deterministic hash-based provider for tests and environments without the
/// `semantic` feature enabled. Not suitable for real retrieval quality, but
/// keeps the vector store's math exercised without a model download.
pub struct HashEmbeddingProvider {
    dim: usize,
}

impl HashEmbeddingProvider {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl EmbeddingProvider for HashEmbeddingProvider {
    fn dimension(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| hash_embed(t, self.dim)).collect())
    }
}

fn hash_embed(text: &str, dim: usize) -> Vec<f32> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut v = vec![0f32; dim];
    for (i, word) in text.split_whitespace().enumerate() {
        let mut hasher = DefaultHasher::new();
        word.hash(&mut hasher);
        i.hash(&mut hasher);
        let h = hasher.finish();
        v[(h as usize) % dim] += 1.0;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_embed_is_normalized() {
        let provider = HashEmbeddingProvider::new(64);
        let v = provider.embed_one("fn main() { println!(\"hi\") }").unwrap();
        assert_eq!(v.len(), 64);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4 || norm == 0.0);
    }

    #[test]
    fn hash_embed_is_deterministic() {
        let provider = HashEmbeddingProvider::new(32);
        let a = provider.embed_one("hello world").unwrap();
        let b = provider.embed_one("hello world").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_batch_returns_empty() {
        let provider = HashEmbeddingProvider::new(32);
        let out = provider.embed_batch(&[]).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn preset_parse_roundtrip() {
        assert_eq!(ModelPreset::parse("minilm"), Some(ModelPreset::MiniLm));
        assert_eq!(ModelPreset::parse("bge-small"), Some(ModelPreset::BgeSmall));
        assert_eq!(ModelPreset::parse("nonsense"), None);
    }
}
