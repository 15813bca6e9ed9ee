// Embeddings module
// Document chunking and the embedding capability used by the index

pub mod chunking;

use anyhow::Result;
use async_trait::async_trait;

pub use chunking::{Chunk, ChunkingConfig, reconstruct_text, split_text};

/// Turns text into a fixed-dimension vector.
///
/// Implementations must return vectors of the same length for every input.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
