// In-memory vector index
// Holds one embedding per chunk of the loaded document and answers
// nearest-neighbour queries by cosine similarity


mod similarity;

use std::cmp::Ordering;
use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use tracing::{debug, info};

use crate::embeddings::{Chunk, Embedder};
use crate::{DocQaError, Result};

pub use similarity::{cosine_similarity, l2_norm};

/// Default number of chunks returned per query
pub const DEFAULT_TOP_K: usize = 3;

struct IndexEntry {
    chunk: Chunk,
    vector: Vec<f32>,
    norm: f32,
}

/// A chunk returned by [`VectorIndex::query`]
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub similarity_score: f32,
}

/// Immutable similarity index over the chunks of one document.
///
/// The index keeps the embedder it was built with so that questions are
/// embedded into the same space as the chunks.
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dimension: usize,
    embedder: Arc<dyn Embedder>,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("chunks", &self.entries.len())
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl VectorIndex {
    /// Embed every chunk and build the index.
    ///
    /// Fails without producing a partial index if any embedding call fails,
    /// returns an empty vector, or disagrees with the others on dimension.
    #[inline]
    pub async fn build(
        chunks: Vec<Chunk>,
        embedder: Arc<dyn Embedder>,
        concurrency: usize,
    ) -> Result<Self> {
        if chunks.is_empty() {
            return Err(DocQaError::EmptyDocument);
        }

        debug!(
            "Embedding {} chunks with concurrency {}",
            chunks.len(),
            concurrency
        );

        let embedder_ref = embedder.as_ref();
        let vectors: Vec<Vec<f32>> = stream::iter(chunks.iter())
            .map(|chunk| async move {
                embedder_ref.embed(&chunk.content).await.map_err(|e| {
                    DocQaError::Embedding(format!(
                        "Failed to embed chunk {}: {:#}",
                        chunk.chunk_index, e
                    ))
                })
            })
            .buffered(concurrency.max(1))
            .try_collect()
            .await?;

        let dimension = vectors.first().map_or(0, Vec::len);
        if dimension == 0 {
            return Err(DocQaError::Embedding(
                "Embedding capability returned an empty vector".to_string(),
            ));
        }

        let mut entries = Vec::with_capacity(chunks.len());
        for (chunk, vector) in chunks.into_iter().zip(vectors) {
            if vector.len() != dimension {
                return Err(DocQaError::Embedding(format!(
                    "Chunk {} embedded with {} dimensions, expected {}",
                    chunk.chunk_index,
                    vector.len(),
                    dimension
                )));
            }
            let norm = l2_norm(&vector);
            entries.push(IndexEntry {
                chunk,
                vector,
                norm,
            });
        }

        info!(
            "Built vector index with {} chunks ({} dimensions)",
            entries.len(),
            dimension
        );

        Ok(Self {
            entries,
            dimension,
            embedder,
        })
    }

    /// Return up to `k` chunks most similar to `question`, best first.
    ///
    /// Ties are broken by document order.
    #[inline]
    pub async fn query(&self, question: &str, k: usize) -> Result<Vec<SearchResult>> {
        let query_vector = self.embedder.embed(question).await.map_err(|e| {
            DocQaError::Embedding(format!("Failed to embed question: {:#}", e))
        })?;

        if query_vector.len() != self.dimension {
            return Err(DocQaError::Embedding(format!(
                "Question embedded with {} dimensions, index has {}",
                query_vector.len(),
                self.dimension
            )));
        }

        let query_norm = l2_norm(&query_vector);

        let mut scored: Vec<(f32, &IndexEntry)> = self
            .entries
            .iter()
            .map(|entry| {
                let score = cosine_similarity(&query_vector, &entry.vector, query_norm, entry.norm);
                (score, entry)
            })
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then(a.1.chunk.chunk_index.cmp(&b.1.chunk.chunk_index))
        });
        scored.truncate(k);

        debug!(
            "Query matched {} chunks (best score {:?})",
            scored.len(),
            scored.first().map(|(score, _)| *score)
        );

        Ok(scored
            .into_iter()
            .map(|(similarity_score, entry)| SearchResult {
                chunk: entry.chunk.clone(),
                similarity_score,
            })
            .collect())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|entry| &entry.chunk)
    }
}
